use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::models::User;
use crate::db::{format_timestamp, now_micros, timestamp_column, uuid_column};

const USER_COLUMNS: &str =
    "id, email, hashed_password, is_active, is_superuser, is_verified, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_column(row, 0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        is_active: row.get(3)?,
        is_superuser: row.get(4)?,
        is_verified: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

/// Emails are compared case-insensitively by storing them lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn insert(conn: &Connection, email: &str, hashed_password: &str) -> rusqlite::Result<User> {
    let user = User {
        id: Uuid::now_v7(),
        email: normalize_email(email),
        hashed_password: hashed_password.to_string(),
        is_active: true,
        is_superuser: false,
        is_verified: false,
        created_at: now_micros(),
    };

    conn.execute(
        "INSERT INTO users (id, email, hashed_password, is_active, is_superuser, is_verified, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id.to_string(),
            user.email,
            user.hashed_password,
            user.is_active,
            user.is_superuser,
            user.is_verified,
            format_timestamp(&user.created_at),
        ],
    )?;

    Ok(user)
}

pub fn get_by_id(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id.to_string()],
        map_user,
    )
    .optional()
}

pub fn get_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![normalize_email(email)],
        map_user,
    )
    .optional()
}

/// Persist every mutable column of `user`.
pub fn update(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users
         SET email = ?2, hashed_password = ?3, is_active = ?4, is_superuser = ?5, is_verified = ?6
         WHERE id = ?1",
        params![
            user.id.to_string(),
            normalize_email(&user.email),
            user.hashed_password,
            user.is_active,
            user.is_superuser,
            user.is_verified,
        ],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(rows > 0)
}

/// Every user's email keyed by id. Used to label feed entries.
pub fn email_index(conn: &Connection) -> rusqlite::Result<HashMap<Uuid, String>> {
    let mut stmt = conn.prepare("SELECT id, email FROM users")?;
    let rows = stmt.query_map([], |row| Ok((uuid_column(row, 0)?, row.get(1)?)))?;
    rows.collect()
}
