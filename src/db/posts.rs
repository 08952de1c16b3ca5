use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::models::{FileType, NewPost, Post};
use crate::db::{format_timestamp, now_micros, timestamp_column, uuid_column};

const POST_COLUMNS: &str = "id, user_id, caption, url, file_type, file_name, created_at";

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    let file_type: String = row.get(4)?;
    let file_type = file_type.parse::<FileType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
    })?;

    Ok(Post {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        caption: row.get(2)?,
        url: row.get(3)?,
        file_type,
        file_name: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

pub fn insert(conn: &Connection, new_post: NewPost) -> rusqlite::Result<Post> {
    let post = Post {
        id: Uuid::now_v7(),
        user_id: new_post.user_id,
        caption: new_post.caption,
        url: new_post.url,
        file_type: new_post.file_type,
        file_name: new_post.file_name,
        created_at: now_micros(),
    };

    conn.execute(
        "INSERT INTO posts (id, user_id, caption, url, file_type, file_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            post.id.to_string(),
            post.user_id.to_string(),
            post.caption,
            post.url,
            post.file_type.as_str(),
            post.file_name,
            format_timestamp(&post.created_at),
        ],
    )?;

    Ok(post)
}

/// All posts, newest first.
pub fn list_newest_first(conn: &Connection) -> rusqlite::Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], map_post)?;
    rows.collect()
}

pub fn get(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        params![id.to_string()],
        map_post,
    )
    .optional()
}

pub fn delete(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])?;
    Ok(rows > 0)
}
