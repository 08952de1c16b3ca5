use axum::extract::{FromRequest, Multipart, Request, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::models::{FileType, NewPost, Post};
use crate::db::{posts, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppPath, CurrentUser};
use crate::media::{self, StagedFile, UploadRequest};
use crate::state::AppState;

const UNKNOWN_EMAIL: &str = "Unknown";

// --- View structs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub post: Post,
    pub is_owner: bool,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub post: Vec<FeedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

// --- Forms ---

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    caption: String,
}

/// Reads the `file` and `caption` fields. Unknown fields are skipped.
impl FromRequest<AppState> for UploadForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> AppResult<Self> {
        let mut multipart = Multipart::from_request(req, state).await?;
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    let file_name = field
                        .file_name()
                        .filter(|n| !n.is_empty())
                        .unwrap_or("upload")
                        .to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;
                    form.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        data,
                    });
                }
                Some("caption") => form.caption = field.text().await?,
                _ => {}
            }
        }

        Ok(form)
    }
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/feed", get(feed))
        .route("/posts/{post_id}", delete(delete_post))
}

// --- Handlers ---

#[tracing::instrument(skip_all, fields(user_id = %user.id))]
async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    form: UploadForm,
) -> AppResult<Json<Post>> {
    let file = form
        .file
        .ok_or_else(|| AppError::Validation("file is required".into()))?;
    let content_type = media::resolve_content_type(file.content_type.as_deref(), &file.file_name);

    let staged = StagedFile::write(&state.config.temp_dir(), &file.file_name, &file.data)?;
    let uploaded = state
        .media
        .upload(UploadRequest {
            path: staged.path(),
            file_name: &file.file_name,
            content_type: &content_type,
            use_unique_file_name: true,
            tags: vec![state.config.cdn.tag.clone()],
        })
        .await?;
    drop(staged);

    let post = {
        let conn = state.db.get()?;
        posts::insert(
            &conn,
            NewPost {
                user_id: user.id,
                caption: Some(form.caption),
                url: uploaded.url,
                file_type: FileType::from_content_type(&content_type),
                file_name: uploaded.name,
            },
        )?
    };

    tracing::info!(post_id = %post.id, file_type = %post.file_type, "Post created");
    Ok(Json(post))
}

#[tracing::instrument(skip_all, fields(user_id = %user.id))]
async fn feed(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<FeedResponse>> {
    let conn = state.db.get()?;
    let posts = posts::list_newest_first(&conn)?;
    let emails = users::email_index(&conn)?;

    Ok(Json(FeedResponse {
        post: build_feed(posts, &emails, user.id),
    }))
}

#[tracing::instrument(skip_all, fields(user_id = %user.id, %post_id))]
async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(post_id): AppPath<String>,
) -> AppResult<Json<DeleteResponse>> {
    let post_id = Uuid::parse_str(&post_id).map_err(|e| AppError::Internal(e.to_string()))?;

    let conn = state.db.get()?;
    let post =
        posts::get(&conn, post_id)?.ok_or_else(|| AppError::NotFound("Post not found".into()))?;

    if post.user_id != user.id {
        return Err(AppError::Forbidden(
            "You don't permission to delete this post".into(),
        ));
    }

    posts::delete(&conn, post_id)?;
    tracing::info!("Post deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "Post deleted successfully".to_string(),
    }))
}

/// Annotate posts (already newest first) for `viewer`.
pub fn build_feed(
    posts: Vec<Post>,
    emails: &HashMap<Uuid, String>,
    viewer: Uuid,
) -> Vec<FeedEntry> {
    posts
        .into_iter()
        .map(|post| FeedEntry {
            is_owner: post.user_id == viewer,
            email: emails
                .get(&post.user_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_EMAIL.to_string()),
            post,
        })
        .collect()
}

// --- Tests ---
