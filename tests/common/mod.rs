#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use snapfeed::auth::password;
use snapfeed::config::Config;
use snapfeed::db;
use snapfeed::media::{MediaError, MediaStore, UploadRequest, UploadedMedia};
use snapfeed::state::AppState;

pub const PASSWORD: &str = "correct horse battery";
const BOUNDARY: &str = "----snapfeed-test-boundary";

/// What the CDN stand-in saw for one upload call.
#[derive(Debug, Clone)]
pub struct SeenUpload {
    pub path: PathBuf,
    pub existed: bool,
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub use_unique_file_name: bool,
    pub tags: Vec<String>,
}

/// In-memory CDN that records each call and either succeeds or fails.
#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    pub seen: Mutex<Vec<SeenUpload>>,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<SeenUpload> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for RecordingStore {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<UploadedMedia, MediaError> {
        let existed = request.path.exists();
        let bytes = std::fs::read(request.path).unwrap_or_default();
        self.seen.lock().unwrap().push(SeenUpload {
            path: request.path.to_path_buf(),
            existed,
            bytes,
            file_name: request.file_name.to_string(),
            content_type: request.content_type.to_string(),
            use_unique_file_name: request.use_unique_file_name,
            tags: request.tags.clone(),
        });

        if self.fail {
            return Err(MediaError::Rejected {
                status: 500,
                body: "cdn down".into(),
            });
        }

        let name = format!("{}_u1", request.file_name);
        Ok(UploadedMedia {
            file_id: format!("fid-{}", name),
            url: format!("https://ik.imagekit.io/test/{}", name),
            name,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub media: Arc<RecordingStore>,
    pub staging_dir: PathBuf,
    _tmp: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(RecordingStore::default(), |_| {})
    }

    pub fn with_failing_cdn() -> Self {
        Self::build(
            RecordingStore {
                fail: true,
                ..RecordingStore::default()
            },
            |_| {},
        )
    }

    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        Self::build(RecordingStore::default(), tweak)
    }

    fn build(store: RecordingStore, tweak: impl FnOnce(&mut Config)) -> Self {
        let tmp = TempDir::new().unwrap();
        let staging_dir = tmp.path().join("staging");

        let mut config = Config::default();
        config.database.path = Some(tmp.path().join("test.db"));
        config.storage.temp_dir = Some(staging_dir.clone());
        config.auth.jwt_secret = Some("test-secret".into());
        config.auth.password_hash_cost = password::MIN_COST;
        tweak(&mut config);

        let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let media = Arc::new(store);
        let state = AppState::new(pool, config, media.clone());
        let router = snapfeed::app(state.clone());

        Self {
            router,
            state,
            media,
            staging_dir,
            _tmp: tmp,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Response { status, body }
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::DELETE).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, email: &str, password: &str) -> Response {
        self.json(
            Method::POST,
            "/auth/register",
            None,
            json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        let form = format!(
            "username={}&password={}",
            email.replace('@', "%40"),
            password.replace(' ', "+")
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/jwt/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        self.send(request).await
    }

    /// Register, log in, and return the bearer token.
    pub async fn sign_up(&self, email: &str) -> String {
        let registered = self.register(email, PASSWORD).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);
        let login = self.login(email, PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        login.body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn upload(
        &self,
        token: Option<&str>,
        file: Option<(&str, Option<&str>, &[u8])>,
        caption: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = multipart_body(file, caption);
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Files left behind in the upload staging directory.
    pub fn staged_files(&self) -> usize {
        match std::fs::read_dir(&self.staging_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

fn multipart_body(file: Option<(&str, Option<&str>, &[u8])>, caption: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(caption) = caption {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\n{caption}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        if let Some(ct) = content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
