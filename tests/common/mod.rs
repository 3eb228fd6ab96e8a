use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use serde::Serialize;
use std::path::PathBuf;
use tempfile::TempDir;
use tilefolio::config::AppConfig;
use tilefolio::routes;
use tilefolio::state::AppState;
use tower::util::ServiceExt;
use uuid::Uuid;

/// The real application over a throwaway directory tree: catalogue JSON under
/// `data/`, uploaded assets under `public/assets/`.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    _tmp: TempDir,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let tmp = TempDir::new().context("failed to create temp dir")?;
        let config = AppConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            data_dir: tmp.path().join("data"),
            public_dir: tmp.path().join("public"),
            cors_allowed_origin: None,
        };

        let state = AppState::new(config);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            _tmp: tmp,
        })
    }

    /// Absolute path of a record's relative asset path (`assets/...`).
    pub fn public_path(&self, rel: &str) -> PathBuf {
        self.state.config.public_dir.join(rel)
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::PUT)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> Result<hyper::Response<Body>> {
        let (content_type, body) = form.finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", content_type)
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

/// Hand-built multipart body. Field order is preserved, which matters for
/// file placement and filename-derived ids.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("boundary-{}", Uuid::new_v4()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body
            .extend(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend(value.as_bytes());
        self.body.extend(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body
            .extend(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        self.body
            .extend(b"Content-Type: application/octet-stream\r\n\r\n");
        self.body.extend(data);
        self.body.extend(b"\r\n");
        self
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}
