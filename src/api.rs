use reqwest::{Method, header};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::models::{Presentation, Repository, Synchronization};

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";
const SESSION_COOKIE: &str = "sessionid";

const ACTIVATE: &str = "ACTIVATE";
const DEACTIVATE: &str = "DEACTIVATE";

/// Typed accessor for the qraz REST API.
///
/// All collection URLs keep their trailing slash; the server rejects the
/// bare form with a redirect the client does not follow.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    csrf_token: Option<String>,
    session_id: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a new client with the given base URL (e.g. "http://localhost:8000").
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base_url_str = base_url.into();
        tracing::debug!(base_url = %base_url_str, "creating ApiClient");
        Ok(ApiClient {
            base_url: base_url_str.trim_end_matches('/').to_string(),
            csrf_token: None,
            session_id: None,
            client,
        })
    }

    /// Return a client carrying the CSRF token in both the cookie and the
    /// X-CSRFToken header on mutating requests.
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Return a client carrying the session cookie.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn cookie_header(&self) -> Option<String> {
        let mut pairs = Vec::new();
        if let Some(token) = &self.csrf_token {
            pairs.push(format!("{CSRF_COOKIE}={token}"));
        }
        if let Some(session) = &self.session_id {
            pairs.push(format!("{SESSION_COOKIE}={session}"));
        }
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        let mutating = method != Method::GET && method != Method::HEAD;
        let mut req = self.client.request(method, &url);
        if let Some(cookies) = self.cookie_header() {
            req = req.header(header::COOKIE, cookies);
        }
        // Django only checks the token on unsafe methods
        if mutating {
            if let Some(token) = &self.csrf_token {
                req = req.header(CSRF_HEADER, token);
            }
        }
        req
    }

    async fn fetch<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.error_for_status()?;
        let body = status.text().await?;
        match serde_json::from_str::<T>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                let snippet_len = body.len().min(2000);
                let snippet = &body[..snippet_len];
                tracing::error!(error = %e, body_snippet = %snippet, "failed to parse response body");
                Err(e.into())
            }
        }
    }

    /// GET /api/presentations/
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn presentations(&self) -> Result<Vec<Presentation>> {
        tracing::debug!("GET presentations");
        self.fetch(self.request(Method::GET, "/api/presentations/"))
            .await
    }

    /// GET /api/presentations/:id/
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn presentation(&self, id: i64) -> Result<Presentation> {
        self.fetch(self.request(Method::GET, &format!("/api/presentations/{id}/")))
            .await
    }

    /// GET /api/repositories/
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn repositories(&self) -> Result<Vec<Repository>> {
        tracing::debug!("GET repositories");
        self.fetch(self.request(Method::GET, "/api/repositories/"))
            .await
    }

    /// GET /api/repositories/:id/
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn repository(&self, id: i64) -> Result<Repository> {
        self.fetch(self.request(Method::GET, &format!("/api/repositories/{id}/")))
            .await
    }

    /// PUT /api/repositories/:id/
    ///
    /// The record's own id routes the request; the client-only `working`
    /// flag is never part of the payload.
    #[tracing::instrument(level = "debug", skip(self, repo), fields(id = repo.id))]
    pub async fn save_repository(&self, repo: &Repository) -> Result<Repository> {
        let path = format!("/api/repositories/{}/", repo.id);
        self.fetch(self.request(Method::PUT, &path).json(repo)).await
    }

    fn transition(&self, verb: &str, id: i64) -> Result<reqwest::RequestBuilder> {
        let method = Method::from_bytes(verb.as_bytes()).map_err(|_| Error::UnsupportedVerb {
            verb: verb.to_string(),
        })?;
        Ok(self.request(method, &format!("/api/repositories/{id}/state/")))
    }

    /// ACTIVATE /api/repositories/:id/state/
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn activate_repository(&self, id: i64) -> Result<Repository> {
        tracing::debug!(%id, "ACTIVATE repository");
        self.fetch(self.transition(ACTIVATE, id)?).await
    }

    /// DEACTIVATE /api/repositories/:id/state/
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn deactivate_repository(&self, id: i64) -> Result<Repository> {
        tracing::debug!(%id, "DEACTIVATE repository");
        self.fetch(self.transition(DEACTIVATE, id)?).await
    }

    /// POST /api/synchronizations/ (starts a new job)
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn create_synchronization(&self) -> Result<Synchronization> {
        tracing::debug!("POST synchronization");
        self.fetch(
            self.request(Method::POST, "/api/synchronizations/")
                .json(&serde_json::json!({})),
        )
        .await
    }

    /// GET /api/synchronizations/:id/ (polls the job status)
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn synchronization(&self, id: &str) -> Result<Synchronization> {
        self.fetch(self.request(Method::GET, &format!("/api/synchronizations/{id}/")))
            .await
    }
}
