use crate::api::types::{CountResponse, Topic, TopicPage, User};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Per-request deadline, applied on top of the client's connect timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from a single API call.
///
/// Every variant is transient from the feed core's point of view: the caller
/// clears its in-flight flag, leaves prior state intact, and the user may
/// re-trigger the action. No automatic retry is performed.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the 10-second deadline
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body could not be decoded as the expected JSON shape
    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Basic-auth credentials. The password is held as a [`SecretString`] so it
/// never appears in Debug output or log messages.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// HTTP collaborator for the topics API.
///
/// Cheap to clone (the underlying `reqwest::Client` is an `Arc` around a
/// connection pool), which is how spawned feed tasks get their own handle.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl ApiClient {
    /// Build a client for the given server base URL (no trailing slash).
    ///
    /// When `credentials` is `None` the client operates anonymously: the feed
    /// is readable, but posting and deleting will be rejected by the server.
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Topics collection path for the given scope: the global feed, or a
    /// single profile's topics when `scope` names a user.
    fn topics_base(&self, scope: Option<&str>) -> String {
        match scope {
            Some(username) => format!("{}/api/1.0/users/{}/topics", self.base_url, username),
            None => format!("{}/api/1.0/topics", self.base_url),
        }
    }

    /// Fetch the first page of the feed, newest topics first.
    pub async fn initial_page(
        &self,
        scope: Option<&str>,
        size: u32,
    ) -> Result<TopicPage, ApiError> {
        let url = format!(
            "{}?page=0&size={}&sort=id,desc",
            self.topics_base(scope),
            size
        );
        self.get_json(&url).await
    }

    /// Fetch the page of topics strictly older than `before_id`.
    pub async fn older_page(
        &self,
        before_id: i64,
        scope: Option<&str>,
        size: u32,
    ) -> Result<TopicPage, ApiError> {
        let url = format!(
            "{}/{}?direction=before&page=0&size={}&sort=id,desc",
            self.topics_base(scope),
            before_id,
            size
        );
        self.get_json(&url).await
    }

    /// Fetch all topics strictly newer than `after_id`, newest first.
    pub async fn newer_topics(
        &self,
        after_id: i64,
        scope: Option<&str>,
    ) -> Result<Vec<Topic>, ApiError> {
        let url = format!(
            "{}/{}?direction=after&sort=id,desc",
            self.topics_base(scope),
            after_id
        );
        self.get_json(&url).await
    }

    /// Ask how many topics exist newer than `after_id`. The server returns an
    /// authoritative count each time; callers overwrite, never accumulate.
    pub async fn new_topic_count(
        &self,
        after_id: i64,
        scope: Option<&str>,
    ) -> Result<u64, ApiError> {
        let url = format!(
            "{}/{}?direction=after&count=true",
            self.topics_base(scope),
            after_id
        );
        let body: CountResponse = self.get_json(&url).await?;
        Ok(body.count)
    }

    /// Delete a topic by id. Authorization is the server's responsibility;
    /// the client only pre-filters in the UI for its own user.
    pub async fn delete_topic(&self, id: i64) -> Result<(), ApiError> {
        let url = format!("{}/api/1.0/topics/{}", self.base_url, id);
        self.send(self.http.delete(&url)).await?;
        Ok(())
    }

    /// Post a new topic and return the created entity.
    pub async fn post_topic(&self, content: &str) -> Result<Topic, ApiError> {
        let url = format!("{}/api/1.0/topics", self.base_url);
        let response = self
            .send(
                self.http
                    .post(&url)
                    .json(&serde_json::json!({ "content": content })),
            )
            .await?;
        decode(response).await
    }

    /// Authenticate with the configured credentials and return the user.
    pub async fn login(&self) -> Result<User, ApiError> {
        let url = format!("{}/api/1.0/login", self.base_url);
        let response = self.send(self.http.post(&url)).await?;
        decode(response).await
    }

    /// Look up a user profile by username.
    pub async fn get_user(&self, username: &str) -> Result<User, ApiError> {
        let url = format!("{}/api/1.0/users/{}", self.base_url, username);
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    /// Apply auth, enforce the request deadline, and reject non-2xx statuses.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let request = match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(c.password.expose_secret())),
            None => request,
        };

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), url = %response.url(), "API call rejected");
            return Err(ApiError::HttpStatus(status.as_u16()));
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}
