use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::models::{NewTask, Task, TaskFilters, TaskPatch, TaskStatus};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("could not reach the task service: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

/// The remote operations the controller depends on.
pub trait TaskService: Send + Sync {
    fn list(&self, filters: &TaskFilters) -> impl Future<Output = Result<Vec<Task>, ServiceError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Task, ServiceError>> + Send;

    fn create(&self, input: &NewTask) -> impl Future<Output = Result<Task, ServiceError>> + Send;

    fn update(&self, id: &str, patch: &TaskPatch) -> impl Future<Output = Result<Task, ServiceError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn toggle_completion(
        &self,
        id: &str,
        current: TaskStatus,
    ) -> impl Future<Output = Result<Task, ServiceError>> + Send {
        let patch = TaskPatch::status(current.toggled());
        async move { self.update(id, &patch).await }
    }

    fn set_favorite(&self, id: &str, is_favorite: bool) -> impl Future<Output = Result<Task, ServiceError>> + Send {
        let patch = TaskPatch::favorite(is_favorite);
        async move { self.update(id, &patch).await }
    }
}

#[derive(Deserialize)]
struct TaskEnvelope {
    tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    error: Option<String>,
}

/// `TaskService` over HTTP/JSON.
pub struct HttpTaskService {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTaskService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::Transport(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Transport(format!("invalid base URL '{base_url}'")));
        }
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(&config.base_url, config.timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/tasks[/<id>]`, with the id percent-encoded as one path segment.
    pub fn tasks_url(&self, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("tasks");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    pub fn list_url(&self, filters: &TaskFilters) -> Url {
        let mut url = self.tasks_url(None);
        let pairs = filters.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        url
    }

    async fn send(&self, method: Method, url: Url, build: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Result<Response, ServiceError> {
        log::debug!("API request: {} {}", method, url.path());
        let request = build(self.client.request(method, url.clone()));
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = self.transport_error(e);
                log::error!("API error: {err}");
                return Err(err);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = if status == StatusCode::NOT_FOUND {
            ServiceError::NotFound(url.path().to_string())
        } else {
            ServiceError::Server {
                status: status.as_u16(),
                message: error_message(status, &body),
            }
        };
        log::error!("API error: {err}");
        Err(err)
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ServiceError> {
        let decoded = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string())),
            Err(e) => Err(self.transport_error(e)),
        };
        if let Err(err) = &decoded {
            log::error!("API error: {err}");
        }
        decoded
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

impl TaskService for HttpTaskService {
    async fn list(&self, filters: &TaskFilters) -> Result<Vec<Task>, ServiceError> {
        let response = self.send(Method::GET, self.list_url(filters), |r| r).await?;
        let envelope: TaskEnvelope = self.decode(response).await?;
        Ok(envelope.tasks)
    }

    async fn get(&self, id: &str) -> Result<Task, ServiceError> {
        let response = self.send(Method::GET, self.tasks_url(Some(id)), |r| r).await?;
        self.decode(response).await
    }

    async fn create(&self, input: &NewTask) -> Result<Task, ServiceError> {
        let response = self.send(Method::POST, self.tasks_url(None), |r| r.json(input)).await?;
        self.decode(response).await
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, ServiceError> {
        let response = self
            .send(Method::PATCH, self.tasks_url(Some(id)), |r| r.json(patch))
            .await?;
        self.decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.send(Method::DELETE, self.tasks_url(Some(id)), |r| r).await?;
        Ok(())
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message;
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status.canonical_reason().unwrap_or("unknown error").to_string()
}
