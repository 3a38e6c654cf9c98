//! HTTP client for the analysis API: the streaming endpoint (NDJSON body) and
//! the non-streaming endpoint (single JSON object).

use reqwest::Response;

use crate::config::{self, Config, ConfigError};
use crate::consumer::{self, Analysis, StreamSink};
use crate::messages::{AnalysisResponse, QueryMessage};

/// Client error. `status()` maps every variant onto the HTTP status the
/// request reached, 0 when it never got one.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body (HTTP {status}): {source}")]
    Body {
        status: u16,
        #[source]
        source: reqwest::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn status(&self) -> u16 {
        match self {
            ClientError::Status { status, .. } | ClientError::Body { status, .. } => *status,
            ClientError::Transport(e) => e.status().map_or(0, |s| s.as_u16()),
            ClientError::Config(_) | ClientError::Io(_) => 0,
        }
    }
}

/// A 2xx answer from the non-streaming endpoint.
#[derive(Debug, Clone)]
pub struct AnalysisReply {
    pub status: u16,
    pub body: AnalysisResponse,
}

/// Authenticated client bound to one API host.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    stream_url: String,
    analysis_url: String,
    api_key: String,
}

impl Client {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kodeks-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            stream_url: config.stream_url(),
            analysis_url: config.analysis_url(),
            api_key: api_key.into(),
        })
    }

    /// Build from the environment: credential first, so a missing key fails
    /// before the config file is touched or any connection is made.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = config::api_key_from_env()?;
        let config = config::resolve()?;
        Self::new(&config, api_key)
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn analysis_url(&self) -> &str {
        &self.analysis_url
    }

    /// Send the query; resolves once the response headers are in, whatever
    /// the status.
    async fn send(&self, url: &str, question: &str) -> Result<Response, ClientError> {
        tracing::debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&QueryMessage::new(question))
            .send()
            .await?;
        Ok(response)
    }

    /// Non-2xx becomes `Status`, carrying the body text when there is one.
    async fn error_for_status(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "No response body".to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Open the streaming endpoint. The returned response has a 2xx status;
    /// its body has not been read yet.
    pub async fn open_stream(&self, question: &str) -> Result<Response, ClientError> {
        let response = self.send(&self.stream_url, question).await?;
        Self::error_for_status(response).await
    }

    /// Ask a question on the streaming endpoint and consume the whole body,
    /// reporting each event to `sink`.
    pub async fn stream_analysis<K: StreamSink>(
        &self,
        question: &str,
        sink: &mut K,
    ) -> Result<Analysis, ClientError> {
        let response = self.open_stream(question).await?;
        sink.connected();
        consumer::consume(response.bytes_stream(), sink).await
    }

    /// Send a question to the non-streaming endpoint. Resolves with the
    /// response headers; pass the response to [`Client::read_analysis`].
    pub async fn send_analysis(&self, question: &str) -> Result<Response, ClientError> {
        self.send(&self.analysis_url, question).await
    }

    /// Check the status of a non-streaming response and decode its body.
    pub async fn read_analysis(response: Response) -> Result<AnalysisReply, ClientError> {
        let response = Self::error_for_status(response).await?;
        let status = response.status().as_u16();
        let body = response
            .json::<AnalysisResponse>()
            .await
            .map_err(|source| ClientError::Body { status, source })?;
        Ok(AnalysisReply { status, body })
    }

    /// Ask a question on the non-streaming endpoint.
    pub async fn analyze(&self, question: &str) -> Result<AnalysisReply, ClientError> {
        let response = self.send_analysis(question).await?;
        Self::read_analysis(response).await
    }
}
