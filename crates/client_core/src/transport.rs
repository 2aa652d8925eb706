use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client,
};
use shared::{
    error::TransportError,
    protocol::{FragmentRequest, FragmentResponse, Method},
};
use tracing::debug;

use crate::form::encode_pairs;

const HTML_ACCEPT: &str = "text/html, */*; q=0.01";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const REQUESTED_WITH: &str = "X-Requested-With";

#[async_trait]
pub trait FragmentTransport: Send + Sync {
    /// Resolves to the body of a 2xx response; anything else is an error.
    async fn send(&self, request: FragmentRequest) -> Result<FragmentResponse, TransportError>;
}

pub struct HttpTransport {
    http: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FragmentTransport for HttpTransport {
    async fn send(&self, request: FragmentRequest) -> Result<FragmentResponse, TransportError> {
        let FragmentRequest { url, method, form } = request;
        debug!("fragment request: {method} {url}");

        let mut builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        }
        .header(ACCEPT, HTML_ACCEPT)
        .header(REQUESTED_WITH, "XMLHttpRequest");
        if let Some(pairs) = form {
            builder = builder
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(encode_pairs(&pairs));
        }

        let res = builder
            .send()
            .await
            .map_err(|err| classify_error(&url, err))?;
        let status = res.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = res.text().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout { url: url.clone() }
            } else {
                TransportError::Malformed {
                    url: url.clone(),
                    message: err.to_string(),
                }
            }
        })?;

        Ok(FragmentResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn classify_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
