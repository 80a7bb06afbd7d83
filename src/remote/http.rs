// src/remote/http.rs

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Instant;

use crate::config::ServiceConfig;
use crate::errors::{EvalError, Result};
use crate::models::{EvaluationResponse, Submission};
use crate::remote::RemoteEvaluator;

/// Talks to the evaluation service over HTTP.
#[derive(Clone)]
pub struct HttpEvaluator {
    client: Client,
    config: ServiceConfig,
}

impl HttpEvaluator {
    /// Creates a new `HttpEvaluator`.
    pub fn new(client: Client, config: ServiceConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn with_timeout(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.timeout() {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

/// Turns a non-2xx status into `EvalError::ApiError`, keeping the body for the user.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let error_body = resp
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error body".to_string());
    Err(EvalError::ApiError {
        status: status.as_u16(),
        body: error_body,
    })
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| EvalError::UnexpectedResponse(e.to_string()))
}

impl RemoteEvaluator for HttpEvaluator {
    async fn evaluate(&self, submission: &Submission) -> Result<EvaluationResponse> {
        let url = self.config.endpoint("evaluate");

        log::debug!("POST {} ({}, {} bytes)", url, submission.language, submission.code.len());

        let start = Instant::now();
        let resp = self
            .with_timeout(self.client.post(&url).json(submission))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;

        log::debug!("evaluate answered in {}ms", start.elapsed().as_millis());

        decode(&body)
    }

    async fn fetch_last_submission(&self) -> Result<Option<Submission>> {
        let url = self.config.endpoint("last-code");

        let resp = self.with_timeout(self.client.get(&url)).send().await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        // `null` decodes to `None` as well.
        decode::<Option<Submission>>(&body)
    }
}
