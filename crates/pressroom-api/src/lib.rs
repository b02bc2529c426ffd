// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use pressroom_app::{
    ApiError, ArticleId, ArticleStats, ArticleStatsSource, CancelToken, ImageFile, ImageSlot,
    MediaService, MediaTarget, Method, MutationGateway, MutationReply, MutationRequest,
    PageRequest, PageSource, RawPage, Resource,
};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

/// Blocking client for the content API.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    token: Option<String>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            token: None,
            http,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every call; blank tokens are ignored.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn endpoint(&self, path: &str, params: &[(String, String)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|error| ApiError::Unknown(format!("invalid endpoint {raw:?}: {error}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn execute(&self, builder: RequestBuilder, method: &str, url: &Url) -> Result<String, ApiError> {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let started = Instant::now();
        let response = builder
            .send()
            .map_err(|error| connection_error(&self.base_url, &error))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|error| connection_error(&self.base_url, &error))?;
        tracing::debug!(
            method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "api call settled"
        );

        if !status.is_success() {
            return Err(clean_error_response(status, &body));
        }
        Ok(body)
    }
}

impl<R: Resource> PageSource<R> for Client {
    fn fetch_page(
        &self,
        request: &PageRequest,
        cancel: &CancelToken,
    ) -> Result<RawPage<R>, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let url = self.endpoint(request.path, &request.query_pairs())?;
        let body = self.execute(self.http.get(url.clone()), "GET", &url)?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        decode_page(&body, request.items_key)
    }
}

impl MutationGateway for Client {
    fn mutate(&self, request: &MutationRequest) -> Result<MutationReply, ApiError> {
        let url = self.endpoint(&request.path, &[])?;
        let mut builder = self.http.request(http_method(request.method), url.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let body = self.execute(builder, request.method.as_str(), &url)?;
        Ok(MutationReply::from_body(&body))
    }
}

impl MediaService for Client {
    fn upload(
        &self,
        target: &MediaTarget,
        slot: ImageSlot,
        file: &ImageFile,
    ) -> Result<String, ApiError> {
        let (path, params) = target.endpoint(slot, true);
        let url = self.endpoint(&path, &params)?;
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let form = Form::new()
            .part(slot.wire_name(), part)
            .text(target.owner_field(), target.id().to_owned());
        let method = slot.upload_method();
        let builder = self
            .http
            .request(http_method(method), url.clone())
            .multipart(form);
        let body = self.execute(builder, method.as_str(), &url)?;

        match MutationReply::from_body(&body) {
            MutationReply::Message(stored) => Ok(stored),
            MutationReply::Entity(Value::Object(map)) => map
                .get("path")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(missing_stored_path),
            _ => Err(missing_stored_path()),
        }
    }

    fn remove(&self, target: &MediaTarget, slot: ImageSlot) -> Result<(), ApiError> {
        let (path, params) = target.endpoint(slot, false);
        let url = self.endpoint(&path, &params)?;
        self.execute(self.http.delete(url.clone()), "DELETE", &url)?;
        Ok(())
    }

    fn public_url(&self, stored_path: &str) -> String {
        pressroom_app::public_url(&self.base_url, stored_path)
    }
}

impl ArticleStatsSource for Client {
    fn article_stats(&self, id: &ArticleId) -> Result<ArticleStats, ApiError> {
        let url = self.endpoint(&format!("articles/stats/{id}"), &[])?;
        let body = self.execute(self.http.get(url.clone()), "GET", &url)?;
        ArticleStats::from_json(&body)
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn missing_stored_path() -> ApiError {
    ApiError::Unknown("upload response did not include the stored image path".to_owned())
}

fn decode_page<R: DeserializeOwned>(body: &str, items_key: &str) -> Result<RawPage<R>, ApiError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| ApiError::Unknown(format!("decode page: {error}")))?;
    let Value::Object(mut map) = value else {
        return Err(ApiError::Unknown(
            "page response is not a JSON object".to_owned(),
        ));
    };

    let items = map
        .remove(items_key)
        .or_else(|| map.remove("items"))
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let items: Vec<R> = serde_json::from_value(items)
        .map_err(|error| ApiError::Unknown(format!("decode {items_key}: {error}")))?;
    let count = map
        .get("count")
        .and_then(as_u64)
        .unwrap_or(items.len() as u64);
    let limit = map
        .get("limit")
        .and_then(as_u64)
        .and_then(|limit| u32::try_from(limit).ok());

    Ok(RawPage {
        items,
        count,
        limit,
    })
}

// Some endpoints echo numbers back as strings.
fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|raw| raw.trim().parse().ok()))
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> ApiError {
    let message = if error.is_timeout() {
        "request timed out".to_owned()
    } else {
        error.to_string()
    };
    ApiError::Network {
        url: base_url.to_owned(),
        message,
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> ApiError {
    let message = backend_message(body);
    if status.is_client_error() {
        return ApiError::Validation {
            status: status.as_u16(),
            message,
        };
    }
    if message.is_empty() {
        return ApiError::Unknown(format!("server returned {}", status.as_u16()));
    }
    ApiError::Unknown(format!("server error ({}): {message}", status.as_u16()))
}

fn backend_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(Value::String(message)) = serde_json::from_str::<Value>(trimmed) {
        return message;
    }
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(trimmed) {
        if let Some(message) = envelope.message.filter(|message| !message.is_empty()) {
            return message;
        }
        match envelope.error {
            Some(ErrorField::Text(message)) if !message.is_empty() => return message,
            Some(ErrorField::Body { message }) if !message.is_empty() => return message,
            _ => {}
        }
    }
    if trimmed.len() < 200 && !trimmed.contains('{') && !trimmed.starts_with('<') {
        return trimmed.to_owned();
    }
    String::new()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Body { message: String },
}
