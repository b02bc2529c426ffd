// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// One single-entity write against the API.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl MutationRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(self, body: Value) -> Self {
        Self {
            body: Some(body),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationReply {
    /// Updated record (or part of one) echoed back.
    Entity(Value),
    /// Human-readable status text.
    Message(String),
    Empty,
}

impl MutationReply {
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::String(message)) => Self::Message(message),
            Ok(Value::Null) => Self::Empty,
            Ok(value) => Self::Entity(value),
            Err(_) => Self::Message(trimmed.to_owned()),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Message(message) if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }

    pub fn entity(&self) -> Option<&Value> {
        match self {
            Self::Entity(value) => Some(value),
            _ => None,
        }
    }
}

pub trait MutationGateway: Send + Sync {
    fn mutate(&self, request: &MutationRequest) -> Result<MutationReply, ApiError>;
}
