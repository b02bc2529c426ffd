// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

pub const GENERIC_ERROR_MESSAGE: &str =
    "an unknown error occurred; if it persists, please report it";

/// Outcome classes for calls against the content API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("cannot reach {url}: {message}")]
    Network { url: String, message: String },

    /// Superseded or aborted; never shown to the user.
    #[error("request cancelled")]
    Cancelled,

    #[error("rejected by server ({status}): {message}")]
    Validation { status: u16, message: String },

    #[error("{0}")]
    Unknown(String),
}

impl ApiError {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Text suitable for a toast: the backend's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Network { .. } => {
                "could not reach the server; check your connection and try again".to_owned()
            }
            _ => GENERIC_ERROR_MESSAGE.to_owned(),
        }
    }
}
