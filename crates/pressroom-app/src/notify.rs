// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

pub const DEFAULT_AUTO_CLOSE: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NotificationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub auto_close: Duration,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            auto_close: DEFAULT_AUTO_CLOSE,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn closing_after(self, auto_close: Duration) -> Self {
        Self { auto_close, ..self }
    }
}

/// Sink for user-facing messages, provided by whatever shell hosts the views.
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, notification: Notification);
}

/// Drops everything; for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentEmitter;

impl NotificationEmitter for SilentEmitter {
    fn emit(&self, notification: Notification) {
        tracing::debug!(
            level = notification.level.as_str(),
            message = %notification.message,
            "notification suppressed"
        );
    }
}
