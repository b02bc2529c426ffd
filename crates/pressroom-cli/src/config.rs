// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pressroom_app::{ALLOWED_LIMITS, DEFAULT_LIMIT, Session, User, UserId, validate_limit};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "pressroom";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:3001";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Tickets,
    Comments,
}

impl ResourceKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "tickets" => Ok(Self::Tickets),
            "comments" => Ok(Self::Comments),
            other => bail!("unknown resource {other:?}; expected one of: tickets, comments"),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tickets => "tickets",
            Self::Comments => "comments",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            session: SessionSection::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub token: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSection {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Address waiting for confirmation, if an e-mail change is pending.
    pub pending_email: Option<String>,
    pub tag_admin: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub default_limit: Option<u32>,
    pub resource: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            default_limit: Some(DEFAULT_LIMIT),
            resource: Some(ResourceKind::Tickets.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PRESSROOM_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PRESSROOM_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [session], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(limit) = self.ui.default_limit {
            validate_limit(limit)
                .with_context(|| format!("ui.default_limit in {}", path.display()))?;
        }

        if let Some(resource) = &self.ui.resource {
            ResourceKind::parse(resource)
                .with_context(|| format!("ui.resource in {}", path.display()))?;
        }

        if let Some(level) = &self.log.level
            && level.trim().is_empty()
        {
            bail!("log.level in {} must not be empty", path.display());
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn token(&self) -> Option<String> {
        self.api
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
    }

    pub fn session(&self) -> Session {
        Session {
            user_id: UserId::new(self.session.user_id.clone().unwrap_or_default()),
            name: self.session.name.clone().unwrap_or_default(),
            tag_admin: self.session.tag_admin.unwrap_or(false),
            token: self.token(),
        }
    }

    /// The signed-in account as last stored; profile edits are compared against it.
    pub fn session_user(&self) -> User {
        let session = self.session();
        User {
            id: session.user_id,
            name: session.name,
            email: self.session.email.clone().unwrap_or_default(),
            confirm_email: self
                .session
                .pending_email
                .as_deref()
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_owned),
            tag_admin: session.tag_admin,
            ..User::default()
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.ui.default_limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn resource(&self) -> Result<ResourceKind> {
        ResourceKind::parse(
            self.ui
                .resource
                .as_deref()
                .unwrap_or(ResourceKind::Tickets.as_str()),
        )
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(PathBuf::from(path)),
            None => default_log_path(),
        }
    }

    pub fn example_config(path: &Path) -> String {
        let limits = ALLOWED_LIMITS
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "# pressroom config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\n# <N>ms, <N>s or <N>m\ntimeout = \"{}\"\n# Optional bearer token sent with every request\n# token = \"\"\n\n[session]\nuser_id = \"\"\nname = \"\"\nemail = \"\"\n# Set while an e-mail change waits for confirmation\n# pending_email = \"\"\ntag_admin = true\n\n[ui]\n# One of {}\ndefault_limit = {}\n# tickets | comments\nresource = \"tickets\"\n\n[log]\nlevel = \"{}\"\n# Optional. Default is platform data dir (for example ~/.local/share/pressroom/pressroom.log)\n# file = \"/absolute/path/to/pressroom.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            limits,
            DEFAULT_LIMIT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn default_log_path() -> Result<PathBuf> {
    let data_root = dirs::data_dir()
        .ok_or_else(|| anyhow!("cannot resolve data directory; set [log].file in the config"))?;
    Ok(data_root.join(APP_NAME).join("pressroom.log"))
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, ResourceKind, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.base_url(), "http://localhost:3001");
        assert_eq!(config.timeout()?, Duration::from_secs(10));
        assert_eq!(config.default_limit(), 10);
        assert_eq!(config.resource()?, ResourceKind::Tickets);
        assert_eq!(config.log_level(), "info");
        assert!(config.token().is_none());
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"http://x\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [session], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://press.example.com//\"\ntimeout = \"500ms\"\ntoken = \" abc \"\n[session]\nuser_id = \"u1\"\nname = \"Ana\"\ntag_admin = true\n[ui]\ndefault_limit = 25\nresource = \"comments\"\n[log]\nlevel = \"debug\"\nfile = \"/tmp/pressroom-test.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "https://press.example.com");
        assert_eq!(config.timeout()?, Duration::from_millis(500));
        assert_eq!(config.token().as_deref(), Some("abc"));
        assert_eq!(config.default_limit(), 25);
        assert_eq!(config.resource()?, ResourceKind::Comments);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file()?, PathBuf::from("/tmp/pressroom-test.log"));

        let session = config.session();
        assert_eq!(session.user_id.as_str(), "u1");
        assert!(session.is_admin());
        assert_eq!(session.token.as_deref(), Some("abc"));
        Ok(())
    }

    #[test]
    fn session_user_carries_email_and_pending_change() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[session]\nuser_id = \"u1\"\nname = \"Ana\"\nemail = \"ana@example.com\"\npending_email = \" \"\n",
        )?;
        let user = Config::load(&path)?.session_user();
        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.confirm_email, None);

        let (_temp, path) = write_config(
            "version = 1\n[session]\nuser_id = \"u1\"\npending_email = \"new@example.com\"\n",
        )?;
        let user = Config::load(&path)?.session_user();
        assert_eq!(user.confirm_email.as_deref(), Some("new@example.com"));
        Ok(())
    }

    #[test]
    fn session_defaults_to_author_access() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[session]\nname = \"Bruno\"\n")?;
        let config = Config::load(&path)?;
        assert!(!config.session().is_admin());
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn page_size_outside_allowed_set_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\ndefault_limit = 7\n")?;
        let error = Config::load(&path).expect_err("limit 7 should fail");
        assert!(format!("{error:#}").contains("ui.default_limit"));
        Ok(())
    }

    #[test]
    fn unknown_resource_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nresource = \"articles\"\n")?;
        let error = Config::load(&path).expect_err("articles is not a list view");
        assert!(format!("{error:#}").contains("unknown resource \"articles\""));
        Ok(())
    }

    #[test]
    fn timeout_rejects_non_positive_values_in_config() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PRESSROOM_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PRESSROOM_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.default_limit(), 10);
        assert!(config.session().is_admin());
        Ok(())
    }
}
