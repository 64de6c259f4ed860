use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub auth_secret: String,
    pub session_ttl_seconds: i64,
    pub max_body_bytes: usize,
    pub bootstrap_admin_username: String,
    pub bootstrap_admin_password: Option<String>,
    pub bootstrap_admin_email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/portal.db".into(),
            auth_secret: "devsecret".into(),
            session_ttl_seconds: 12 * 3600,
            max_body_bytes: 64 * 1024,
            bootstrap_admin_username: "admin".into(),
            bootstrap_admin_password: None,
            bootstrap_admin_email: "admin@localhost.localdomain".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, &file_cfg),
            Err(error) => warn!(%error, "ignoring malformed server.toml"),
        }
    }

    apply_env_settings(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    let text = |key: &str| file_cfg.get(key).and_then(|v| v.as_str()).map(str::to_string);
    let int = |key: &str| file_cfg.get(key).and_then(toml::Value::as_integer);

    if let Some(v) = text("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = text("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = text("auth_secret") {
        settings.auth_secret = v;
    }
    if let Some(v) = int("session_ttl_seconds") {
        settings.session_ttl_seconds = v;
    }
    if let Some(v) = int("max_body_bytes").and_then(|v| usize::try_from(v).ok()) {
        settings.max_body_bytes = v;
    }
    if let Some(v) = text("bootstrap_admin_username") {
        settings.bootstrap_admin_username = v;
    }
    if let Some(v) = text("bootstrap_admin_password") {
        settings.bootstrap_admin_password = Some(v);
    }
    if let Some(v) = text("bootstrap_admin_email") {
        settings.bootstrap_admin_email = v;
    }
}

/// Later keys win, so `APP__*` overrides the short names.
fn apply_env_settings(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["SERVER_BIND", "APP__BIND_ADDR"] {
        if let Some(v) = lookup(key) {
            settings.server_bind = v;
        }
    }
    for key in ["DATABASE_URL", "APP__DATABASE_URL"] {
        if let Some(v) = lookup(key) {
            settings.database_url = v;
        }
    }
    if let Some(v) = lookup("APP__AUTH_SECRET") {
        settings.auth_secret = v;
    }
    if let Some(v) = lookup("APP__SESSION_TTL_SECONDS") {
        match v.parse::<i64>() {
            Ok(parsed) => settings.session_ttl_seconds = parsed,
            Err(_) => warn!(value = %v, "APP__SESSION_TTL_SECONDS is not a number; keeping default"),
        }
    }
    if let Some(v) = lookup("APP__MAX_BODY_BYTES") {
        match v.parse::<usize>() {
            Ok(parsed) => settings.max_body_bytes = parsed,
            Err(_) => warn!(value = %v, "APP__MAX_BODY_BYTES is not a number; keeping default"),
        }
    }
    if let Some(v) = lookup("APP__ADMIN_USERNAME") {
        settings.bootstrap_admin_username = v;
    }
    if let Some(v) = lookup("APP__ADMIN_PASSWORD") {
        settings.bootstrap_admin_password = Some(v);
    }
    if let Some(v) = lookup("APP__ADMIN_EMAIL") {
        settings.bootstrap_admin_email = v;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
