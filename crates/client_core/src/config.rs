use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::warn;

use crate::api::parse_base_url;

pub const SETTINGS_FILE: &str = "fitting_room.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub catalog_service_url: String,
    pub image_service_url: String,
    pub request_timeout_seconds: u64,
    pub download_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_service_url: "http://localhost:8001".into(),
            image_service_url: "http://localhost:8000".into(),
            request_timeout_seconds: 30,
            download_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Applies flat `key = "value"` pairs from a settings file.
    pub fn apply_file(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!("ignoring malformed {SETTINGS_FILE}: {err}");
                return;
            }
        };

        let text = |key: &str| match file_cfg.get(key) {
            Some(toml::Value::String(v)) => Some(v.clone()),
            Some(toml::Value::Integer(v)) => Some(v.to_string()),
            _ => None,
        };

        if let Some(v) = text("catalog_service_url") {
            self.set_catalog_service_url(&v);
        }
        if let Some(v) = text("image_service_url") {
            self.set_image_service_url(&v);
        }
        if let Some(v) = text("request_timeout_seconds") {
            self.set_request_timeout(&v);
        }
        if let Some(v) = text("download_dir") {
            self.download_dir = PathBuf::from(v);
        }
    }

    /// Applies environment overrides; `APP__` names win over the short ones.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for name in ["CATALOG_SERVICE_URL", "APP__CATALOG_SERVICE_URL"] {
            if let Some(v) = lookup(name) {
                self.set_catalog_service_url(&v);
            }
        }
        for name in ["IMAGE_SERVICE_URL", "APP__IMAGE_SERVICE_URL"] {
            if let Some(v) = lookup(name) {
                self.set_image_service_url(&v);
            }
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECONDS") {
            self.set_request_timeout(&v);
        }
        if let Some(v) = lookup("APP__DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
    }

    pub fn set_catalog_service_url(&mut self, raw: &str) {
        if let Some(url) = normalize_base_url(raw) {
            self.catalog_service_url = url;
        }
    }

    pub fn set_image_service_url(&mut self, raw: &str) {
        if let Some(url) = normalize_base_url(raw) {
            self.image_service_url = url;
        }
    }

    fn set_request_timeout(&mut self, raw: &str) {
        match raw.trim().parse::<u64>() {
            Ok(seconds) if seconds > 0 => self.request_timeout_seconds = seconds,
            _ => warn!("ignoring invalid request timeout '{raw}'"),
        }
    }
}

/// Trims trailing slashes; invalid URLs are rejected with a warning.
pub fn normalize_base_url(raw: &str) -> Option<String> {
    match parse_base_url(raw) {
        Ok(_) => Some(raw.trim().trim_end_matches('/').to_string()),
        Err(err) => {
            warn!("ignoring service url: {err}");
            None
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        settings.apply_file(&raw);
    }

    settings.apply_env(|name| {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
    });

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_the_two_services_apart() {
        let settings = Settings::default();
        assert_eq!(settings.catalog_service_url, "http://localhost:8001");
        assert_eq!(settings.image_service_url, "http://localhost:8000");
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        settings.apply_file(
            r#"
            catalog_service_url = "http://10.0.0.5:9001/"
            request_timeout_seconds = 5
            download_dir = "/tmp/out"
            "#,
        );
        assert_eq!(settings.catalog_service_url, "http://10.0.0.5:9001");
        assert_eq!(settings.image_service_url, "http://localhost:8000");
        assert_eq!(settings.request_timeout_seconds, 5);
        assert_eq!(settings.download_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_file("this is = = not toml");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn app_prefixed_env_wins() {
        let mut settings = Settings::default();
        let env = HashMap::from([
            ("CATALOG_SERVICE_URL", "http://short:1"),
            ("APP__CATALOG_SERVICE_URL", "http://prefixed:2"),
            ("IMAGE_SERVICE_URL", "https://images.example.com/"),
            ("APP__REQUEST_TIMEOUT_SECONDS", "12"),
        ]);
        settings.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.catalog_service_url, "http://prefixed:2");
        assert_eq!(settings.image_service_url, "https://images.example.com");
        assert_eq!(settings.request_timeout_seconds, 12);
    }

    #[test]
    fn invalid_values_keep_previous_setting() {
        let mut settings = Settings::default();
        let env = HashMap::from([
            ("CATALOG_SERVICE_URL", "ftp://catalog"),
            ("IMAGE_SERVICE_URL", "not a url"),
            ("APP__REQUEST_TIMEOUT_SECONDS", "0"),
        ]);
        settings.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings, Settings::default());
    }
}
