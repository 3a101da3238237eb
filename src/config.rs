use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthContext,
    content_client::DEFAULT_CONTENT_BASE_URL,
    tracker::{DEFAULT_DEBOUNCE, DEFAULT_RESUME_THRESHOLD, DEFAULT_RESUME_TIMEOUT},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub content_base_url: String,
    pub db_connection_string: String,
    pub local_store_dir: PathBuf,
    pub viewer_id: Option<String>,
    pub debounce_ms: u64,
    pub resume_threshold: f64,
    pub resume_timeout_ms: u64,
}

const DEFAULT_DB_CONNECTION_STRING: &str = "sqlite://progress.sqlite?mode=rwc";
const DEFAULT_LOCAL_STORE_DIR: &str = ".chapter-progress";
const DEFAULT_DEBOUNCE_MS: u64 = DEFAULT_DEBOUNCE.as_millis() as u64;
const DEFAULT_RESUME_TIMEOUT_MS: u64 = DEFAULT_RESUME_TIMEOUT.as_millis() as u64;

/// Env var naming an optional YAML file with the same keys in snake_case.
pub const CONFIG_FILE_VAR: &str = "CHAPTER_PROGRESS_CONFIG";

/// Values a YAML config file may set; environment variables win over it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    content_base_url: Option<String>,
    db_connection_string: Option<String>,
    local_store_dir: Option<PathBuf>,
    viewer_id: Option<String>,
    debounce_ms: Option<u64>,
    resume_threshold: Option<f64>,
    resume_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            content_base_url: DEFAULT_CONTENT_BASE_URL.into(),
            db_connection_string: DEFAULT_DB_CONNECTION_STRING.into(),
            local_store_dir: DEFAULT_LOCAL_STORE_DIR.into(),
            viewer_id: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            resume_threshold: DEFAULT_RESUME_THRESHOLD,
            resume_timeout_ms: DEFAULT_RESUME_TIMEOUT_MS,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid {}: {}", key, raw))
        })
        .transpose()
}

impl Config {
    /// Defaults, overlaid by the YAML file named in `CHAPTER_PROGRESS_CONFIG`
    /// (if any), overlaid by environment variables.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Some(path) = lookup(CONFIG_FILE_VAR).filter(|p| !p.trim().is_empty()) {
            config.apply_file(Path::new(&path))?;
        }

        if let Some(v) = lookup("CONTENT_BASE_URL") {
            config.content_base_url = v;
        }
        if let Some(v) = lookup("DB_CONNECTION_STRING") {
            config.db_connection_string = v;
        }
        if let Some(v) = lookup("LOCAL_STORE_DIR") {
            config.local_store_dir = v.into();
        }
        if let Some(v) = lookup("VIEWER_ID") {
            config.viewer_id = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Some(v) = parse_var(&lookup, "DEBOUNCE_MS")? {
            config.debounce_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "RESUME_THRESHOLD")? {
            config.resume_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "RESUME_TIMEOUT_MS")? {
            config.resume_timeout_ms = v;
        }
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file: FileConfig = serde_yml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config file");

        if let Some(v) = file.content_base_url {
            self.content_base_url = v;
        }
        if let Some(v) = file.db_connection_string {
            self.db_connection_string = v;
        }
        if let Some(v) = file.local_store_dir {
            self.local_store_dir = v;
        }
        if file.viewer_id.is_some() {
            self.viewer_id = file.viewer_id;
        }
        if let Some(v) = file.debounce_ms {
            self.debounce_ms = v;
        }
        if let Some(v) = file.resume_threshold {
            self.resume_threshold = v;
        }
        if let Some(v) = file.resume_timeout_ms {
            self.resume_timeout_ms = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.content_base_url.trim().is_empty() {
            return Err("CONTENT_BASE_URL is missing".into());
        }
        if self.db_connection_string.trim().is_empty() {
            return Err("DB_CONNECTION_STRING is missing".into());
        }
        if let Some(id) = &self.viewer_id {
            if Uuid::parse_str(id.trim()).is_err() {
                return Err(format!("VIEWER_ID is not a UUID: {}", id));
            }
        }
        if !(0.0..=100.0).contains(&self.resume_threshold) {
            return Err("RESUME_THRESHOLD must be between 0 and 100".into());
        }
        if self.debounce_ms == 0 {
            return Err("DEBOUNCE_MS must be greater than zero".into());
        }
        Ok(())
    }

    /// The identity this process reads as; anonymous without `VIEWER_ID`.
    pub fn auth_context(&self) -> anyhow::Result<AuthContext> {
        match &self.viewer_id {
            Some(id) => {
                let user_id = Uuid::parse_str(id.trim())
                    .with_context(|| format!("Invalid VIEWER_ID: {}", id))?;
                Ok(AuthContext::authenticated(user_id))
            }
            None => Ok(AuthContext::anonymous()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
        assert!(!config.auth_context().unwrap().is_authenticated());
    }

    #[test]
    fn default_config_yields_default_tracker_settings() {
        use crate::tracker::TrackerSettings;

        assert_eq!(
            TrackerSettings::from(&Config::default()),
            TrackerSettings::default()
        );
    }

    #[test]
    fn env_overrides_defaults() {
        let id = "0f8fad5b-d9cb-469f-a165-70867728950e";
        let config = Config::from_lookup(lookup(&[
            ("VIEWER_ID", id),
            ("DEBOUNCE_MS", "250"),
            ("RESUME_THRESHOLD", "10"),
            ("LOCAL_STORE_DIR", "/tmp/progress"),
        ]))
        .unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.resume_threshold, 10.0);
        assert_eq!(config.local_store_dir, PathBuf::from("/tmp/progress"));
        assert_eq!(
            config.auth_context().unwrap().viewer_id(),
            Some(Uuid::parse_str(id).unwrap())
        );
    }

    #[test]
    fn blank_viewer_id_is_anonymous() {
        let config = Config::from_lookup(lookup(&[("VIEWER_ID", "  ")])).unwrap();
        assert_eq!(config.viewer_id, None);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(Config::from_lookup(lookup(&[("DEBOUNCE_MS", "soon")])).is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.viewer_id = Some("not-a-uuid".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.resume_threshold = 150.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.debounce_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn yaml_file_sits_between_defaults_and_env() {
        let path = std::env::temp_dir().join(format!("chapter-progress-{}.yaml", Uuid::new_v4()));
        std::fs::write(
            &path,
            "content_base_url: https://mirror.example/comic\ndebounce_ms: 750\nresume_timeout_ms: 8000\n",
        )
        .unwrap();
        let path_str = path.to_string_lossy().to_string();

        let config = Config::from_lookup(lookup(&[
            (CONFIG_FILE_VAR, path_str.as_str()),
            ("DEBOUNCE_MS", "300"),
        ]))
        .unwrap();
        assert_eq!(config.content_base_url, "https://mirror.example/comic");
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.resume_timeout_ms, 8000);
        std::fs::remove_file(&path).unwrap();
    }
}
