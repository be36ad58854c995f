use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "nanoctl_config.json";

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    pub server_url: Url,
    pub download_dir: PathBuf,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

fn default_poll_interval_secs() -> u64 {
    1
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Unable to open config file {:?}", path.as_ref()))?;
        serde_json::from_reader(file)
            .with_context(|| format!("Unable to parse config file {:?}", path.as_ref()))
    }

    /// Status poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let config: Config = serde_json::from_str(
            r#"{
                "server_url": "http://192.168.4.1/",
                "download_dir": "downloads",
                "credentials": {"username": "foo", "password": "bar"},
                "poll_interval_secs": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.server_url.as_str(), "http://192.168.4.1/");
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.username, "foo");
        assert_eq!(credentials.password, "bar");
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"server_url": "http://localhost:8080/", "download_dir": "dl"}"#,
        )
        .unwrap();

        assert!(config.credentials.is_none());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let config: Config = serde_json::from_str(
            r#"{
                "server_url": "http://localhost:8080/",
                "download_dir": "dl",
                "poll_interval_secs": 0
            }"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Unable to open config file"));
    }
}
