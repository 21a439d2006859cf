use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "deckcast";

const DEFAULT_REVEAL_DELAY_MS: u64 = 800;
const DEFAULT_SYNC_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<RecordingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Delay before a Revealing slide is promoted to Revealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_delay_ms: Option<u64>,

    /// Cadence of the presenter-window catch-up push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoplay: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Preferred microphone device name; the default input device otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microphone: Option<String>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `deckcast config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# Deckcast configuration\n{yaml}");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.reveal_delay_ms" => {
                let ms: u64 = parse_millis(value)?;
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .reveal_delay_ms = Some(ms);
            }
            "defaults.sync_interval_ms" => {
                let ms: u64 = parse_millis(value)?;
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .sync_interval_ms = Some(ms);
            }
            "defaults.autoplay" => {
                let autoplay = match value {
                    "true" => true,
                    "false" => false,
                    _ => anyhow::bail!("Invalid autoplay: {value}. Must be 'true' or 'false'."),
                };
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .autoplay = Some(autoplay);
            }
            "recording.output_dir" => {
                self.recording
                    .get_or_insert_with(RecordingConfig::default)
                    .output_dir = Some(PathBuf::from(value));
            }
            "recording.microphone" => {
                self.recording
                    .get_or_insert_with(RecordingConfig::default)
                    .microphone = Some(value.to_string());
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: defaults.reveal_delay_ms, defaults.sync_interval_ms, defaults.autoplay, recording.output_dir, recording.microphone"
            ),
        }
        Ok(())
    }

    pub fn reveal_delay(&self) -> Duration {
        let ms = self
            .defaults
            .as_ref()
            .and_then(|d| d.reveal_delay_ms)
            .unwrap_or(DEFAULT_REVEAL_DELAY_MS);
        Duration::from_millis(ms)
    }

    pub fn sync_interval(&self) -> Duration {
        let ms = self
            .defaults
            .as_ref()
            .and_then(|d| d.sync_interval_ms)
            .unwrap_or(DEFAULT_SYNC_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    pub fn autoplay(&self) -> bool {
        self.defaults
            .as_ref()
            .and_then(|d| d.autoplay)
            .unwrap_or(true)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.recording
            .as_ref()
            .and_then(|r| r.output_dir.clone())
            .or_else(dirs::video_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn microphone(&self) -> Option<String> {
        self.recording.as_ref().and_then(|r| r.microphone.clone())
    }
}

fn parse_millis(value: &str) -> Result<u64> {
    let ms: u64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid duration: {value}. Must be milliseconds."))?;
    if ms == 0 {
        anyhow::bail!("Invalid duration: must be greater than zero.");
    }
    Ok(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.reveal_delay(), Duration::from_millis(800));
        assert_eq!(config.sync_interval(), Duration::from_secs(1));
        assert!(config.autoplay());
        assert!(config.microphone().is_none());
    }

    #[test]
    fn test_set_and_read_back() {
        let mut config = Config::default();
        config.set("defaults.reveal_delay_ms", "2500").unwrap();
        config.set("defaults.autoplay", "false").unwrap();
        config.set("recording.microphone", "USB Audio").unwrap();
        assert_eq!(config.reveal_delay(), Duration::from_millis(2500));
        assert!(!config.autoplay());
        assert_eq!(config.microphone().as_deref(), Some("USB Audio"));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("defaults.reveal_delay_ms", "fast").is_err());
        assert!(config.set("defaults.reveal_delay_ms", "0").is_err());
        assert!(config.set("defaults.autoplay", "yes").is_err());
        assert!(config.set("unknown.key", "x").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "defaults:\n  reveal_delay_ms: 1200\nrecording:\n  output_dir: /tmp/takes"
        )
        .unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.reveal_delay(), Duration::from_millis(1200));
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/takes"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load_from(Path::new("/nonexistent/deckcast.yaml")).is_err());
    }
}
