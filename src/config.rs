use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Bot username used to recognise mentions, with or without the leading `@`
    pub name: String,
    /// Base URL of the frame API, e.g. `http://localhost:8763`
    pub api_url: String,
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("/tmp/AnimeFrameBot")
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Telegram media groups hold at most this many items.
pub const MEDIA_GROUP_LIMIT: u32 = 10;

fn default_max_frames() -> u32 {
    MEDIA_GROUP_LIMIT
}

impl BotConfig {
    /// Bot name without the leading `@`.
    pub fn username(&self) -> &str {
        self.name.trim().trim_start_matches('@')
    }

    /// API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if !config.bot.tmp_dir.exists() {
            std::fs::create_dir_all(&config.bot.tmp_dir).with_context(|| {
                format!(
                    "Failed to create temp directory: {}",
                    config.bot.tmp_dir.display()
                )
            })?;
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        if config.bot.username().is_empty() {
            anyhow::bail!("[bot] name must not be empty");
        }
        if config.bot.api_base().is_empty() {
            anyhow::bail!("[bot] api_url must not be empty");
        }
        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("[telegram] bot_token must not be empty");
        }
        if config.bot.max_frames == 0 || config.bot.max_frames > MEDIA_GROUP_LIMIT {
            anyhow::bail!(
                "[bot] max_frames must be between 1 and {}",
                MEDIA_GROUP_LIMIT
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[bot]
name = "@MockBot"
api_url = "http://localhost:8763/"

[telegram]
bot_token = "mock_token"
"#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.bot.tmp_dir, PathBuf::from("/tmp/AnimeFrameBot"));
        assert_eq!(config.bot.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.bot.max_frames, 10);
        assert_eq!(config.telegram.bot_token, "mock_token");
    }

    #[test]
    fn test_username_and_api_base_normalised() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.bot.username(), "MockBot");
        assert_eq!(config.bot.api_base(), "http://localhost:8763");
    }

    #[test]
    fn test_missing_token_section_rejected() {
        let content = r#"
[bot]
name = "MockBot"
api_url = "http://localhost:8763"
"#;
        assert!(Config::parse(content).is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let content = MINIMAL.replace("@MockBot", "@");
        let err = Config::parse(&content).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_max_frames_bounds() {
        let with_max = |n: u32| {
            MINIMAL.replace(
                "api_url = \"http://localhost:8763/\"",
                &format!("api_url = \"http://localhost:8763/\"\nmax_frames = {}", n),
            )
        };

        assert_eq!(Config::parse(&with_max(5)).unwrap().bot.max_frames, 5);
        assert_eq!(Config::parse(&with_max(10)).unwrap().bot.max_frames, 10);

        let err = Config::parse(&with_max(11)).unwrap_err();
        assert!(err.to_string().contains("max_frames"));
        assert!(Config::parse(&with_max(0)).is_err());
    }

    #[test]
    fn test_load_creates_tmp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tmp_dir = dir.path().join("frames");
        let config_path = dir.path().join("config.toml");
        let content = MINIMAL.replace(
            "api_url = \"http://localhost:8763/\"",
            &format!(
                "api_url = \"http://localhost:8763/\"\ntmp_dir = \"{}\"",
                tmp_dir.display()
            ),
        );
        std::fs::write(&config_path, content).unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.bot.tmp_dir, tmp_dir);
        assert!(tmp_dir.is_dir());
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = Config::load(Path::new("/nonexistent/animeframebot.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/animeframebot.toml"));
    }
}
