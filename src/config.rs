use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::apod;
use crate::gallery;

const DEFAULT_ENV_PREFIX: &str = "APOD_TUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub favorites: FavoritesConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_url")]
    pub url: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: default_dataset_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_dataset_url() -> String {
    apod::DATASET_URL.to_string()
}

fn default_timeout() -> Duration {
    apod::DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    format!("apod-tui/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            categories: BTreeMap::new(),
        }
    }
}

fn default_page_size() -> usize {
    gallery::PAGE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoritesConfig {
    #[serde(default = "default_favorites_path")]
    pub path: Option<PathBuf>,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            path: default_favorites_path(),
        }
    }
}

fn default_favorites_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("apod-tui").join("favorites.json"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_video_command")]
    pub video_command: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_command: default_video_command(),
        }
    }
}

fn default_video_command() -> Vec<String> {
    vec!["mpv".into(), "--fs".into(), "%URL%".into()]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("apod-tui").join("apod-tui.log"))
}

fn default_log_filter() -> String {
    "apod_tui=info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        anyhow::ensure!(path.exists(), "config file {} not found", path.display());
        let from_file = read_config_file(path)?;
        cfg = merge_config(cfg, from_file);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = apply_env(cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.dataset.url.trim().is_empty() {
        base.dataset.url = other.dataset.url;
    }
    if !other.dataset.timeout.is_zero() {
        base.dataset.timeout = other.dataset.timeout;
    }
    if !other.dataset.user_agent.trim().is_empty() {
        base.dataset.user_agent = other.dataset.user_agent;
    }

    if other.gallery.page_size != 0 {
        base.gallery.page_size = other.gallery.page_size;
    }
    base.gallery.categories.extend(other.gallery.categories);

    if other.favorites.path.is_some() {
        base.favorites.path = other.favorites.path;
    }

    if !other.player.video_command.is_empty() {
        base.player.video_command = other.player.video_command;
    }

    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }
    if !other.log.filter.trim().is_empty() {
        base.log.filter = other.log.filter;
    }

    base
}

/// Applies `PREFIX_SECTION__KEY=value` variables on top of `cfg`.
fn apply_env(mut cfg: Config, prefix: &str) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    cfg
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "dataset.url" => cfg.dataset.url = value,
        "dataset.user_agent" => cfg.dataset.user_agent = value,
        "dataset.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.dataset.timeout = duration;
            }
        }
        "gallery.page_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed > 0 {
                    cfg.gallery.page_size = parsed;
                }
            }
        }
        "favorites.path" => cfg.favorites.path = Some(PathBuf::from(value)),
        "player.video_command" => {
            cfg.player.video_command = split_list(&value);
        }
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        "log.filter" => cfg.log.filter = value,
        other => {
            if let Some(category) = other.strip_prefix("gallery.categories.") {
                cfg.gallery
                    .categories
                    .insert(category.to_string(), split_list(&value));
            }
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("apod-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            env_prefix: Some("APOD_TUI_TEST_DEFAULTS".into()),
            ..LoadOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.dataset.url, apod::DATASET_URL);
        assert_eq!(cfg.dataset.timeout, Duration::from_secs(12));
        assert_eq!(cfg.gallery.page_size, 9);
        assert_eq!(cfg.player.video_command[0], "mpv");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "dataset:\n  url: file:///tmp/apod.json\n  timeout: 3s\ngallery:\n  categories:\n    planet: [pluto, ceres]\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("APOD_TUI_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.dataset.url, "file:///tmp/apod.json");
        assert_eq!(cfg.dataset.timeout, Duration::from_secs(3));
        assert_eq!(cfg.gallery.page_size, 9);
        assert_eq!(
            cfg.gallery.categories.get("planet"),
            Some(&vec!["pluto".to_string(), "ceres".to_string()])
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load(LoadOptions {
            config_file: Some(dir.path().join("absent.yaml")),
            env_prefix: Some("APOD_TUI_TEST_MISSING".into()),
        });
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides() {
        env::set_var("APOD_TUI_TEST_ENV_DATASET__TIMEOUT", "500ms");
        env::set_var("APOD_TUI_TEST_ENV_GALLERY__CATEGORIES__STAR", "sun, corona");
        let cfg = load(LoadOptions {
            env_prefix: Some("APOD_TUI_TEST_ENV".into()),
            ..LoadOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.dataset.timeout, Duration::from_millis(500));
        assert_eq!(
            cfg.gallery.categories.get("star"),
            Some(&vec!["sun".to_string(), "corona".to_string()])
        );
        env::remove_var("APOD_TUI_TEST_ENV_DATASET__TIMEOUT");
        env::remove_var("APOD_TUI_TEST_ENV_GALLERY__CATEGORIES__STAR");
    }
}
