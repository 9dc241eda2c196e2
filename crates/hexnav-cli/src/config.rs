//! Configuration Vault – reads/writes `~/.hexnav/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use hexnav_types::NavConfig;

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Built-in synthetic scene (an obstacle approaching the robot).
    #[default]
    Sim,
    /// A directory of still images replayed in name order.
    ImageDir,
}

/// `[source]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Image directory, required when `kind = "image_dir"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Restart from the first image after the last one.
    #[serde(default = "default_true", rename = "loop")]
    pub looping: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: None,
            looping: true,
        }
    }
}

/// `[control]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Begin in PAUSED and wait for `resume` on the prompt.
    #[serde(default)]
    pub start_paused: bool,
}

/// `[diagnostics]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_every_n_cycles")]
    pub every_n_cycles: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_output_dir(),
            every_n_cycles: default_every_n_cycles(),
        }
    }
}

/// Persisted configuration stored in `~/.hexnav/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub navigation: NavConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

fn default_true() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("hexnav-diagnostics")
}
fn default_every_n_cycles() -> u64 {
    10
}

/// Return the config path: `$HEXNAV_CONFIG` if set, else
/// `~/.hexnav/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("HEXNAV_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".hexnav").join("config.toml")
}

/// Outcome of [`load`]: the config and whether it was freshly written.
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    pub created: bool,
}

/// Load the config, writing defaults first when the file is missing.
pub fn load() -> Result<Loaded, String> {
    let mut loaded = load_or_create(&config_path())?;
    apply_env_overrides(&mut loaded.config, |k| std::env::var(k).ok())?;
    Ok(loaded)
}

pub(crate) fn load_or_create(path: &Path) -> Result<Loaded, String> {
    if !path.exists() {
        let config = Config::default();
        save_to(&config, path)?;
        return Ok(Loaded { config, created: true });
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let config: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Loaded { config, created: false })
}

/// Apply `HEXNAV_*` overrides read through `var`.  A value that does not
/// parse is an error rather than being skipped.
///
/// | Variable | Config field |
/// |---|---|
/// | `HEXNAV_SOURCE_DIR` | `source.path` (and `source.kind = "image_dir"`) |
/// | `HEXNAV_DIAGNOSTICS_DIR` | `diagnostics.output_dir` (and `enabled = true`) |
/// | `HEXNAV_HYSTERESIS_WINDOW` | `navigation.hysteresis_window` |
pub fn apply_env_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) -> Result<(), String> {
    if let Some(v) = var("HEXNAV_SOURCE_DIR") {
        cfg.source.kind = SourceKind::ImageDir;
        cfg.source.path = Some(PathBuf::from(v));
    }
    if let Some(v) = var("HEXNAV_DIAGNOSTICS_DIR") {
        cfg.diagnostics.enabled = true;
        cfg.diagnostics.output_dir = PathBuf::from(v);
    }
    if let Some(v) = var("HEXNAV_HYSTERESIS_WINDOW") {
        cfg.navigation.hysteresis_window = v
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("Invalid HEXNAV_HYSTERESIS_WINDOW '{}': {}", v, e))?;
    }
    Ok(())
}

/// Save the config to a specific path, creating parent directories.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
