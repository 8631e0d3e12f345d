use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use engine::EngineConfig;
use serde::Deserialize;

/// Optional `config.yaml`. Engine settings sit at the top level next to the
/// CLI's own keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    pub save_dir: Option<PathBuf>,
    /// External scenario catalog replacing the built-in one.
    pub scenarios: Option<PathBuf>,
}

/// Read a text file, honouring a UTF-8/UTF-16 BOM if present.
pub fn read_text_auto(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("adventure").join("config.yaml"))
}

pub fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adventure")
}

/// Load `path` if given, else the default location if it exists, else defaults.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => path,
            None => return Ok(AppConfig::default()),
        },
    };
    let text = read_text_auto(&path)?;
    if text.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}
