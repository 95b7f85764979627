use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clipboard_bridge::BridgeConfig;

pub fn config_path() -> Option<PathBuf> {
    let dir = dirs::config_dir()?;
    Some(dir.join("clipboard-bridge").join("config.toml"))
}

/// Configuration together with the reason it fell back to defaults, if it did.
#[derive(Debug)]
pub struct Loaded {
    pub config: BridgeConfig,
    pub warning: Option<String>,
}

/// Load `path`, or the per-user config file when `path` is `None`.
///
/// A missing file silently yields defaults. A file that cannot be read or
/// parsed yields defaults plus a warning.
pub fn load(path: Option<&Path>) -> Loaded {
    let path = match path.map(Path::to_path_buf).or_else(config_path) {
        Some(path) => path,
        None => return defaults(None),
    };

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return defaults(None),
        Err(e) => return defaults(Some(format!("cannot read {}: {}", path.display(), e))),
    };

    match BridgeConfig::from_toml_str(&text) {
        Ok(config) => Loaded { config, warning: None },
        Err(e) => defaults(Some(format!("ignoring {}: {}", path.display(), e))),
    }
}

/// Write the default configuration to `path`, creating parent directories.
pub fn save_default(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(&BridgeConfig::default())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, content)
}

fn defaults(warning: Option<String>) -> Loaded {
    Loaded { config: BridgeConfig::default(), warning }
}
