use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the exporter writes its reports.
///
/// The database path always comes from the command line, never from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub out_dir: PathBuf,
    pub diff_file: String,
    pub index_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            diff_file: "diff.txt".to_string(),
            index_file: "index.txt".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn diff_path(&self) -> PathBuf {
        self.out_dir.join(&self.diff_file)
    }

    pub fn index_path(&self) -> PathBuf {
        self.out_dir.join(&self.index_file)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("bakindex.toml")
}

/// Load the config file, or `None` when it doesn't exist
pub fn load_config(path: Option<&Path>) -> crate::Result<Option<ExportConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ExportConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}
