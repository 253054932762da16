use paperclip_editor::CodeWriterConfig;
use paperclip_workspace::DEFAULT_KEY_ATTRIBUTE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "paperclip.config.json";

/// Paperclip configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Project root that diff paths are relative to
    #[serde(default = "default_root")]
    pub root: String,

    /// Anchor manifest mapping selectors to source locations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<String>,

    /// Command computing diffs, e.g. `["node", "scripts/diff.js"]`
    #[serde(default)]
    pub diff_command: Vec<String>,

    /// Attribute holding transient generation keys
    #[serde(default = "default_key_attribute")]
    pub key_attribute: String,

    #[serde(default)]
    pub code_writer: CodeWriterConfig,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_key_attribute() -> String {
    DEFAULT_KEY_ATTRIBUTE.to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the project root
    pub fn get_root_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.root)
    }

    pub fn get_anchors_path(&self, cwd: &str) -> Option<PathBuf> {
        self.anchors.as_ref().map(|anchors| PathBuf::from(cwd).join(anchors))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            anchors: None,
            diff_command: vec![],
            key_attribute: default_key_attribute(),
            code_writer: CodeWriterConfig::default(),
        }
    }
}
