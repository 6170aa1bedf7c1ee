use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Spoken when a turn fails with a connectivity problem.
    #[serde(default = "default_network_error_speech")]
    pub network_error_speech: String,

    /// Spoken when a turn fails for any other reason.
    #[serde(default = "default_generic_error_speech")]
    pub generic_error_speech: String,

    /// How many turns the in-memory interaction log retains.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            network_error_speech: default_network_error_speech(),
            generic_error_speech: default_generic_error_speech(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl EvaluatorConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }
}

// デフォルト値の定義
fn default_network_error_speech() -> String {
    "Sorry, I can't reach the network right now".to_string()
}

fn default_generic_error_speech() -> String {
    "Sorry, something went wrong".to_string()
}

fn default_log_capacity() -> usize {
    32
}
