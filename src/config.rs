use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "MEDIVISUAL_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub diabetes: DiabetesConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ModelsConfig {
    pub classifier_path: String,
    pub autoencoder_path: String,
    pub scaler_path: String,
    pub intra_threads: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            classifier_path: "weights/brain_tumor.onnx".to_string(),
            autoencoder_path: "weights/diabetes_autoencoder.onnx".to_string(),
            scaler_path: "weights/scaler.json".to_string(),
            intra_threads: 4,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DiabetesConfig {
    /// Reconstruction errors strictly above this value are flagged.
    pub threshold: f32,
}

impl Default for DiabetesConfig {
    fn default() -> Self {
        Self { threshold: 0.2 }
    }
}

impl AppConfig {
    /// Reads the config from `path`. A missing file yields the defaults;
    /// a file that exists but does not parse is an error.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolves the config location from the environment and loads it.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
