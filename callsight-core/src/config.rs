use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CallsightConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "data/Call_Center_Dataset.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    #[default]
    Forest,
    Onnx,
}

impl ModelBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelBackend::Forest => "forest",
            ModelBackend::Onnx => "onnx",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    pub path: String,
    #[serde(default = "default_onnx_input_name")]
    pub onnx_input_name: String,
}

fn default_onnx_input_name() -> String {
    "float_input".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Forest,
            path: "model.json".to_string(),
            onnx_input_name: default_onnx_input_name(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// An external report shown in an iframe.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportEmbed {
    pub title: String,
    pub url: String,
    #[serde(default = "default_embed_width")]
    pub width: u32,
    #[serde(default = "default_embed_height")]
    pub height: u32,
}

fn default_embed_width() -> u32 {
    800
}

fn default_embed_height() -> u32 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportsConfig {
    pub page_1: ReportEmbed,
    pub page_2: ReportEmbed,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            page_1: ReportEmbed {
                title: "Power BI Output - Page 1".to_string(),
                url: "https://app.powerbi.com/view?r=YOUR_REPORT_ID".to_string(),
                width: default_embed_width(),
                height: default_embed_height(),
            },
            page_2: ReportEmbed {
                title: "Power BI Output - Page 2".to_string(),
                url: "https://app.powerbi.com/view?r=YOUR_REPORT_ID_2".to_string(),
                width: default_embed_width(),
                height: default_embed_height(),
            },
        }
    }
}

impl CallsightConfig {
    /// Load `path` (TOML; the extension may be omitted) and overlay
    /// `CALLSIGHT__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("CALLSIGHT").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callsight.toml");
        std::fs::write(
            &path,
            r#"
[dataset]
path = "/srv/calls.csv"

[model]
backend = "onnx"
path = "/srv/model.onnx"
"#,
        )
        .unwrap();

        let config = CallsightConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.dataset.path, "/srv/calls.csv");
        assert_eq!(config.model.backend, ModelBackend::Onnx);
        assert_eq!(config.model.onnx_input_name, "float_input");
        assert_eq!(config.http.port, 8501);
        assert_eq!(config.reports.page_2.height, 600);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[model]\nbackend = \"pickle\"\npath = \"model.joblib\"\n").unwrap();
        assert!(CallsightConfig::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(CallsightConfig::load("/nonexistent/callsight.toml").is_err());
    }
}
