use crate::config::{DEFAULT_CLIENTS_EXCLUDE, DEFAULT_TRANSACTIONS_EXCLUDE};
use crate::core::ConfigProvider;
use crate::domain::model::{OutlierMethod, OutlierSettings};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
    pub transactions_file: String,
    pub clients_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub outlier_method: OutlierMethod,
    #[serde(default = "default_zscore_threshold")]
    pub zscore_threshold: f64,
    #[serde(default)]
    pub zscore_ddof: u32,
    #[serde(default = "default_transactions_exclude")]
    pub transactions_exclude: Vec<String>,
    #[serde(default = "default_clients_exclude")]
    pub clients_exclude: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            outlier_method: OutlierMethod::default(),
            zscore_threshold: default_zscore_threshold(),
            zscore_ddof: 0,
            transactions_exclude: default_transactions_exclude(),
            clients_exclude: default_clients_exclude(),
        }
    }
}

fn default_zscore_threshold() -> f64 {
    3.0
}

fn default_transactions_exclude() -> Vec<String> {
    DEFAULT_TRANSACTIONS_EXCLUDE.map(String::from).to_vec()
}

fn default_clients_exclude() -> Vec<String> {
    DEFAULT_CLIENTS_EXCLUDE.map(String::from).to_vec()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_true")]
    pub report: bool,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid env var pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_path("source.input_path", &self.source.input_path)?;
        validation::validate_file_extension(
            "source.transactions_file",
            &self.source.transactions_file,
            &["csv"],
        )?;
        validation::validate_file_extension("source.clients_file", &self.source.clients_file, &["json"])?;
        validation::validate_range("audit.zscore_threshold", self.audit.zscore_threshold, 0.0, 1_000.0)?;
        validation::validate_range("audit.zscore_ddof", self.audit.zscore_ddof, 0, 1)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;

        if let Some(compression) = self.load.compression.as_ref().filter(|c| c.enabled) {
            let filename =
                validation::validate_required_field("load.compression.filename", &compression.filename)?;
            validation::validate_file_extension("load.compression.filename", filename, &["zip"])?;
        }

        Ok(())
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.source.input_path
    }

    fn transactions_file(&self) -> &str {
        &self.source.transactions_file
    }

    fn clients_file(&self) -> &str {
        &self.source.clients_file
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn outlier_settings(&self) -> OutlierSettings {
        OutlierSettings {
            method: self.audit.outlier_method,
            zscore_threshold: self.audit.zscore_threshold,
            zscore_ddof: self.audit.zscore_ddof,
        }
    }

    fn transactions_exclude_columns(&self) -> &[String] {
        &self.audit.transactions_exclude
    }

    fn clients_exclude_columns(&self) -> &[String] {
        &self.audit.clients_exclude
    }

    fn write_report(&self) -> bool {
        self.load.report
    }

    fn archive_name(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .and_then(|c| c.filename.as_deref())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
