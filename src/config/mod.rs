pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::{OutlierMethod, OutlierSettings};
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

/// 交易資料預設不做頻率統計的識別碼欄位
pub const DEFAULT_TRANSACTIONS_EXCLUDE: [&str; 2] = ["transaction_id", "client_id"];
pub const DEFAULT_CLIENTS_EXCLUDE: [&str; 1] = ["id"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "finance-etl")]
#[command(about = "Audit, clean, merge and analyze transaction and client datasets")]
pub struct CliConfig {
    #[arg(long, default_value = "data")]
    pub input_path: String,

    #[arg(long, default_value = "transactions_data.csv")]
    pub transactions_file: String,

    #[arg(long, default_value = "clients_data.json")]
    pub clients_file: String,

    #[arg(long, default_value = "analysis_output")]
    pub output_path: String,

    #[arg(long, value_enum, default_value_t = OutlierMethod::Iqr)]
    pub outlier_method: OutlierMethod,

    #[arg(long, default_value = "3.0")]
    pub zscore_threshold: f64,

    #[arg(long, default_value = "0")]
    pub zscore_ddof: u32,

    #[arg(long, value_delimiter = ',', default_value = "transaction_id,client_id")]
    pub transactions_exclude: Vec<String>,

    #[arg(long, value_delimiter = ',', default_value = "id")]
    pub clients_exclude: Vec<String>,

    #[arg(long, help = "Skip the Markdown report")]
    pub no_report: bool,

    #[arg(long, help = "Bundle all artifacts into a single zip archive")]
    pub compress: bool,

    #[arg(long, default_value = "analysis_output.zip")]
    pub archive_name: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn transactions_file(&self) -> &str {
        &self.transactions_file
    }

    fn clients_file(&self) -> &str {
        &self.clients_file
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn outlier_settings(&self) -> OutlierSettings {
        OutlierSettings {
            method: self.outlier_method,
            zscore_threshold: self.zscore_threshold,
            zscore_ddof: self.zscore_ddof,
        }
    }

    fn transactions_exclude_columns(&self) -> &[String] {
        &self.transactions_exclude
    }

    fn clients_exclude_columns(&self) -> &[String] {
        &self.clients_exclude
    }

    fn write_report(&self) -> bool {
        !self.no_report
    }

    fn archive_name(&self) -> Option<&str> {
        self.compress.then_some(self.archive_name.as_str())
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input_path", &self.input_path)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_file_extension("transactions_file", &self.transactions_file, &["csv"])?;
        validation::validate_file_extension("clients_file", &self.clients_file, &["json"])?;
        validation::validate_range("zscore_threshold", self.zscore_threshold, 0.0, 1_000.0)?;
        validation::validate_range("zscore_ddof", self.zscore_ddof, 0, 1)?;
        if self.compress {
            validation::validate_file_extension("archive_name", &self.archive_name, &["zip"])?;
        }
        Ok(())
    }
}
