use crate::core::aggregator::run_analysis;
use crate::core::auditor::{audit_table, AuditOptions};
use crate::core::cleaner::{clean_clients, clean_transactions};
use crate::core::joiner::merge_tables;
use crate::core::loader::{read_csv_table, read_json_table};
use crate::core::report::render_markdown;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{ClientRecord, RawDatasets, RunSnapshot, RunSummary, TransactionRecord};
use crate::utils::error::Result;
use std::io::Write;
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const RAW_TRANSACTIONS_AUDIT_FILE: &str = "audit_raw_transactions.json";
pub const RAW_CLIENTS_AUDIT_FILE: &str = "audit_raw_clients.json";
pub const TRANSACTIONS_AUDIT_FILE: &str = "audit_transactions.json";
pub const CLIENTS_AUDIT_FILE: &str = "audit_clients.json";
pub const ANALYSIS_FILE: &str = "analysis_results.json";
pub const REPORT_FILE: &str = "report.md";

/// 交易與客戶資料的稽核、清理、合併與分析流程
pub struct AnalysisPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> AnalysisPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn input_file(&self, name: &str) -> String {
        Path::new(self.config.input_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    fn artifacts(&self, snapshot: &RunSnapshot) -> Result<Vec<(&'static str, Vec<u8>)>> {
        let mut files = vec![
            (
                RAW_TRANSACTIONS_AUDIT_FILE,
                serde_json::to_vec_pretty(&snapshot.raw_transactions_audit)?,
            ),
            (
                RAW_CLIENTS_AUDIT_FILE,
                serde_json::to_vec_pretty(&snapshot.raw_clients_audit)?,
            ),
            (
                TRANSACTIONS_AUDIT_FILE,
                serde_json::to_vec_pretty(&snapshot.transactions_audit)?,
            ),
            (
                CLIENTS_AUDIT_FILE,
                serde_json::to_vec_pretty(&snapshot.clients_audit)?,
            ),
            (ANALYSIS_FILE, serde_json::to_vec_pretty(&snapshot.analysis)?),
        ];

        if self.config.write_report() {
            let generated_at = chrono::Local::now().format("%d.%m.%Y %H:%M").to_string();
            files.push((
                REPORT_FILE,
                render_markdown(snapshot, &generated_at).into_bytes(),
            ));
        }

        Ok(files)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AnalysisPipeline<S, C> {
    async fn extract(&self) -> Result<RawDatasets> {
        let transactions_path = self.input_file(self.config.transactions_file());
        let clients_path = self.input_file(self.config.clients_file());

        tracing::debug!("Reading transactions from: {}", transactions_path);
        let transactions = read_csv_table(
            &self.storage.read_file(&transactions_path).await?,
            "transactions",
            &TransactionRecord::ID_COLUMNS,
        )?;

        tracing::debug!("Reading clients from: {}", clients_path);
        let clients = read_json_table(
            &self.storage.read_file(&clients_path).await?,
            "clients",
            &ClientRecord::ID_COLUMNS,
        )?;

        Ok(RawDatasets {
            transactions,
            clients,
        })
    }

    async fn transform(&self, data: RawDatasets) -> Result<RunSnapshot> {
        let outliers = self.config.outlier_settings();
        let transactions_options =
            AuditOptions::new(outliers, self.config.transactions_exclude_columns());
        let clients_options = AuditOptions::new(outliers, self.config.clients_exclude_columns());

        tracing::debug!("Auditing raw datasets (outlier method: {})", outliers.method);
        let raw_transactions_audit = audit_table(&data.transactions, &transactions_options);
        let raw_clients_audit = audit_table(&data.clients, &clients_options);

        let transactions = clean_transactions(&data.transactions)?;
        let clients = clean_clients(&data.clients)?;

        let transactions_audit = audit_table(
            &TransactionRecord::to_table(&transactions),
            &transactions_options,
        );
        let clients_audit = audit_table(&ClientRecord::to_table(&clients), &clients_options);

        let joined = merge_tables(&transactions, &clients);
        let analysis = run_analysis(&joined.records);

        let summary = RunSummary {
            raw_transactions: data.transactions.row_count(),
            raw_clients: data.clients.row_count(),
            clean_transactions: transactions.len(),
            clean_clients: clients.len(),
            merged: joined.records.len(),
            unmatched: joined.unmatched,
        };
        tracing::info!(
            "Transactions: {} raw, {} cleaned, {} merged ({} unmatched)",
            summary.raw_transactions,
            summary.clean_transactions,
            summary.merged,
            summary.unmatched
        );

        Ok(RunSnapshot {
            raw_transactions_audit,
            raw_clients_audit,
            transactions_audit,
            clients_audit,
            analysis,
            summary,
        })
    }

    async fn load(&self, snapshot: RunSnapshot) -> Result<String> {
        let files = self.artifacts(&snapshot)?;

        if let Some(archive_name) = self.config.archive_name() {
            tracing::debug!("Creating ZIP file with {} files", files.len());

            // 建立 ZIP 檔
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file(*name, SimpleFileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };

            let path = self.output_file(archive_name);
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(&path, &zip_data).await?;
            return Ok(path);
        }

        for (name, data) in &files {
            let path = self.output_file(name);
            self.storage.write_file(&path, data).await?;
            tracing::info!("Saved: {}", path);
        }

        Ok(self.output_file(ANALYSIS_FILE))
    }
}
