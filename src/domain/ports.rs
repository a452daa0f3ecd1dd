use crate::domain::model::{OutlierSettings, RawDatasets, RunSnapshot};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn transactions_file(&self) -> &str;
    fn clients_file(&self) -> &str;
    fn output_path(&self) -> &str;
    fn outlier_settings(&self) -> OutlierSettings;
    /// 交易資料中不做分類頻率統計的欄位（通常是識別碼）
    fn transactions_exclude_columns(&self) -> &[String];
    fn clients_exclude_columns(&self) -> &[String];
    fn write_report(&self) -> bool;
    /// 啟用壓縮時回傳 zip 檔名
    fn archive_name(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RawDatasets>;
    async fn transform(&self, data: RawDatasets) -> Result<RunSnapshot>;
    async fn load(&self, snapshot: RunSnapshot) -> Result<String>;
}
