use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process...");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} transactions and {} clients",
            raw_data.transactions.row_count(),
            raw_data.clients.row_count()
        );
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("Transforming data...");
        let snapshot = self.pipeline.transform(raw_data).await?;
        tracing::info!("Merged {} records for analysis", snapshot.summary.merged);
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("Loading results...");
        let output_path = self.pipeline.load(snapshot).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
