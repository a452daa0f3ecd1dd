use finance_etl::core::ConfigProvider;
use finance_etl::domain::model::OutlierMethod;
use finance_etl::{AnalysisPipeline, CliConfig, EtlEngine, EtlError, LocalStorage, TomlConfig};
use tempfile::TempDir;

const TRANSACTIONS: &str = "\
transaction_id,client_id,amount,transaction_date,payment_method,service,city,consultant
t1,1,1000,2024-01-05,Карта,Налоги,Москва,Иванов
t2,2,2000,2024-01-20,Наличные,Аудит,Казань,Петров
t3,3,1500,2024-02-03,Карта,Налоги,Москва,
t4,1,2500,2024-02-18,Перевод,Аудит,Казань,Петров
t5,2,3000,2024-03-02,Карта,Налоги,,Иванов
t6,3,500,2024-03-25,Карта,Консалтинг,Москва,Иванов
t6,3,500,2024-03-25,Карта,Консалтинг,Москва,Иванов
,1,700,2024-03-26,Карта,Налоги,Москва,Иванов
t8,1,-50,2024-03-27,Карта,Налоги,Москва,Иванов
t9,,100,2024-03-27,Карта,Налоги,Москва,Иванов
t10,1,100,not-a-date,Карта,Налоги,Москва,Иванов
t11,42,900,2024-03-28,Карта,Налоги,Москва,Иванов
";

const CLIENTS: &str = r#"[
  {"id": 1, "gender": "М", "net_worth": 50000, "age": 34},
  {"id": 2, "gender": "Ж", "net_worth": 100000, "age": 51},
  {"id": 3, "gender": null, "net_worth": 1000001, "age": 34},
  {"id": null, "gender": "М", "net_worth": 10, "age": 20}
]"#;

fn write_inputs(root: &std::path::Path) {
    let input = root.join("data");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("transactions.csv"), TRANSACTIONS).unwrap();
    std::fs::write(input.join("clients.json"), CLIENTS).unwrap();
}

fn cli_config(compress: bool) -> CliConfig {
    CliConfig {
        input_path: "data".to_string(),
        transactions_file: "transactions.csv".to_string(),
        clients_file: "clients.json".to_string(),
        output_path: "out".to_string(),
        outlier_method: OutlierMethod::Iqr,
        zscore_threshold: 3.0,
        zscore_ddof: 0,
        transactions_exclude: vec!["transaction_id".to_string(), "client_id".to_string()],
        clients_exclude: vec!["id".to_string()],
        no_report: false,
        compress,
        archive_name: "bundle.zip".to_string(),
        verbose: false,
        monitor: false,
    }
}

fn read_json(path: std::path::PathBuf) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_end_to_end_analysis() {
    let temp_dir = TempDir::new().unwrap();
    write_inputs(temp_dir.path());

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let pipeline = AnalysisPipeline::new(storage, cli_config(false));
    let engine = EtlEngine::new(pipeline);

    let output = engine.run().await.unwrap();
    assert!(output.ends_with("analysis_results.json"));

    let out_dir = temp_dir.path().join("out");
    let analysis = read_json(out_dir.join("analysis_results.json"));

    // t1..t6 (deduped) + generated id row; t11 has no client
    assert_eq!(analysis["services_by_count"]["Налоги"], 4);
    assert_eq!(analysis["services_by_transaction_amount"]["Аудит"], 4500.0);
    assert_eq!(analysis["avg_transaction_amount_by_city"]["Unknown city"], 3000.0);
    assert_eq!(analysis["client_net_worth_category_total_amount"]["medium"], 5000.0);
    assert_eq!(analysis["client_net_worth_category_total_amount"]["high"], 2000.0);
    assert_eq!(analysis["client_net_worth_category_total_amount"]["low"], 4200.0);
    assert_eq!(analysis["last_month_total_amount"], 4200.0);
    assert_eq!(analysis["avg_transaction_amount_by_client_age"]["34"], 1240.0);

    let pct = analysis["payment_method_percentage"].as_object().unwrap();
    let total: f64 = pct.values().map(|v| v.as_f64().unwrap()).sum();
    assert!((total - 100.0).abs() <= 0.01 * pct.len() as f64);

    let forecast = analysis["forecast_next_month"].as_object().unwrap();
    assert_eq!(forecast.len(), 2);
    assert!(forecast["count"].is_i64());
    assert!(forecast["amount"].is_f64());

    let raw_audit = read_json(out_dir.join("audit_raw_transactions.json"));
    assert_eq!(raw_audit["rows"], 12);
    assert_eq!(raw_audit["duplicate_rows"], 1);
    assert_eq!(raw_audit["duplicate_rows_all"], 2);
    assert!(raw_audit["str_summary_by_col"].get("transaction_id").is_none());
    assert_eq!(raw_audit["str_summary_by_col"]["service"]["Налоги"], 8);

    let clean_audit = read_json(out_dir.join("audit_transactions.json"));
    assert_eq!(clean_audit["rows"], 8);
    assert_eq!(clean_audit["duplicate_by_col"]["transaction_id"], 0);
    assert_eq!(clean_audit["missing_total"], 0);

    let clients_audit = read_json(out_dir.join("audit_clients.json"));
    assert_eq!(clients_audit["rows"], 3);

    let report = std::fs::read_to_string(out_dir.join("report.md")).unwrap();
    assert!(report.contains("Налоги"));
    assert!(report.contains("Next month forecast"));
}

#[tokio::test]
async fn test_end_to_end_with_archive_and_monitoring() {
    let temp_dir = TempDir::new().unwrap();
    write_inputs(temp_dir.path());

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let pipeline = AnalysisPipeline::new(storage, cli_config(true));
    let engine = EtlEngine::new_with_monitoring(pipeline, true);

    let output = engine.run().await.unwrap();
    assert!(output.ends_with("bundle.zip"));

    let zip_data = std::fs::read(temp_dir.path().join("out").join("bundle.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert!(names.contains(&"analysis_results.json".to_string()));
    assert!(names.contains(&"report.md".to_string()));
    assert!(!temp_dir.path().join("out").join("analysis_results.json").exists());
}

#[tokio::test]
async fn test_missing_required_column_aborts_run() {
    let temp_dir = TempDir::new().unwrap();
    write_inputs(temp_dir.path());
    std::fs::write(
        temp_dir.path().join("data").join("transactions.csv"),
        "transaction_id,client_id,transaction_date\nt1,1,2024-01-01\n",
    )
    .unwrap();

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let engine = EtlEngine::new(AnalysisPipeline::new(storage, cli_config(false)));

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, EtlError::DataValidationError { .. }));
    assert!(!temp_dir.path().join("out").exists());
}

#[tokio::test]
async fn test_empty_inputs_produce_empty_results() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("data");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(
        input.join("transactions.csv"),
        "transaction_id,client_id,amount,transaction_date\n",
    )
    .unwrap();
    std::fs::write(
        input.join("clients.json"),
        r#"[{"id": 1, "gender": "F", "net_worth": 10, "age": 30}]"#,
    )
    .unwrap();

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let engine = EtlEngine::new(AnalysisPipeline::new(storage, cli_config(false)));
    engine.run().await.unwrap();

    let out_dir = temp_dir.path().join("out");
    let analysis = read_json(out_dir.join("analysis_results.json"));
    assert!(analysis["services_by_count"].as_object().unwrap().is_empty());
    assert!(analysis["forecast_next_month"].is_null());

    let audit = read_json(out_dir.join("audit_raw_transactions.json"));
    assert_eq!(audit["rows"], 0);
    assert_eq!(audit["columns"], 4);
    assert!(audit["missing_ratio_by_col"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_toml_config_drives_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    write_inputs(temp_dir.path());

    let config = TomlConfig::from_toml_str(
        r#"
[pipeline]
name = "toml-run"

[source]
input_path = "data"
transactions_file = "transactions.csv"
clients_file = "clients.json"

[audit]
outlier_method = "zscore"

[load]
output_path = "results"
report = false
"#,
    )
    .unwrap();
    assert_eq!(config.outlier_settings().method, OutlierMethod::Zscore);

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let engine = EtlEngine::new(AnalysisPipeline::new(storage, config));
    engine.run().await.unwrap();

    let results = temp_dir.path().join("results");
    assert!(results.join("analysis_results.json").exists());
    assert!(!results.join("report.md").exists());

    let audit = read_json(results.join("audit_transactions.json"));
    assert!(audit["numeric_outliers_by_col"]["amount"]["lower_bound"].is_null());
}
