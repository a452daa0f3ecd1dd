use crate::domain::model::{Cell, Table};
use crate::utils::error::{EtlError, Result};

/// 讀取含標題列的 CSV，儲存格型別逐格推斷；`verbatim_columns` 保留原始文字
pub fn read_csv_table(data: &[u8], dataset: &str, verbatim_columns: &[&str]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(EtlError::data_validation(dataset, "CSV header row is empty"));
    }

    let verbatim: Vec<bool> = columns
        .iter()
        .map(|c| verbatim_columns.contains(&c.as_str()))
        .collect();

    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record?;
        table.push_row(
            record
                .iter()
                .enumerate()
                .map(|(i, raw)| match verbatim.get(i) {
                    Some(&true) => Cell::verbatim(raw),
                    _ => Cell::infer(raw),
                })
                .collect(),
        );
    }

    tracing::debug!("Read {} rows from {} CSV", table.row_count(), dataset);
    Ok(table)
}

/// 讀取 JSON 物件陣列；欄位為所有物件鍵的聯集，依首次出現順序排列
pub fn read_json_table(data: &[u8], dataset: &str, verbatim_columns: &[&str]) -> Result<Table> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    let serde_json::Value::Array(items) = value else {
        return Err(EtlError::data_validation(
            dataset,
            "expected a JSON array of objects",
        ));
    };

    let mut objects = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            serde_json::Value::Object(obj) => objects.push(obj),
            other => {
                return Err(EtlError::data_validation(
                    dataset,
                    format!("item {} is not an object: {}", index, other),
                ))
            }
        }
    }

    let mut columns: Vec<String> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(columns.clone());
    for obj in &objects {
        table.push_row(
            columns
                .iter()
                .map(|c| match obj.get(c) {
                    Some(value) if verbatim_columns.contains(&c.as_str()) => {
                        Cell::from_json_verbatim(value)
                    }
                    Some(value) => Cell::from_json(value),
                    None => Cell::Missing,
                })
                .collect(),
        );
    }

    tracing::debug!("Read {} rows from {} JSON", table.row_count(), dataset);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_table_infers_cells() {
        let data = "\u{feff}transaction_id,client_id,amount,transaction_date,city\n\
                    1,10,99.5,2024-01-01,Москва\n\
                    2,,abc,2024-01-02,\n";

        let table = read_csv_table(data.as_bytes(), "transactions", &[]).unwrap();

        assert_eq!(table.columns()[0], "transaction_id");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][2], Cell::Float(99.5));
        assert_eq!(table.rows()[0][4], Cell::Text("Москва".to_string()));
        assert_eq!(table.rows()[1][1], Cell::Missing);
        assert_eq!(table.rows()[1][2], Cell::Text("abc".to_string()));
    }

    #[test]
    fn test_read_csv_short_rows_are_padded() {
        let data = "a,b,c\n1,2\n";
        let table = read_csv_table(data.as_bytes(), "transactions", &[]).unwrap();
        assert_eq!(table.rows()[0][2], Cell::Missing);
    }

    #[test]
    fn test_read_json_table_unions_keys() {
        let data = r#"[{"id": 1, "gender": "F"}, {"id": 2, "net_worth": 1500.5, "gender": null}]"#;

        let table = read_json_table(data.as_bytes(), "clients", &[]).unwrap();

        assert_eq!(table.columns(), ["id", "gender", "net_worth"]);
        let gender = table.column_index("gender").unwrap();
        let net_worth = table.column_index("net_worth").unwrap();
        assert_eq!(table.rows()[0][net_worth], Cell::Missing);
        assert_eq!(table.rows()[1][gender], Cell::Missing);
        assert_eq!(table.rows()[1][net_worth], Cell::Float(1500.5));
    }

    #[test]
    fn test_read_json_rejects_non_array() {
        assert!(read_json_table(br#"{"id": 1}"#, "clients", &[]).is_err());
        assert!(read_json_table(br#"[1, 2]"#, "clients", &[]).is_err());
        assert!(read_json_table(b"not json", "clients", &[]).is_err());
    }

    #[test]
    fn test_verbatim_columns_keep_identifier_text() {
        let csv = "transaction_id,amount\n007,007\n12345678901234567891,1\n";
        let table = read_csv_table(csv.as_bytes(), "transactions", &["transaction_id"]).unwrap();
        assert_eq!(table.rows()[0][0], Cell::Text("007".to_string()));
        assert_eq!(table.rows()[0][1], Cell::Int(7));
        assert_eq!(
            table.rows()[1][0],
            Cell::Text("12345678901234567891".to_string())
        );

        let json = r#"[{"net_worth": 10, "id": 12345678901234567891}, {"id": "007"}]"#;
        let table = read_json_table(json.as_bytes(), "clients", &["id"]).unwrap();
        assert_eq!(table.columns(), ["net_worth", "id"]);
        assert_eq!(
            table.rows()[0][1],
            Cell::Text("12345678901234567891".to_string())
        );
        assert_eq!(table.rows()[1][1], Cell::Text("007".to_string()));
    }
}
