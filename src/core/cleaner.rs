use crate::domain::model::{Cell, ClientRecord, Table, TransactionRecord};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use uuid::Uuid;

pub const UNKNOWN_PAYMENT_METHOD: &str = "Unknown payment method";
pub const UNKNOWN_SERVICE: &str = "Unknown service";
pub const UNKNOWN_CITY: &str = "Unknown city";
pub const UNKNOWN_CONSULTANT: &str = "Unknown consultant";
pub const UNKNOWN_GENDER: &str = "Unknown";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// 解析日期儲存格，無法解析時回傳 None
pub fn parse_date(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(raw) => parse_date_str(raw.trim()),
        _ => None,
    }
}

fn parse_date_str(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// 識別碼一律轉為字串；文字保留原樣（含前導零），空白文字視為缺失
fn identifier(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Missing => None,
        Cell::Text(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| strip_zero_fraction(s).to_string())
        }
        other => Some(other.label()),
    }
}

// "1001.0" 與 "1001" 為同一識別碼
fn strip_zero_fraction(raw: &str) -> &str {
    match raw.split_once('.') {
        Some((whole, fraction))
            if !whole.is_empty()
                && !fraction.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && fraction.bytes().all(|b| b == b'0') =>
        {
            whole
        }
        _ => raw,
    }
}

fn required_column(table: &Table, dataset: &str, name: &str) -> Result<usize> {
    table.column_index(name).ok_or_else(|| {
        EtlError::data_validation(dataset, format!("required column '{}' is missing", name))
    })
}

fn categorical(row: &[Cell], index: Option<usize>, fallback: &str) -> String {
    index
        .map(|i| &row[i])
        .filter(|cell| !cell.is_missing())
        .map(Cell::label)
        .unwrap_or_else(|| fallback.to_string())
}

pub fn clean_transactions(raw: &Table) -> Result<Vec<TransactionRecord>> {
    const DATASET: &str = "transactions";

    let client_idx = required_column(raw, DATASET, "client_id")?;
    let amount_idx = required_column(raw, DATASET, "amount")?;
    let date_idx = required_column(raw, DATASET, "transaction_date")?;
    let id_idx = raw.column_index("transaction_id");
    let payment_idx = raw.column_index("payment_method");
    let service_idx = raw.column_index("service");
    let city_idx = raw.column_index("city");
    let consultant_idx = raw.column_index("consultant");

    // 整欄日期皆無法解析代表格式錯誤，而非個別壞資料
    let present_dates = raw.column_at(date_idx).filter(|c| !c.is_missing()).count();
    let parsed_dates = raw.column_at(date_idx).filter_map(parse_date).count();
    if present_dates > 0 && parsed_dates == 0 {
        return Err(EtlError::data_validation(
            DATASET,
            "no value in column 'transaction_date' could be parsed as a date",
        ));
    }

    let mut missing_required = 0usize;
    let mut invalid_dates = 0usize;
    let mut non_positive = 0usize;
    let mut duplicates = 0usize;
    let mut generated_ids = 0usize;
    let mut seen_ids = HashSet::new();
    let mut cleaned = Vec::new();

    for row in raw.rows() {
        let client_id = identifier(&row[client_idx]);
        let amount = row[amount_idx].as_f64();
        let (Some(client_id), Some(amount)) = (client_id, amount) else {
            missing_required += 1;
            continue;
        };

        let Some(transaction_date) = parse_date(&row[date_idx]) else {
            invalid_dates += 1;
            continue;
        };

        let transaction_id = match id_idx.and_then(|i| identifier(&row[i])) {
            Some(id) => id,
            None => {
                generated_ids += 1;
                Uuid::new_v4().to_string()
            }
        };

        if amount <= 0.0 {
            non_positive += 1;
            continue;
        }

        if !seen_ids.insert(transaction_id.clone()) {
            duplicates += 1;
            continue;
        }

        cleaned.push(TransactionRecord {
            transaction_id,
            client_id,
            amount,
            transaction_date,
            payment_method: categorical(row, payment_idx, UNKNOWN_PAYMENT_METHOD),
            service: categorical(row, service_idx, UNKNOWN_SERVICE),
            city: categorical(row, city_idx, UNKNOWN_CITY),
            consultant: categorical(row, consultant_idx, UNKNOWN_CONSULTANT),
        });
    }

    tracing::info!(
        "Cleaned transactions: {} -> {} rows (missing required: {}, invalid date: {}, non-positive amount: {}, duplicate id: {}, generated ids: {})",
        raw.row_count(),
        cleaned.len(),
        missing_required,
        invalid_dates,
        non_positive,
        duplicates,
        generated_ids
    );

    Ok(cleaned)
}

pub fn clean_clients(raw: &Table) -> Result<Vec<ClientRecord>> {
    let id_idx = required_column(raw, "clients", "id")?;
    let gender_idx = raw.column_index("gender");
    let net_worth_idx = raw.column_index("net_worth");
    let age_idx = raw.column_index("age");

    let cleaned: Vec<ClientRecord> = raw
        .rows()
        .iter()
        .filter_map(|row| {
            let id = identifier(&row[id_idx])?;
            Some(ClientRecord {
                id,
                gender: categorical(row, gender_idx, UNKNOWN_GENDER),
                net_worth: net_worth_idx
                    .and_then(|i| row[i].as_f64())
                    .unwrap_or(0.0),
                age: age_idx.and_then(|i| row[i].as_f64()),
            })
        })
        .collect();

    tracing::info!(
        "Cleaned clients: {} -> {} rows (missing id: {})",
        raw.row_count(),
        cleaned.len(),
        raw.row_count() - cleaned.len()
    );

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn transactions_table(rows: Vec<Vec<Cell>>) -> Table {
        let mut table = Table::new(
            TransactionRecord::COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        for row in rows {
            table.push_row(row);
        }
        table
    }

    fn tx_row(id: Cell, client: Cell, amount: Cell, date: Cell) -> Vec<Cell> {
        vec![id, client, amount, date, text("card"), text("audit"), text("Kazan"), text("Ivanov")]
    }

    #[test]
    fn test_clean_transactions_applies_rules_in_order() {
        let table = transactions_table(vec![
            tx_row(Cell::Int(1), Cell::Int(10), Cell::Float(100.0), text("2024-01-05")),
            tx_row(Cell::Int(2), Cell::Missing, Cell::Float(50.0), text("2024-01-06")),
            tx_row(Cell::Int(3), Cell::Int(11), Cell::Missing, text("2024-01-06")),
            tx_row(Cell::Int(4), Cell::Int(12), Cell::Float(20.0), text("not a date")),
            tx_row(Cell::Int(5), Cell::Int(13), Cell::Float(-5.0), text("2024-01-07")),
            tx_row(Cell::Int(5), Cell::Int(13), Cell::Float(0.0), text("2024-01-07")),
            tx_row(Cell::Int(1), Cell::Int(14), Cell::Float(70.0), text("2024-01-08")),
            tx_row(Cell::Int(6), Cell::Float(15.0), Cell::Int(30), text("2024-02-01 10:30:00")),
        ]);

        let cleaned = clean_transactions(&table).unwrap();

        let ids: Vec<&str> = cleaned.iter().map(|t| t.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "6"]);
        assert_eq!(cleaned[0].client_id, "10");
        assert_eq!(cleaned[1].client_id, "15");
        assert_eq!(cleaned[1].amount, 30.0);
        assert_eq!(
            cleaned[1].transaction_date,
            NaiveDate::from_ymd_opt(2024, 2, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_identifiers_keep_leading_zeros_and_large_values() {
        let csv = "transaction_id,client_id,amount,transaction_date\n\
                   12345678901234567891,12345678901234567891,10,2024-01-01\n\
                   12345678901234567892,12345678901234567892,20,2024-01-02\n\
                   007,007,30,2024-01-03\n\
                   7,7.0,40,2024-01-04\n";
        let table = crate::core::loader::read_csv_table(
            csv.as_bytes(),
            "transactions",
            &TransactionRecord::ID_COLUMNS,
        )
        .unwrap();

        let cleaned = clean_transactions(&table).unwrap();

        let ids: Vec<&str> = cleaned.iter().map(|t| t.transaction_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["12345678901234567891", "12345678901234567892", "007", "7"]
        );
        let clients: Vec<&str> = cleaned.iter().map(|t| t.client_id.as_str()).collect();
        assert_eq!(
            clients,
            vec!["12345678901234567891", "12345678901234567892", "007", "7"]
        );
    }

    #[test]
    fn test_missing_ids_get_distinct_generated_values() {
        let table = transactions_table(vec![
            tx_row(Cell::Missing, Cell::Int(1), Cell::Float(10.0), text("2024-01-01")),
            tx_row(Cell::Missing, Cell::Int(1), Cell::Float(10.0), text("2024-01-01")),
        ]);

        let cleaned = clean_transactions(&table).unwrap();

        assert_eq!(cleaned.len(), 2);
        assert_ne!(cleaned[0].transaction_id, cleaned[1].transaction_id);
    }

    #[test]
    fn test_missing_categoricals_get_sentinels() {
        let mut table = transactions_table(vec![]);
        table.push_row(vec![
            Cell::Int(1),
            Cell::Int(1),
            Cell::Float(10.0),
            text("2024-01-01"),
        ]);

        let cleaned = clean_transactions(&table).unwrap();

        assert_eq!(cleaned[0].payment_method, UNKNOWN_PAYMENT_METHOD);
        assert_eq!(cleaned[0].service, UNKNOWN_SERVICE);
        assert_eq!(cleaned[0].city, UNKNOWN_CITY);
        assert_eq!(cleaned[0].consultant, UNKNOWN_CONSULTANT);
    }

    #[test]
    fn test_all_rows_dropped_yields_empty_set() {
        let table = transactions_table(vec![tx_row(
            Cell::Int(1),
            Cell::Int(1),
            Cell::Float(-1.0),
            text("2024-01-01"),
        )]);

        assert!(clean_transactions(&table).unwrap().is_empty());
        assert!(clean_transactions(&transactions_table(vec![])).unwrap().is_empty());
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let table = Table::new(vec!["transaction_id".to_string(), "client_id".to_string()]);
        let err = clean_transactions(&table).unwrap_err();
        assert!(matches!(err, EtlError::DataValidationError { .. }));
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn test_unparseable_date_column_is_fatal() {
        let table = transactions_table(vec![
            tx_row(Cell::Int(1), Cell::Int(1), Cell::Float(10.0), text("yesterday")),
            tx_row(Cell::Int(2), Cell::Int(1), Cell::Float(10.0), text("tomorrow")),
        ]);
        assert!(clean_transactions(&table).is_err());
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let table = transactions_table(vec![
            tx_row(Cell::Missing, Cell::Int(1), Cell::Float(10.0), text("2024-01-01")),
            tx_row(Cell::Int(2), Cell::Int(2), Cell::Float(20.5), text("15.03.2024")),
            vec![Cell::Int(3), Cell::Int(3), Cell::Float(5.0), text("2024-03-20")],
        ]);

        let once = clean_transactions(&table).unwrap();
        let twice = clean_transactions(&TransactionRecord::to_table(&once)).unwrap();
        assert_eq!(once, twice);

        let mut clients = Table::new(ClientRecord::COLUMNS.iter().map(|c| c.to_string()).collect());
        clients.push_row(vec![Cell::Int(1), Cell::Missing, Cell::Missing, Cell::Int(30)]);
        clients.push_row(vec![Cell::Int(2), text("F"), Cell::Int(500_000), Cell::Missing]);
        let once = clean_clients(&clients).unwrap();
        let twice = clean_clients(&ClientRecord::to_table(&once)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clean_clients_fills_defaults() {
        let mut table = Table::new(ClientRecord::COLUMNS.iter().map(|c| c.to_string()).collect());
        table.push_row(vec![Cell::Missing, text("M"), Cell::Int(10), Cell::Int(20)]);
        table.push_row(vec![Cell::Int(7), Cell::Missing, Cell::Missing, Cell::Int(41)]);

        let clients = clean_clients(&table).unwrap();

        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, "7");
        assert_eq!(clients[0].gender, UNKNOWN_GENDER);
        assert_eq!(clients[0].net_worth, 0.0);
        assert_eq!(clients[0].age, Some(41.0));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date(&text("2024-05-01T12:00:00Z")).is_some());
        assert!(parse_date(&text("2024/05/01")).is_some());
        assert!(parse_date(&text("01.05.2024")).is_some());
        assert!(parse_date(&text("2024-13-01")).is_none());
        assert!(parse_date(&Cell::Int(20240501)).is_none());
    }
}
