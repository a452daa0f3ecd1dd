use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 日期欄位序列化與分類標籤使用的格式
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 缺失值在頻率表中的標籤
pub const MISSING_LABEL: &str = "(missing)";

/// 表格中的單一儲存格
#[derive(Debug, Clone)]
pub enum Cell {
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Cell {
    /// 從 CSV 文字推斷型別：整數、浮點數、布林值，其餘視為文字
    pub fn infer(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Cell::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_nan() {
                return Cell::Missing;
            }
            if value.is_finite() {
                return Cell::Float(value);
            }
        }
        match trimmed {
            "true" | "TRUE" | "True" => Cell::Bool(true),
            "false" | "FALSE" | "False" => Cell::Bool(false),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// 保留原始文字，不做型別推斷；用於識別碼欄位
    pub fn verbatim(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Cell {
        match value {
            serde_json::Value::Null => Cell::Missing,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Missing),
            },
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// JSON 數字以原始表示轉為文字，超出 i64 的識別碼不會失真
    pub fn from_json_verbatim(value: &serde_json::Value) -> Cell {
        match value {
            serde_json::Value::Number(n) => Cell::Text(n.to_string()),
            serde_json::Value::String(s) => Cell::verbatim(s),
            other => Cell::from_json(other),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// 數值型儲存格轉為 f64，文字不做解析
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// 用於識別碼正規化及分類頻率表的字串表示；整數值的浮點數不帶小數
    pub fn label(&self) -> String {
        match self {
            Cell::Missing => MISSING_LABEL.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => format_number(*f),
            Cell::Text(s) => s.clone(),
            Cell::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Missing, Cell::Missing) => true,
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Date(a), Cell::Date(b)) => a == b,
            (a, b) => match (a.numeric_key(), b.numeric_key()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Cell::Missing => 0u8.hash(state),
            Cell::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Cell::Int(_) | Cell::Float(_) => {
                2u8.hash(state);
                self.numeric_key().hash(state);
            }
            Cell::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Cell::Date(d) => {
                4u8.hash(state);
                d.hash(state);
            }
        }
    }
}

/// 數值儲存格的比較鍵：整數值的浮點數與對應整數相等
#[derive(PartialEq, Eq, Hash)]
enum NumericKey {
    Int(i64),
    Float(u64),
}

impl Cell {
    fn numeric_key(&self) -> Option<NumericKey> {
        match self {
            Cell::Int(i) => Some(NumericKey::Int(*i)),
            Cell::Float(f) => {
                // i64::MIN as f64 為 -2^63，可精確表示
                let bound = -(i64::MIN as f64);
                if f.fract() == 0.0 && *f >= -bound && *f < bound {
                    Some(NumericKey::Int(*f as i64))
                } else {
                    Some(NumericKey::Float(normalized_bits(*f)))
                }
            }
            _ => None,
        }
    }
}

// -0.0 與 0.0 視為相同值
fn normalized_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Missing => serializer.serialize_none(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Float(f) => serializer.serialize_f64(*f),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Date(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
        }
    }
}

/// 欄位名稱有序、列為儲存格陣列的通用表格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 加入一列，長度不足時補缺失值，過長時截斷
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_at(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }
}

/// 保持插入順序的鍵值對映，序列化為 JSON 物件
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// 不檢查重複鍵，呼叫端須保證鍵唯一
    pub(crate) fn push_unique(&mut self, key: String, value: V) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub client_id: String,
    pub amount: f64,
    pub transaction_date: NaiveDateTime,
    pub payment_method: String,
    pub service: String,
    pub city: String,
    pub consultant: String,
}

impl TransactionRecord {
    pub const COLUMNS: [&'static str; 8] = [
        "transaction_id",
        "client_id",
        "amount",
        "transaction_date",
        "payment_method",
        "service",
        "city",
        "consultant",
    ];

    /// 以原始文字讀入、不做數值推斷的欄位
    pub const ID_COLUMNS: [&'static str; 2] = ["transaction_id", "client_id"];

    pub fn to_table(records: &[TransactionRecord]) -> Table {
        let mut table = Table::new(Self::COLUMNS.iter().map(|c| c.to_string()).collect());
        for r in records {
            table.push_row(vec![
                Cell::Text(r.transaction_id.clone()),
                Cell::Text(r.client_id.clone()),
                Cell::Float(r.amount),
                Cell::Date(r.transaction_date),
                Cell::Text(r.payment_method.clone()),
                Cell::Text(r.service.clone()),
                Cell::Text(r.city.clone()),
                Cell::Text(r.consultant.clone()),
            ]);
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRecord {
    pub id: String,
    pub gender: String,
    pub net_worth: f64,
    pub age: Option<f64>,
}

impl ClientRecord {
    pub const COLUMNS: [&'static str; 4] = ["id", "gender", "net_worth", "age"];
    pub const ID_COLUMNS: [&'static str; 1] = ["id"];

    pub fn to_table(records: &[ClientRecord]) -> Table {
        let mut table = Table::new(Self::COLUMNS.iter().map(|c| c.to_string()).collect());
        for r in records {
            table.push_row(vec![
                Cell::Text(r.id.clone()),
                Cell::Text(r.gender.clone()),
                Cell::Float(r.net_worth),
                r.age.map(Cell::Float).unwrap_or(Cell::Missing),
            ]);
        }
        table
    }
}

/// 交易與其對應客戶的合併結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub transaction: TransactionRecord,
    pub client: ClientRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutlierMethod {
    #[default]
    Iqr,
    Zscore,
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => write!(f, "iqr"),
            OutlierMethod::Zscore => write!(f, "zscore"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierSettings {
    pub method: OutlierMethod,
    pub zscore_threshold: f64,
    pub zscore_ddof: u32,
}

impl Default for OutlierSettings {
    fn default() -> Self {
        Self {
            method: OutlierMethod::Iqr,
            zscore_threshold: 3.0,
            zscore_ddof: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierStats {
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl OutlierStats {
    /// 空序列或零變異時的「無訊號」結果
    pub fn no_signal() -> Self {
        Self {
            count: 0,
            percentage: 0.0,
            lower_bound: None,
            upper_bound: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Datetime,
    Text,
    Mixed,
    Empty,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub rows: usize,
    pub columns: usize,
    pub column_types: OrderedMap<ColumnType>,
    pub missing_total: usize,
    pub missing_by_col: OrderedMap<usize>,
    pub missing_ratio_by_col: OrderedMap<f64>,
    pub duplicate_rows: usize,
    pub duplicate_rows_all: usize,
    pub duplicate_by_col: OrderedMap<usize>,
    pub constant_cols: Vec<String>,
    pub numeric_summary_by_col: OrderedMap<Option<NumericSummary>>,
    pub numeric_outliers_by_col: OrderedMap<OutlierStats>,
    pub str_summary_by_col: OrderedMap<OrderedMap<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastResult {
    pub count: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AnalysisResults {
    pub services_by_count: OrderedMap<usize>,
    pub services_by_transaction_amount: OrderedMap<f64>,
    pub avg_transaction_amount_by_city: OrderedMap<f64>,
    pub payment_method_percentage: OrderedMap<f64>,
    pub last_month_amount_by_service: OrderedMap<f64>,
    pub last_month_total_amount: f64,
    pub client_net_worth_category_total_amount: OrderedMap<f64>,
    pub avg_transaction_amount_by_client_age: OrderedMap<f64>,
    pub forecast_next_month: Option<ForecastResult>,
}

/// 載入階段讀入的原始資料
#[derive(Debug, Clone, Default)]
pub struct RawDatasets {
    pub transactions: Table,
    pub clients: Table,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub raw_transactions: usize,
    pub raw_clients: usize,
    pub clean_transactions: usize,
    pub clean_clients: usize,
    pub merged: usize,
    pub unmatched: usize,
}

/// 一次執行的所有產出，交給載入階段寫出
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub raw_transactions_audit: AuditReport,
    pub raw_clients_audit: AuditReport,
    pub transactions_audit: AuditReport,
    pub clients_audit: AuditReport,
    pub analysis: AnalysisResults,
    pub summary: RunSummary,
}
