use crate::core::stats;
use crate::domain::model::{
    AuditReport, Cell, ColumnType, NumericSummary, OrderedMap, OutlierMethod, OutlierSettings,
    OutlierStats, Table,
};
use std::collections::{HashMap, HashSet};

/// IQR 圍欄倍數
const IQR_FENCE: f64 = 1.5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditOptions {
    pub outliers: OutlierSettings,
    /// 不做分類頻率統計的欄位
    pub exclude_columns: Vec<String>,
}

impl AuditOptions {
    pub fn new(outliers: OutlierSettings, exclude_columns: &[String]) -> Self {
        Self {
            outliers,
            exclude_columns: exclude_columns.to_vec(),
        }
    }
}

/// 偵測數值序列中的離群值，缺失值先行排除。
///
/// IQR 法回報上下界；Z-score 法刻意不回報界線。
pub fn detect_outliers(
    series: &[Option<f64>],
    method: OutlierMethod,
    zscore_threshold: f64,
    zscore_ddof: u32,
) -> OutlierStats {
    let values: Vec<f64> = series.iter().flatten().copied().collect();
    if values.is_empty() {
        return OutlierStats::no_signal();
    }

    let (count, lower_bound, upper_bound) = match method {
        OutlierMethod::Iqr => {
            let sorted = stats::sorted(&values);
            let (Some(q1), Some(q3)) = (stats::quantile(&sorted, 0.25), stats::quantile(&sorted, 0.75))
            else {
                return OutlierStats::no_signal();
            };
            let iqr = q3 - q1;
            let lower = q1 - IQR_FENCE * iqr;
            let upper = q3 + IQR_FENCE * iqr;
            let count = values.iter().filter(|v| **v < lower || **v > upper).count();
            (count, Some(lower), Some(upper))
        }
        OutlierMethod::Zscore => {
            let std = match stats::std_dev(&values, zscore_ddof) {
                Some(std) if std > 0.0 && std.is_finite() => std,
                _ => return OutlierStats::no_signal(),
            };
            let Some(mean) = stats::mean(&values) else {
                return OutlierStats::no_signal();
            };
            let count = values
                .iter()
                .filter(|v| ((**v - mean) / std).abs() > zscore_threshold)
                .count();
            (count, None, None)
        }
    };

    OutlierStats {
        count,
        percentage: count as f64 / values.len() as f64,
        lower_bound,
        upper_bound,
    }
}

pub fn infer_column_type<'a>(cells: impl Iterator<Item = &'a Cell>) -> ColumnType {
    let (mut ints, mut floats, mut bools, mut dates, mut texts) = (false, false, false, false, false);
    for cell in cells {
        match cell {
            Cell::Missing => {}
            Cell::Int(_) => ints = true,
            Cell::Float(_) => floats = true,
            Cell::Bool(_) => bools = true,
            Cell::Date(_) => dates = true,
            Cell::Text(_) => texts = true,
        }
    }

    let numeric = ints || floats;
    let kinds = [numeric, bools, dates, texts].iter().filter(|k| **k).count();
    match kinds {
        0 => ColumnType::Empty,
        1 if floats => ColumnType::Float,
        1 if ints => ColumnType::Integer,
        1 if bools => ColumnType::Boolean,
        1 if dates => ColumnType::Datetime,
        1 => ColumnType::Text,
        _ => ColumnType::Mixed,
    }
}

fn numeric_summary(values: &[f64]) -> Option<NumericSummary> {
    let sorted = stats::sorted(values);
    Some(NumericSummary {
        count: sorted.len(),
        mean: stats::mean(&sorted)?,
        std: stats::std_dev(&sorted, 1),
        min: *sorted.first()?,
        p25: stats::quantile(&sorted, 0.25)?,
        p50: stats::quantile(&sorted, 0.5)?,
        p75: stats::quantile(&sorted, 0.75)?,
        max: *sorted.last()?,
    })
}

/// 依出現次數遞減排序的頻率表，次數相同時保留首次出現順序
fn value_counts<'a>(cells: impl Iterator<Item = &'a Cell>) -> OrderedMap<usize> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, cell) in cells.enumerate() {
        counts.entry(cell.label()).or_insert((0, position)).0 += 1;
    }

    let mut entries: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

    let mut map = OrderedMap::new();
    for (label, (count, _)) in entries {
        map.push_unique(label, count);
    }
    map
}

pub fn audit_table(table: &Table, options: &AuditOptions) -> AuditReport {
    let rows = table.row_count();
    let mut report = AuditReport {
        rows,
        columns: table.column_count(),
        column_types: OrderedMap::new(),
        missing_total: 0,
        missing_by_col: OrderedMap::new(),
        missing_ratio_by_col: OrderedMap::new(),
        duplicate_rows: 0,
        duplicate_rows_all: 0,
        duplicate_by_col: OrderedMap::new(),
        constant_cols: Vec::new(),
        numeric_summary_by_col: OrderedMap::new(),
        numeric_outliers_by_col: OrderedMap::new(),
        str_summary_by_col: OrderedMap::new(),
    };

    let mut row_groups: HashMap<&[Cell], usize> = HashMap::new();
    for row in table.rows() {
        *row_groups.entry(row.as_slice()).or_default() += 1;
    }
    for count in row_groups.values().filter(|c| **c > 1) {
        report.duplicate_rows += count - 1;
        report.duplicate_rows_all += count;
    }

    for (index, name) in table.columns().iter().enumerate() {
        let column_type = infer_column_type(table.column_at(index));
        report.column_types.insert(name.as_str(), column_type);

        let missing = table.column_at(index).filter(|c| c.is_missing()).count();
        report.missing_total += missing;
        report.missing_by_col.insert(name.as_str(), missing);
        if rows > 0 {
            report
                .missing_ratio_by_col
                .insert(name.as_str(), missing as f64 / rows as f64);
        }

        let distinct: HashSet<&Cell> = table.column_at(index).collect();
        report.duplicate_by_col.insert(name.as_str(), rows - distinct.len());
        if distinct.len() <= 1 {
            report.constant_cols.push(name.clone());
        }

        if column_type.is_numeric() {
            let series: Vec<Option<f64>> = table.column_at(index).map(Cell::as_f64).collect();
            let values: Vec<f64> = series.iter().flatten().copied().collect();
            report
                .numeric_summary_by_col
                .insert(name.as_str(), numeric_summary(&values));
            report.numeric_outliers_by_col.insert(
                name.as_str(),
                detect_outliers(
                    &series,
                    options.outliers.method,
                    options.outliers.zscore_threshold,
                    options.outliers.zscore_ddof,
                ),
            );
        } else if !options.exclude_columns.iter().any(|c| c == name) {
            report
                .str_summary_by_col
                .insert(name.as_str(), value_counts(table.column_at(index)));
        }
    }

    tracing::debug!(
        "Audit: {} rows, {} columns, {} missing cells, {} duplicate rows",
        report.rows,
        report.columns,
        report.missing_total,
        report.duplicate_rows
    );

    report
}
