use crate::core::stats::linear_fit;
use crate::domain::model::{ForecastResult, MergedRecord};
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// 單一月份的彙總，`month_end` 為該月最後一天
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPeriod {
    pub month_end: NaiveDate,
    pub time_index: usize,
    pub count: usize,
    pub amount: f64,
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_end(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(start)
}

/// 依月份分桶；首尾之間沒有資料的月份補 0，與連續時間軸對齊
pub fn monthly_periods(records: &[MergedRecord]) -> Vec<MonthlyPeriod> {
    let mut buckets: BTreeMap<NaiveDate, (usize, f64)> = BTreeMap::new();
    for record in records {
        let bucket = buckets
            .entry(month_start(record.transaction.transaction_date.date()))
            .or_default();
        bucket.0 += 1;
        bucket.1 += record.transaction.amount;
    }

    let (Some(first), Some(last)) = (
        buckets.keys().next().copied(),
        buckets.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let mut periods = Vec::new();
    let mut current = first;
    while current <= last {
        let (count, amount) = buckets.get(&current).copied().unwrap_or((0, 0.0));
        periods.push(MonthlyPeriod {
            month_end: month_end(current),
            time_index: periods.len(),
            count,
            amount,
        });
        match current.checked_add_months(Months::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    periods
}

/// 以月份索引對筆數與金額各自做線性回歸，外推下一個月。
///
/// 沒有任何資料時回傳 None。只有一個月份時斜率為 0，預測值即該月數值。
pub fn forecast_next_month(records: &[MergedRecord]) -> Option<ForecastResult> {
    let periods = monthly_periods(records);
    let last = periods.last()?;
    if periods.len() < 2 {
        tracing::warn!("Only one monthly period available, forecast falls back to a flat trend");
    }

    let xs: Vec<f64> = periods.iter().map(|p| p.time_index as f64).collect();
    let counts: Vec<f64> = periods.iter().map(|p| p.count as f64).collect();
    let amounts: Vec<f64> = periods.iter().map(|p| p.amount).collect();

    let next_index = (last.time_index + 1) as f64;
    let count = linear_fit(&xs, &counts)?.predict(next_index);
    let amount = linear_fit(&xs, &amounts)?.predict(next_index);

    tracing::debug!(
        "Forecast over {} periods: count {:.2}, amount {:.2}",
        periods.len(),
        count,
        amount
    );

    Some(ForecastResult {
        count: count.round_ties_even() as i64,
        amount: amount.round_ties_even(),
    })
}
