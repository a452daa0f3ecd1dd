use crate::core::forecaster::forecast_next_month;
use crate::core::stats::round_to;
use crate::domain::model::{format_number, AnalysisResults, MergedRecord, OrderedMap};
use chrono::{Months, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

const LOW_TIER_CEILING: f64 = 100_000.0;
const MEDIUM_TIER_CEILING: f64 = 1_000_000.0;

/// 客戶資產等級：< 100k 為低，100k..=1M 為中，> 1M 為高
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetWorthTier {
    Low,
    Medium,
    High,
}

impl NetWorthTier {
    pub fn classify(net_worth: f64) -> Self {
        if net_worth < LOW_TIER_CEILING {
            NetWorthTier::Low
        } else if net_worth <= MEDIUM_TIER_CEILING {
            NetWorthTier::Medium
        } else {
            NetWorthTier::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NetWorthTier::Low => "low",
            NetWorthTier::Medium => "medium",
            NetWorthTier::High => "high",
        }
    }
}

/// 依鍵分組加總金額並計數；BTreeMap 讓同值排序結果穩定
fn group_amounts<'a, F>(records: impl Iterator<Item = &'a MergedRecord>, key: F) -> BTreeMap<String, (f64, usize)>
where
    F: Fn(&MergedRecord) -> String,
{
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(key(record)).or_default();
        entry.0 += record.transaction.amount;
        entry.1 += 1;
    }
    groups
}

fn descending<V: PartialOrd + Copy>(values: impl IntoIterator<Item = (String, V)>) -> OrderedMap<V> {
    let mut entries: Vec<(String, V)> = values.into_iter().collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut map = OrderedMap::new();
    for (key, value) in entries {
        map.push_unique(key, value);
    }
    map
}

fn trailing_month_start(records: &[MergedRecord]) -> Option<NaiveDateTime> {
    let max_date = records.iter().map(|r| r.transaction.transaction_date).max()?;
    max_date.checked_sub_months(Months::new(1))
}

fn trailing_month(records: &[MergedRecord]) -> impl Iterator<Item = &MergedRecord> {
    let start = trailing_month_start(records);
    records
        .iter()
        .filter(move |r| start.is_some_and(|s| r.transaction.transaction_date >= s))
}

pub fn services_by_count(records: &[MergedRecord]) -> OrderedMap<usize> {
    let groups = group_amounts(records.iter(), |r| r.transaction.service.clone());
    descending(groups.into_iter().map(|(k, (_, count))| (k, count)))
}

pub fn services_by_transaction_amount(records: &[MergedRecord]) -> OrderedMap<f64> {
    let groups = group_amounts(records.iter(), |r| r.transaction.service.clone());
    descending(groups.into_iter().map(|(k, (sum, _))| (k, round_to(sum, 2))))
}

pub fn avg_transaction_amount_by_city(records: &[MergedRecord]) -> OrderedMap<f64> {
    let groups = group_amounts(records.iter(), |r| r.transaction.city.clone());
    descending(
        groups
            .into_iter()
            .map(|(k, (sum, count))| (k, round_to(sum / count as f64, 2))),
    )
}

pub fn payment_method_percentage(records: &[MergedRecord]) -> OrderedMap<f64> {
    let total = records.len() as f64;
    let groups = group_amounts(records.iter(), |r| r.transaction.payment_method.clone());
    descending(
        groups
            .into_iter()
            .map(|(k, (_, count))| (k, round_to(count as f64 / total * 100.0, 2))),
    )
}

/// 最大日期往前一個月（含下界）內的總金額
pub fn last_month_total_amount(records: &[MergedRecord]) -> f64 {
    round_to(trailing_month(records).map(|r| r.transaction.amount).sum(), 2)
}

pub fn last_month_amount_by_service(records: &[MergedRecord]) -> OrderedMap<f64> {
    let groups = group_amounts(trailing_month(records), |r| r.transaction.service.clone());
    descending(groups.into_iter().map(|(k, (sum, _))| (k, round_to(sum, 2))))
}

pub fn client_net_worth_category_total_amount(records: &[MergedRecord]) -> OrderedMap<f64> {
    let groups = group_amounts(records.iter(), |r| {
        NetWorthTier::classify(r.client.net_worth).label().to_string()
    });
    descending(groups.into_iter().map(|(k, (sum, _))| (k, round_to(sum, 2))))
}

/// 依年齡遞增排列的平均金額；年齡缺失的紀錄不計入
pub fn avg_transaction_amount_by_client_age(records: &[MergedRecord]) -> OrderedMap<f64> {
    let mut pairs: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|r| r.client.age.map(|age| (age, r.transaction.amount)))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut map = OrderedMap::new();
    let mut iter = pairs.into_iter().peekable();
    while let Some((age, amount)) = iter.next() {
        let (mut sum, mut count) = (amount, 1usize);
        while let Some((_, next)) = iter.next_if(|(a, _)| *a == age) {
            sum += next;
            count += 1;
        }
        map.push_unique(format_number(age), round_to(sum / count as f64, 2));
    }
    map
}

pub fn run_analysis(records: &[MergedRecord]) -> AnalysisResults {
    let forecast = forecast_next_month(records);
    if forecast.is_none() {
        tracing::warn!("No dated records available, skipping forecast");
    }

    AnalysisResults {
        services_by_count: services_by_count(records),
        services_by_transaction_amount: services_by_transaction_amount(records),
        avg_transaction_amount_by_city: avg_transaction_amount_by_city(records),
        payment_method_percentage: payment_method_percentage(records),
        last_month_amount_by_service: last_month_amount_by_service(records),
        last_month_total_amount: last_month_total_amount(records),
        client_net_worth_category_total_amount: client_net_worth_category_total_amount(records),
        avg_transaction_amount_by_client_age: avg_transaction_amount_by_client_age(records),
        forecast_next_month: forecast,
    }
}
