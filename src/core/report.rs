use crate::domain::model::{OrderedMap, RunSnapshot};

/// 千分位、無小數的金額格式
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn table<V>(header: (&str, &str), map: &OrderedMap<V>, limit: usize, fmt: impl Fn(&V) -> String) -> String {
    let mut out = format!("| {} | {} |\n|:--|--:|\n", header.0, header.1);
    for (key, value) in map.iter().take(limit) {
        out.push_str(&format!("| {} | {} |\n", key, fmt(value)));
    }
    out
}

/// 產生 Markdown 摘要報告（不含圖表）
pub fn render_markdown(snapshot: &RunSnapshot, generated_at: &str) -> String {
    let analysis = &snapshot.analysis;
    let money = |v: &f64| format!("${}", format_thousands(*v));
    let summary = &snapshot.summary;

    let mut out = format!("# Financial transactions analysis\n{}\n\n", generated_at);
    out.push_str(&format!(
        "Transactions: {} raw, {} cleaned, {} merged ({} unmatched). Clients: {} raw, {} cleaned.\n\n",
        summary.raw_transactions,
        summary.clean_transactions,
        summary.merged,
        summary.unmatched,
        summary.raw_clients,
        summary.clean_clients
    ));

    out.push_str("## Top 5 services by transaction count\n");
    out.push_str(&table(("service", "count"), &analysis.services_by_count, 5, |v| v.to_string()));

    out.push_str("\n## Service with the highest revenue\n");
    out.push_str(&table(("service", "amount"), &analysis.services_by_transaction_amount, 1, money));

    out.push_str(&format!(
        "\nTotal revenue for the last month: ${}\n\n",
        format_thousands(analysis.last_month_total_amount)
    ));
    out.push_str(&table(
        ("service", "amount"),
        &analysis.last_month_amount_by_service,
        usize::MAX,
        money,
    ));

    out.push_str("\n## Top 5 average transaction amounts by city\n");
    out.push_str(&table(("city", "amount"), &analysis.avg_transaction_amount_by_city, 5, money));

    out.push_str("\n## Revenue by client net-worth tier\n");
    out.push_str(&table(
        ("tier", "amount"),
        &analysis.client_net_worth_category_total_amount,
        usize::MAX,
        money,
    ));

    out.push_str("\n## Share of transactions by payment method\n");
    out.push_str(&table(
        ("payment method", "%"),
        &analysis.payment_method_percentage,
        usize::MAX,
        |v| format!("{:.2}", v),
    ));

    out.push_str("\n## Next month forecast\n");
    match &analysis.forecast_next_month {
        Some(forecast) => out.push_str(&format!(
            "Forecast transaction count: {}\n\nForecast revenue: ${}\n",
            forecast.count,
            format_thousands(forecast.amount)
        )),
        None => out.push_str("Not enough dated transactions to forecast.\n"),
    }

    out
}
