//! 稽核與預測共用的基本統計函式

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// 以 `ddof` 調整自由度的標準差；樣本數不大於 ddof 時無定義
pub fn std_dev(values: &[f64], ddof: u32) -> Option<f64> {
    let n = values.len();
    if n <= ddof as usize {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (n - ddof as usize) as f64).sqrt())
}

/// 線性內插分位數，`sorted` 必須已遞增排序
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// 最小平方法直線 `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// x 沒有變異（例如只有一個點）時斜率定為 0，退化成平均值
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;

    let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
    let sxy: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - x_mean) * (y - y_mean))
        .sum();

    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    Some(LinearFit {
        intercept: y_mean - slope * x_mean,
        slope,
    })
}

/// 四捨六入五成雙
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
