//! 指标卡：记录数、上映年份范围、时长中位数

use serde::Serialize;

use super::stats::{format_thousands, median};
use super::{DURATION_NUM, RELEASE_YEAR_NUM};
use crate::frame::Frame;

const NOT_AVAILABLE: &str = "N/D";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub records: usize,
    pub records_label: String,
    pub year_range: Option<YearRange>,
    pub year_range_label: String,
    /// 电影为分钟，剧集为季数
    pub median_duration: Option<f64>,
    pub median_duration_label: String,
}

fn present_values(frame: &Frame, name: &str) -> Vec<f64> {
    frame
        .column(name)
        .and_then(|c| c.as_numeric())
        .map(|values| values.iter().flatten().copied().filter(|v| v.is_finite()).collect())
        .unwrap_or_default()
}

pub fn compute_kpis(view: &Frame) -> Kpis {
    let records = view.len();

    let years = present_values(view, RELEASE_YEAR_NUM);
    let year_range = if years.is_empty() {
        None
    } else {
        let min = years.iter().copied().fold(f64::INFINITY, f64::min);
        let max = years.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(YearRange {
            min: min.trunc() as i64,
            max: max.trunc() as i64,
        })
    };

    let median_duration = median(&present_values(view, DURATION_NUM));

    Kpis {
        records,
        records_label: format_thousands(records),
        year_range,
        year_range_label: year_range
            .map(|r| format!("{} — {}", r.min, r.max))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        median_duration,
        median_duration_label: median_duration
            .map(|m| format!("{:.0}", m))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}
