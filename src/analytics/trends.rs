//! 按上映年份计数

use serde::Serialize;
use std::collections::BTreeMap;

use super::view::{apply_filter, ContentFilter};
use super::RELEASE_YEAR_NUM;
use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i64,
    pub count: usize,
}

/// 每年的标题数量，按年份升序；缺少 `release_year_num` 时为空
pub fn count_by_year(view: &Frame, content_type: ContentFilter) -> Vec<YearCount> {
    let filtered = apply_filter(view, content_type);
    let Some(years) = filtered.column(RELEASE_YEAR_NUM).and_then(|c| c.as_numeric()) else {
        return Vec::new();
    };

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for year in years.iter().flatten().filter(|y| y.is_finite()) {
        *counts.entry(year.trunc() as i64).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}
