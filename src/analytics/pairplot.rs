//! 数值列两两关系（pairplot）

use rand::{rngs::StdRng, seq::index, SeedableRng};
use serde::Serialize;

use super::stats::{histogram, HistogramBin};
use super::AnalyticsError;
use crate::frame::Frame;

pub const PAIRPLOT_MIN_ROWS: usize = 200;
pub const PAIRPLOT_MAX_ROWS: usize = 5000;
pub const PAIRPLOT_ROW_STEP: usize = 100;
/// 未指定列时默认选取的数值列数量
pub const DEFAULT_SELECTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairplotData {
    pub columns: Vec<String>,
    /// 所有可选的数值列
    pub available: Vec<String>,
    /// 去除缺失值后的行数
    pub complete_rows: usize,
    pub sampled: bool,
    /// 按列存放的数值，各列等长
    pub values: Vec<Vec<f64>>,
    pub histograms: Vec<Vec<HistogramBin>>,
}

/// 构建 pairplot 数据
///
/// `selection` 为空时取前四个数值列；完整行数超过 `max_rows` 时按种子随机采样。
pub fn pairplot(
    view: &Frame,
    selection: &[String],
    max_rows: usize,
    seed: u64,
) -> Result<PairplotData, AnalyticsError> {
    let available = view.numeric_column_names();
    if available.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "No numeric columns to show. Make sure release_year and duration were converted."
                .to_string(),
        ));
    }

    let columns: Vec<String> = if selection.is_empty() {
        available.iter().take(DEFAULT_SELECTION).cloned().collect()
    } else {
        for name in selection {
            if !available.contains(name) {
                return Err(AnalyticsError::UnknownColumn(name.clone()));
            }
        }
        selection.to_vec()
    };

    if columns.len() < 2 {
        return Err(AnalyticsError::InsufficientData(
            "Select at least two columns.".to_string(),
        ));
    }

    let series: Vec<&[Option<f64>]> = columns
        .iter()
        .filter_map(|name| view.column(name).and_then(|c| c.as_numeric()))
        .collect();

    let complete: Vec<usize> = (0..view.len())
        .filter(|&row| series.iter().all(|s| s[row].is_some()))
        .collect();
    let complete_rows = complete.len();

    let (rows, sampled) = if complete.len() > max_rows {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked: Vec<usize> = index::sample(&mut rng, complete.len(), max_rows)
            .into_iter()
            .map(|i| complete[i])
            .collect();
        picked.sort_unstable();
        (picked, true)
    } else {
        (complete, false)
    };

    let values: Vec<Vec<f64>> = series
        .iter()
        .map(|s| rows.iter().filter_map(|&row| s[row]).collect())
        .collect();
    let histograms = values.iter().map(|v| histogram(v)).collect();

    Ok(PairplotData {
        columns,
        available,
        complete_rows,
        sampled,
        values,
        histograms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;

    fn frame(rows: usize) -> Frame {
        let a = (0..rows).map(|i| Some(i as f64)).collect();
        let b = (0..rows)
            .map(|i| if i % 10 == 0 { None } else { Some((i * 2) as f64) })
            .collect();
        let c = (0..rows).map(|i| Some((i % 7) as f64)).collect();
        let label = (0..rows).map(|i| Some(format!("t{i}"))).collect();
        Frame::from_columns(vec![
            Column::numeric("a", a),
            Column::text("label", label),
            Column::numeric("b", b),
            Column::numeric("c", c),
        ])
        .unwrap()
    }

    #[test]
    fn test_default_selection_and_dropna() {
        let data = pairplot(&frame(50), &[], 1000, 42).unwrap();
        assert_eq!(data.columns, vec!["a", "b", "c"]);
        assert_eq!(data.complete_rows, 45);
        assert!(!data.sampled);
        assert!(data.values.iter().all(|v| v.len() == 45));
        assert_eq!(data.histograms.len(), 3);
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let view = frame(3000);
        let first = pairplot(&view, &["a".to_string(), "c".to_string()], 200, 42).unwrap();
        let second = pairplot(&view, &["a".to_string(), "c".to_string()], 200, 42).unwrap();
        assert!(first.sampled);
        assert_eq!(first.values[0].len(), 200);
        assert_eq!(first.values, second.values);
    }

    #[test]
    fn test_requires_two_columns() {
        let err = pairplot(&frame(10), &["a".to_string()], 1000, 42).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData(_)));
    }

    #[test]
    fn test_rejects_non_numeric_selection() {
        let err = pairplot(&frame(10), &["a".to_string(), "label".to_string()], 1000, 42).unwrap_err();
        assert_eq!(err, AnalyticsError::UnknownColumn("label".to_string()));
    }

    #[test]
    fn test_no_numeric_columns() {
        let view = Frame::from_columns(vec![Column::text("t", vec![Some("x".to_string())])]).unwrap();
        assert!(matches!(
            pairplot(&view, &[], 1000, 42),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }
}
