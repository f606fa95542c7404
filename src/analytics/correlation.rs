//! 相关系数矩阵

use serde::Serialize;

use super::stats::pearson;
use super::AnalyticsError;
use crate::frame::Frame;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]` 为第 i 列与第 j 列的相关系数，无法计算时为 null
    pub values: Vec<Vec<Option<f64>>>,
}

/// 对至少含一个值的数值列计算两两相关系数
pub fn correlation_matrix(view: &Frame) -> Result<CorrelationMatrix, AnalyticsError> {
    let series: Vec<(&str, &[Option<f64>])> = view
        .columns()
        .iter()
        .filter(|c| c.non_missing() > 0)
        .filter_map(|c| c.as_numeric().map(|values| (c.name.as_str(), values)))
        .collect();

    if series.len() < 2 {
        return Err(AnalyticsError::InsufficientData(
            "Not enough numeric columns to compute correlations.".to_string(),
        ));
    }

    let values = series
        .iter()
        .map(|(_, xs)| series.iter().map(|(_, ys)| pearson(xs, ys)).collect())
        .collect();

    Ok(CorrelationMatrix {
        columns: series.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let view = Frame::from_columns(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::numeric("y", vec![Some(2.0), Some(1.0), Some(4.0), Some(3.0)]),
            Column::text("t", vec![None, None, None, None]),
        ])
        .unwrap();

        let matrix = correlation_matrix(&view).unwrap();
        assert_eq!(matrix.columns, vec!["x", "y"]);
        assert!((matrix.values[0][0].unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(matrix.values[0][1], matrix.values[1][0]);
        assert!((matrix.values[0][1].unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_all_missing_columns_are_dropped() {
        let view = Frame::from_columns(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0)]),
            Column::numeric("empty", vec![None, None]),
        ])
        .unwrap();
        assert!(matches!(
            correlation_matrix(&view),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_constant_column_yields_null() {
        let view = Frame::from_columns(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::numeric("k", vec![Some(5.0), Some(5.0), Some(5.0)]),
        ])
        .unwrap();
        let matrix = correlation_matrix(&view).unwrap();
        assert_eq!(matrix.values[0][1], None);
        assert_eq!(matrix.values[1][1], None);
    }
}
