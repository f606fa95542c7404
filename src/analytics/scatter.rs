//! 数值列与上映年份的散点关系

use serde::Serialize;

use super::stats::{linear_regression, LinearFit};
use super::{AnalyticsError, RELEASE_YEAR_NUM};
use crate::frame::Frame;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterData {
    pub x: String,
    pub y: String,
    /// 可作为 Y 轴的数值列
    pub candidates: Vec<String>,
    pub points: Vec<(f64, f64)>,
    /// 仅在请求回归线且可拟合时存在
    pub regression: Option<LinearFit>,
}

pub fn scatter(
    view: &Frame,
    y: Option<&str>,
    with_regression: bool,
) -> Result<ScatterData, AnalyticsError> {
    let Some(xs) = view.column(RELEASE_YEAR_NUM).and_then(|c| c.as_numeric()) else {
        return Err(AnalyticsError::InsufficientData(
            "release_year_num does not exist. Map and convert the release year column first."
                .to_string(),
        ));
    };

    let candidates: Vec<String> = view
        .numeric_column_names()
        .into_iter()
        .filter(|name| name != RELEASE_YEAR_NUM)
        .collect();

    let y = match y {
        Some(name) if candidates.iter().any(|c| c == name) => name.to_string(),
        Some(name) => return Err(AnalyticsError::UnknownColumn(name.to_string())),
        None => candidates.first().cloned().ok_or_else(|| {
            AnalyticsError::InsufficientData("No numeric columns to compare.".to_string())
        })?,
    };

    let ys = view
        .column(&y)
        .and_then(|c| c.as_numeric())
        .ok_or_else(|| AnalyticsError::UnknownColumn(y.clone()))?;

    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if points.is_empty() {
        return Err(AnalyticsError::InsufficientData("Not enough data to plot.".to_string()));
    }

    let regression = if with_regression {
        linear_regression(&points)
    } else {
        None
    };

    Ok(ScatterData {
        x: RELEASE_YEAR_NUM.to_string(),
        y,
        candidates,
        points,
        regression,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{prepare_view, ColumnMapping, ContentFilter};
    use crate::frame::parse_csv;

    fn view() -> Frame {
        let frame = parse_csv(
            b"type,release_year,duration\n\
Movie,2000,100 min\nMovie,2010,120 min\nMovie,2020,140 min\nMovie,,90 min\n",
        )
        .unwrap();
        prepare_view(&frame, &ColumnMapping::default(), ContentFilter::All).unwrap()
    }

    #[test]
    fn test_default_y_is_first_candidate() {
        let data = scatter(&view(), None, false).unwrap();
        // release_year 本身也是数值列
        assert_eq!(data.candidates, vec!["release_year", "duration_num"]);
        assert_eq!(data.y, "release_year");
        assert!(data.regression.is_none());
    }

    #[test]
    fn test_regression_line() {
        let data = scatter(&view(), Some("duration_num"), true).unwrap();
        assert_eq!(data.points.len(), 3);
        let fit = data.regression.unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.predict(2000.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_y() {
        assert_eq!(
            scatter(&view(), Some("type"), false).unwrap_err(),
            AnalyticsError::UnknownColumn("type".to_string())
        );
    }

    #[test]
    fn test_missing_year_column() {
        let frame = parse_csv(b"a,b\n1,2\n").unwrap();
        assert!(matches!(
            scatter(&frame, None, false),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }
}
