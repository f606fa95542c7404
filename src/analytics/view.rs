//! 视图构建：列映射、数值转换、内容类型过滤

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{AnalyticsError, CONTENT_TYPE, DURATION, DURATION_NUM, RELEASE_YEAR, RELEASE_YEAR_NUM};
use crate::frame::{Column, Frame};

static FIRST_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("valid regex"));

/// 内容类型过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentFilter {
    #[default]
    #[serde(rename = "Todos")]
    All,
    #[serde(rename = "Movie")]
    Movie,
    #[serde(rename = "TV Show")]
    TvShow,
}

impl ContentFilter {
    /// `type` 列中对应的取值，`All` 没有
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ContentFilter::All => None,
            ContentFilter::Movie => Some("Movie"),
            ContentFilter::TvShow => Some("TV Show"),
        }
    }
}

impl FromStr for ContentFilter {
    type Err = AnalyticsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "Todos" | "All" | "all" => Ok(ContentFilter::All),
            "Movie" => Ok(ContentFilter::Movie),
            "TV Show" => Ok(ContentFilter::TvShow),
            other => Err(AnalyticsError::InvalidFilter(other.to_string())),
        }
    }
}

/// 列映射：把用户数据中的列对齐到规范列名
///
/// `None` 表示不做映射；规范列本身存在时依然会被使用。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub release_col: Option<String>,
    pub duration_col: Option<String>,
    pub type_col: Option<String>,
}

impl ColumnMapping {
    /// 规范列存在时的默认映射
    pub fn defaults_for(frame: &Frame) -> Self {
        let pick = |name: &str| frame.has_column(name).then(|| name.to_string());
        Self {
            release_col: pick(RELEASE_YEAR),
            duration_col: pick(DURATION),
            type_col: pick(CONTENT_TYPE),
        }
    }

    /// 空字符串视为未选择
    pub fn normalized(self) -> Self {
        let clean = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            release_col: clean(self.release_col),
            duration_col: clean(self.duration_col),
            type_col: clean(self.type_col),
        }
    }

    /// 复制映射列到规范列名，返回新表
    pub fn apply(&self, frame: &Frame) -> Result<Frame, AnalyticsError> {
        let mut out = frame.clone();
        for (source, canonical) in [
            (&self.release_col, RELEASE_YEAR),
            (&self.duration_col, DURATION),
            (&self.type_col, CONTENT_TYPE),
        ] {
            let Some(source) = source else { continue };
            let column = frame
                .column(source)
                .ok_or_else(|| AnalyticsError::UnknownColumn(source.clone()))?;
            if source != canonical {
                let mut aliased = column.clone();
                aliased.name = canonical.to_string();
                out.set_column(aliased)
                    .map_err(|_| AnalyticsError::UnknownColumn(source.clone()))?;
            }
        }
        Ok(out)
    }
}

/// 派生 `release_year_num` 与 `duration_num`
///
/// `duration` 取字符串形式中的第一段数字：电影为分钟，剧集为季数。
pub fn coerce_numeric_columns(frame: &Frame) -> Frame {
    let mut out = frame.clone();

    if let Some(release) = frame.column(RELEASE_YEAR) {
        let values = release.to_numeric();
        // 长度与原表一致，不会失败
        let _ = out.set_column(Column::numeric(RELEASE_YEAR_NUM, values));
    }

    if let Some(duration) = frame.column(DURATION) {
        let values = (0..duration.len())
            .map(|row| leading_number(&duration.display(row)))
            .collect();
        let _ = out.set_column(Column::numeric(DURATION_NUM, values));
    }

    out
}

fn leading_number(value: &str) -> Option<f64> {
    FIRST_DIGITS
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// 按内容类型过滤，缺少 `type` 列时原样返回
pub fn apply_filter(frame: &Frame, filter: ContentFilter) -> Frame {
    let (Some(label), Some(column)) = (filter.label(), frame.column(CONTENT_TYPE)) else {
        return frame.clone();
    };
    let mask: Vec<bool> = (0..frame.len()).map(|row| column.text_equals(row, label)).collect();
    frame.filter_rows(&mask)
}

/// 映射 → 转换 → 过滤
pub fn prepare_view(
    frame: &Frame,
    mapping: &ColumnMapping,
    filter: ContentFilter,
) -> Result<Frame, AnalyticsError> {
    let mapped = mapping.apply(frame)?;
    let coerced = coerce_numeric_columns(&mapped);
    Ok(apply_filter(&coerced, filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::parse_csv;

    fn sample() -> Frame {
        parse_csv(
            b"show_id,type,release_year,duration,year_alt\n\
s1,Movie,2020,90 min,1999\n\
s2,TV Show,2021,2 Seasons,2000\n\
s3,Movie,unknown,,2001\n\
s4,Movie,2019,125 min,2002\n",
        )
        .unwrap()
    }

    #[test]
    fn test_content_filter_parsing() {
        assert_eq!("Todos".parse::<ContentFilter>().unwrap(), ContentFilter::All);
        assert_eq!("TV Show".parse::<ContentFilter>().unwrap(), ContentFilter::TvShow);
        assert_eq!(
            "Documentary".parse::<ContentFilter>(),
            Err(AnalyticsError::InvalidFilter("Documentary".to_string()))
        );
    }

    #[test]
    fn test_coerce_numeric_columns() {
        let frame = coerce_numeric_columns(&sample());
        let years = frame.column(RELEASE_YEAR_NUM).unwrap().as_numeric().unwrap();
        assert_eq!(years, &[Some(2020.0), Some(2021.0), None, Some(2019.0)]);

        let durations = frame.column(DURATION_NUM).unwrap().as_numeric().unwrap();
        assert_eq!(durations, &[Some(90.0), Some(2.0), None, Some(125.0)]);

        let names = frame.column_names();
        assert_eq!(&names[names.len() - 2..], &["release_year_num", "duration_num"]);
    }

    #[test]
    fn test_coerce_without_source_columns() {
        let frame = parse_csv(b"a,b\n1,2\n").unwrap();
        let coerced = coerce_numeric_columns(&frame);
        assert_eq!(coerced.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_mapping_overwrites_canonical_column() {
        let mapping = ColumnMapping {
            release_col: Some("year_alt".to_string()),
            ..ColumnMapping::default()
        };
        let view = prepare_view(&sample(), &mapping, ContentFilter::All).unwrap();
        let years = view.column(RELEASE_YEAR_NUM).unwrap().as_numeric().unwrap();
        assert_eq!(years, &[Some(1999.0), Some(2000.0), Some(2001.0), Some(2002.0)]);
    }

    #[test]
    fn test_mapping_unknown_column() {
        let mapping = ColumnMapping {
            type_col: Some("kind".to_string()),
            ..ColumnMapping::default()
        };
        assert_eq!(
            mapping.apply(&sample()),
            Err(AnalyticsError::UnknownColumn("kind".to_string()))
        );
    }

    #[test]
    fn test_mapping_defaults_and_normalization() {
        let defaults = ColumnMapping::defaults_for(&sample());
        assert_eq!(defaults.release_col.as_deref(), Some("release_year"));
        assert_eq!(defaults.type_col.as_deref(), Some("type"));

        let mapping = ColumnMapping {
            release_col: Some("".to_string()),
            ..ColumnMapping::default()
        }
        .normalized();
        assert!(mapping.release_col.is_none());
    }

    #[test]
    fn test_filter_by_type() {
        let movies = prepare_view(&sample(), &ColumnMapping::default(), ContentFilter::Movie).unwrap();
        assert_eq!(movies.len(), 3);

        let shows = prepare_view(&sample(), &ColumnMapping::default(), ContentFilter::TvShow).unwrap();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows.column("show_id").unwrap().display(0), "s2");
    }

    #[test]
    fn test_filter_without_type_column_is_noop() {
        let frame = parse_csv(b"release_year\n2020\n2021\n").unwrap();
        let view = prepare_view(&frame, &ColumnMapping::default(), ContentFilter::Movie).unwrap();
        assert_eq!(view.len(), 2);
    }
}
