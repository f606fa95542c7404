//! 列式数据表
//!
//! `Frame` 是仪表盘所有计算的输入：每列要么是数值列（`Option<f64>`），
//! 要么是文本列（`Option<String>`）。列类型在加载时推断，规则如下：
//! - 缺失标记（空串、`NA`、`NaN`、`null` 等）精确匹配时记为缺失（不去除首尾空白）
//! - 所有非缺失单元格均可解析为浮点数时为数值列（全缺失的列同样视为数值列）
//! - 否则为文本列

pub mod reader;

use serde::Serialize;
use thiserror::Error;

pub use reader::parse_csv;

/// 视为缺失值的单元格内容
const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#NA",
];

/// 数据表错误
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("No columns to parse from file")]
    NoColumns,

    #[error("Expected {expected} fields in line {line}, saw {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Column '{name}' has {found} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid CSV: {0}")]
    Csv(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 列类型（对外展示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    /// 由原始字符串单元格构建列并推断类型
    pub fn infer(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        let cells: Vec<Option<String>> = cells
            .into_iter()
            .map(|cell| cell.filter(|value| !is_missing(value)))
            .collect();

        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(value) => parse_number(value).map(Some),
            })
            .collect();

        match parsed {
            Some(values) => Column::numeric(name, values),
            None => Column::text(name, cells),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    /// 强制转换为数值，无法解析的单元格记为缺失
    pub fn to_numeric(&self) -> Vec<Option<f64>> {
        match &self.data {
            ColumnData::Numeric(values) => values.clone(),
            ColumnData::Text(values) => values
                .iter()
                .map(|cell| cell.as_deref().and_then(parse_number))
                .collect(),
        }
    }

    /// 单元格的字符串形式，缺失值为 `nan`
    pub fn display(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(values) => match values.get(row).copied().flatten() {
                Some(value) => format_number(value),
                None => "nan".to_string(),
            },
            ColumnData::Text(values) => match values.get(row) {
                Some(Some(value)) => value.clone(),
                _ => "nan".to_string(),
            },
        }
    }

    /// 单元格的 JSON 值
    pub fn json_value(&self, row: usize) -> serde_json::Value {
        match &self.data {
            ColumnData::Numeric(values) => match values.get(row).copied().flatten() {
                Some(value) => serde_json::Number::from_f64(value)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
                None => serde_json::Value::Null,
            },
            ColumnData::Text(values) => match values.get(row) {
                Some(Some(value)) => serde_json::Value::String(value.clone()),
                _ => serde_json::Value::Null,
            },
        }
    }

    pub fn text_equals(&self, row: usize, expected: &str) -> bool {
        match &self.data {
            ColumnData::Text(values) => values.get(row).and_then(|v| v.as_deref()) == Some(expected),
            ColumnData::Numeric(_) => false,
        }
    }

    pub fn non_missing(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(values) => values.iter().filter(|v| v.is_some()).count(),
            ColumnData::Text(values) => values.iter().filter(|v| v.is_some()).count(),
        }
    }

    fn select(&self, indices: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(indices.iter().map(|&i| values[i]).collect())
            }
            ColumnData::Text(values) => {
                ColumnData::Text(indices.iter().map(|&i| values[i].clone()).collect())
            }
        };
        Column {
            name: self.name.clone(),
            data,
        }
    }
}

/// 列式数据表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    len: usize,
}

impl Frame {
    /// 由表头与行记录构建，处理重复/空白列名并推断列类型
    pub fn from_records(
        headers: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<Self, FrameError> {
        if headers.is_empty() {
            return Err(FrameError::NoColumns);
        }

        let names = dedupe_headers(headers);
        let width = names.len();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];

        for row in rows {
            let mut row = row.into_iter();
            for column in cells.iter_mut() {
                column.push(row.next().flatten());
            }
        }

        let len = cells.first().map(Vec::len).unwrap_or(0);
        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::infer(name, values))
            .collect();

        Ok(Self { columns, len })
    }

    /// 由已构建的列组装，所有列长度必须一致
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, FrameError> {
        let len = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != len) {
            return Err(FrameError::LengthMismatch {
                name: bad.name.clone(),
                expected: len,
                found: bad.len(),
            });
        }
        Ok(Self { columns, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// 数值列名称，保持列顺序
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// 同名列原位替换，否则追加到末尾
    pub fn set_column(&mut self, column: Column) -> Result<(), FrameError> {
        if !self.columns.is_empty() && column.len() != self.len {
            let found = column.len();
            return Err(FrameError::LengthMismatch {
                name: column.name,
                expected: self.len,
                found,
            });
        }
        if self.columns.is_empty() {
            self.len = column.len();
        }

        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// 按掩码保留行
    pub fn filter_rows(&self, mask: &[bool]) -> Frame {
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&indices)
    }

    /// 按行号选取行，行号必须在范围内
    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
            len: indices.len(),
        }
    }

    /// 前 `n` 行
    pub fn head(&self, n: usize) -> Frame {
        let indices: Vec<usize> = (0..self.len.min(n)).collect();
        self.take_rows(&indices)
    }
}

pub fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

/// 解析数值，允许首尾空白
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_missing(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for (index, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while names.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}
