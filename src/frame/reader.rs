//! CSV 解析

use super::{Frame, FrameError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 解析带表头的 CSV 内容
pub fn parse_csv(bytes: &[u8]) -> Result<Frame, FrameError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(FrameError::NoColumns);
    }

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FrameError::Csv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() {
        return Err(FrameError::NoColumns);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FrameError::Csv(e.to_string()))?;

        // 完全空白的行直接跳过
        if record.iter().all(|field| field.is_empty()) && record.len() <= 1 {
            continue;
        }

        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(FrameError::RaggedRow {
                line,
                expected: headers.len(),
                found: record.len(),
            });
        }

        rows.push(record.iter().map(|field| Some(field.to_string())).collect());
    }

    Frame::from_records(headers, rows)
}
