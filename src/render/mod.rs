//! 图表渲染
//!
//! 图表直接输出为 SVG 字符串，浏览器端以 `<img>` 或内联方式展示。

pub mod charts;
pub mod scale;

use std::fmt::Write;

pub use charts::{heatmap, line_chart, pairplot_grid, scatter_chart, ChartLabels};

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

const FONT_FAMILY: &str = "DejaVu Sans, Helvetica, Arial, sans-serif";

/// XML 文本转义
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 简单的 SVG 文档构建器
pub struct SvgDocument {
    width: f64,
    height: f64,
    body: String,
}

impl SvgDocument {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            body: String::new(),
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, stroke: Option<&str>) {
        let _ = write!(
            self.body,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}""#,
            x, y, w.max(0.0), h.max(0.0), fill
        );
        if let Some(stroke) = stroke {
            let _ = write!(self.body, r#" stroke="{}" stroke-width="0.5""#, stroke);
        }
        self.body.push_str("/>");
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64) {
        let _ = write!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{}"/>"#,
            x1, y1, x2, y2, stroke, width
        );
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, opacity: f64) {
        let _ = write!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" fill-opacity="{}"/>"#,
            cx, cy, r, fill, opacity
        );
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64) {
        if points.is_empty() {
            return;
        }
        let coords: Vec<String> = points.iter().map(|(x, y)| format!("{:.2},{:.2}", x, y)).collect();
        let _ = write!(
            self.body,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            coords.join(" "),
            stroke,
            width
        );
    }

    /// `anchor`: start / middle / end
    pub fn text(&mut self, x: f64, y: f64, content: &str, size: f64, anchor: &str) {
        let _ = write!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" font-size="{}" text-anchor="{}">{}</text>"#,
            x,
            y,
            size,
            anchor,
            escape(content)
        );
    }

    pub fn text_colored(&mut self, x: f64, y: f64, content: &str, size: f64, fill: &str) {
        let _ = write!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" font-size="{}" text-anchor="middle" dominant-baseline="middle" fill="{}">{}</text>"#,
            x,
            y,
            size,
            fill,
            escape(content)
        );
    }

    /// 逆时针旋转 90° 的文字（纵轴标题）
    pub fn vertical_text(&mut self, x: f64, y: f64, content: &str, size: f64) {
        let _ = write!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" font-size="{}" text-anchor="middle" transform="rotate(-90 {:.2} {:.2})">{}</text>"#,
            x,
            y,
            size,
            x,
            y,
            escape(content)
        );
    }

    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{font}"><rect width="100%" height="100%" fill="white"/>{body}</svg>"#,
            w = self.width,
            h = self.height,
            font = FONT_FAMILY,
            body = self.body
        )
    }
}
