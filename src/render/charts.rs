//! 具体图表：折线图、散点图、热力图、pairplot 网格

use super::scale::{format_tick, LinearScale};
use super::SvgDocument;
use crate::analytics::stats::{HistogramBin, LinearFit};

const LINE_COLOR: &str = "#1f77b4";
const REGRESSION_COLOR: &str = "#d62728";
const AXIS_COLOR: &str = "#333333";
const GRID_COLOR: &str = "#e5e5e5";
const TICK_COUNT: usize = 6;

/// 图表标题与坐标轴名称
#[derive(Debug, Clone, Default)]
pub struct ChartLabels {
    pub title: Option<String>,
    pub x: String,
    pub y: String,
}

/// 绘图区
#[derive(Debug, Clone, Copy)]
struct Plot {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Plot {
    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn x_scale(&self, values: impl IntoIterator<Item = f64>) -> LinearScale {
        LinearScale::padded(values, (self.left, self.right()))
    }

    fn y_scale(&self, values: impl IntoIterator<Item = f64>) -> LinearScale {
        LinearScale::padded(values, (self.bottom(), self.top))
    }
}

fn draw_axes(
    doc: &mut SvgDocument,
    plot: Plot,
    x: &LinearScale,
    y: &LinearScale,
    labels: &ChartLabels,
    font_size: f64,
) {
    for tick in y.ticks(TICK_COUNT) {
        let py = y.map(tick);
        doc.line(plot.left, py, plot.right(), py, GRID_COLOR, 1.0);
        doc.text(plot.left - 6.0, py + font_size / 3.0, &format_tick(tick), font_size, "end");
    }
    for tick in x.ticks(TICK_COUNT) {
        let px = x.map(tick);
        doc.line(px, plot.bottom(), px, plot.bottom() + 4.0, AXIS_COLOR, 1.0);
        doc.text(px, plot.bottom() + 6.0 + font_size, &format_tick(tick), font_size, "middle");
    }

    doc.line(plot.left, plot.bottom(), plot.right(), plot.bottom(), AXIS_COLOR, 1.0);
    doc.line(plot.left, plot.top, plot.left, plot.bottom(), AXIS_COLOR, 1.0);

    if !labels.x.is_empty() {
        doc.text(
            plot.left + plot.width / 2.0,
            plot.bottom() + 2.0 * font_size + 16.0,
            &labels.x,
            font_size + 1.0,
            "middle",
        );
    }
    if !labels.y.is_empty() {
        doc.vertical_text(plot.left - 48.0, plot.top + plot.height / 2.0, &labels.y, font_size + 1.0);
    }
    if let Some(title) = &labels.title {
        doc.text(plot.left + plot.width / 2.0, plot.top - 14.0, title, font_size + 3.0, "middle");
    }
}

/// 折线图，点按 x 顺序连接
pub fn line_chart(points: &[(f64, f64)], labels: &ChartLabels) -> String {
    let (width, height) = (1000.0, 400.0);
    let plot = Plot {
        left: 80.0,
        top: 40.0,
        width: width - 110.0,
        height: height - 100.0,
    };

    let mut doc = SvgDocument::new(width, height);
    let x = plot.x_scale(points.iter().map(|p| p.0));
    let y = plot.y_scale(points.iter().map(|p| p.1).chain(std::iter::once(0.0)));
    draw_axes(&mut doc, plot, &x, &y, labels, 11.0);

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mapped: Vec<(f64, f64)> = sorted.iter().map(|(px, py)| (x.map(*px), y.map(*py))).collect();
    doc.polyline(&mapped, LINE_COLOR, 2.0);

    doc.finish()
}

/// 散点图，可叠加回归线
pub fn scatter_chart(
    points: &[(f64, f64)],
    regression: Option<&LinearFit>,
    labels: &ChartLabels,
) -> String {
    let (width, height) = (1000.0, 400.0);
    let plot = Plot {
        left: 80.0,
        top: 40.0,
        width: width - 110.0,
        height: height - 100.0,
    };

    let mut doc = SvgDocument::new(width, height);
    let x = plot.x_scale(points.iter().map(|p| p.0));
    let y = plot.y_scale(points.iter().map(|p| p.1));
    draw_axes(&mut doc, plot, &x, &y, labels, 11.0);

    for (px, py) in points {
        doc.circle(x.map(*px), y.map(*py), 3.0, LINE_COLOR, 0.6);
    }

    if let Some(fit) = regression {
        let (x0, x1) = x.domain();
        doc.line(
            x.map(x0),
            y.map(fit.predict(x0)).clamp(plot.top, plot.bottom()),
            x.map(x1),
            y.map(fit.predict(x1)).clamp(plot.top, plot.bottom()),
            REGRESSION_COLOR,
            2.0,
        );
    }

    doc.finish()
}

/// 发散配色：-1 蓝、0 灰白、1 红
pub fn diverging_color(value: f64) -> String {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 { (MID, COLD, -v) } else { (MID, WARM, v) };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// 带数值标注的热力图
pub fn heatmap(columns: &[String], values: &[Vec<Option<f64>>], title: Option<&str>) -> String {
    let n = columns.len().max(1) as f64;
    let cell = (480.0 / n).clamp(40.0, 120.0);
    let left = 170.0;
    let top = 50.0;
    let width = left + cell * n + 110.0;
    let height = top + cell * n + 150.0;

    let mut doc = SvgDocument::new(width, height);
    if let Some(title) = title {
        doc.text(left + cell * n / 2.0, 28.0, title, 14.0, "middle");
    }

    for (i, row) in values.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let x = left + cell * j as f64;
            let y = top + cell * i as f64;
            match value {
                Some(v) => {
                    doc.rect(x, y, cell, cell, &diverging_color(*v), Some("white"));
                    let ink = if v.abs() > 0.6 { "white" } else { "black" };
                    doc.text_colored(x + cell / 2.0, y + cell / 2.0, &format!("{:.2}", v), 11.0, ink);
                }
                None => doc.rect(x, y, cell, cell, "white", Some(GRID_COLOR)),
            }
        }
    }

    for (i, name) in columns.iter().enumerate() {
        let center = cell * i as f64 + cell / 2.0;
        doc.text(left - 8.0, top + center + 4.0, name, 11.0, "end");
        doc.vertical_text(left + center, top + cell * n + 60.0, name, 11.0);
    }

    // 色标
    let bar_x = left + cell * n + 30.0;
    let steps = 20;
    let bar_height = cell * n;
    for s in 0..steps {
        let value = 1.0 - 2.0 * (s as f64 + 0.5) / steps as f64;
        let y = top + bar_height * s as f64 / steps as f64;
        doc.rect(bar_x, y, 16.0, bar_height / steps as f64 + 0.5, &diverging_color(value), None);
    }
    doc.text(bar_x + 22.0, top + 8.0, "1.0", 10.0, "start");
    doc.text(bar_x + 22.0, top + bar_height / 2.0 + 4.0, "0.0", 10.0, "start");
    doc.text(bar_x + 22.0, top + bar_height, "-1.0", 10.0, "start");

    doc.finish()
}

/// Pairplot 网格：对角线为直方图，其余为散点
pub fn pairplot_grid(columns: &[String], values: &[Vec<f64>], histograms: &[Vec<HistogramBin>]) -> String {
    let n = columns.len();
    let cell = 180.0;
    let gap = 16.0;
    let left = 70.0;
    let top = 20.0;
    let size = left + (cell + gap) * n as f64 + 10.0;
    let height = top + (cell + gap) * n as f64 + 50.0;

    let mut doc = SvgDocument::new(size, height);
    let scales: Vec<(f64, f64)> = values
        .iter()
        .map(|v| {
            let s = LinearScale::padded(v.iter().copied(), (0.0, 1.0));
            s.domain()
        })
        .collect();

    for row in 0..n {
        for col in 0..n {
            let plot = Plot {
                left: left + (cell + gap) * col as f64,
                top: top + (cell + gap) * row as f64,
                width: cell,
                height: cell,
            };
            doc.rect(plot.left, plot.top, plot.width, plot.height, "none", Some(AXIS_COLOR));

            let x = LinearScale::new(scales[col], (plot.left, plot.right()));
            if row == col {
                let bins = &histograms[col];
                let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
                let y = LinearScale::new((0.0, max_count.max(1.0) * 1.05), (plot.bottom(), plot.top));
                for bin in bins {
                    let x0 = x.map(bin.start);
                    let x1 = x.map(bin.end);
                    let y0 = y.map(bin.count as f64);
                    doc.rect(x0, y0, (x1 - x0 - 1.0).max(1.0), plot.bottom() - y0, LINE_COLOR, None);
                }
            } else {
                let y = LinearScale::new(scales[row], (plot.bottom(), plot.top));
                for (vx, vy) in values[col].iter().zip(&values[row]) {
                    doc.circle(x.map(*vx), y.map(*vy), 1.8, LINE_COLOR, 0.5);
                }
            }

            if row == n - 1 {
                doc.text(plot.left + cell / 2.0, plot.bottom() + 30.0, &columns[col], 11.0, "middle");
                for tick in x.ticks(3) {
                    doc.text(x.map(tick), plot.bottom() + 13.0, &format_tick(tick), 9.0, "middle");
                }
            }
            if col == 0 {
                doc.vertical_text(plot.left - 50.0, plot.top + cell / 2.0, &columns[row], 11.0);
                if row != col {
                    let y = LinearScale::new(scales[row], (plot.bottom(), plot.top));
                    for tick in y.ticks(3) {
                        doc.text(plot.left - 4.0, y.map(tick) + 3.0, &format_tick(tick), 9.0, "end");
                    }
                }
            }
        }
    }

    doc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::stats::histogram;

    fn labels() -> ChartLabels {
        ChartLabels {
            title: Some("Titles per release year".to_string()),
            x: "Year".to_string(),
            y: "Count".to_string(),
        }
    }

    #[test]
    fn test_line_chart_draws_polyline() {
        let svg = line_chart(&[(2019.0, 10.0), (2018.0, 5.0), (2020.0, 7.0)], &labels());
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("Titles per release year"));
        assert!(svg.contains(">2020<"));
    }

    #[test]
    fn test_scatter_chart_with_regression() {
        let points = [(2000.0, 100.0), (2010.0, 120.0), (2020.0, 140.0)];
        let fit = LinearFit {
            slope: 2.0,
            intercept: -3900.0,
        };
        let svg = scatter_chart(&points, Some(&fit), &labels());
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains(REGRESSION_COLOR));

        let plain = scatter_chart(&points, None, &labels());
        assert!(!plain.contains(REGRESSION_COLOR));
    }

    #[test]
    fn test_diverging_color_endpoints() {
        assert_eq!(diverging_color(-1.0), "#3b4cc0");
        assert_eq!(diverging_color(0.0), "#dddddd");
        assert_eq!(diverging_color(1.0), "#b40426");
        assert_eq!(diverging_color(7.0), "#b40426");
    }

    #[test]
    fn test_heatmap_annotations() {
        let columns = vec!["release_year".to_string(), "duration_num".to_string()];
        let values = vec![vec![Some(1.0), Some(-0.25)], vec![Some(-0.25), None]];
        let svg = heatmap(&columns, &values, Some("Correlation matrix"));
        assert!(svg.contains(">1.00<"));
        assert_eq!(svg.matches(">-0.25<").count(), 2);
        assert!(svg.contains("duration_num"));
    }

    #[test]
    fn test_pairplot_grid_layout() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let values = vec![vec![1.0, 2.0, 3.0], vec![3.0, 1.0, 2.0]];
        let histograms: Vec<_> = values.iter().map(|v| histogram(v)).collect();
        let svg = pairplot_grid(&columns, &values, &histograms);
        // 两个散点子图各 3 个点
        assert_eq!(svg.matches("<circle").count(), 6);
    }
}
