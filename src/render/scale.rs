//! 线性坐标映射与刻度

/// 把数据区间映射到像素区间
#[derive(Debug, Clone, Copy)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    /// 区间退化（min == max）时向两侧扩展 0.5，数量级很大时按 1e-6 相对宽度扩展
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let (mut lo, mut hi) = domain;
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        if (hi - lo).abs() < f64::EPSILON {
            let half = (lo.abs() * 1e-6).max(0.5);
            lo -= half;
            hi += half;
        }
        Self {
            domain: (lo, hi),
            range,
        }
    }

    /// 由数据计算范围并留出 5% 边距
    pub fn padded(values: impl IntoIterator<Item = f64>, range: (f64, f64)) -> Self {
        let (lo, hi) = extent(values).unwrap_or((0.0, 1.0));
        let pad = (hi - lo) * 0.05;
        Self::new((lo - pad, hi + pad), range)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    /// 落在区间内的刻度
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        nice_ticks(self.domain.0, self.domain.1, count)
    }
}

pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// 取 1、2、5 × 10ⁿ 的刻度步长
pub fn nice_step(span: f64, count: usize) -> f64 {
    let count = count.max(1) as f64;
    let raw = span / count;
    if raw <= 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let factor = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// 刻度数最多为 `2 * count + 1`；步长相对数值过小（加上步长后数值不变）时停止
pub fn nice_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let step = nice_step(hi - lo, count);
    let first = (lo / step).ceil() * step;
    if !first.is_finite() || !hi.is_finite() {
        return Vec::new();
    }

    let limit = count.max(1) * 2;
    let mut ticks: Vec<f64> = Vec::new();
    for i in 0..=limit {
        let value = first + i as f64 * step;
        if value > hi + step * 1e-9 {
            break;
        }
        // 消除浮点误差导致的 -0 和 0.30000000000000004
        let rounded = (value / step).round() * step;
        let rounded = if rounded == 0.0 { 0.0 } else { rounded };
        if ticks.last() == Some(&rounded) {
            break;
        }
        ticks.push(rounded);
        if value + step == value {
            break;
        }
    }
    ticks
}

/// 刻度标签：整数不带小数位
pub fn format_tick(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
