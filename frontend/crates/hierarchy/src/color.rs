use crate::cell::CellKey;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t as f32,
        }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
pub const SCALE_LOW: Rgba = Rgba::rgb(0xf7, 0xfb, 0xff);
pub const SCALE_HIGH: Rgba = Rgba::rgb(0x9e, 0xca, 0xe1);

/// Linear scale from a metric domain onto the light-to-blue cell colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn color(&self, value: f64) -> Rgba {
        let span = self.max - self.min;
        // A degenerate domain maps everything to the middle of the range
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            (value - self.min) / span
        };
        SCALE_LOW.lerp(SCALE_HIGH, t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub swatches: [Rgba; 2],
    pub labels: [String; 2],
}

pub fn format_legend_value(value: f64) -> String {
    if value > 10.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

/// Graph metrics of every loaded cell, keyed by cell.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    values: BTreeMap<CellKey, BTreeMap<String, f64>>,
}

impl MetricRegistry {
    pub fn insert(&mut self, key: CellKey, metrics: BTreeMap<String, f64>) {
        self.values.insert(key, metrics);
    }

    pub fn remove(&mut self, key: CellKey) {
        self.values.remove(&key);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn metric_names(&self) -> BTreeSet<String> {
        self.values
            .values()
            .flat_map(|metrics| metrics.keys().cloned())
            .collect()
    }

    pub fn scale(&self, metric: &str) -> Option<ColorScale> {
        let mut values = self
            .values
            .values()
            .filter_map(|metrics| metrics.get(metric).copied());
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));
        Some(ColorScale { min, max })
    }

    /// White when no metric is selected or the cell has no value for it.
    pub fn color_for(&self, key: CellKey, metric: Option<&str>) -> Rgba {
        let Some(metric) = metric else {
            return WHITE;
        };
        match (self.scale(metric), self.values.get(&key).and_then(|m| m.get(metric))) {
            (Some(scale), Some(value)) => scale.color(*value),
            _ => WHITE,
        }
    }

    pub fn legend(&self, metric: Option<&str>) -> Option<Legend> {
        let scale = self.scale(metric?)?;
        Some(Legend {
            swatches: [SCALE_LOW, SCALE_HIGH],
            labels: [format_legend_value(scale.min), format_legend_value(scale.max)],
        })
    }
}
