//! Backend-agnostic figure description. Renderers live in the binaries.

use crate::{pipeline::AnalysisResult, signal::RRSeries};
use serde::{Deserialize, Serialize};

pub const SIGNAL_COLOR: u32 = 0x1F77B4;
pub const PEAK_COLOR: u32 = 0xD62728;
pub const RR_COLOR: u32 = 0xFF0077;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Isolated points drawn as filled circles of `style.width` pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// Data bounds over every series as `((x_min, x_max), (y_min, y_max))`.
    /// Degenerate ranges are widened so a renderer always has a non-empty span.
    pub fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for p in self.series.iter().flat_map(|s| s.points()) {
            x = (x.0.min(p[0]), x.1.max(p[0]));
            y = (y.0.min(p[1]), y.1.max(p[1]));
        }
        (widen(x), widen(y))
    }
}

fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        (0.0, 1.0)
    } else if hi - lo < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// Reduce `points` to at most `max_points`, keeping the minimum and maximum of
/// each bucket so narrow spikes such as R-peaks survive.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points < 2 {
        return points.to_vec();
    }
    let buckets = max_points / 2;
    let bucket_size = points.len() as f64 / buckets as f64;
    let mut result = Vec::with_capacity(buckets * 2);
    for i in 0..buckets {
        let start = (i as f64 * bucket_size).floor() as usize;
        let end = (((i + 1) as f64 * bucket_size).floor() as usize).min(points.len());
        let bucket = &points[start..end];
        let (Some(lo), Some(hi)) = (
            bucket.iter().min_by(|a, b| a[1].total_cmp(&b[1])),
            bucket.iter().max_by(|a, b| a[1].total_cmp(&b[1])),
        ) else {
            continue;
        };
        if lo[0] <= hi[0] {
            result.push(*lo);
            result.push(*hi);
        } else {
            result.push(*hi);
            result.push(*lo);
        }
    }
    result.dedup_by(|a, b| a == b);
    result
}

pub fn figure_from_rr(rr: &RRSeries) -> Figure {
    let mut fig = Figure::new(Some("RR intervals".into()));
    fig.x.label = Some("beat".into());
    fig.y.label = Some("RR (s)".into());
    let points: Vec<[f64; 2]> = rr
        .rr
        .iter()
        .enumerate()
        .map(|(i, value)| [i as f64, *value])
        .collect();
    fig.add_series(Series::Line(LineSeries {
        name: "RR".into(),
        points: decimate_points(&points, 1024),
        style: Style {
            width: 2.0,
            color: Color(RR_COLOR),
        },
    }));
    fig
}

/// Filtered lead against time with the detected R-peaks marked.
pub fn figure_from_analysis(result: &AnalysisResult, max_points: usize) -> Figure {
    let dt = 1.0 / result.sampling_rate.max(1) as f64;
    let points: Vec<[f64; 2]> = result
        .filtered
        .iter()
        .enumerate()
        .map(|(i, value)| [i as f64 * dt, *value])
        .collect();
    let peaks: Vec<[f64; 2]> = result
        .peaks
        .indices
        .iter()
        .filter_map(|&i| result.filtered.get(i).map(|v| [i as f64 * dt, *v]))
        .collect();

    let title = match result.metrics.heart_rate_bpm.value() {
        Some(hr) => format!("Filtered ECG ({hr:.0} bpm)"),
        None => "Filtered ECG".to_string(),
    };
    let mut fig = Figure::new(Some(title));
    fig.x.label = Some("time (s)".into());
    fig.y.label = Some("amplitude".into());
    fig.add_series(Series::Line(LineSeries {
        name: "filtered".into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.4,
            color: Color(SIGNAL_COLOR),
        },
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: "R-peaks".into(),
        points: peaks,
        style: Style {
            width: 4.0,
            color: Color(PEAK_COLOR),
        },
    }));
    fig
}
