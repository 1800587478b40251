//! `.trc` position trajectory reader.
//!
//! Layout: five header lines, then tab-separated rows. Header line 2 holds
//! `<rate> <camera rate> <frame count> ...`, header line 3 the marker names.
//! Each marker owns three columns (x, y, and an unused third) after the
//! frame and time columns.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::{is_valid_sample, parse_cell, Frame, FramePoint, ParseError};

const HEADER_VALUES_LINE: usize = 2;
const MARKER_NAMES_LINE: usize = 3;
const DATA_START_LINE: usize = 5;
const RESERVED_COLUMNS: [&str; 2] = ["Frame#", "Time"];

#[derive(Debug, Clone, Serialize)]
pub struct MarkerSeries {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl MarkerSeries {
    pub fn len(&self) -> usize { self.x.len().min(self.y.len()) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Position at `frame`, or `None` when out of range or not detected.
    pub fn position(&self, frame: Frame) -> Option<FramePoint> {
        let (x, y) = (*self.x.get(frame)?, *self.y.get(frame)?);
        is_valid_sample(x, y).then_some(FramePoint::new(x, y))
    }

    /// Like [`position`](Self::position) but with `frame` clamped to the last sample.
    pub fn position_clamped(&self, frame: Frame) -> Option<FramePoint> {
        if self.is_empty() { return None; }
        self.position(frame.min(self.len() - 1))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerTable {
    pub data_rate: f64,
    pub frame_count: usize,
    pub marker_list: Vec<String>,
    pub time: Vec<f64>,
    markers: HashMap<String, MarkerSeries>,
}

impl MarkerTable {
    pub fn marker(&self, name: &str) -> Option<&MarkerSeries> { self.markers.get(name) }

    /// Markers in file order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerSeries> + '_ {
        self.marker_list.iter().filter_map(|n| self.markers.get(n))
    }

    pub fn rows(&self) -> usize { self.time.len() }

    /// Seconds between consecutive samples.
    pub fn sample_interval(&self) -> f64 { 1.0 / self.data_rate }

    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), markers = table.marker_list.len(), rows = table.rows(), "loaded trc");
        Ok(table)
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let lines: Vec<&str> = text.lines().collect();

        let header = lines.get(HEADER_VALUES_LINE).ok_or(ParseError::MissingHeader(HEADER_VALUES_LINE))?;
        let values: Vec<&str> = header.split_whitespace().collect();
        let bad = |value: Option<&&str>| ParseError::BadHeaderValue {
            line: HEADER_VALUES_LINE,
            value: value.map(|v| v.to_string()).unwrap_or_default(),
        };
        let data_rate: f64 = values.first().and_then(|v| v.parse().ok()).ok_or_else(|| bad(values.first()))?;
        let frame_count: usize = values.get(2).and_then(|v| v.parse().ok()).ok_or_else(|| bad(values.get(2)))?;
        if !(data_rate.is_finite() && data_rate > 0.0) {
            return Err(bad(values.first()));
        }

        let names_line = lines.get(MARKER_NAMES_LINE).ok_or(ParseError::MissingHeader(MARKER_NAMES_LINE))?;
        let marker_list: Vec<String> = names_line
            .split('\t')
            .map(str::trim)
            .filter(|n| !n.is_empty() && !RESERVED_COLUMNS.contains(n))
            .map(str::to_string)
            .collect();

        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut width = 0usize;
        for (offset, line) in lines.iter().skip(DATA_START_LINE).enumerate() {
            if line.trim().is_empty() { continue; }
            let line_no = DATA_START_LINE + offset;
            let row = line
                .split('\t')
                .enumerate()
                .map(|(col, cell)| parse_cell(cell, line_no, col))
                .collect::<Result<Vec<_>, _>>()?;
            width = width.max(row.len());
            rows.push(row);
        }

        let column = |idx: usize| -> Vec<f64> {
            rows.iter().map(|r| r.get(idx).copied().unwrap_or(f64::NAN)).collect()
        };

        let mut markers = HashMap::with_capacity(marker_list.len());
        for (i, name) in marker_list.iter().enumerate() {
            let x_col = 2 + 3 * i;
            let y_col = x_col + 1;
            if y_col >= width {
                return Err(ParseError::MissingColumn { name: name.clone(), column: y_col });
            }
            markers.insert(name.clone(), MarkerSeries { name: name.clone(), x: column(x_col), y: column(y_col) });
        }
        if width < 2 && !rows.is_empty() {
            return Err(ParseError::MissingColumn { name: "Time".into(), column: 1 });
        }

        Ok(Self { data_rate, frame_count, marker_list, time: column(1), markers })
    }
}
