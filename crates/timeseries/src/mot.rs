//! `.mot` joint-angle trajectory reader.
//!
//! Free-form header terminated by a line containing `endheader`, followed by
//! a tab-separated table whose first column is time and whose remaining
//! columns are angles in degrees, one per angle group.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::{parse_cell, ParseError};

const END_HEADER: &str = "endheader";

#[derive(Debug, Clone, Serialize)]
pub struct AngleSeries {
    pub name: String,
    pub angle: Vec<f64>,
}

impl AngleSeries {
    pub fn len(&self) -> usize { self.angle.len() }

    pub fn is_empty(&self) -> bool { self.angle.is_empty() }
}

#[derive(Debug, Clone, Serialize)]
pub struct AngleTable {
    pub angle_list: Vec<String>,
    pub time: Vec<f64>,
    series: Vec<AngleSeries>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AngleTable {
    pub fn angle(&self, name: &str) -> Option<&AngleSeries> {
        self.index.get(name).map(|&i| &self.series[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AngleSeries> + '_ { self.series.iter() }

    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), angles = table.angle_list.len(), rows = table.time.len(), "loaded mot");
        Ok(table)
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.iter().position(|l| l.contains(END_HEADER)).map(|i| i + 1).unwrap_or(0);

        let mut body = lines.iter().enumerate().skip(start).filter(|(_, l)| !l.trim().is_empty());
        let (_, header) = body.next().ok_or(ParseError::MissingHeader(start))?;
        let headers: Vec<String> = header.split('\t').map(|h| h.trim().to_string()).collect();
        if headers.len() < 2 {
            return Err(ParseError::MissingColumn { name: "angle".into(), column: 1 });
        }

        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
        for (line_no, line) in body {
            let cells: Vec<&str> = line.split('\t').collect();
            if cells.len() > headers.len() {
                return Err(ParseError::BadCell { line: line_no, column: headers.len(), value: cells[headers.len()].to_string() });
            }
            for (col, values) in columns.iter_mut().enumerate() {
                let value = match cells.get(col) {
                    Some(cell) => parse_cell(cell, line_no, col)?,
                    None => f64::NAN,
                };
                values.push(value);
            }
        }

        let mut columns = columns.into_iter();
        let time = columns.next().unwrap_or_default();
        let angle_list: Vec<String> = headers[1..].to_vec();
        let series: Vec<AngleSeries> = angle_list
            .iter()
            .zip(columns)
            .map(|(name, angle)| AngleSeries { name: name.clone(), angle })
            .collect();
        let index = angle_list.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();

        Ok(Self { angle_list, time, series, index })
    }
}
