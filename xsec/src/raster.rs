//! Raster elevation surfaces and trace draping.
//!
//! Surfaces are regular grids read from ESRI ASCII grid (`.asc`) files with
//! values in feet. Draping samples a trace at the raster resolution and
//! splits the profile wherever the trace leaves the data (nodata gaps),
//! which is where multipart profiles come from.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::geometry::{Point3, Polyline3};
use crate::trace::Trace;

/// Regular elevation grid. Row 0 is the top (northernmost) row.
#[derive(Debug, Clone)]
pub struct Raster {
    name: String,
    ncols: usize,
    nrows: usize,
    xll: f64,
    yll: f64,
    cell: f64,
    nodata: Option<f64>,
    values: Vec<f64>,
}

impl Raster {
    /// Reads an ESRI ASCII grid file. The raster takes its name from the
    /// file stem.
    pub fn from_ascii_grid(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let parse_err = |message: String| Error::RasterParse {
            path: path.display().to_string(),
            message,
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "raster".to_string());
        let text = fs::read_to_string(path)?;
        let mut tokens = text.split_whitespace().peekable();

        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut cell = None;
        let mut nodata = None;
        while let Some(tok) = tokens.peek() {
            if tok.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                let key = tokens.next().unwrap_or_default().to_ascii_lowercase();
                let value = tokens
                    .next()
                    .ok_or_else(|| parse_err(format!("missing value for `{key}`")))?;
                match key.as_str() {
                    "ncols" => ncols = Some(parse_usize(value, &key, &parse_err)?),
                    "nrows" => nrows = Some(parse_usize(value, &key, &parse_err)?),
                    "xllcorner" => xll = Some(parse_f64(value, &key, &parse_err)?),
                    "yllcorner" => yll = Some(parse_f64(value, &key, &parse_err)?),
                    "cellsize" => cell = Some(parse_f64(value, &key, &parse_err)?),
                    "nodata_value" => nodata = Some(parse_f64(value, &key, &parse_err)?),
                    _ => return Err(parse_err(format!("unknown header keyword `{key}`"))),
                }
            } else {
                break;
            }
        }
        let ncols = ncols.ok_or_else(|| parse_err("missing `ncols`".to_string()))?;
        let nrows = nrows.ok_or_else(|| parse_err("missing `nrows`".to_string()))?;
        let xll = xll.ok_or_else(|| parse_err("missing `xllcorner`".to_string()))?;
        let yll = yll.ok_or_else(|| parse_err("missing `yllcorner`".to_string()))?;
        let cell = cell.ok_or_else(|| parse_err("missing `cellsize`".to_string()))?;

        let mut values = Vec::with_capacity(ncols * nrows);
        for tok in tokens {
            values.push(parse_f64(tok, "value", &parse_err)?);
        }
        if values.len() != ncols * nrows {
            return Err(parse_err(format!(
                "expected {} values, found {}",
                ncols * nrows,
                values.len()
            )));
        }
        Ok(Self {
            name,
            ncols,
            nrows,
            xll,
            yll,
            cell,
            nodata,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    fn cell_value(&self, row: usize, col: usize) -> Option<f64> {
        let v = self.values[row * self.ncols + col];
        match self.nodata {
            Some(nd) if (v - nd).abs() < 1e-9 => None,
            _ => Some(v),
        }
    }

    /// Bilinear sample of the surface. Returns `None` outside the grid
    /// extent and in nodata areas.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let width = self.ncols as f64 * self.cell;
        let height = self.nrows as f64 * self.cell;
        if x < self.xll || x > self.xll + width || y < self.yll || y > self.yll + height {
            return None;
        }
        // fractional position among cell centers, clamped at the margins
        let max_col = (self.ncols - 1) as f64;
        let max_row = (self.nrows - 1) as f64;
        let col_f = ((x - self.xll) / self.cell - 0.5).clamp(0.0, max_col);
        let row_f = (self.nrows as f64 - 0.5 - (y - self.yll) / self.cell).clamp(0.0, max_row);
        let c0 = (col_f.floor() as usize).min(self.ncols - 1);
        let r0 = (row_f.floor() as usize).min(self.nrows - 1);
        let c1 = (c0 + 1).min(self.ncols - 1);
        let r1 = (r0 + 1).min(self.nrows - 1);
        let tx = col_f - c0 as f64;
        let ty = row_f - r0 as f64;

        let v00 = self.cell_value(r0, c0)?;
        let v01 = self.cell_value(r0, c1)?;
        let v10 = self.cell_value(r1, c0)?;
        let v11 = self.cell_value(r1, c1)?;
        let top = v00 + tx * (v01 - v00);
        let bottom = v10 + tx * (v11 - v10);
        Some(top + ty * (bottom - top))
    }

    /// Drapes a trace on the surface, producing one 3D profile part per
    /// contiguous data run. Samples fall on the trace vertices and at the
    /// raster resolution along each segment.
    pub fn drape(&self, trace: &Trace) -> Vec<Polyline3> {
        let len = trace.length();
        let mut stations = trace.vertex_stations();
        let mut s = self.cell;
        while s < len {
            stations.push(s);
            s += self.cell;
        }
        stations.sort_by(|a, b| a.total_cmp(b));
        stations.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        let mut parts: Vec<Polyline3> = Vec::new();
        let mut current: Vec<Point3> = Vec::new();
        for station in stations {
            let Some(p) = trace.point_at(station) else {
                continue;
            };
            match self.value_at(p.x, p.y) {
                Some(z) => current.push(Point3::new(p.x, p.y, z)),
                None => {
                    if current.len() >= 2 {
                        parts.push(Polyline3::new(std::mem::take(&mut current)));
                    } else {
                        current.clear();
                    }
                }
            }
        }
        if current.len() >= 2 {
            parts.push(Polyline3::new(current));
        }
        parts
    }
}

fn parse_usize(
    value: &str,
    key: &str,
    err: &impl Fn(String) -> Error,
) -> Result<usize> {
    value
        .parse()
        .map_err(|_| err(format!("invalid {key}: `{value}`")))
}

fn parse_f64(value: &str, key: &str, err: &impl Fn(String) -> Error) -> Result<f64> {
    value
        .parse()
        .map_err(|_| err(format!("invalid {key}: `{value}`")))
}
