//! Geometry toolkit for building geologic cross-section displays.
//!
//! The library turns map-view datasets (cross-section traces, well points,
//! geology polygons, raster surfaces) into section-view feature classes:
//! reference grids, attached well data, polygon intersections, surface
//! profiles and vertical marker lines. Datasets live in a directory
//! container of GeoJSON files; section view measures distance along a
//! trace in feet, scaled down by the vertical exaggeration, against true
//! elevation in feet.

pub mod config;
pub mod container;
pub mod crs;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod markers;
pub mod polygons;
pub mod profile;
pub mod raster;
pub mod trace;
pub mod wells;

pub use error::{Error, Result};
