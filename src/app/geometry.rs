//! GIS collaborator interfaces and coverage payload decoding
//!
//! Geometry resolution (hexagon cell to boundary) and GIS layer writing
//! are external collaborators behind traits; the core owns only the pieces
//! with real design in them: the coordinate-pair flip the downstream geo
//! tooling requires, and decoding the zipped CSV payload a coverage
//! download contains into per-cell records.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{api, payload};
use crate::errors::{ConvertError, ConvertResult};

/// Output format for converted GIS layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GisFormat {
    Shp,
    Gpkg,
}

impl GisFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shp => "shp",
            Self::Gpkg => "gpkg",
        }
    }

    /// File extension for layers written in this format
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Path code the download endpoint expects for this format
    pub fn download_code(&self) -> &'static str {
        match self {
            Self::Shp => api::GIS_CODE_SHP,
            Self::Gpkg => api::GIS_CODE_GPKG,
        }
    }
}

impl std::str::FromStr for GisFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shp" => Ok(Self::Shp),
            "gpkg" => Ok(Self::Gpkg),
            other => Err(format!("unknown GIS format '{other}', expected shp or gpkg")),
        }
    }
}

impl std::fmt::Display for GisFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed polygon in lon-first vertex order (x = longitude, y = latitude)
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<(f64, f64)>,
}

impl Polygon {
    /// Build from boundary vertices as the upstream hex index library
    /// returns them: latitude first. Downstream geo tooling expects
    /// lon-first pairs, so each pair is flipped here.
    pub fn from_lat_lng_boundary(boundary: &[(f64, f64)]) -> Self {
        Self {
            vertices: boundary.iter().map(|&(lat, lng)| (lng, lat)).collect(),
        }
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }
}

/// Resolves a hexagonal-grid cell token to its boundary vertices
/// (latitude first, as the upstream index library reports them)
pub trait CellGeometry {
    fn cell_boundary(&self, token: &str) -> Result<Vec<(f64, f64)>, String>;
}

/// One decoded coverage record: the raw CSV fields plus its cell token
#[derive(Debug, Clone)]
pub struct HexRecord {
    pub cell_token: String,
    pub fields: csv::StringRecord,
}

/// A coverage record paired with its resolved polygon, ready for a layer
/// writer
#[derive(Debug, Clone)]
pub struct GeoRecord {
    pub record: HexRecord,
    pub geometry: Polygon,
}

/// Persists rows-with-geometry as a GIS layer in the requested format
pub trait LayerWriter {
    fn write_layer(
        &self,
        headers: &csv::StringRecord,
        records: &[GeoRecord],
        format: GisFormat,
        output_path: &Path,
    ) -> Result<(), String>;
}

/// Decoded tabular payload of a coverage download
#[derive(Debug, Clone)]
pub struct CoverageTable {
    pub headers: csv::StringRecord,
    pub records: Vec<HexRecord>,
}

/// Decode the zipped CSV payload of a downloaded coverage archive.
///
/// The archive holds a single CSV whose [`payload::HEX_CELL_COLUMN`] column
/// carries the resolution-8 cell identifier for each row.
pub fn decode_coverage_archive(path: &Path) -> ConvertResult<CoverageTable> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| ConvertError::Archive {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entry = archive.by_index(0).map_err(|source| ConvertError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    let mut contents = String::new();
    entry.read_to_string(&mut contents)?;

    decode_coverage_csv(&contents, path)
}

fn decode_coverage_csv(contents: &str, path: &Path) -> ConvertResult<CoverageTable> {
    let mut reader = csv::Reader::from_reader(contents.as_bytes());
    let headers = reader
        .headers()
        .map_err(|source| ConvertError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let cell_index = headers
        .iter()
        .position(|h| h == payload::HEX_CELL_COLUMN)
        .ok_or(ConvertError::MissingCellColumn {
            column: payload::HEX_CELL_COLUMN,
            path: path.to_path_buf(),
        })?;

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| ConvertError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let cell_token = record
            .get(cell_index)
            .unwrap_or_default()
            .trim()
            .to_string();
        records.push(HexRecord {
            cell_token,
            fields: record,
        });
    }

    Ok(CoverageTable { headers, records })
}

/// Resolve each record's cell token into a lon-first polygon via the
/// geometry collaborator
pub fn polygonize(
    table: &CoverageTable,
    geometry: &dyn CellGeometry,
) -> ConvertResult<Vec<GeoRecord>> {
    let mut out = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let boundary =
            geometry
                .cell_boundary(&record.cell_token)
                .map_err(|reason| ConvertError::Geometry {
                    token: record.cell_token.clone(),
                    reason,
                })?;
        out.push(GeoRecord {
            record: record.clone(),
            geometry: Polygon::from_lat_lng_boundary(&boundary),
        });
    }
    Ok(out)
}
