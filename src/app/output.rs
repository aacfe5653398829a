//! On-disk output layout for downloaded and converted files
//!
//! Downloads land under one output root in format-specific directories
//! (`csv/`, `shp/`, `gpkg/`), which are created on demand. The layout is a
//! value passed explicitly to whoever writes files; nothing global.

use std::path::{Path, PathBuf};

use crate::app::geometry::GisFormat;
use crate::constants::output;

/// Resolved output directory layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at an explicit directory (the `data/output` level)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout under a base directory, appending the standard
    /// `data/output` suffix
    pub fn under_base(base: &Path) -> Self {
        Self {
            root: base.join(output::OUTPUT_ROOT),
        }
    }

    /// Default layout under the current working directory
    pub fn default_local() -> std::io::Result<Self> {
        Ok(Self::under_base(&std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn csv_dir(&self) -> PathBuf {
        self.root.join(output::CSV_DIR)
    }

    pub fn gis_dir(&self, format: GisFormat) -> PathBuf {
        match format {
            GisFormat::Shp => self.root.join(output::SHP_DIR),
            GisFormat::Gpkg => self.root.join(output::GPKG_DIR),
        }
    }

    /// Directory a download with the given GIS format lands in; plain
    /// CSV/ZIP payloads go to the csv directory
    pub fn download_dir(&self, gis_format: Option<GisFormat>) -> PathBuf {
        match gis_format {
            Some(format) => self.gis_dir(format),
            None => self.csv_dir(),
        }
    }

    /// Create every directory of the layout
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [
            self.csv_dir(),
            self.gis_dir(GisFormat::Shp),
            self.gis_dir(GisFormat::Gpkg),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_all_directories() {
        let base = tempfile::tempdir().unwrap();
        let layout = OutputLayout::under_base(base.path());
        layout.ensure().unwrap();
        assert!(layout.csv_dir().is_dir());
        assert!(layout.gis_dir(GisFormat::Shp).is_dir());
        assert!(layout.gis_dir(GisFormat::Gpkg).is_dir());
    }

    #[test]
    fn download_dir_routes_by_format() {
        let layout = OutputLayout::new("/tmp/out");
        assert!(layout.download_dir(None).ends_with("csv"));
        assert!(layout.download_dir(Some(GisFormat::Shp)).ends_with("shp"));
        assert!(layout.download_dir(Some(GisFormat::Gpkg)).ends_with("gpkg"));
    }
}
