//! Reference catalog data model
//!
//! The map API publishes, per as-of date, a listing of every downloadable
//! file. This module types that listing: one [`ReferenceRow`] per file,
//! collected into an immutable [`ReferenceCatalog`]. The catalog is fetched
//! once per as-of date and never mutated; planning narrows a borrowed view
//! of it.

use std::path::Path;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Top-level grouping of a downloadable file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Summary,
    State,
    Provider,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::State => "State",
            Self::Provider => "Provider",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Summary" => Ok(Self::Summary),
            "State" => Ok(Self::State),
            "Provider" => Ok(Self::Provider),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service technology family a file reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechnologyType {
    #[serde(rename = "Fixed Broadband")]
    FixedBroadband,
    #[serde(rename = "Mobile Broadband")]
    MobileBroadband,
    #[serde(rename = "Mobile Voice")]
    MobileVoice,
}

impl TechnologyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedBroadband => "Fixed Broadband",
            Self::MobileBroadband => "Mobile Broadband",
            Self::MobileVoice => "Mobile Voice",
        }
    }

    /// Parse the label the API uses (exact, space-separated)
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Fixed Broadband" => Some(Self::FixedBroadband),
            "Mobile Broadband" => Some(Self::MobileBroadband),
            "Mobile Voice" => Some(Self::MobileVoice),
            _ => None,
        }
    }
}

impl std::fmt::Display for TechnologyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical format of a downloadable file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Gis,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Gis => "gis",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One downloadable file as described by the reference listing.
///
/// `provider_id` and `technology_code` look numeric in the JSON but must be
/// treated as strings: provider identifiers carry no arithmetic meaning and
/// a technology cell can hold several space- or comma-joined code tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub category: Category,
    pub subcategory: String,
    pub technology_type: TechnologyType,
    #[serde(deserialize_with = "string_from_any")]
    pub technology_code: String,
    #[serde(default, deserialize_with = "optional_string_from_any")]
    pub speed_tier: Option<String>,
    #[serde(deserialize_with = "string_from_any")]
    pub state_fips: String,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(deserialize_with = "string_from_any")]
    pub provider_id: String,
    pub file_type: FileType,
    #[serde(deserialize_with = "string_from_any")]
    pub file_id: String,
    pub file_name: String,
}

/// Immutable view of "what is downloadable as of a date".
///
/// Re-fetched per as-of date; never mutated in place.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    as_of_date: String,
    rows: Vec<ReferenceRow>,
}

impl ReferenceCatalog {
    pub fn new(as_of_date: impl Into<String>, rows: Vec<ReferenceRow>) -> Self {
        Self {
            as_of_date: as_of_date.into(),
            rows,
        }
    }

    /// Parse a catalog from the `data` array the listing endpoints return
    pub fn from_json_data(
        as_of_date: impl Into<String>,
        data: &serde_json::Value,
    ) -> serde_json::Result<Self> {
        let rows: Vec<ReferenceRow> = serde_json::from_value(data.clone())?;
        Ok(Self::new(as_of_date, rows))
    }

    pub fn as_of_date(&self) -> &str {
        &self.as_of_date
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Persist the listing to a CSV file, mirroring the reference dump the
    /// original tooling kept alongside its downloads
    pub fn save_csv(&self, path: &Path) -> csv::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "as_of_date",
            "category",
            "subcategory",
            "technology_type",
            "technology_code",
            "speed_tier",
            "state_fips",
            "state_name",
            "provider_id",
            "file_type",
            "file_id",
            "file_name",
        ])?;
        for row in &self.rows {
            writer.write_record([
                self.as_of_date.as_str(),
                row.category.as_str(),
                row.subcategory.as_str(),
                row.technology_type.as_str(),
                row.technology_code.as_str(),
                row.speed_tier.as_deref().unwrap_or(""),
                row.state_fips.as_str(),
                row.state_name.as_deref().unwrap_or(""),
                row.provider_id.as_str(),
                row.file_type.as_str(),
                row.file_id.as_str(),
                row.file_name.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// One downloadable challenge file. The challenge listing is a simpler
/// shape than the availability catalog: the category was already a request
/// parameter, so rows carry only state identity and the file token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRow {
    #[serde(deserialize_with = "string_from_any")]
    pub state_fips: String,
    #[serde(default)]
    pub state_name: String,
    #[serde(deserialize_with = "string_from_any")]
    pub file_id: String,
}

/// Immutable view of the challenge files downloadable for one as-of date
/// and category
#[derive(Debug, Clone)]
pub struct ChallengeCatalog {
    as_of_date: String,
    category: String,
    rows: Vec<ChallengeRow>,
}

impl ChallengeCatalog {
    pub fn new(
        as_of_date: impl Into<String>,
        category: impl Into<String>,
        rows: Vec<ChallengeRow>,
    ) -> Self {
        Self {
            as_of_date: as_of_date.into(),
            category: category.into(),
            rows,
        }
    }

    /// Parse a challenge catalog from the `data` array the listing returns
    pub fn from_json_data(
        as_of_date: impl Into<String>,
        category: impl Into<String>,
        data: &serde_json::Value,
    ) -> serde_json::Result<Self> {
        let rows: Vec<ChallengeRow> = serde_json::from_value(data.clone())?;
        Ok(Self::new(as_of_date, category, rows))
    }

    pub fn as_of_date(&self) -> &str {
        &self.as_of_date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn rows(&self) -> &[ChallengeRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Persist the listing to a CSV file
    pub fn save_csv(&self, path: &Path) -> csv::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["as_of_date", "category", "state_fips", "state_name", "file_id"])?;
        for row in &self.rows {
            writer.write_record([
                self.as_of_date.as_str(),
                self.category.as_str(),
                row.state_fips.as_str(),
                row.state_name.as_str(),
                row.file_id.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Normalize a date value from the API (ISO timestamp or plain date) into
/// the `YYYY-MM-DD` form used throughout the tool
pub fn normalize_as_of_date(raw: &str) -> Option<String> {
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date().format("%Y-%m-%d").to_string());
    }
    None
}

/// Accept a JSON string or number as a string field
fn string_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Accept a JSON string, number, or null as an optional string field
fn optional_string_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.is_empty() => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!(
            "expected string, number, or null, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_listing_with_numeric_provider_and_null_tier() {
        let data = json!([
            {
                "category": "Provider",
                "subcategory": "Hexagon Coverage",
                "technology_type": "Mobile Broadband",
                "technology_code": 300,
                "speed_tier": null,
                "state_fips": "06",
                "provider_id": 130077,
                "file_type": "gis",
                "file_id": 9912,
                "file_name": "CA_06"
            },
            {
                "category": "Provider",
                "subcategory": "Hexagon Coverage",
                "technology_type": "Mobile Broadband",
                "technology_code": 500,
                "speed_tier": "35/3",
                "state_fips": "06",
                "provider_id": "130077",
                "file_type": "gis",
                "file_id": "9913",
                "file_name": "CA_06_5G"
            }
        ]);

        let catalog = ReferenceCatalog::from_json_data("2024-06-30", &data).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = &catalog.rows()[0];
        assert_eq!(first.provider_id, "130077");
        assert_eq!(first.technology_code, "300");
        assert_eq!(first.speed_tier, None);
        assert_eq!(first.file_type, FileType::Gis);

        let second = &catalog.rows()[1];
        assert_eq!(second.speed_tier.as_deref(), Some("35/3"));
        assert_eq!(second.file_id, "9913");
    }

    #[test]
    fn leading_zero_fips_survives_round_trip() {
        let data = json!([{
            "category": "Provider",
            "subcategory": "Hexagon Coverage",
            "technology_type": "Fixed Broadband",
            "technology_code": "50",
            "speed_tier": null,
            "state_fips": "05",
            "provider_id": "1",
            "file_type": "csv",
            "file_id": "1",
            "file_name": "AR_05"
        }]);
        let catalog = ReferenceCatalog::from_json_data("2024-06-30", &data).unwrap();
        assert_eq!(catalog.rows()[0].state_fips, "05");
    }

    #[test]
    fn rejects_unknown_category() {
        let data = json!([{
            "category": "Planet",
            "subcategory": "x",
            "technology_type": "Fixed Broadband",
            "technology_code": "50",
            "state_fips": "01",
            "provider_id": "1",
            "file_type": "csv",
            "file_id": "1",
            "file_name": "f"
        }]);
        assert!(ReferenceCatalog::from_json_data("2024-06-30", &data).is_err());
    }

    #[test]
    fn parses_challenge_listing() {
        let data = json!([
            {"state_fips": "01", "state_name": "Alabama", "file_id": 7001},
            {"state_fips": "06", "state_name": "California", "file_id": "7002"}
        ]);
        let catalog = ChallengeCatalog::from_json_data(
            "2024-06-30",
            "Fixed Challenge - Resolved",
            &data,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.rows()[0].file_id, "7001");
        assert_eq!(catalog.category(), "Fixed Challenge - Resolved");
    }

    #[test]
    fn normalizes_dates_from_timestamps() {
        assert_eq!(
            normalize_as_of_date("2024-06-30T00:00:00.000+00:00").as_deref(),
            Some("2024-06-30")
        );
        assert_eq!(
            normalize_as_of_date("2024-06-30").as_deref(),
            Some("2024-06-30")
        );
        assert_eq!(normalize_as_of_date("June 2024"), None);
    }

    #[test]
    fn saves_catalog_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.csv");
        let catalog = ReferenceCatalog::new(
            "2024-06-30",
            vec![ReferenceRow {
                category: Category::Provider,
                subcategory: "Hexagon Coverage".to_string(),
                technology_type: TechnologyType::FixedBroadband,
                technology_code: "50".to_string(),
                speed_tier: None,
                state_fips: "06".to_string(),
                state_name: None,
                provider_id: "130077".to_string(),
                file_type: FileType::Csv,
                file_id: "17".to_string(),
                file_name: "CA_06".to_string(),
            }],
        );
        catalog.save_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("as_of_date,category"));
        assert!(contents.contains("130077"));
    }
}
