//! Filter planning: from a user request to an ordered download plan
//!
//! The planner is a pure function from a reference catalog and a
//! [`FilterRequest`] to an ordered sequence of [`SelectedFile`]s. It does
//! no I/O and never mutates the catalog. Each request kind narrows the
//! catalog through the same successive steps (base cut, state, technology,
//! provider), with kind-specific validation, the mobile speed-tier policy,
//! and kind-specific file naming. A request that narrows to zero rows is a
//! user-facing error carrying the applied filter expression, never an
//! empty success.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::catalog::{
    Category, ChallengeCatalog, ChallengeRow, FileType, ReferenceCatalog, ReferenceRow,
    TechnologyType,
};
use crate::app::geometry::GisFormat;
use crate::app::predicate::{Dimension, Field, Predicate};
use crate::constants::catalog::{
    CHALLENGE_CATEGORIES, FIVE_G_SPEED_TIERS, TECH_3G, TECH_5G, TECH_LTE, TECH_VOICE,
};
use crate::errors::{RequestError, RequestResult};

/// Remote data family a selected file belongs to; forms part of the
/// download endpoint path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Availability,
    Challenge,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Availability => "availability",
            Self::Challenge => "challenge",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subcategory label the fixed-coverage kind is pinned to
const FIXED_SUBCATEGORY: &str = "Location Coverage";

/// Subcategory labels the mobile kind accepts
const MOBILE_SUBCATEGORIES: [&str; 2] = ["Raw Coverage", "Hexagon Coverage"];

/// Fixed-coverage filter request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRequest {
    pub as_of_date: String,
    pub state_fips: Vec<String>,
    pub technology_codes: Vec<String>,
    pub provider_ids: Vec<String>,
}

/// Mobile-coverage filter request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileRequest {
    pub as_of_date: String,
    /// Must be "Mobile Broadband" or "Mobile Voice"
    pub technology_type: String,
    /// Must be "Raw Coverage" or "Hexagon Coverage"
    pub subcategory: String,
    pub state_fips: Vec<String>,
    pub technology_codes: Vec<String>,
    pub provider_ids: Vec<String>,
    /// 5G speed tiers, e.g. "35/3"; semantics depend on the technology set
    pub speed_tiers: Vec<String>,
    /// Format the download endpoint should deliver the GIS payload in
    pub gis_format: Option<GisFormat>,
}

/// Challenge-data filter request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    pub as_of_date: String,
    /// Must be one of the seven published challenge-category labels
    pub category: String,
    pub state_fips: Vec<String>,
}

/// Source row a plan entry was selected from
#[derive(Debug, Clone)]
pub enum SourceRow {
    Availability(ReferenceRow),
    Challenge(ChallengeRow),
}

/// One planned download: the file token, where it goes on the wire, and
/// the deterministic local name it will be saved under
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub file_id: String,
    pub data_type: DataType,
    pub gis_format: Option<GisFormat>,
    /// Synthesized local file name, always `.zip`
    pub file_name: String,
    pub source: SourceRow,
}

impl SelectedFile {
    /// Ordering contract: ascending lexicographic by
    /// (provider_id, state_fips, technology_code, speed_tier). Challenge
    /// rows carry only state identity; their other keys sort as empty.
    fn sort_key(&self) -> (String, String, String, String) {
        match &self.source {
            SourceRow::Availability(row) => (
                row.provider_id.clone(),
                row.state_fips.clone(),
                row.technology_code.clone(),
                row.speed_tier.clone().unwrap_or_default(),
            ),
            SourceRow::Challenge(row) => (
                String::new(),
                row.state_fips.clone(),
                String::new(),
                String::new(),
            ),
        }
    }
}

/// Synthesize the local name for an availability download:
/// `{TechnologyType}_{Subcategory}_{file_name}.zip` with internal spaces
/// stripped from the prefix tokens
fn availability_file_name(technology_type: &str, subcategory: &str, file_name: &str) -> String {
    format!(
        "{}_{}_{}.zip",
        technology_type.replace(' ', ""),
        subcategory.replace(' ', ""),
        file_name
    )
}

/// Synthesize the local name for a challenge download:
/// `{category}_{as_of_date}_{state_fips}_{state_name}.zip` with spaces,
/// hyphens, and date dashes turned into underscores
fn challenge_file_name(category: &str, as_of_date: &str, row: &ChallengeRow) -> String {
    format!(
        "{}_{}_{}_{}.zip",
        category.replace(' ', "_").replace('-', "_"),
        as_of_date.replace('-', "_"),
        row.state_fips,
        row.state_name
    )
}

impl FixedRequest {
    fn validate_dimensions(&self) -> RequestResult<(Dimension, Dimension, Dimension)> {
        let state = Dimension::resolve("state", &self.state_fips, false)?;
        // 'all' mixed with explicit codes is a conflict for this kind
        let technology = Dimension::resolve("technology", &self.technology_codes, true)?;
        let provider = Dimension::resolve("provider", &self.provider_ids, false)?;
        Ok((state, technology, provider))
    }

    /// Plan fixed-coverage downloads against the availability catalog
    pub fn plan(&self, catalog: &ReferenceCatalog) -> RequestResult<Vec<SelectedFile>> {
        if catalog.is_empty() {
            return Err(RequestError::EmptyCatalog {
                as_of_date: self.as_of_date.clone(),
            });
        }

        let (state, technology, provider) = self.validate_dimensions()?;

        let base = Predicate::and(vec![
            Predicate::equals(Field::Category, Category::Provider.as_str()),
            Predicate::equals(Field::Subcategory, FIXED_SUBCATEGORY),
            Predicate::equals(Field::TechnologyType, TechnologyType::FixedBroadband.as_str()),
            Predicate::equals(Field::FileType, FileType::Csv.as_str()),
        ]);
        let narrowed: Vec<&ReferenceRow> =
            catalog.rows().iter().filter(|r| base.matches(r)).collect();
        if narrowed.is_empty() {
            return Err(RequestError::EmptyReference {
                filter: base.to_string(),
            });
        }

        let combined = Predicate::and(vec![
            state.equality_predicate(Field::StateFips),
            technology.token_predicate(Field::TechnologyCode),
            provider.equality_predicate(Field::ProviderId),
        ]);
        let selected: Vec<&ReferenceRow> = narrowed
            .into_iter()
            .filter(|r| combined.matches(r))
            .collect();
        if selected.is_empty() {
            return Err(RequestError::EmptyReference {
                filter: Predicate::and(vec![base, combined]).to_string(),
            });
        }

        let mut files: Vec<SelectedFile> = selected
            .into_iter()
            .map(|row| SelectedFile {
                file_id: row.file_id.clone(),
                data_type: DataType::Availability,
                gis_format: None,
                file_name: availability_file_name(
                    TechnologyType::FixedBroadband.as_str(),
                    FIXED_SUBCATEGORY,
                    &row.file_name,
                ),
                source: SourceRow::Availability(row.clone()),
            })
            .collect();
        files.sort_by_key(|f| f.sort_key());
        Ok(files)
    }
}

impl MobileRequest {
    /// Validate kind gating and normalize the technology dimension.
    ///
    /// Selecting "Mobile Voice" forces the technology dimension to the
    /// single voice code regardless of what the caller supplied; that is a
    /// normalization step, not a narrowing.
    fn validate(&self) -> RequestResult<(TechnologyType, Dimension)> {
        let technology_type = match TechnologyType::from_label(&self.technology_type) {
            Some(tt @ (TechnologyType::MobileBroadband | TechnologyType::MobileVoice)) => tt,
            _ => {
                return Err(RequestError::invalid(format!(
                    "technology type must be 'Mobile Broadband' or 'Mobile Voice', got '{}'",
                    self.technology_type
                )))
            }
        };

        if !MOBILE_SUBCATEGORIES.contains(&self.subcategory.as_str()) {
            return Err(RequestError::invalid(format!(
                "subcategory must be 'Raw Coverage' or 'Hexagon Coverage', got '{}'",
                self.subcategory
            )));
        }

        let technology = if technology_type == TechnologyType::MobileVoice {
            Dimension::Values(vec![TECH_VOICE.to_string()])
        } else {
            Dimension::resolve("technology", &self.technology_codes, false)?
        };

        Ok((technology_type, technology))
    }

    /// Speed-tier predicate for the resolved technology set.
    ///
    /// 5G rows carry an explicit tier while the legacy codes (3G/LTE) are
    /// stored with an absent tier, and voice rows have no tier concept at
    /// all; the predicate has to split accordingly.
    fn speed_tier_predicate(&self, technology: &Dimension) -> RequestResult<Predicate> {
        // Voice present: no speed-tier reasoning applies
        if technology.contains(TECH_VOICE) {
            return Ok(Predicate::True);
        }

        let tiers: Vec<String> = self
            .speed_tiers
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        // Unknown tiers are not rejected (the catalog is the authority),
        // but a typo would otherwise surface only as an empty result
        for tier in &tiers {
            if !FIVE_G_SPEED_TIERS.contains(&tier.as_str()) {
                warn!(
                    tier = %tier,
                    known = ?FIVE_G_SPEED_TIERS,
                    "speed tier is not one of the published 5G tiers"
                );
            }
        }

        // Unrestricted technology is a mixed legacy/5G set
        if technology.is_unrestricted() {
            if tiers.is_empty() {
                return Err(RequestError::MissingDimension {
                    dimension: "speed_tier",
                });
            }
            return Ok(Predicate::or(vec![
                Predicate::is_null(Field::SpeedTier),
                Predicate::one_of(Field::SpeedTier, tiers),
            ]));
        }

        let has_3g = technology.contains(TECH_3G);
        let has_lte = technology.contains(TECH_LTE);
        let has_5g = technology.contains(TECH_5G);
        let legacy_count = usize::from(has_3g) + usize::from(has_lte);

        if has_5g && tiers.is_empty() {
            return Err(RequestError::MissingDimension {
                dimension: "speed_tier",
            });
        }

        match (legacy_count, has_5g) {
            // Legacy only, both codes: null-tier rows. Supplied tiers are
            // ignored here; carried over from the source as a documented
            // quirk, not silently "fixed".
            (2, false) => Ok(Predicate::is_null(Field::SpeedTier)),
            // Exactly one legacy code with tiers supplied was ambiguous
            // upstream; reject instead of silently matching nothing.
            (1, false) if !tiers.is_empty() => Err(RequestError::invalid(
                "speed tiers were supplied for a single legacy technology code; \
                 legacy rows carry no speed tier, so drop the tiers or add code 500",
            )),
            (_, false) => Ok(Predicate::is_null(Field::SpeedTier)),
            // Legacy and 5G mixed: null tier for the legacy side, or one of
            // the requested tiers for the 5G side
            (n, true) if n > 0 => Ok(Predicate::or(vec![
                Predicate::is_null(Field::SpeedTier),
                Predicate::one_of(Field::SpeedTier, tiers),
            ])),
            // 5G only
            (_, true) => Ok(Predicate::one_of(Field::SpeedTier, tiers)),
        }
    }

    /// Plan mobile-coverage downloads against the availability catalog
    pub fn plan(&self, catalog: &ReferenceCatalog) -> RequestResult<Vec<SelectedFile>> {
        if catalog.is_empty() {
            return Err(RequestError::EmptyCatalog {
                as_of_date: self.as_of_date.clone(),
            });
        }

        let (technology_type, technology) = self.validate()?;
        let state = Dimension::resolve("state", &self.state_fips, false)?;
        let provider = Dimension::resolve("provider", &self.provider_ids, false)?;
        let speed_tier = self.speed_tier_predicate(&technology)?;

        let base = Predicate::and(vec![
            Predicate::equals(Field::Category, Category::Provider.as_str()),
            Predicate::equals(Field::Subcategory, self.subcategory.clone()),
            Predicate::equals(Field::TechnologyType, technology_type.as_str()),
            Predicate::equals(Field::FileType, FileType::Gis.as_str()),
        ]);
        let narrowed: Vec<&ReferenceRow> =
            catalog.rows().iter().filter(|r| base.matches(r)).collect();
        if narrowed.is_empty() {
            return Err(RequestError::EmptyReference {
                filter: base.to_string(),
            });
        }

        let combined = Predicate::and(vec![
            provider.equality_predicate(Field::ProviderId),
            state.equality_predicate(Field::StateFips),
            technology.token_predicate(Field::TechnologyCode),
            speed_tier,
        ]);
        let selected: Vec<&ReferenceRow> = narrowed
            .into_iter()
            .filter(|r| combined.matches(r))
            .collect();
        if selected.is_empty() {
            return Err(RequestError::EmptyReference {
                filter: Predicate::and(vec![base, combined]).to_string(),
            });
        }

        let mut files: Vec<SelectedFile> = selected
            .into_iter()
            .map(|row| SelectedFile {
                file_id: row.file_id.clone(),
                data_type: DataType::Availability,
                gis_format: self.gis_format,
                file_name: availability_file_name(
                    technology_type.as_str(),
                    &self.subcategory,
                    &row.file_name,
                ),
                source: SourceRow::Availability(row.clone()),
            })
            .collect();
        files.sort_by_key(|f| f.sort_key());
        Ok(files)
    }
}

impl ChallengeRequest {
    fn validate(&self) -> RequestResult<()> {
        if !CHALLENGE_CATEGORIES.contains(&self.category.as_str()) {
            return Err(RequestError::invalid(format!(
                "unknown challenge category '{}'; expected one of: {}",
                self.category,
                CHALLENGE_CATEGORIES.join(", ")
            )));
        }
        Ok(())
    }

    /// Plan challenge downloads against the challenge listing for this
    /// request's category
    pub fn plan(&self, catalog: &ChallengeCatalog) -> RequestResult<Vec<SelectedFile>> {
        self.validate()?;

        if catalog.is_empty() {
            return Err(RequestError::EmptyCatalog {
                as_of_date: self.as_of_date.clone(),
            });
        }

        let state = Dimension::resolve("state", &self.state_fips, false)?;
        let selected: Vec<&ChallengeRow> = match &state {
            Dimension::Unrestricted => catalog.rows().iter().collect(),
            Dimension::Values(values) => catalog
                .rows()
                .iter()
                .filter(|r| values.iter().any(|v| v == &r.state_fips))
                .collect(),
        };
        if selected.is_empty() {
            return Err(RequestError::EmptyReference {
                filter: format!(
                    "category == '{}' and {}",
                    self.category,
                    match &state {
                        Dimension::Unrestricted => "state_fips == *".to_string(),
                        Dimension::Values(values) =>
                            format!("state_fips in ['{}']", values.join("', '")),
                    }
                ),
            });
        }

        let mut files: Vec<SelectedFile> = selected
            .into_iter()
            .map(|row| SelectedFile {
                file_id: row.file_id.clone(),
                data_type: DataType::Challenge,
                gis_format: None,
                file_name: challenge_file_name(&self.category, &self.as_of_date, row),
                source: SourceRow::Challenge(row.clone()),
            })
            .collect();
        files.sort_by_key(|f| f.sort_key());
        Ok(files)
    }
}

/// A complete filter request, one of the three kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRequest {
    Fixed(FixedRequest),
    Mobile(MobileRequest),
    Challenge(ChallengeRequest),
}

impl FilterRequest {
    pub fn as_of_date(&self) -> &str {
        match self {
            Self::Fixed(r) => &r.as_of_date,
            Self::Mobile(r) => &r.as_of_date,
            Self::Challenge(r) => &r.as_of_date,
        }
    }

    /// A raw dimension list from the CLI/GUI: comma-separated tokens,
    /// trimmed of whitespace
    pub fn split_dimension_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect()
    }
}
