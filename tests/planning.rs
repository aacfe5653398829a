//! End-to-end tests for the plan-then-download pipeline
//!
//! These tests drive a catalog parsed from realistic listing JSON through
//! the filter planner and the sequential orchestrator, with the network
//! replaced by a fake fetcher.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use serde_json::json;

use bdc_fetcher::app::{
    BatchOutcome, CancelFlag, ChallengeCatalog, DownloadOrchestrator, FileFetcher, FilterRequest,
    FixedRequest, GisFormat, MobileRequest, ReferenceCatalog, SelectedFile,
};
use bdc_fetcher::errors::{RequestError, TransferError, TransferResult};

fn availability_listing() -> serde_json::Value {
    json!([
        {
            "category": "Provider",
            "subcategory": "Location Coverage",
            "technology_type": "Fixed Broadband",
            "technology_code": "50",
            "speed_tier": null,
            "state_fips": "06",
            "state_name": "California",
            "provider_id": 130077,
            "file_type": "csv",
            "file_id": 901,
            "file_name": "CA_cable"
        },
        {
            "category": "Provider",
            "subcategory": "Location Coverage",
            "technology_type": "Fixed Broadband",
            "technology_code": "70",
            "speed_tier": null,
            "state_fips": "41",
            "state_name": "Oregon",
            "provider_id": 130077,
            "file_type": "csv",
            "file_id": 902,
            "file_name": "OR_fiber"
        },
        {
            "category": "Provider",
            "subcategory": "Hexagon Coverage",
            "technology_type": "Mobile Broadband",
            "technology_code": "500",
            "speed_tier": "35/3",
            "state_fips": "06",
            "state_name": "California",
            "provider_id": "130228",
            "file_type": "gis",
            "file_id": 903,
            "file_name": "CA_5g_hex"
        },
        {
            "category": "Provider",
            "subcategory": "Hexagon Coverage",
            "technology_type": "Mobile Broadband",
            "technology_code": "400",
            "speed_tier": null,
            "state_fips": "06",
            "state_name": "California",
            "provider_id": "130228",
            "file_type": "gis",
            "file_id": 904,
            "file_name": "CA_lte_hex"
        }
    ])
}

fn catalog() -> ReferenceCatalog {
    ReferenceCatalog::from_json_data("2024-06-30", &availability_listing()).unwrap()
}

struct CountingFetcher {
    calls: AtomicUsize,
    fail_ids: Vec<String>,
}

impl CountingFetcher {
    fn new(fail_ids: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_ids: fail_ids.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileFetcher for CountingFetcher {
    fn fetch<'a>(&'a self, selected: &'a SelectedFile) -> BoxFuture<'a, TransferResult<PathBuf>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_ids.contains(&selected.file_id) {
                return Err(TransferError::Status {
                    status: 503,
                    file_id: selected.file_id.clone(),
                });
            }
            Ok(PathBuf::from(format!("/tmp/{}", selected.file_name)))
        })
    }
}

#[test]
fn fixed_plan_selects_and_names_deterministically() {
    let request = FixedRequest {
        as_of_date: "2024-06-30".to_string(),
        state_fips: FilterRequest::split_dimension_list("06, 41"),
        technology_codes: FilterRequest::split_dimension_list("all"),
        provider_ids: FilterRequest::split_dimension_list("130077"),
    };

    let plan = request.plan(&catalog()).unwrap();
    assert_eq!(plan.len(), 2);
    // ascending by (provider_id, state_fips, technology_code, speed_tier)
    assert_eq!(plan[0].file_id, "901");
    assert_eq!(plan[1].file_id, "902");
    assert_eq!(
        plan[0].file_name,
        "FixedBroadband_LocationCoverage_CA_cable.zip"
    );
    assert!(plan.iter().all(|f| f.gis_format.is_none()));
}

#[test]
fn mobile_plan_passes_gis_format_through() {
    let request = MobileRequest {
        as_of_date: "2024-06-30".to_string(),
        technology_type: "Mobile Broadband".to_string(),
        subcategory: "Hexagon Coverage".to_string(),
        state_fips: vec!["06".to_string()],
        technology_codes: vec!["400".to_string(), "500".to_string()],
        provider_ids: vec!["all".to_string()],
        speed_tiers: vec!["35/3".to_string()],
        gis_format: Some(GisFormat::Gpkg),
    };

    let plan = request.plan(&catalog()).unwrap();
    // LTE row (null tier) and the 5G row at the requested tier
    assert_eq!(plan.len(), 2);
    assert!(plan.iter().all(|f| f.gis_format == Some(GisFormat::Gpkg)));
    assert_eq!(
        plan[0].file_name,
        "MobileBroadband_HexagonCoverage_CA_lte_hex.zip"
    );
}

#[test]
fn zero_match_narrowing_reports_the_filter() {
    let request = FixedRequest {
        as_of_date: "2024-06-30".to_string(),
        state_fips: vec!["99".to_string()],
        technology_codes: vec!["all".to_string()],
        provider_ids: vec!["all".to_string()],
    };

    let err = request.plan(&catalog()).unwrap_err();
    match err {
        RequestError::EmptyReference { filter } => {
            assert!(filter.contains("99"), "filter echo missing value: {filter}");
        }
        other => panic!("expected EmptyReference, got {other}"),
    }
}

#[tokio::test]
async fn planned_batch_downloads_in_order_and_survives_a_failure() {
    let request = FixedRequest {
        as_of_date: "2024-06-30".to_string(),
        state_fips: vec!["all".to_string()],
        technology_codes: vec!["all".to_string()],
        provider_ids: vec!["all".to_string()],
    };
    let plan = request.plan(&catalog()).unwrap();
    assert_eq!(plan.len(), 2);

    let fetcher = CountingFetcher::new(&["901"]);
    let orchestrator = DownloadOrchestrator::new(CancelFlag::new());
    let report = orchestrator.run(&plan, &fetcher).await.unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.outcome(), BatchOutcome::Partial);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file_id, "901");
    assert_eq!(
        report.downloaded,
        vec![PathBuf::from(
            "/tmp/FixedBroadband_LocationCoverage_OR_fiber.zip"
        )]
    );
}

#[tokio::test]
async fn challenge_pipeline_builds_underscored_names() {
    let listing = json!([
        { "state_fips": "01", "state_name": "Alabama", "file_id": 77 },
        { "state_fips": "06", "state_name": "California", "file_id": 78 }
    ]);
    let catalog =
        ChallengeCatalog::from_json_data("2024-06-30", "FixedChallenge - Cumulative", &listing)
            .unwrap();

    let request = bdc_fetcher::app::ChallengeRequest {
        as_of_date: "2024-06-30".to_string(),
        category: "FixedChallenge - Cumulative".to_string(),
        state_fips: vec!["01".to_string()],
    };
    let plan = request.plan(&catalog).unwrap();
    assert_eq!(plan.len(), 1);
    // spaces and hyphens become underscores, dates keep their triple form
    assert_eq!(
        plan[0].file_name,
        "FixedChallenge___Cumulative_2024_06_30_01_Alabama.zip"
    );

    let fetcher = CountingFetcher::new(&[]);
    let orchestrator = DownloadOrchestrator::new(CancelFlag::new());
    let report = orchestrator.run(&plan, &fetcher).await.unwrap();
    assert_eq!(report.outcome(), BatchOutcome::Complete);
    assert_eq!(report.downloaded.len(), 1);
}
