//! Sequential download orchestration
//!
//! One logical worker per batch: downloads run strictly in plan order on a
//! single task, isolated from whatever drives the user interface. The
//! remote service is rate sensitive, so sequential transfer is a deliberate
//! choice, not a missing feature. Cancellation is cooperative: a shared
//! latched flag is polled between iterations, never mid-transfer, and the
//! caller clears it before starting a new batch. A failed transfer is
//! recorded and the batch moves on; partial success is a normal outcome
//! the report distinguishes from cancellation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::geometry::{
    decode_coverage_archive, polygonize, CellGeometry, GisFormat, LayerWriter,
};
use crate::app::output::OutputLayout;
use crate::app::planner::SelectedFile;
use crate::errors::{AppError, RequestError, Result, TransferResult};

/// Shared cooperative cancellation latch.
///
/// Once set it stays set until the caller explicitly clears it; the
/// orchestrator only observes it, at iteration boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current batch
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the latch before starting a new batch. Never done
    /// automatically.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Fetches one selected file and persists it, returning the local path
pub trait FileFetcher: Send + Sync {
    fn fetch<'a>(&'a self, selected: &'a SelectedFile) -> BoxFuture<'a, TransferResult<PathBuf>>;
}

/// Progress events emitted once per batch item
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        index: usize,
        total: usize,
        file_name: String,
    },
    Finished {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Failed {
        index: usize,
        total: usize,
        file_name: String,
    },
    Cancelled {
        completed: usize,
        total: usize,
    },
}

/// A recorded per-file failure; the batch continued past it
#[derive(Debug)]
pub struct FailedTransfer {
    pub file_id: String,
    pub file_name: String,
    pub error: AppError,
}

/// Result of one batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Local paths of successful downloads, in plan order
    pub downloaded: Vec<PathBuf>,
    /// Paths of converted GIS layers, when polygonization ran
    pub converted: Vec<PathBuf>,
    /// Per-file failures the batch continued past
    pub failures: Vec<FailedTransfer>,
    /// Whether the cancel latch stopped the batch early
    pub cancelled: bool,
    /// Number of files the plan contained
    pub planned: usize,
}

impl BatchReport {
    /// An empty result is ambiguous on its own; callers distinguish why
    pub fn outcome(&self) -> BatchOutcome {
        if self.cancelled {
            BatchOutcome::Cancelled
        } else if self.downloaded.is_empty() && !self.failures.is_empty() {
            BatchOutcome::AllFailed
        } else if self.failures.is_empty() {
            BatchOutcome::Complete
        } else {
            BatchOutcome::Partial
        }
    }
}

/// Why a batch ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Complete,
    Partial,
    AllFailed,
    Cancelled,
}

/// Configuration for the optional polygonization step after each
/// successful fixed-coverage download
pub struct PolygonizeConfig {
    pub geometry: Arc<dyn CellGeometry + Send + Sync>,
    pub writer: Arc<dyn LayerWriter + Send + Sync>,
    /// Output layer format; must have been validated upstream. A missing
    /// format reaching the conversion step is a contract violation.
    pub format: Option<GisFormat>,
    pub layout: OutputLayout,
}

/// Drives a planned batch of downloads sequentially
pub struct DownloadOrchestrator {
    cancel: CancelFlag,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    polygonize: Option<PolygonizeConfig>,
}

impl DownloadOrchestrator {
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            progress: None,
            polygonize: None,
        }
    }

    /// Attach a progress event channel
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Attach a polygonization step run after each successful download
    pub fn with_polygonize(mut self, config: PolygonizeConfig) -> Self {
        self.polygonize = Some(config);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }

    /// Run the batch. Per-file failures are recorded in the report; only a
    /// contract violation (missing GIS format at conversion time) aborts.
    pub async fn run(
        &self,
        selected: &[SelectedFile],
        fetcher: &dyn FileFetcher,
    ) -> Result<BatchReport> {
        let total = selected.len();
        let mut report = BatchReport {
            planned: total,
            ..Default::default()
        };

        for (index, file) in selected.iter().enumerate() {
            if self.cancel.is_set() {
                info!(
                    completed = report.downloaded.len(),
                    total, "batch cancelled per user request"
                );
                report.cancelled = true;
                self.emit(ProgressEvent::Cancelled {
                    completed: report.downloaded.len(),
                    total,
                });
                break;
            }

            self.emit(ProgressEvent::Started {
                index,
                total,
                file_name: file.file_name.clone(),
            });

            let path = match fetcher.fetch(file).await {
                Ok(path) => path,
                Err(error) => {
                    warn!(file = %file.file_name, %error, "transfer failed, continuing batch");
                    self.emit(ProgressEvent::Failed {
                        index,
                        total,
                        file_name: file.file_name.clone(),
                    });
                    report.failures.push(FailedTransfer {
                        file_id: file.file_id.clone(),
                        file_name: file.file_name.clone(),
                        error: AppError::Transfer(error),
                    });
                    continue;
                }
            };

            if let Some(config) = &self.polygonize {
                match self.convert(config, file, &path)? {
                    Ok(layer_path) => report.converted.push(layer_path),
                    Err(error) => {
                        warn!(file = %file.file_name, %error, "conversion failed, keeping raw download");
                        report.failures.push(FailedTransfer {
                            file_id: file.file_id.clone(),
                            file_name: file.file_name.clone(),
                            error,
                        });
                    }
                }
            }

            self.emit(ProgressEvent::Finished {
                index,
                total,
                path: path.clone(),
            });
            report.downloaded.push(path);
        }

        info!(
            downloaded = report.downloaded.len(),
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "batch finished"
        );
        Ok(report)
    }

    /// Convert one downloaded archive to a GIS layer. The outer `Result`
    /// is fatal (contract violation); the inner one is a per-file
    /// conversion failure the batch survives.
    fn convert(
        &self,
        config: &PolygonizeConfig,
        file: &SelectedFile,
        archive_path: &std::path::Path,
    ) -> Result<std::result::Result<PathBuf, AppError>> {
        let format = config.format.ok_or_else(|| {
            AppError::Request(RequestError::invalid(
                "polygonization requested without a GIS output format; \
                 this should have been rejected at request validation",
            ))
        })?;

        let inner = (|| {
            let table = decode_coverage_archive(archive_path)?;
            let records = polygonize(&table, config.geometry.as_ref())?;

            let layer_name = file.file_name.replace(".zip", &format!(".{}", format.extension()));
            let dir = config.layout.gis_dir(format);
            std::fs::create_dir_all(&dir)?;
            let output_path = dir.join(&layer_name);

            config
                .writer
                .write_layer(&table.headers, &records, format, &output_path)
                .map_err(|reason| crate::errors::ConvertError::LayerWrite {
                    layer: layer_name.clone(),
                    reason,
                })?;

            info!(layer = %output_path.display(), records = records.len(), "wrote GIS layer");
            Ok::<PathBuf, AppError>(output_path)
        })();

        Ok(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::catalog::ChallengeRow;
    use crate::app::planner::{DataType, SourceRow};
    use crate::errors::TransferError;
    use std::sync::atomic::AtomicUsize;

    fn selected(file_id: &str) -> SelectedFile {
        SelectedFile {
            file_id: file_id.to_string(),
            data_type: DataType::Availability,
            gis_format: None,
            file_name: format!("file_{file_id}.zip"),
            source: SourceRow::Challenge(ChallengeRow {
                state_fips: "06".to_string(),
                state_name: "California".to_string(),
                file_id: file_id.to_string(),
            }),
        }
    }

    /// Fetcher that records calls, optionally failing some ids and
    /// optionally setting a cancel flag after N successes
    struct FakeFetcher {
        calls: AtomicUsize,
        fail_ids: Vec<String>,
        cancel_after: Option<(usize, CancelFlag)>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_ids: Vec::new(),
                cancel_after: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FileFetcher for FakeFetcher {
        fn fetch<'a>(
            &'a self,
            selected: &'a SelectedFile,
        ) -> BoxFuture<'a, TransferResult<PathBuf>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if self.fail_ids.contains(&selected.file_id) {
                    return Err(TransferError::Status {
                        status: 500,
                        file_id: selected.file_id.clone(),
                    });
                }
                if let Some((after, flag)) = &self.cancel_after {
                    if call >= *after {
                        flag.set();
                    }
                }
                Ok(PathBuf::from(format!("/tmp/{}", selected.file_name)))
            })
        }
    }

    #[tokio::test]
    async fn downloads_run_in_plan_order() {
        let files: Vec<SelectedFile> = (1..=3).map(|i| selected(&i.to_string())).collect();
        let fetcher = FakeFetcher::new();
        let orchestrator = DownloadOrchestrator::new(CancelFlag::new());

        let report = orchestrator.run(&files, &fetcher).await.unwrap();
        assert_eq!(report.outcome(), BatchOutcome::Complete);
        assert_eq!(
            report.downloaded,
            vec![
                PathBuf::from("/tmp/file_1.zip"),
                PathBuf::from("/tmp/file_2.zip"),
                PathBuf::from("/tmp/file_3.zip"),
            ]
        );
    }

    #[tokio::test]
    async fn cancellation_after_second_fetch_stops_batch() {
        let files: Vec<SelectedFile> = (1..=5).map(|i| selected(&i.to_string())).collect();
        let cancel = CancelFlag::new();
        let mut fetcher = FakeFetcher::new();
        fetcher.cancel_after = Some((2, cancel.clone()));
        let orchestrator = DownloadOrchestrator::new(cancel.clone());

        let report = orchestrator.run(&files, &fetcher).await.unwrap();
        assert_eq!(report.downloaded.len(), 2);
        assert_eq!(fetcher.calls(), 2, "items 3-5 must never be fetched");
        assert_eq!(report.outcome(), BatchOutcome::Cancelled);
        // the latch stays set until the caller clears it
        assert!(cancel.is_set());
        cancel.clear();
        assert!(!cancel.is_set());
    }

    #[tokio::test]
    async fn failed_transfer_is_recorded_and_batch_continues() {
        let files: Vec<SelectedFile> = (1..=3).map(|i| selected(&i.to_string())).collect();
        let mut fetcher = FakeFetcher::new();
        fetcher.fail_ids = vec!["2".to_string()];
        let orchestrator = DownloadOrchestrator::new(CancelFlag::new());

        let report = orchestrator.run(&files, &fetcher).await.unwrap();
        assert_eq!(report.downloaded.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_id, "2");
        assert_eq!(report.outcome(), BatchOutcome::Partial);
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn all_failed_is_distinguished_from_cancelled() {
        let files: Vec<SelectedFile> = (1..=2).map(|i| selected(&i.to_string())).collect();
        let mut fetcher = FakeFetcher::new();
        fetcher.fail_ids = vec!["1".to_string(), "2".to_string()];
        let orchestrator = DownloadOrchestrator::new(CancelFlag::new());

        let report = orchestrator.run(&files, &fetcher).await.unwrap();
        assert!(report.downloaded.is_empty());
        assert_eq!(report.outcome(), BatchOutcome::AllFailed);
    }

    #[tokio::test]
    async fn progress_events_follow_the_batch() {
        let files: Vec<SelectedFile> = (1..=2).map(|i| selected(&i.to_string())).collect();
        let fetcher = FakeFetcher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = DownloadOrchestrator::new(CancelFlag::new()).with_progress(tx);

        orchestrator.run(&files, &fetcher).await.unwrap();

        let mut started = 0;
        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                ProgressEvent::Started { .. } => started += 1,
                ProgressEvent::Finished { .. } => finished += 1,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(started, 2);
        assert_eq!(finished, 2);
    }

    mod polygonize_step {
        use super::*;
        use crate::app::geometry::{GeoRecord, LayerWriter};
        use std::io::Write as _;
        use std::sync::Mutex;

        struct FlatGeometry;

        impl CellGeometry for FlatGeometry {
            fn cell_boundary(&self, _token: &str) -> std::result::Result<Vec<(f64, f64)>, String> {
                Ok(vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)])
            }
        }

        #[derive(Default)]
        struct RecordingWriter {
            layers: Mutex<Vec<(PathBuf, usize, GisFormat)>>,
        }

        impl LayerWriter for RecordingWriter {
            fn write_layer(
                &self,
                _headers: &csv::StringRecord,
                records: &[GeoRecord],
                format: GisFormat,
                output_path: &std::path::Path,
            ) -> std::result::Result<(), String> {
                self.layers.lock().unwrap().push((
                    output_path.to_path_buf(),
                    records.len(),
                    format,
                ));
                Ok(())
            }
        }

        /// Fetcher that writes a real zipped CSV to a temp dir
        struct ArchiveFetcher {
            dir: PathBuf,
        }

        impl FileFetcher for ArchiveFetcher {
            fn fetch<'a>(
                &'a self,
                selected: &'a SelectedFile,
            ) -> BoxFuture<'a, TransferResult<PathBuf>> {
                Box::pin(async move {
                    let path = self.dir.join(&selected.file_name);
                    let file = std::fs::File::create(&path).unwrap();
                    let mut writer = zip::ZipWriter::new(file);
                    writer
                        .start_file("coverage.csv", zip::write::FileOptions::default())
                        .unwrap();
                    writer
                        .write_all(b"h3_res8_id,served\n8828308281fffff,1\n")
                        .unwrap();
                    writer.finish().unwrap();
                    Ok(path)
                })
            }
        }

        #[tokio::test]
        async fn successful_fetch_is_converted_to_a_layer() {
            let dir = tempfile::tempdir().unwrap();
            let layout = OutputLayout::under_base(dir.path());
            let writer = Arc::new(RecordingWriter::default());
            let orchestrator =
                DownloadOrchestrator::new(CancelFlag::new()).with_polygonize(PolygonizeConfig {
                    geometry: Arc::new(FlatGeometry),
                    writer: writer.clone(),
                    format: Some(GisFormat::Gpkg),
                    layout: layout.clone(),
                });
            let fetcher = ArchiveFetcher {
                dir: dir.path().to_path_buf(),
            };

            let files = vec![selected("9")];
            let report = orchestrator.run(&files, &fetcher).await.unwrap();
            assert_eq!(report.converted.len(), 1);
            let layers = writer.layers.lock().unwrap();
            assert_eq!(layers.len(), 1);
            assert_eq!(layers[0].1, 1);
            assert_eq!(layers[0].2, GisFormat::Gpkg);
            assert!(layers[0].0.ends_with("gpkg/file_9.gpkg"));
        }

        #[tokio::test]
        async fn missing_format_at_conversion_is_a_contract_violation() {
            let dir = tempfile::tempdir().unwrap();
            let orchestrator =
                DownloadOrchestrator::new(CancelFlag::new()).with_polygonize(PolygonizeConfig {
                    geometry: Arc::new(FlatGeometry),
                    writer: Arc::new(RecordingWriter::default()),
                    format: None,
                    layout: OutputLayout::under_base(dir.path()),
                });
            let fetcher = ArchiveFetcher {
                dir: dir.path().to_path_buf(),
            };

            let err = orchestrator
                .run(&[selected("9")], &fetcher)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                AppError::Request(RequestError::Invalid { .. })
            ));
        }
    }
}
