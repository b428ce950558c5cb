//! The resumable workflow: every record walks the requested stages in order,
//! skipping what its checkpoints already cover.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::app::ports::{Clock, Credentials, Marketplace, SaleStatus, StageResult, SystemClock};
use crate::config::WorkflowConfig;
use crate::constants::DATE_FORMAT;
use crate::domain::Record;
use crate::error::{Result, StageError};
use crate::observability::metrics;
use crate::pipeline::checkpoint::{log as checkpoint_log, CheckpointStore};
use crate::pipeline::ingestion::{SourceFile, SourceFormat};
use crate::pipeline::policy::{Stage, StagePlan};
use crate::pipeline::processing::normalize::Normalizer;
use crate::pipeline::report::RunReport;
use crate::pipeline::retry::{login_with_retry, RetryPolicy};
use crate::pipeline::validation;

/// What a stage produced when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Done,
    /// The upload could not be found on the marketplace
    Missing,
    StillListed,
    /// The sale ended and the record left the sale file
    ReadyForRelisting,
}

pub struct WorkflowEngine {
    plan: StagePlan,
    marketplace: Box<dyn Marketplace>,
    config: WorkflowConfig,
    store: CheckpointStore,
    clock: Box<dyn Clock>,
    normalizer: Normalizer,
}

impl WorkflowEngine {
    /// Opens the checkpoint files of the plan. Failing to establish them is
    /// fatal.
    pub fn new(
        plan: StagePlan,
        marketplace: Box<dyn Marketplace>,
        config: WorkflowConfig,
    ) -> Result<Self> {
        let store = CheckpointStore::open(&plan)?;
        Ok(Self {
            plan,
            marketplace,
            config,
            store,
            clock: Box::new(SystemClock),
            normalizer: Normalizer::new(),
        })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub async fn login(&self, credentials: &Credentials, policy: &RetryPolicy) -> Result<()> {
        login_with_retry(self.marketplace.as_ref(), credentials, policy).await
    }

    /// Closes the marketplace session.
    pub async fn shutdown(&self) -> Result<()> {
        self.marketplace.shutdown().await?;
        Ok(())
    }

    /// Reads the plan's source file and processes every record.
    pub async fn run(&mut self) -> Result<RunReport> {
        let source = SourceFile::open(&self.plan.source)?;
        self.run_source(&source).await
    }

    pub async fn run_source(&mut self, source: &SourceFile) -> Result<RunReport> {
        let mut report = RunReport {
            records: source.len(),
            ..RunReport::default()
        };
        info!(
            records = source.len(),
            actions = %self.plan.actions,
            "Starting workflow"
        );

        let records: Vec<_> = source
            .rows
            .iter()
            .map(|row| self.normalizer.normalize(row))
            .collect();
        warn_duplicate_names(&records);

        for (i, normalized) in records.into_iter().enumerate() {
            let index = i + 1;
            let mut record = match normalized {
                Ok(record) => record,
                Err(e) => {
                    error!(index, error = %e, "Skipping malformed record");
                    println!("❌ NFT n°{}/{} skipped: {}", index, source.len(), e);
                    report.malformed(index, e.to_string());
                    continue;
                }
            };

            let span = info_span!("record", index, name = %record.name);
            self.process_record(index, source.len(), &mut record, &mut report)
                .instrument(span)
                .await?;
            metrics::workflow::record_processed();
        }

        info!(
            failures = report.failures.len(),
            missing = report.missing.len(),
            "Workflow finished"
        );
        Ok(report)
    }

    async fn process_record(
        &mut self,
        index: usize,
        total: usize,
        record: &mut Record,
        report: &mut RunReport,
    ) -> Result<()> {
        let stages: Vec<Stage> = self.plan.actions.iter().collect();
        for stage in stages {
            if self.store.has_completed(stage, &record.name) {
                if let Some(projection) = self.store.projection(stage, &record.name) {
                    projection.apply_to(record);
                }
                metrics::workflow::stage_skipped(stage.as_str());
                report.skipped(stage);
                debug!(stage = %stage, "Already checkpointed");
                println!(
                    "⏭️  NFT n°{}/{} -{} already done: {}",
                    index, total, record.name, stage
                );
                continue;
            }

            println!("▶️  NFT n°{}/{} -{}: {}", index, total, record.name, stage);
            let started = Instant::now();
            let outcome = self.execute(stage, record).await;
            metrics::workflow::stage_duration(stage.as_str(), started.elapsed().as_secs_f64());

            match outcome {
                Ok(StageOutcome::Missing) => {
                    warn!(stage = %stage, "Upload not found on the marketplace");
                    println!("   ❌ Missing on the marketplace");
                    metrics::workflow::stage_failed(stage.as_str(), "missing");
                    report.missing.push(record.name.clone());
                    report.failed(
                        index,
                        &record.name,
                        stage,
                        "upload not found on the marketplace".to_string(),
                    );
                    break;
                }
                Ok(outcome) => {
                    // Checkpoint I/O failures abort the run
                    self.store.record_completion(stage, record)?;
                    metrics::workflow::stage_completed(stage.as_str());
                    report.completed(stage);
                    match outcome {
                        StageOutcome::StillListed => println!("   ✅ Still up for sale"),
                        StageOutcome::ReadyForRelisting => {
                            println!("   🔄 Sale has ended, ready for re-listing");
                            report.ready_for_relisting.push(record.name.clone());
                        }
                        _ => println!("   ✅ {} done", stage),
                    }
                    info!(stage = %stage, "Stage completed");
                }
                Err(e) => {
                    warn!(stage = %stage, error = %e, "Stage failed");
                    println!("   ❌ {} failed: {}", stage, e);
                    metrics::workflow::stage_failed(stage.as_str(), failure_kind(&e));
                    report.failed(index, &record.name, stage, e.to_string());
                    if stage == Stage::VerifySale {
                        self.cool_down().await;
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    async fn execute(&mut self, stage: Stage, record: &mut Record) -> StageResult<StageOutcome> {
        let limit = self.config.stage_timeout();
        match stage {
            Stage::Upload => {
                validation::validate_upload(record, &self.config)?;
                let url = bounded(limit, self.marketplace.upload(record)).await?;
                if url.trim().is_empty() {
                    return Err(StageError::MissingRemoteUrl);
                }
                record.remote_url = Some(url);
                Ok(StageOutcome::Done)
            }
            Stage::VerifyUpload => {
                validation::require_remote_url(record)?;
                if bounded(limit, self.marketplace.verify_upload(record)).await? {
                    Ok(StageOutcome::Done)
                } else {
                    Ok(StageOutcome::Missing)
                }
            }
            Stage::Sell => {
                let now = self.clock.now();
                validation::validate_sale(record, now, &self.config)?;
                bounded(limit, self.marketplace.list_for_sale(record)).await?;
                record.sale_date = Some(now.format(DATE_FORMAT).to_string());
                Ok(StageOutcome::Done)
            }
            Stage::VerifySale => {
                validation::require_remote_url(record)?;
                match bounded(limit, self.marketplace.check_sale(record)).await? {
                    SaleStatus::StillListed => Ok(StageOutcome::StillListed),
                    SaleStatus::Ended => {
                        self.drop_from_source(&record.name)?;
                        self.store.forget(Stage::Sell, &record.name);
                        Ok(StageOutcome::ReadyForRelisting)
                    }
                }
            }
            Stage::Remove => {
                validation::require_remote_url(record)?;
                bounded(limit, self.marketplace.remove(record)).await?;
                Ok(StageOutcome::Done)
            }
        }
    }

    /// Removes a concluded sale from the source file so it can be listed again.
    fn drop_from_source(&self, name: &str) -> StageResult<()> {
        let path = &self.plan.source;
        let removed = match self.plan.format {
            SourceFormat::DelimitedText => checkpoint_log::remove_entry(path, name),
            SourceFormat::StructuredObject => checkpoint_log::remove_structured_entry(path, name),
            SourceFormat::Tabular => {
                return Err(StageError::SourceRewrite(
                    "spreadsheet sources cannot be rewritten".to_string(),
                ))
            }
        }
        .map_err(|e| StageError::SourceRewrite(e.to_string()))?;

        metrics::checkpoint::source_rewrite();
        if !removed {
            warn!(name, path = %path.display(), "Concluded sale had no line in the source file");
        }
        Ok(())
    }

    async fn cool_down(&self) {
        let cooldown = self.config.sale_check_cooldown();
        if cooldown > Duration::ZERO {
            info!(secs = cooldown.as_secs(), "Cooling down after a failed sale check");
            tokio::time::sleep(cooldown).await;
        }
    }
}

/// Runs the local checks of every requested stage without a browser.
///
/// Existing checkpoints are read but never created. A missing remote URL is
/// not reported when the same run would upload first.
pub fn dry_run(
    plan: &StagePlan,
    source: &SourceFile,
    config: &WorkflowConfig,
    clock: &dyn Clock,
    normalizer: &Normalizer,
) -> Result<RunReport> {
    let store = CheckpointStore::load_existing(plan)?;
    let mut report = RunReport {
        records: source.len(),
        ..RunReport::default()
    };
    let now = clock.now();

    for (i, row) in source.rows.iter().enumerate() {
        let index = i + 1;
        let mut record = match normalizer.normalize(row) {
            Ok(record) => record,
            Err(e) => {
                report.malformed(index, e.to_string());
                continue;
            }
        };
        for stage in plan.actions.iter() {
            if store.has_completed(stage, &record.name) {
                if let Some(projection) = store.projection(stage, &record.name) {
                    projection.apply_to(&mut record);
                }
                report.skipped(stage);
                continue;
            }
            if record.remote_url().is_none() && plan.actions.contains(Stage::Upload) {
                record.remote_url = Some("pending upload".to_string());
            }
            let checked = match stage {
                Stage::Upload => validation::validate_upload(&record, config),
                Stage::Sell => validation::validate_sale(&record, now, config),
                _ => validation::require_remote_url(&record).map(|_| ()),
            };
            match checked {
                Ok(()) => report.completed(stage),
                Err(e) => {
                    report.failed(index, &record.name, stage, e.to_string());
                    break;
                }
            }
        }
    }
    Ok(report)
}

async fn bounded<T>(limit: Duration, operation: impl Future<Output = StageResult<T>>) -> StageResult<T> {
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(StageError::Timeout(limit)),
    }
}

fn failure_kind(error: &StageError) -> &'static str {
    match error {
        StageError::Validation(_) => "validation",
        StageError::MissingRemoteUrl => "missing_remote_url",
        StageError::Driver(_) => "driver",
        StageError::Timeout(_) => "timeout",
        StageError::SourceRewrite(_) => "source_rewrite",
    }
}

fn warn_duplicate_names(records: &[Result<Record>]) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for record in records.iter().flatten() {
        *seen.entry(record.name.as_str()).or_default() += 1;
    }
    for (name, count) in seen.into_iter().filter(|(_, count)| *count > 1) {
        warn!(
            name,
            count,
            "Duplicate NFT name in batch; checkpoints match on name, so only the first is processed per stage"
        );
    }
}
