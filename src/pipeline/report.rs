use serde::Serialize;
use std::collections::BTreeMap;

use crate::pipeline::policy::Stage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounters {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One record that did not get through a stage. `stage` is `None` when the
/// row could not be normalized at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub index: usize,
    pub name: String,
    pub stage: Option<Stage>,
    pub reason: String,
}

/// Summary of one workflow run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub records: usize,
    pub stages: BTreeMap<Stage, StageCounters>,
    pub failures: Vec<RecordFailure>,
    /// Records whose upload could not be found on the marketplace
    pub missing: Vec<String>,
    /// Records whose sale ended and were dropped from the sale file
    pub ready_for_relisting: Vec<String>,
}

impl RunReport {
    pub fn counters(&self, stage: Stage) -> StageCounters {
        self.stages.get(&stage).copied().unwrap_or_default()
    }

    pub(crate) fn completed(&mut self, stage: Stage) {
        self.stages.entry(stage).or_default().completed += 1;
    }

    pub(crate) fn skipped(&mut self, stage: Stage) {
        self.stages.entry(stage).or_default().skipped += 1;
    }

    pub(crate) fn failed(&mut self, index: usize, name: &str, stage: Stage, reason: String) {
        self.stages.entry(stage).or_default().failed += 1;
        self.failures.push(RecordFailure {
            index,
            name: name.to_string(),
            stage: Some(stage),
            reason,
        });
    }

    pub(crate) fn malformed(&mut self, index: usize, reason: String) {
        self.failures.push(RecordFailure {
            index,
            name: String::new(),
            stage: None,
            reason,
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Prints the end-of-run summary for the operator.
    pub fn print_summary(&self) {
        println!("\n📊 Run summary: {} records", self.records);
        for (stage, counters) in &self.stages {
            println!(
                "   {}: {} completed, {} skipped, {} failed",
                stage, counters.completed, counters.skipped, counters.failed
            );
        }
        if !self.failures.is_empty() {
            println!("\n⚠️  Failures:");
            for failure in &self.failures {
                match failure.stage {
                    Some(stage) => println!(
                        "   - n°{} {} [{}]: {}",
                        failure.index, failure.name, stage, failure.reason
                    ),
                    None => println!("   - n°{}: {}", failure.index, failure.reason),
                }
            }
        }
        if self.stages.contains_key(&Stage::VerifyUpload) {
            if self.missing.is_empty() {
                println!("\n✅ No missing uploads!");
            } else {
                println!("\n❌ Missing uploads: {}", self.missing.join(", "));
            }
        }
        if !self.ready_for_relisting.is_empty() {
            println!(
                "\n🔄 Ready for re-listing: {}",
                self.ready_for_relisting.join(", ")
            );
        }
    }
}
