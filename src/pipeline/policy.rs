//! Which stages run, which checkpoint files they use, and which source file
//! names they accept.

use clap::ValueEnum;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{CHECKPOINT_EXTENSION, SALE_SUFFIX, UPLOADED_SUFFIX, VERIFIED_SUFFIX};
use crate::error::{ListerError, Result};
use crate::pipeline::ingestion::SourceFormat;

/// One phase of the workflow. Declaration order is execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    VerifyUpload,
    Sell,
    VerifySale,
    Remove,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Upload,
        Stage::VerifyUpload,
        Stage::Sell,
        Stage::VerifySale,
        Stage::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::VerifyUpload => "verify_upload",
            Stage::Sell => "sell",
            Stage::VerifySale => "verify_sale",
            Stage::Remove => "remove",
        }
    }

    /// Suffix of the checkpoint file this stage writes; `None` for stages
    /// that always run.
    pub fn checkpoint_suffix(&self) -> Option<&'static str> {
        match self {
            Stage::Upload => Some(UPLOADED_SUFFIX),
            Stage::VerifyUpload => Some(VERIFIED_SUFFIX),
            Stage::Sell => Some(SALE_SUFFIX),
            Stage::VerifySale | Stage::Remove => None,
        }
    }

    pub fn is_checkpointed(&self) -> bool {
        self.checkpoint_suffix().is_some()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-empty set of requested stages, iterated in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet(BTreeSet<Stage>);

impl ActionSet {
    pub fn new(stages: impl IntoIterator<Item = Stage>) -> Result<Self> {
        let set: BTreeSet<Stage> = stages.into_iter().collect();
        if set.is_empty() {
            return Err(ListerError::Config(
                "at least one action must be requested".to_string(),
            ));
        }
        Ok(Self(set))
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|s| s.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Checkpoint suffix carried by a source file name, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSuffix {
    None,
    Uploaded,
    Verified,
    Sale,
}

impl SourceSuffix {
    fn of_stem(stem: &str) -> (Self, &str) {
        for (suffix, kind) in [
            (UPLOADED_SUFFIX, SourceSuffix::Uploaded),
            (VERIFIED_SUFFIX, SourceSuffix::Verified),
            (SALE_SUFFIX, SourceSuffix::Sale),
        ] {
            if let Some(base) = stem
                .strip_suffix(suffix)
                .and_then(|rest| rest.strip_suffix('_'))
            {
                if !base.is_empty() {
                    return (kind, base);
                }
            }
        }
        (SourceSuffix::None, stem)
    }
}

/// Resolved plan for one run: the source file, its format, and the checkpoint
/// file of every requested checkpointed stage.
#[derive(Debug, Clone)]
pub struct StagePlan {
    pub source: PathBuf,
    pub format: SourceFormat,
    pub actions: ActionSet,
    pub suffix: SourceSuffix,
    base: String,
    checkpoints: BTreeMap<Stage, PathBuf>,
}

impl StagePlan {
    /// Checks the source file name against the requested actions.
    ///
    /// A stage's naming requirement is waived when an earlier requested stage
    /// produces its input during the same run.
    pub fn resolve(actions: ActionSet, source: &Path) -> Result<Self> {
        let format = SourceFormat::from_path(source)?;
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ListerError::Config(format!("invalid source file name: {}", source.display()))
            })?;
        let (suffix, base) = SourceSuffix::of_stem(stem);

        for stage in actions.iter() {
            check_naming(stage, &actions, suffix, source)?;
        }

        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        let checkpoints = checkpoint_paths(&actions, dir, base);

        Ok(Self {
            source: source.to_path_buf(),
            format,
            actions,
            suffix,
            base: base.to_string(),
            checkpoints,
        })
    }

    /// Plan covering every checkpointed stage with no naming checks, for
    /// read-only progress reports.
    pub fn inspect(source: &Path) -> Result<Self> {
        let format = SourceFormat::from_path(source)?;
        let stem = source.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
            ListerError::Config(format!("invalid source file name: {}", source.display()))
        })?;
        let (suffix, base) = SourceSuffix::of_stem(stem);
        let actions = ActionSet::new(Stage::ORDER.into_iter().filter(Stage::is_checkpointed))?;
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        let checkpoints = checkpoint_paths(&actions, dir, base);
        Ok(Self {
            source: source.to_path_buf(),
            format,
            actions,
            suffix,
            base: base.to_string(),
            checkpoints,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn checkpoint_path(&self, stage: Stage) -> Option<&Path> {
        self.checkpoints.get(&stage).map(PathBuf::as_path)
    }

    pub fn checkpoints(&self) -> impl Iterator<Item = (Stage, &Path)> {
        self.checkpoints.iter().map(|(s, p)| (*s, p.as_path()))
    }
}

fn checkpoint_paths(actions: &ActionSet, dir: &Path, base: &str) -> BTreeMap<Stage, PathBuf> {
    actions
        .iter()
        .filter_map(|stage| {
            stage.checkpoint_suffix().map(|suffix| {
                let name = format!("{}_{}.{}", base, suffix, CHECKPOINT_EXTENSION);
                (stage, dir.join(name))
            })
        })
        .collect()
}

fn check_naming(
    stage: Stage,
    actions: &ActionSet,
    suffix: SourceSuffix,
    source: &Path,
) -> Result<()> {
    let ok = match stage {
        Stage::Upload => suffix == SourceSuffix::None,
        Stage::VerifyUpload => {
            actions.contains(Stage::Upload) || suffix == SourceSuffix::Uploaded
        }
        Stage::Sell => {
            actions.contains(Stage::Upload)
                || actions.contains(Stage::VerifyUpload)
                || matches!(suffix, SourceSuffix::Verified | SourceSuffix::Sale)
        }
        Stage::VerifySale => suffix == SourceSuffix::Sale,
        Stage::Remove => actions.contains(Stage::Upload) || suffix != SourceSuffix::None,
    };
    if ok {
        return Ok(());
    }

    let expected = match stage {
        Stage::Upload => "a file without an _uploaded, _verified or _sale suffix",
        Stage::VerifyUpload => "a file ending in _uploaded",
        Stage::Sell => "a file ending in _verified or _sale",
        Stage::VerifySale => "a file ending in _sale",
        Stage::Remove => "a file ending in _uploaded, _verified or _sale",
    };
    Err(ListerError::Config(format!(
        "{} requires {}, got {}",
        stage,
        expected,
        source.display()
    )))
}
