//! Ordered execution of merge steps
//!
//! Steps run strictly in order and the first failure stops the run. Nothing
//! is rolled back: the backup library left by the `backup` step is what
//! `restore` returns to.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{DeployError, Result};
use super::fsops;
use super::layout::Layout;
use super::steps::Step;

/// Progress notifications emitted while running
#[derive(Debug)]
pub enum Event<'a> {
    Started {
        index: usize,
        total: usize,
        step: &'a Step,
        description: String,
    },
    Finished {
        index: usize,
        summary: &'a str,
    },
    Failed {
        index: usize,
        error: &'a DeployError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
    Skipped,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub kind: String,
    pub status: Status,
    pub message: String,
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub run_id: String,
    pub profile: String,
    /// "deploy" or "restore"
    pub action: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub steps: Vec<StepRecord>,
}

impl DeployReport {
    pub fn new(profile: &str, action: &str) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            profile: profile.to_string(),
            action: action.to_string(),
            started_at: chrono::Utc::now().timestamp(),
            finished_at: 0,
            steps: Vec::new(),
        }
    }

    /// The step that stopped the run
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == Status::Failed)
    }

    pub fn status(&self) -> Status {
        if self.failed_step().is_some() {
            Status::Failed
        } else {
            Status::Ok
        }
    }

    fn finish(&mut self) {
        self.finished_at = chrono::Utc::now().timestamp();
    }
}

/// A profile's steps bound to its resolved layout
pub struct Pipeline<'a> {
    profile: &'a str,
    layout: &'a Layout,
    steps: &'a [Step],
}

impl<'a> Pipeline<'a> {
    /// Bind steps to a layout, rejecting invalid step arguments
    pub fn new(profile: &'a str, layout: &'a Layout, steps: &'a [Step]) -> Result<Self> {
        for step in steps {
            step.validate()?;
        }
        Ok(Self {
            profile,
            layout,
            steps,
        })
    }

    /// Check the inputs no step produces before anything is touched
    pub fn preflight(&self) -> Result<()> {
        fsops::require_dir(&self.layout.project_dir)?;
        fsops::require_dir(&self.layout.new_library)?;

        if self.has(|s| matches!(s, Step::Backup)) {
            fsops::require_dir(&self.layout.library())?;
        }
        if self.has(|s| matches!(s, Step::ReplaceManifest)) {
            let template = self
                .layout
                .manifest_template
                .as_deref()
                .ok_or(DeployError::NoManifestTemplate)?;
            fsops::require_file(template)?;
        }
        if self.has(|s| matches!(s, Step::OrganizeLibs(_))) && self.layout.app_libs_dir.is_none()
        {
            return Err(DeployError::AppLibsDirNotSet);
        }
        Ok(())
    }

    fn has(&self, pred: impl Fn(&Step) -> bool) -> bool {
        self.steps.iter().any(pred)
    }

    /// Numbered descriptions of every step
    pub fn plan(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| s.describe(self.layout))
            .collect()
    }

    /// Run every step in order, stopping at the first failure
    pub fn run(&self, mut on_event: impl FnMut(Event<'_>)) -> DeployReport {
        let mut report = DeployReport::new(self.profile, "deploy");
        let total = self.steps.len();
        info!(profile = self.profile, total, "starting deployment");

        for (index, step) in self.steps.iter().enumerate() {
            on_event(Event::Started {
                index,
                total,
                step,
                description: step.describe(self.layout),
            });

            match step.run(self.layout) {
                Ok(summary) => {
                    on_event(Event::Finished {
                        index,
                        summary: &summary,
                    });
                    report.steps.push(StepRecord {
                        index,
                        kind: step.kind().to_string(),
                        status: Status::Ok,
                        message: summary,
                    });
                }
                Err(error) => {
                    warn!(index, kind = step.kind(), %error, "step failed");
                    on_event(Event::Failed {
                        index,
                        error: &error,
                    });
                    report.steps.push(StepRecord {
                        index,
                        kind: step.kind().to_string(),
                        status: Status::Failed,
                        message: error.to_string(),
                    });
                    for (skipped, rest) in self.steps.iter().enumerate().skip(index + 1) {
                        report.steps.push(StepRecord {
                            index: skipped,
                            kind: rest.kind().to_string(),
                            status: Status::Skipped,
                            message: String::new(),
                        });
                    }
                    break;
                }
            }
        }

        report.finish();
        report
    }
}

/// Put the backup library back in place of the deployed one
pub fn restore(profile: &str, layout: &Layout) -> DeployReport {
    let mut report = DeployReport::new(profile, "restore");
    let result = fsops::require_dir(&layout.backup())
        .and_then(|_| fsops::rename_dir(&layout.backup(), &layout.library()));

    let (status, message) = match result {
        Ok(()) => (
            Status::Ok,
            format!("{} -> {}", layout.backup_name, layout.library_name),
        ),
        Err(e) => (Status::Failed, e.to_string()),
    };
    report.steps.push(StepRecord {
        index: 0,
        kind: "restore".to_string(),
        status,
        message,
    });
    report.finish();
    report
}
