//! Per-call lifecycle shared by both entry points.
//!
//! Every call walks the same stages:
//!
//! ```text
//! Start -> Validating -> Building | Querying -> Success | Failed -> Cleanup -> Return
//!          Validating -> Failed
//! ```
//!
//! The call body owns its resources (descriptor, argument list) as locals,
//! so they are released when the body returns, before [`Invocation::finish`]
//! runs. `finish` is the single place an [`ErrorRecord`] becomes a
//! [`ClientError`].

use std::fmt;

use crate::error::{ClientError, ErrorRecord, ErrorReporter};

/// The public operation an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Background scan submission.
    ScanApply,
    /// Background scan status query.
    ScanInfo,
}

impl Operation {
    /// The working stage of this operation.
    pub fn work_stage(self) -> Stage {
        match self {
            Self::ScanApply => Stage::Building,
            Self::ScanInfo => Stage::Querying,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanApply => write!(f, "scan_apply"),
            Self::ScanInfo => write!(f, "scan_info"),
        }
    }
}

/// Lifecycle stage of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Call entered.
    Start,
    /// Checking caller input.
    Validating,
    /// Assembling and submitting a job.
    Building,
    /// Querying job status.
    Querying,
    /// Work finished with a value.
    Success,
    /// Work stopped at the first failure.
    Failed,
    /// Releasing untransferred resources.
    Cleanup,
    /// Handing the outcome back.
    Return,
}

impl Stage {
    /// Returns `true` if moving from this stage to `next` is allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use scan_jobs::invocation::Stage;
    ///
    /// assert!(Stage::Validating.can_advance_to(Stage::Failed));
    /// assert!(Stage::Failed.can_advance_to(Stage::Cleanup));
    /// assert!(!Stage::Failed.can_advance_to(Stage::Return));
    /// ```
    pub fn can_advance_to(self, next: Stage) -> bool {
        match self {
            Self::Start => next == Self::Validating,
            Self::Validating => matches!(next, Self::Building | Self::Querying | Self::Failed),
            Self::Building | Self::Querying => matches!(next, Self::Success | Self::Failed),
            Self::Success | Self::Failed => next == Self::Cleanup,
            Self::Cleanup => next == Self::Return,
            Self::Return => false,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Validating => "validating",
            Self::Building => "building",
            Self::Querying => "querying",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cleanup => "cleanup",
            Self::Return => "return",
        };
        f.write_str(name)
    }
}

/// Stage tracker for one call.
#[derive(Debug)]
pub struct Invocation {
    operation: Operation,
    stage: Stage,
}

impl Invocation {
    /// Starts a call and moves it into [`Stage::Validating`].
    pub fn start(operation: Operation) -> Self {
        let mut invocation = Self {
            operation,
            stage: Stage::Start,
        };
        invocation.enter(Stage::Validating);
        invocation
    }

    /// The current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The operation being run.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Moves into the operation's working stage.
    pub fn begin_work(&mut self) {
        self.enter(self.operation.work_stage());
    }

    fn enter(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage transition {} -> {next}",
            self.stage
        );
        tracing::debug!(operation = %self.operation, from = %self.stage, to = %next, "stage");
        self.stage = next;
    }

    /// Completes the call: records the outcome, runs cleanup, and reports
    /// the first failure (if any) as a [`ClientError`].
    pub fn finish<T>(mut self, outcome: Result<T, ErrorRecord>) -> Result<T, ClientError> {
        match &outcome {
            Ok(_) => self.enter(Stage::Success),
            Err(record) => {
                tracing::warn!(
                    operation = %self.operation,
                    stage = %self.stage,
                    code = %record.code,
                    error = %record.message,
                    "call failed"
                );
                self.enter(Stage::Failed);
            },
        }
        self.enter(Stage::Cleanup);
        self.enter(Stage::Return);
        outcome.map_err(ErrorReporter::report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn success_path() {
        let mut inv = Invocation::start(Operation::ScanApply);
        assert_eq!(inv.stage(), Stage::Validating);
        inv.begin_work();
        assert_eq!(inv.stage(), Stage::Building);
        assert_eq!(inv.finish::<u64>(Ok(5)).unwrap(), 5);
    }

    #[test]
    fn failure_during_validation_skips_work() {
        let inv = Invocation::start(Operation::ScanInfo);
        let err = inv
            .finish::<()>(Err(ErrorRecord::invalid_param("invalid client object")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParam);
        assert_eq!(err.message, "invalid client object");
    }

    #[test]
    fn query_stage_for_scan_info() {
        let mut inv = Invocation::start(Operation::ScanInfo);
        inv.begin_work();
        assert_eq!(inv.stage(), Stage::Querying);
        assert_eq!(inv.operation(), Operation::ScanInfo);
    }

    #[test]
    fn transitions() {
        assert!(Stage::Start.can_advance_to(Stage::Validating));
        assert!(!Stage::Start.can_advance_to(Stage::Building));
        assert!(Stage::Building.can_advance_to(Stage::Failed));
        assert!(!Stage::Building.can_advance_to(Stage::Querying));
        assert!(Stage::Cleanup.can_advance_to(Stage::Return));
        assert!(!Stage::Return.can_advance_to(Stage::Start));
    }
}
