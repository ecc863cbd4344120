//! Error types for the resource pool

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::lease::Pooled;

/// Error type returned by lifecycle policy hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared form of a policy error, so it can be kept in the failure history
/// and still be handed back to the caller.
pub type HookError = Arc<dyn std::error::Error + Send + Sync>;

/// The lifecycle hook that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HookPhase {
    /// `LifecyclePolicy::create`
    Create,

    /// `LifecyclePolicy::on_acquire`
    Acquire,

    /// `LifecyclePolicy::on_return`
    Return,

    /// `LifecyclePolicy::on_destroy`
    Destroy,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Create => "create",
            HookPhase::Acquire => "on_acquire",
            HookPhase::Return => "on_return",
            HookPhase::Destroy => "on_destroy",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Pool has been disposed")]
    Disposed,

    #[error("Pool has not been configured")]
    Uninitialized,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource is not checked out from this pool")]
    ForeignObject,

    #[error("Lifecycle hook `{phase}` failed: {source}")]
    Hook {
        phase: HookPhase,
        #[source]
        source: HookError,
    },

    #[error("No scheduler installed - timed leases are unavailable")]
    SchedulerUnavailable,
}

impl PoolError {
    pub(crate) fn hook(phase: HookPhase, source: HookError) -> Self {
        PoolError::Hook { phase, source }
    }

    /// The lifecycle phase for hook failures, `None` for every other error.
    pub fn phase(&self) -> Option<HookPhase> {
        match self {
            PoolError::Hook { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Failure of [`Pool::try_release`](crate::Pool::try_release)
#[derive(Error, Debug)]
pub enum ReleaseError<T> {
    /// The lease belongs to another pool or is no longer checked out; it is
    /// handed back as is.
    #[error("Resource is not checked out from this pool")]
    Foreign(Pooled<T>),

    #[error(transparent)]
    Failed(#[from] PoolError),
}
