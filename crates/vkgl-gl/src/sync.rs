use crate::api::GlApi;
use crate::consts;

/// Outcome of waiting on a GL sync object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncWait {
    /// Signaled before the wait started.
    AlreadySignaled,
    /// Signaled during the wait.
    ConditionSatisfied,
    TimeoutExpired,
    /// `GL_WAIT_FAILED`, or an unknown status. The context is unusable.
    Failed,
}

impl SyncWait {
    pub fn from_gl(status: u32) -> Self {
        match status {
            consts::ALREADY_SIGNALED => Self::AlreadySignaled,
            consts::CONDITION_SATISFIED => Self::ConditionSatisfied,
            consts::TIMEOUT_EXPIRED => Self::TimeoutExpired,
            _ => Self::Failed,
        }
    }

    pub fn is_signaled(self) -> bool {
        matches!(self, Self::AlreadySignaled | Self::ConditionSatisfied)
    }
}

/// Blocks on `sync` for up to `timeout_ns`, flushing pending commands first so
/// the wait can complete.
pub fn client_wait(gl: &mut dyn GlApi, sync: u64, timeout_ns: u64) -> SyncWait {
    let status = gl.client_wait_sync(sync, consts::SYNC_FLUSH_COMMANDS_BIT, timeout_ns);
    let wait = SyncWait::from_gl(status);
    if wait == SyncWait::Failed {
        tracing::warn!(status = format_args!("{status:#x}"), "glClientWaitSync failed");
    }
    wait
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_gl_statuses() {
        assert_eq!(SyncWait::from_gl(consts::ALREADY_SIGNALED), SyncWait::AlreadySignaled);
        assert_eq!(SyncWait::from_gl(consts::CONDITION_SATISFIED), SyncWait::ConditionSatisfied);
        assert_eq!(SyncWait::from_gl(consts::TIMEOUT_EXPIRED), SyncWait::TimeoutExpired);
        assert_eq!(SyncWait::from_gl(consts::WAIT_FAILED), SyncWait::Failed);
        assert_eq!(SyncWait::from_gl(0), SyncWait::Failed);
        assert!(!SyncWait::TimeoutExpired.is_signaled());
    }
}
