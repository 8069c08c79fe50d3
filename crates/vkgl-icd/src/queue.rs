//! Submission and CPU-side completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, trace};
use vkgl_gl::{client_wait, SyncWait};

use crate::command_buffer::{RecordingState, SharedCommandBuffer};
use crate::device::Device;
use crate::error::{IcdError, Result};
use crate::replay::Replayer;

/// Outcome of [`Fence::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    AlreadySignaled,
    SignaledAfterWait,
    TimedOut,
}

/// A GL sync object inserted at the end of a submission.
#[derive(Debug, Default)]
pub struct Fence {
    sync: Mutex<Option<u64>>,
    signaled: AtomicBool,
}

impl Fence {
    pub fn new(signaled: bool) -> Self {
        Self {
            sync: Mutex::new(None),
            signaled: AtomicBool::new(signaled),
        }
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    fn arm(&self, sync: u64) -> Option<u64> {
        self.signaled.store(false, Ordering::Release);
        self.sync_slot().replace(sync)
    }

    fn sync_slot(&self) -> std::sync::MutexGuard<'_, Option<u64>> {
        self.sync.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Blocks for at most `timeout_ns`. A fence that was never submitted and
    /// is not signaled times out immediately.
    pub fn wait(&self, device: &Device, timeout_ns: u64) -> Result<WaitOutcome> {
        if self.is_signaled() {
            return Ok(WaitOutcome::AlreadySignaled);
        }
        let Some(sync) = *self.sync_slot() else {
            return Ok(WaitOutcome::TimedOut);
        };

        let mut ctx = device.lock()?;
        let status = client_wait(ctx.gl(), sync, timeout_ns);
        trace!(sync, timeout_ns, ?status, "fence wait");
        let outcome = match status {
            SyncWait::AlreadySignaled => WaitOutcome::AlreadySignaled,
            SyncWait::ConditionSatisfied => WaitOutcome::SignaledAfterWait,
            SyncWait::TimeoutExpired => return Ok(WaitOutcome::TimedOut),
            SyncWait::Failed => return Err(IcdError::DeviceLost("glClientWaitSync failed".into())),
        };

        // A resubmission may have re-armed the fence while we waited.
        let mut slot = self.sync_slot();
        if *slot == Some(sync) {
            slot.take();
            ctx.gl().delete_sync(sync);
            self.signaled.store(true, Ordering::Release);
        }
        Ok(outcome)
    }

    /// `vkResetFences`.
    pub fn reset(&self, device: &Device) -> Result<()> {
        self.signaled.store(false, Ordering::Release);
        let stale = self.sync_slot().take();
        if let Some(sync) = stale {
            device.lock()?.gl().delete_sync(sync);
        }
        Ok(())
    }
}

/// The device queue. All queues of a device share its single GL context.
#[derive(Debug, Clone, Copy)]
pub struct Queue<'a> {
    device: &'a Device,
}

impl<'a> Queue<'a> {
    pub(crate) fn new(device: &'a Device) -> Self {
        Self { device }
    }

    /// `vkQueueSubmit` for one batch. Buffers replay in order: each one's
    /// recorded commands, then its after-submission commands.
    pub fn submit(
        &self,
        command_buffers: &[SharedCommandBuffer],
        fence: Option<&Fence>,
    ) -> Result<()> {
        let device = self.device;
        let config = device.config();
        let reporter = device.reporter();

        let mut ctx = device.lock()?;
        let (gl, backend) = ctx.split();
        let mut vaos = device.vaos();
        vaos.purge(gl, &device.geometry().take_retired());

        let mut replayed = 0usize;
        let mut errors = 0usize;
        for shared in command_buffers {
            let cb = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if cb.state() != RecordingState::Executable {
                reporter.validation(
                    Some(cb.id()),
                    format!("submitted command buffer is {:?}, not executable", cb.state()),
                );
                continue;
            }
            if !cb.is_primary() {
                reporter.validation(Some(cb.id()), "secondary command buffers cannot be submitted");
                continue;
            }

            let mut replayer = Replayer {
                gl: &mut *gl,
                backend: &mut *backend,
                vaos: &mut vaos,
                geometry: device.geometry(),
                memories: device.memories(),
                reporter,
                log_calls: config.log_gl_calls,
                check_errors: config.check_gl_errors,
            };
            errors += replayer.run(cb.commands().iter());
            errors += replayer.run(cb.after_commands().iter());
            trace!(cb = %cb.id(), commands = cb.commands().len(), "replayed command buffer");
            replayed += 1;
        }

        if let Some(fence) = fence {
            let sync = gl.fence_sync();
            if let Some(stale) = fence.arm(sync) {
                gl.delete_sync(stale);
            }
        }
        gl.flush();
        debug!(
            submitted = command_buffers.len(),
            replayed,
            errors,
            fence = fence.is_some(),
            "queue submit"
        );
        Ok(())
    }

    /// `vkQueueWaitIdle`.
    pub fn wait_idle(&self) -> Result<()> {
        self.device.lock()?.gl().finish();
        Ok(())
    }

    /// `vkQueuePresentKHR` for the window-system target.
    pub fn present(&self) -> Result<()> {
        self.device.lock()?.swap_buffers();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubmitted_fence_states() {
        assert!(Fence::new(true).is_signaled());
        assert!(!Fence::new(false).is_signaled());
        assert!(!Fence::default().is_signaled());
    }

    #[test]
    fn arming_clears_the_signal_and_returns_the_old_sync() {
        let fence = Fence::new(true);
        assert_eq!(fence.arm(3), None);
        assert!(!fence.is_signaled());
        assert_eq!(fence.arm(4), Some(3));
    }
}
