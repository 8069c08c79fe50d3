//! Command recording and replay core of the vkgl Vulkan driver.
//!
//! Vulkan command buffers are recorded into deferred lists of GL calls
//! ([`cmd::GlCmd`]). Recording consults a per-buffer [`state::ContextStateStack`]
//! so redundant GL state changes are never encoded. At submission time
//! [`Queue::submit`] takes the exclusive context lock and replays the lists
//! against the live GL context.
//!
//! Resource objects ([`objects`]) are thin: they own GL names and the host
//! shadow of mappable memory, nothing more.

pub mod cmd;
pub mod command_buffer;
pub mod config;
pub mod dependents;
pub mod device;
pub mod error;
pub mod format;
pub mod geometry;
pub mod handle;
pub mod objects;
pub mod queue;
pub mod replay;
pub mod report;
pub mod shader;
pub mod state;

pub use command_buffer::{CommandBuffer, RecordingState, SharedCommandBuffer};
pub use config::IcdConfig;
pub use device::Device;
pub use error::{IcdError, Result};
pub use queue::{Fence, Queue, WaitOutcome};
pub use report::{Category, CollectingReporter, Report, Reporter, Severity, TracingReporter};
