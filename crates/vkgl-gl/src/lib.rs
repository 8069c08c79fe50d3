//! `vkgl-gl` is the OpenGL side of the vkgl driver.
//!
//! Currently this crate provides:
//! - The raw GL entry-point surface the command replayer calls into (see [`GlApi`]).
//! - Capability probing results and the legacy/modern backend split
//!   (see [`GlCapabilities`] and [`DeviceBackend`]).
//! - The exclusive, scoped context lock (see [`GlContext`]).
//!
//! Context creation per window system is owned by the platform layer; it hands
//! this crate a ready-to-use [`GlApi`] implementation.

mod api;
mod backend;
mod caps;
mod context;
mod scratch;
mod sync;

pub mod consts;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use api::GlApi;
pub use backend::{
    DeviceBackend, LegacyBackend, ModernBackend, TextureSubresource, UniformValue,
    VertexArrayLayout, VertexAttribLayout, VertexBindingLayout,
};
pub use caps::{BackendTier, GlCapabilities, GlFeatures};
pub use context::{ContextError, ContextGuard, GlContext};
pub use scratch::ScratchFramebuffers;
pub use sync::{client_wait, SyncWait};
