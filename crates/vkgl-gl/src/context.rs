use std::sync::{Mutex, MutexGuard};

use crate::api::GlApi;
use crate::backend::DeviceBackend;
use crate::caps::{BackendTier, GlCapabilities, GlFeatures};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A thread panicked while holding the context; GL state is unknown.
    #[error("GL context lock poisoned")]
    Poisoned,
}

struct ContextInner {
    api: Box<dyn GlApi>,
    backend: DeviceBackend,
}

/// A GL context shared by every queue of one device.
///
/// GL contexts may only be current on one thread at a time, so all access goes
/// through [`GlContext::lock`], which makes the context current for the
/// lifetime of the returned guard.
pub struct GlContext {
    caps: GlCapabilities,
    inner: Mutex<ContextInner>,
}

impl std::fmt::Debug for GlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlContext").field("caps", &self.caps).finish_non_exhaustive()
    }
}

impl GlContext {
    /// Wraps `api`. The backend tier is fixed here: `tier` overrides the
    /// capability-derived choice when set.
    pub fn new(api: Box<dyn GlApi>, caps: GlCapabilities, tier: Option<BackendTier>) -> Self {
        let tier = tier.unwrap_or_else(|| caps.tier());
        tracing::debug!(?tier, major = caps.major, minor = caps.minor, "created GL context");
        Self {
            caps,
            inner: Mutex::new(ContextInner {
                api,
                backend: DeviceBackend::new(tier),
            }),
        }
    }

    pub fn caps(&self) -> &GlCapabilities {
        &self.caps
    }

    pub fn has(&self, features: GlFeatures) -> bool {
        self.caps.has(features)
    }

    pub fn lock(&self) -> Result<ContextGuard<'_>, ContextError> {
        let mut inner = self.inner.lock().map_err(|_| ContextError::Poisoned)?;
        inner.api.make_current();
        Ok(ContextGuard { inner })
    }
}

/// Scoped ownership of the current context. Dropping it releases the context
/// on every exit path, including unwinding.
pub struct ContextGuard<'a> {
    inner: MutexGuard<'a, ContextInner>,
}

impl ContextGuard<'_> {
    pub fn gl(&mut self) -> &mut dyn GlApi {
        self.inner.api.as_mut()
    }

    pub fn backend(&mut self) -> &mut DeviceBackend {
        &mut self.inner.backend
    }

    /// Both halves at once, for backend calls that need the raw API.
    pub fn split(&mut self) -> (&mut dyn GlApi, &mut DeviceBackend) {
        let inner = &mut *self.inner;
        (inner.api.as_mut(), &mut inner.backend)
    }

    pub fn swap_buffers(&mut self) {
        self.inner.api.swap_buffers();
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.inner.api.release_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGl;

    #[test]
    fn guard_makes_current_and_releases() {
        let (gl, log) = RecordingGl::new();
        let ctx = GlContext::new(Box::new(gl), GlCapabilities::default(), None);
        {
            let mut guard = ctx.lock().unwrap();
            guard.gl().flush();
        }
        assert_eq!(log.names(), vec!["make_current", "flush", "release_current"]);
    }

    #[test]
    fn tier_override_wins() {
        let (gl, _log) = RecordingGl::new();
        let ctx = GlContext::new(
            Box::new(gl),
            GlCapabilities::for_core_version(4, 6),
            Some(BackendTier::Legacy),
        );
        assert_eq!(ctx.lock().unwrap().backend().tier(), BackendTier::Legacy);
    }

    #[test]
    fn panic_while_locked_poisons() {
        let (gl, _log) = RecordingGl::new();
        let gl_context = GlContext::new(Box::new(gl), GlCapabilities::default(), None);
        let ctx = std::sync::Arc::new(gl_context);
        let worker = ctx.clone();
        let _ = std::thread::spawn(move || {
            let _guard = worker.lock().unwrap();
            panic!("replay failed");
        })
        .join();
        assert!(matches!(ctx.lock(), Err(ContextError::Poisoned)));
    }
}
