//! Geometry Buffers: vertex array objects built lazily from bindings.
//!
//! Recording only registers a [`VertexArrayLayout`] and gets an id back. The
//! GL vertex array itself is created on first use during replay, inside the
//! context that replays it, and deleted once the id has been retired and the
//! next submission purges it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use vkgl_gl::{DeviceBackend, GlApi, VertexArrayLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryBuffersId(pub u32);

#[derive(Debug, Default)]
struct Registry {
    next: u32,
    layouts: HashMap<GeometryBuffersId, VertexArrayLayout>,
    retired: Vec<GeometryBuffersId>,
}

/// Device-wide table of live geometry layouts.
#[derive(Debug, Default)]
pub struct GeometryRegistry {
    inner: Mutex<Registry>,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, layout: VertexArrayLayout) -> GeometryBuffersId {
        let mut inner = self.lock();
        inner.next += 1;
        let id = GeometryBuffersId(inner.next);
        inner.layouts.insert(id, layout);
        tracing::trace!(id = id.0, "registered geometry buffers");
        id
    }

    pub fn layout(&self, id: GeometryBuffersId) -> Option<VertexArrayLayout> {
        self.lock().layouts.get(&id).cloned()
    }

    pub fn contains(&self, id: GeometryBuffersId) -> bool {
        self.lock().layouts.contains_key(&id)
    }

    /// Forgets `id`; its vertex array is deleted at the next purge.
    pub fn retire(&self, id: GeometryBuffersId) {
        let mut inner = self.lock();
        if inner.layouts.remove(&id).is_some() {
            inner.retired.push(id);
        }
    }

    pub fn take_retired(&self) -> Vec<GeometryBuffersId> {
        std::mem::take(&mut self.lock().retired)
    }

    pub fn len(&self) -> usize {
        self.lock().layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Vertex arrays created in one GL context, keyed by geometry id.
#[derive(Debug, Default)]
pub struct VaoTable {
    vaos: HashMap<GeometryBuffersId, u32>,
}

impl VaoTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The vertex array for `id`, creating it on first use. `None` once the
    /// id has been retired.
    pub fn get_or_create(
        &mut self,
        gl: &mut dyn GlApi,
        backend: &mut DeviceBackend,
        registry: &GeometryRegistry,
        id: GeometryBuffersId,
    ) -> Option<u32> {
        if let Some(&vao) = self.vaos.get(&id) {
            return Some(vao);
        }
        let layout = registry.layout(id)?;
        let vao = backend.create_vertex_array(gl, &layout);
        tracing::debug!(id = id.0, vao, "created vertex array");
        self.vaos.insert(id, vao);
        Some(vao)
    }

    pub fn purge(&mut self, gl: &mut dyn GlApi, retired: &[GeometryBuffersId]) {
        for id in retired {
            if let Some(vao) = self.vaos.remove(id) {
                gl.delete_vertex_array(vao);
            }
        }
    }

    pub fn release(&mut self, gl: &mut dyn GlApi) {
        for (_, vao) in self.vaos.drain() {
            gl.delete_vertex_array(vao);
        }
    }

    pub fn len(&self) -> usize {
        self.vaos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkgl_gl::testing::RecordingGl;
    use vkgl_gl::BackendTier;

    #[test]
    fn vertex_arrays_are_created_once_and_purged_after_retire() {
        let (mut gl, log) = RecordingGl::new();
        let mut backend = DeviceBackend::new(BackendTier::Modern);
        let registry = GeometryRegistry::new();
        let mut vaos = VaoTable::new();

        let id = registry.register(VertexArrayLayout {
            element_buffer: 9,
            ..Default::default()
        });
        let first = vaos.get_or_create(&mut gl, &mut backend, &registry, id);
        let second = vaos.get_or_create(&mut gl, &mut backend, &registry, id);
        assert_eq!(first, second);
        assert_eq!(log.count("gen_vertex_array"), 1);

        registry.retire(id);
        let retired = registry.take_retired();
        assert_eq!(retired, vec![id]);
        vaos.purge(&mut gl, &retired);
        assert!(vaos.is_empty());
        assert_eq!(log.count("delete_vertex_array"), 1);
        assert_eq!(vaos.get_or_create(&mut gl, &mut backend, &registry, id), None);
    }
}
