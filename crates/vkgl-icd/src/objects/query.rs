use ash::vk;

use crate::dependents::ObjectId;
use crate::handle::DeviceObject;

/// One GL query object per pool slot.
#[derive(Debug)]
pub struct QueryPool {
    handle: vk::QueryPool,
    query_type: vk::QueryType,
    gl_names: Vec<u32>,
}

impl DeviceObject for QueryPool {
    type Handle = vk::QueryPool;

    fn handle(&self) -> vk::QueryPool {
        self.handle
    }
}

impl QueryPool {
    pub fn new(handle: vk::QueryPool, query_type: vk::QueryType, gl_names: Vec<u32>) -> Self {
        Self {
            handle,
            query_type,
            gl_names,
        }
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.handle)
    }

    pub fn query_type(&self) -> vk::QueryType {
        self.query_type
    }

    pub fn len(&self) -> u32 {
        self.gl_names.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.gl_names.is_empty()
    }

    pub fn gl_name(&self, query: u32) -> Option<u32> {
        self.gl_names.get(query as usize).copied()
    }

    pub fn gl_names(&self) -> &[u32] {
        &self.gl_names
    }
}
