use ash::vk;
use thiserror::Error;
use vkgl_gl::ContextError;

/// Hard failures that surface to the application as a `VkResult`.
///
/// Recoverable conditions never end up here; they go through
/// [`crate::report::Reporter`] and recording continues.
#[derive(Debug, Error)]
pub enum IcdError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("out of host memory")]
    OutOfHostMemory,
    #[error("device lost: {0}")]
    DeviceLost(String),
    #[error("invalid {kind:?} handle {raw:#x}")]
    InvalidHandle { kind: vk::ObjectType, raw: u64 },
    #[error("memory {raw:#x} is not host visible")]
    MemoryMapFailed { raw: u64 },
    #[error("format {0:?} has no GL equivalent")]
    UnsupportedFormat(vk::Format),
    #[error("command buffer is {actual:?}, expected {expected:?}")]
    InvalidCommandBufferState {
        expected: crate::RecordingState,
        actual: crate::RecordingState,
    },
}

impl IcdError {
    pub fn vk_result(&self) -> vk::Result {
        match self {
            IcdError::Context(_) | IcdError::DeviceLost(_) => vk::Result::ERROR_DEVICE_LOST,
            IcdError::OutOfHostMemory => vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            IcdError::InvalidHandle { .. } => vk::Result::ERROR_UNKNOWN,
            IcdError::MemoryMapFailed { .. } => vk::Result::ERROR_MEMORY_MAP_FAILED,
            IcdError::UnsupportedFormat(_) => vk::Result::ERROR_FORMAT_NOT_SUPPORTED,
            IcdError::InvalidCommandBufferState { .. } => vk::Result::ERROR_VALIDATION_FAILED_EXT,
        }
    }
}

pub type Result<T, E = IcdError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_context_is_device_lost() {
        let err = IcdError::from(ContextError::Poisoned);
        assert_eq!(err.vk_result(), vk::Result::ERROR_DEVICE_LOST);
        assert_eq!(err.to_string(), "GL context lock poisoned");
    }
}
