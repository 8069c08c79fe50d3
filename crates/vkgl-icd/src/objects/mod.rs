//! Resource objects the recording core reads from.
//!
//! These stay deliberately thin: GL names, creation parameters and the
//! bookkeeping recording needs (memory bindings, destruction dependents,
//! pipeline geometry caches). Creation goes through [`crate::Device`].

mod buffer;
mod descriptor;
mod image;
mod layout;
mod memory;
mod pipeline;
mod query;
mod render_pass;

pub use buffer::{Buffer, MemoryBinding};
pub use descriptor::{is_supported_descriptor_type, BufferRange, Descriptor, DescriptorSet};
pub use image::{texture_target, Image, ImageView, Sampler};
pub use layout::{
    DescriptorBinding, DescriptorSetLayout, LayoutCompatibility, PipelineLayout, PushConstantRange,
};
pub use memory::{DeviceMemory, MappedRange};
pub use pipeline::{
    geometry_key, ColorBlendDesc, ComputePipelineDesc, DepthStencilDesc, DynamicStates,
    GraphicsPipelineDesc, MultisampleDesc, Pipeline, PipelineVariant, RasterizationDesc,
    VertexAttributeDesc, VertexBindingDesc, VertexInputDesc,
};
pub use query::QueryPool;
pub use render_pass::{AttachmentDesc, Framebuffer, RenderPass, SubpassDesc};
