//! The device: one GL context plus everything recorded against it.

use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;
use tracing::{debug, warn};
use vkgl_gl::consts as gl;
use vkgl_gl::{
    BackendTier, ContextGuard, GlApi, GlCapabilities, GlContext, GlFeatures, VertexArrayLayout,
};

use crate::command_buffer::{CommandBuffer, RecordEnv, SharedCommandBuffer};
use crate::config::IcdConfig;
use crate::dependents::ObjectId;
use crate::error::{IcdError, Result};
use crate::format::format_info;
use crate::geometry::{GeometryBuffersId, GeometryRegistry, VaoTable};
use crate::handle::{HandleAllocator, HandleTable};
use crate::objects::{
    texture_target, AttachmentDesc, Buffer, ComputePipelineDesc, DescriptorBinding, DescriptorSet,
    DescriptorSetLayout, DeviceMemory, Framebuffer, GraphicsPipelineDesc, Image, ImageView,
    MappedRange, Pipeline,
    PipelineLayout, PushConstantRange, QueryPool, RenderPass, Sampler, SubpassDesc,
};
use crate::queue::Queue;
use crate::report::{Category, Reporter};
use crate::shader::{CompileRequest, CompiledProgram, ShaderCompiler, ShaderError, ShaderStage};
use crate::state::translate;

/// Indices of the single triangle drawn by pipelines without vertex input.
const DUMMY_INDICES: [u32; 3] = [0, 1, 2];

/// `VkImageCreateInfo`, reduced to what the GL texture needs.
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub image_type: vk::ImageType,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: u32,
    pub cube_compatible: bool,
}

impl ImageDesc {
    /// Single-level, single-sample 2D image.
    pub fn new_2d(format: vk::Format, width: u32, height: u32) -> Self {
        Self {
            image_type: vk::ImageType::TYPE_2D,
            format,
            extent: vk::Extent3D { width, height, depth: 1 },
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
            cube_compatible: false,
        }
    }
}

pub struct Device {
    context: GlContext,
    config: IcdConfig,
    reporter: Arc<dyn Reporter>,
    compiler: Arc<dyn ShaderCompiler>,
    handles: HandleAllocator,
    env: Arc<RecordEnv>,
    geometry: Arc<GeometryRegistry>,
    vaos: Mutex<VaoTable>,
    dummy_index_buffer: u32,
    memories: HandleTable<DeviceMemory>,
    buffers: HandleTable<Buffer>,
    images: HandleTable<Image>,
    pipelines: HandleTable<Pipeline>,
    query_pools: HandleTable<QueryPool>,
    command_buffers: HandleTable<Mutex<CommandBuffer>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("context", &self.context)
            .field("config", &self.config)
            .field("memories", &self.memories.len())
            .field("command_buffers", &self.command_buffers.len())
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Wraps a ready GL context. The backend tier is chosen here once and
    /// never changes for the lifetime of the device.
    pub fn new(
        api: Box<dyn GlApi>,
        caps: GlCapabilities,
        config: IcdConfig,
        reporter: Arc<dyn Reporter>,
        compiler: Arc<dyn ShaderCompiler>,
    ) -> Result<Self> {
        let tier = config.force_legacy_backend.then_some(BackendTier::Legacy);
        let context = GlContext::new(api, caps, tier);

        let dummy_index_buffer = {
            let mut ctx = context.lock()?;
            let gl = ctx.gl();
            let buffer = gl.gen_buffer();
            gl.bind_buffer(gl::COPY_WRITE_BUFFER, buffer);
            gl.buffer_data(
                gl::COPY_WRITE_BUFFER,
                bytemuck::cast_slice(&DUMMY_INDICES),
                gl::STATIC_DRAW,
            );
            gl.bind_buffer(gl::COPY_WRITE_BUFFER, 0);
            buffer
        };

        let geometry = Arc::new(GeometryRegistry::new());
        let dummy_geometry = geometry.register(VertexArrayLayout {
            element_buffer: dummy_index_buffer,
            ..Default::default()
        });
        let env = Arc::new(RecordEnv {
            features: caps.features,
            reporter: reporter.clone(),
            default_state: config.default_state.clone(),
            dummy_geometry,
            geometry: geometry.clone(),
        });
        debug!(
            major = caps.major,
            minor = caps.minor,
            features = ?caps.features,
            dummy_index_buffer,
            "created device"
        );

        Ok(Self {
            context,
            config,
            reporter,
            compiler,
            handles: HandleAllocator::default(),
            env,
            geometry,
            vaos: Mutex::new(VaoTable::new()),
            dummy_index_buffer,
            memories: HandleTable::default(),
            buffers: HandleTable::default(),
            images: HandleTable::default(),
            pipelines: HandleTable::default(),
            query_pools: HandleTable::default(),
            command_buffers: HandleTable::default(),
        })
    }

    pub fn context(&self) -> &GlContext {
        &self.context
    }

    pub fn lock(&self) -> Result<ContextGuard<'_>> {
        Ok(self.context.lock()?)
    }

    pub fn config(&self) -> &IcdConfig {
        &self.config
    }

    pub fn features(&self) -> GlFeatures {
        self.env.features
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub fn record_env(&self) -> &Arc<RecordEnv> {
        &self.env
    }

    pub fn geometry(&self) -> &GeometryRegistry {
        &self.geometry
    }

    pub fn dummy_geometry(&self) -> GeometryBuffersId {
        self.env.dummy_geometry
    }

    pub fn dummy_index_buffer(&self) -> u32 {
        self.dummy_index_buffer
    }

    pub fn memories(&self) -> &HandleTable<DeviceMemory> {
        &self.memories
    }

    pub fn queue(&self) -> Queue<'_> {
        Queue::new(self)
    }

    pub(crate) fn vaos(&self) -> MutexGuard<'_, VaoTable> {
        self.vaos.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `vkAllocateMemory`. Every allocation gets a GL buffer of the full size.
    pub fn allocate_memory(&self, size: u64, host_visible: bool) -> Result<Arc<DeviceMemory>> {
        let len = usize::try_from(size).map_err(|_| IcdError::OutOfHostMemory)?;
        let mut zeros = Vec::new();
        zeros.try_reserve_exact(len).map_err(|_| IcdError::OutOfHostMemory)?;
        zeros.resize(len, 0u8);

        let gl_buffer = {
            let mut ctx = self.lock()?;
            let gl = ctx.gl();
            let buffer = gl.gen_buffer();
            gl.bind_buffer(gl::COPY_WRITE_BUFFER, buffer);
            gl.buffer_data(gl::COPY_WRITE_BUFFER, &zeros, gl::DYNAMIC_DRAW);
            gl.bind_buffer(gl::COPY_WRITE_BUFFER, 0);
            buffer
        };
        let handle = self.handles.next();
        let memory = Arc::new(DeviceMemory::new(handle, gl_buffer, size, host_visible));
        debug!(memory = %memory.id(), size, host_visible, gl_buffer, "allocated memory");
        Ok(self.memories.insert(memory))
    }

    /// `vkFreeMemory`. Dependents are notified before the GL buffer goes away.
    pub fn free_memory(&self, handle: vk::DeviceMemory) -> Result<()> {
        let Some(memory) = self.memories.remove(handle) else {
            return Ok(());
        };
        memory.dependents().notify(memory.id());
        self.lock()?.gl().delete_buffer(memory.gl_buffer());
        debug!(memory = %memory.id(), "freed memory");
        Ok(())
    }

    pub fn map_memory(
        &self,
        handle: vk::DeviceMemory,
        offset: u64,
        size: u64,
    ) -> Result<MappedRange> {
        self.memories.resolve(handle)?.map(offset, size)
    }

    pub fn unmap_memory(&self, handle: vk::DeviceMemory) -> Result<()> {
        self.memories.resolve(handle)?.unmap();
        Ok(())
    }

    /// `vkFlushMappedMemoryRanges`: host writes reach the GL buffer now.
    pub fn flush_mapped_memory(
        &self,
        handle: vk::DeviceMemory,
        offset: u64,
        size: u64,
    ) -> Result<()> {
        let memory = self.memories.resolve(handle)?;
        let bytes = memory.read(offset, mapped_len(&memory, offset, size));
        let mut ctx = self.lock()?;
        let (gl, backend) = ctx.split();
        backend.upload_buffer(gl, memory.gl_buffer(), offset, &bytes);
        Ok(())
    }

    /// `vkInvalidateMappedMemoryRanges`: GL buffer contents reach the host now.
    pub fn invalidate_mapped_memory(
        &self,
        handle: vk::DeviceMemory,
        offset: u64,
        size: u64,
    ) -> Result<()> {
        let memory = self.memories.resolve(handle)?;
        let mut bytes = vec![0u8; mapped_len(&memory, offset, size)];
        {
            let mut ctx = self.lock()?;
            let (gl, backend) = ctx.split();
            backend.download_buffer(gl, memory.gl_buffer(), offset, &mut bytes);
        }
        memory.write(offset, &bytes);
        Ok(())
    }

    pub fn create_buffer(&self, size: u64, usage: vk::BufferUsageFlags) -> Arc<Buffer> {
        self.buffers.insert(Arc::new(Buffer::new(self.handles.next(), size, usage)))
    }

    /// `vkBindBufferMemory`.
    pub fn bind_buffer_memory(&self, buffer: &Buffer, memory: &Arc<DeviceMemory>, offset: u64) {
        if !buffer.bind_memory(memory.clone(), offset) {
            self.reporter()
                .validation(Some(buffer.id()), "buffer is already bound to memory");
        }
    }

    /// `vkDestroyBuffer`. Pipelines caching geometry over the buffer drop it.
    pub fn destroy_buffer(&self, handle: vk::Buffer) {
        if let Some(buffer) = self.buffers.remove(handle) {
            buffer.dependents().notify(buffer.id());
        }
    }

    pub fn create_image(&self, desc: &ImageDesc) -> Result<Arc<Image>> {
        let info = format_info(desc.format).ok_or(IcdError::UnsupportedFormat(desc.format))?;
        let target = texture_target(
            desc.image_type,
            desc.array_layers,
            desc.samples,
            desc.cube_compatible,
        );
        let vk::Extent3D { width, height, depth } = desc.extent;
        let storage_extent = match target {
            gl::TEXTURE_1D_ARRAY => [width, desc.array_layers, 1],
            gl::TEXTURE_2D_ARRAY
            | gl::TEXTURE_CUBE_MAP_ARRAY
            | gl::TEXTURE_2D_MULTISAMPLE_ARRAY => {
                [width, height, desc.array_layers]
            }
            gl::TEXTURE_3D => [width, height, depth],
            _ => [width, height, 1],
        };

        let texture = {
            let mut ctx = self.lock()?;
            let gl = ctx.gl();
            let texture = gl.gen_texture();
            gl.bind_texture(target, texture);
            gl.tex_storage(
                target,
                desc.mip_levels,
                info.internal_format,
                storage_extent,
                desc.samples,
            );
            gl.bind_texture(target, 0);
            texture
        };
        let image = Arc::new(Image::new(
            self.handles.next(),
            texture,
            target,
            desc.format,
            info,
            desc.extent,
            desc.mip_levels,
            desc.array_layers,
            desc.samples,
        ));
        Ok(self.images.insert(image))
    }

    pub fn destroy_image(&self, handle: vk::Image) -> Result<()> {
        if let Some(image) = self.images.remove(handle) {
            self.lock()?.gl().delete_texture(image.gl_name());
        }
        Ok(())
    }

    pub fn create_image_view(
        &self,
        image: &Arc<Image>,
        format: vk::Format,
        range: vk::ImageSubresourceRange,
    ) -> Result<Arc<ImageView>> {
        let info = format_info(format).ok_or(IcdError::UnsupportedFormat(format))?;
        Ok(Arc::new(ImageView::new(self.handles.next(), image.clone(), format, info, range)))
    }

    pub fn create_sampler(
        &self,
        mag: vk::Filter,
        min: vk::Filter,
        mipmap: vk::SamplerMipmapMode,
        address: vk::SamplerAddressMode,
    ) -> Result<Arc<Sampler>> {
        let mut ctx = self.lock()?;
        let gl = ctx.gl();
        let sampler = gl.gen_sampler();
        gl.sampler_parameter_i(sampler, gl::TEXTURE_MAG_FILTER, translate::filter(mag) as i32);
        let min_filter = translate::min_filter(min, mipmap) as i32;
        gl.sampler_parameter_i(sampler, gl::TEXTURE_MIN_FILTER, min_filter);
        let wrap = translate::address_mode(address) as i32;
        for pname in [gl::TEXTURE_WRAP_S, gl::TEXTURE_WRAP_T, gl::TEXTURE_WRAP_R] {
            gl.sampler_parameter_i(sampler, pname, wrap);
        }
        Ok(Arc::new(Sampler::new(self.handles.next(), sampler)))
    }

    pub fn create_render_pass(
        &self,
        attachments: Vec<AttachmentDesc>,
        subpasses: Vec<SubpassDesc>,
    ) -> Arc<RenderPass> {
        Arc::new(RenderPass::new(self.handles.next(), attachments, subpasses))
    }

    pub fn create_framebuffer(
        &self,
        attachments: Vec<Arc<ImageView>>,
        extent: vk::Extent2D,
        layers: u32,
    ) -> Result<Arc<Framebuffer>> {
        let handle = self.handles.next();
        let mut ctx = self.lock()?;
        Ok(Arc::new(Framebuffer::create(ctx.gl(), handle, attachments, extent, layers)))
    }

    /// The window-system target, GL framebuffer 0.
    pub fn window_framebuffer(&self, extent: vk::Extent2D) -> Arc<Framebuffer> {
        Arc::new(Framebuffer::window(self.handles.next(), extent))
    }

    pub fn create_descriptor_set_layout(
        &self,
        bindings: Vec<DescriptorBinding>,
    ) -> Arc<DescriptorSetLayout> {
        Arc::new(DescriptorSetLayout::new(self.handles.next(), bindings))
    }

    pub fn create_pipeline_layout(
        &self,
        set_layouts: Vec<Arc<DescriptorSetLayout>>,
        push_constant_ranges: Vec<PushConstantRange>,
    ) -> Arc<PipelineLayout> {
        Arc::new(PipelineLayout::new(self.handles.next(), set_layouts, push_constant_ranges))
    }

    pub fn allocate_descriptor_set(&self, layout: &Arc<DescriptorSetLayout>) -> Arc<DescriptorSet> {
        Arc::new(DescriptorSet::new(self.handles.next(), layout.clone()))
    }

    /// Compiles the window (flipped) and offscreen programs. Compile or link
    /// failures are reported and leave an invalid program in the pipeline.
    pub fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<Pipeline>> {
        let handle: vk::Pipeline = self.handles.next();
        let id = ObjectId::of(handle);
        let (window, offscreen) = {
            let mut ctx = self.lock()?;
            let gl = ctx.gl();
            let window = self.compile(gl, id, &desc.stages, &desc.layout, desc.flags, true);
            let offscreen = self.compile(gl, id, &desc.stages, &desc.layout, desc.flags, false);
            (window, offscreen)
        };
        let pipeline = Pipeline::graphics(handle, desc, window, offscreen, self.geometry.clone());
        debug!(pipeline = %id, valid = pipeline.is_valid(), "created graphics pipeline");
        Ok(self.pipelines.insert(pipeline))
    }

    pub fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<Arc<Pipeline>> {
        let handle: vk::Pipeline = self.handles.next();
        let id = ObjectId::of(handle);
        let program = {
            let mut ctx = self.lock()?;
            let stages = std::slice::from_ref(&desc.stage);
            self.compile(ctx.gl(), id, stages, &desc.layout, desc.flags, false)
        };
        let layout = desc.layout.clone();
        let pipeline = Pipeline::compute(handle, layout, program, self.geometry.clone());
        debug!(pipeline = %id, valid = pipeline.is_valid(), "created compute pipeline");
        Ok(self.pipelines.insert(pipeline))
    }

    fn compile(
        &self,
        gl: &mut dyn GlApi,
        pipeline: ObjectId,
        stages: &[ShaderStage],
        layout: &PipelineLayout,
        flags: vk::PipelineCreateFlags,
        flip_y: bool,
    ) -> CompiledProgram {
        let request = CompileRequest {
            stages,
            layout,
            flags,
            flip_y,
        };
        match self.compiler.compile(gl, &request) {
            Ok(program) => program,
            Err(err) => {
                let category = match err {
                    ShaderError::Compile { .. } => Category::ShaderCompilation,
                    ShaderError::Link { .. } => Category::ProgramLink,
                };
                self.reporter()
                    .error(
                        Some(pipeline),
                        vk::Result::ERROR_INVALID_SHADER_NV,
                        category,
                        err.to_string(),
                    );
                CompiledProgram::invalid()
            }
        }
    }

    /// `vkDestroyPipeline`. Cached geometry is retired and its vertex arrays
    /// are deleted at the next submission.
    pub fn destroy_pipeline(&self, handle: vk::Pipeline) -> Result<()> {
        let Some(pipeline) = self.pipelines.remove(handle) else {
            return Ok(());
        };
        pipeline.release_geometry();
        let mut ctx = self.lock()?;
        for program in pipeline.programs() {
            ctx.gl().delete_program(program);
        }
        Ok(())
    }

    pub fn create_query_pool(
        &self,
        query_type: vk::QueryType,
        count: u32,
    ) -> Result<Arc<QueryPool>> {
        let names = {
            let mut ctx = self.lock()?;
            let gl = ctx.gl();
            (0..count).map(|_| gl.gen_query()).collect()
        };
        Ok(self
            .query_pools
            .insert(Arc::new(QueryPool::new(self.handles.next(), query_type, names))))
    }

    pub fn destroy_query_pool(&self, handle: vk::QueryPool) -> Result<()> {
        if let Some(pool) = self.query_pools.remove(handle) {
            let mut ctx = self.lock()?;
            for &query in pool.gl_names() {
                ctx.gl().delete_query(query);
            }
        }
        Ok(())
    }

    /// `vkAllocateCommandBuffers` for a single buffer.
    pub fn allocate_command_buffer(&self, level: vk::CommandBufferLevel) -> SharedCommandBuffer {
        let cb = CommandBuffer::allocate(self.handles.next(), level, self.env.clone());
        self.command_buffers.insert(cb)
    }

    pub fn command_buffer(&self, handle: vk::CommandBuffer) -> Result<SharedCommandBuffer> {
        self.command_buffers.resolve(handle)
    }

    pub fn free_command_buffer(&self, handle: vk::CommandBuffer) {
        self.command_buffers.remove(handle);
    }
}

/// Byte count of a flush or invalidate range, clamped to the allocation.
fn mapped_len(memory: &DeviceMemory, offset: u64, size: u64) -> usize {
    let available = memory.size().saturating_sub(offset);
    let size = if size == vk::WHOLE_SIZE { available } else { size.min(available) };
    size as usize
}

impl Drop for Device {
    fn drop(&mut self) {
        let Ok(mut ctx) = self.context.lock() else {
            warn!("GL context poisoned; leaking device objects");
            return;
        };
        let (gl, backend) = ctx.split();
        self.vaos.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner()).release(gl);
        backend.release(gl);
        gl.delete_buffer(self.dummy_index_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::DeviceObject;
    use crate::report::CollectingReporter;
    use vkgl_gl::testing::{CallLog, RecordingGl};

    struct NoCompiler;

    impl ShaderCompiler for NoCompiler {
        fn compile(
            &self,
            _gl: &mut dyn GlApi,
            _request: &CompileRequest<'_>,
        ) -> std::result::Result<CompiledProgram, ShaderError> {
            Err(ShaderError::Link {
                log: "error: no main".into(),
            })
        }
    }

    fn device(config: IcdConfig) -> (Device, CallLog, Arc<CollectingReporter>) {
        let (gl, log) = RecordingGl::new();
        let reporter = Arc::new(CollectingReporter::new());
        let device = Device::new(
            Box::new(gl),
            GlCapabilities::for_core_version(4, 6),
            config,
            reporter.clone(),
            Arc::new(NoCompiler),
        )
        .unwrap();
        (device, log, reporter)
    }

    #[test]
    fn dummy_index_buffer_holds_one_triangle() {
        let (device, log, _) = device(IcdConfig::default());
        assert_eq!(
            log.buffer_contents(device.dummy_index_buffer()),
            Some(bytemuck::cast_slice(&[0u32, 1, 2]).to_vec())
        );
        assert_eq!(
            device.geometry().layout(device.dummy_geometry()).map(|l| l.element_buffer),
            Some(device.dummy_index_buffer())
        );
    }

    #[test]
    fn forced_legacy_backend() {
        let config = IcdConfig {
            force_legacy_backend: true,
            ..Default::default()
        };
        let (device, _, _) = device(config);
        assert_eq!(device.lock().unwrap().backend().tier(), BackendTier::Legacy);
    }

    #[test]
    fn link_failure_is_reported_and_leaves_an_invalid_pipeline() {
        let (device, _, reporter) = device(IcdConfig::default());
        let layout = device.create_pipeline_layout(vec![], vec![]);
        let pipeline = device
            .create_graphics_pipeline(&GraphicsPipelineDesc::new(vec![], layout))
            .unwrap();
        assert!(!pipeline.is_valid());
        assert_eq!(reporter.count(Category::ProgramLink), 2);
    }

    #[test]
    fn unsupported_image_format_is_a_hard_error() {
        let (device, _, _) = device(IcdConfig::default());
        let err = device
            .create_image(&ImageDesc::new_2d(vk::Format::ASTC_4X4_UNORM_BLOCK, 4, 4))
            .unwrap_err();
        assert_eq!(err.vk_result(), vk::Result::ERROR_FORMAT_NOT_SUPPORTED);
    }

    #[test]
    fn array_images_fold_layers_into_storage_depth() {
        let (device, log, _) = device(IcdConfig::default());
        let desc = ImageDesc {
            array_layers: 4,
            ..ImageDesc::new_2d(vk::Format::R8G8B8A8_UNORM, 16, 8)
        };
        let image = device.create_image(&desc).unwrap();
        assert_eq!(image.target(), gl::TEXTURE_2D_ARRAY);
        let expected = format!(
            "tex_storage({}, 1, {}, [16, 8, 4], 1)",
            gl::TEXTURE_2D_ARRAY,
            gl::RGBA8
        );
        assert!(log.contains(&expected));
    }

    #[test]
    fn flush_and_invalidate_move_mapped_bytes() {
        let (device, log, _) = device(IcdConfig::default());
        let memory = device.allocate_memory(8, true).unwrap();
        device.map_memory(memory.handle(), 0, vk::WHOLE_SIZE).unwrap();
        memory.write(0, &[9, 8, 7, 6]);
        device.flush_mapped_memory(memory.handle(), 0, 4).unwrap();
        assert_eq!(log.buffer_contents(memory.gl_buffer()).unwrap()[..4], [9, 8, 7, 6]);

        memory.write(0, &[0; 4]);
        device.invalidate_mapped_memory(memory.handle(), 0, vk::WHOLE_SIZE).unwrap();
        assert_eq!(memory.read(0, 4), vec![9, 8, 7, 6]);
    }
}
