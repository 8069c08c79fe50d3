//! Shared setup for the driver integration tests: a device on top of the
//! recording GL, a shader compiler stub and a few canned objects.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, MutexGuard};

use ash::vk;
use vkgl_gl::testing::{CallLog, RecordingGl};
use vkgl_gl::{GlApi, GlCapabilities, GlFeatures};
use vkgl_icd::command_buffer::{BeginInfo, RenderPassBeginInfo};
use vkgl_icd::device::ImageDesc;
use vkgl_icd::objects::{
    AttachmentDesc, Framebuffer, GraphicsPipelineDesc, ImageView, Pipeline, PipelineLayout,
    RenderPass,
    SubpassDesc,
};
use vkgl_icd::shader::{CompileRequest, CompiledProgram, ShaderCompiler, ShaderError, ShaderStage};
use vkgl_icd::state::Rect;
use vkgl_icd::{CollectingReporter, CommandBuffer, Device, IcdConfig, SharedCommandBuffer};

/// Hands out program names from 100 upwards without touching GL. Every
/// program carries the binding and push-constant tables of `template`.
#[derive(Debug, Default)]
pub struct StubCompiler {
    next: AtomicU32,
    template: CompiledProgram,
}

impl ShaderCompiler for StubCompiler {
    fn compile(
        &self,
        _gl: &mut dyn GlApi,
        _request: &CompileRequest<'_>,
    ) -> Result<CompiledProgram, ShaderError> {
        Ok(CompiledProgram {
            program: 100 + self.next.fetch_add(1, Ordering::Relaxed),
            ..self.template.clone()
        })
    }
}

pub struct Harness {
    pub device: Device,
    pub log: CallLog,
    pub reporter: Arc<CollectingReporter>,
}

pub fn harness() -> Harness {
    harness_with(GlCapabilities::for_core_version(4, 6), IcdConfig::default())
}

pub fn harness_with(caps: GlCapabilities, config: IcdConfig) -> Harness {
    build(caps, config, StubCompiler::default())
}

/// Device whose programs all expose the tables of `template`.
pub fn harness_with_program(template: CompiledProgram) -> Harness {
    let compiler = StubCompiler {
        template,
        ..Default::default()
    };
    build(GlCapabilities::for_core_version(4, 6), IcdConfig::default(), compiler)
}

fn build(caps: GlCapabilities, config: IcdConfig, compiler: StubCompiler) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (gl, log) = RecordingGl::new();
    let reporter = Arc::new(CollectingReporter::new());
    let device = Device::new(Box::new(gl), caps, config, reporter.clone(), Arc::new(compiler))
        .expect("device");
    log.clear();
    Harness { device, log, reporter }
}

/// Core 3.3 without any of the optional features.
pub fn legacy_caps() -> GlCapabilities {
    let mut caps = GlCapabilities::for_core_version(3, 3);
    caps.features = GlFeatures::empty();
    caps
}

pub fn lock(cb: &SharedCommandBuffer) -> MutexGuard<'_, CommandBuffer> {
    cb.lock().unwrap()
}

pub fn stage(stage: vk::ShaderStageFlags) -> ShaderStage {
    ShaderStage {
        stage,
        code: vec![0x0723_0203],
        entry_point: "main".into(),
    }
}

impl Harness {
    pub fn empty_layout(&self) -> Arc<PipelineLayout> {
        self.device.create_pipeline_layout(vec![], vec![])
    }

    /// Triangle-list pipeline without vertex input.
    pub fn pipeline(&self, layout: Arc<PipelineLayout>) -> Arc<Pipeline> {
        let desc = GraphicsPipelineDesc::new(
            vec![
                stage(vk::ShaderStageFlags::VERTEX),
                stage(vk::ShaderStageFlags::FRAGMENT),
            ],
            layout,
        );
        self.device.create_graphics_pipeline(&desc).unwrap()
    }

    pub fn color_pass(&self, load_op: vk::AttachmentLoadOp) -> Arc<RenderPass> {
        self.device.create_render_pass(
            vec![AttachmentDesc::color(
                vk::Format::R8G8B8A8_UNORM,
                load_op,
                vk::AttachmentStoreOp::STORE,
            )],
            vec![SubpassDesc {
                colors: vec![Some(0)],
                ..Default::default()
            }],
        )
    }

    pub fn color_view(&self, width: u32, height: u32) -> Arc<ImageView> {
        let image = self
            .device
            .create_image(&ImageDesc::new_2d(vk::Format::R8G8B8A8_UNORM, width, height))
            .unwrap();
        self.device
            .create_image_view(
                &image,
                vk::Format::R8G8B8A8_UNORM,
                vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
            )
            .unwrap()
    }

    pub fn offscreen_target(&self, width: u32, height: u32) -> Arc<Framebuffer> {
        let view = self.color_view(width, height);
        self.device
            .create_framebuffer(vec![view], vk::Extent2D { width, height }, 1)
            .unwrap()
    }

    pub fn primary(&self) -> SharedCommandBuffer {
        self.device.allocate_command_buffer(vk::CommandBufferLevel::PRIMARY)
    }

    /// A primary buffer already in the recording state.
    pub fn recording(&self) -> SharedCommandBuffer {
        let cb = self.primary();
        lock(&cb).begin(&BeginInfo::default()).unwrap();
        cb
    }
}

pub fn begin_info(
    render_pass: &Arc<RenderPass>,
    framebuffer: &Arc<Framebuffer>,
) -> RenderPassBeginInfo {
    let extent = framebuffer.extent();
    RenderPassBeginInfo {
        render_pass: render_pass.clone(),
        framebuffer: framebuffer.clone(),
        render_area: Rect::new(0, 0, extent.width, extent.height),
        clear_values: vec![],
    }
}
