mod common;

use std::sync::Arc;

use ash::vk;
use pretty_assertions::assert_eq;
use vkgl_gl::consts as gl;
use vkgl_gl::UniformValue;
use vkgl_icd::cmd::GlCmd;
use vkgl_icd::command_buffer::{BeginInfo, BufferBarrier, Inheritance};
use vkgl_icd::device::ImageDesc;
use vkgl_icd::objects::{
    AttachmentDesc, Buffer, BufferRange, Descriptor, DescriptorBinding, GraphicsPipelineDesc,
    PushConstantRange, SubpassDesc, VertexBindingDesc, VertexInputDesc,
};
use vkgl_icd::shader::{CompiledProgram, PushConstantUniform, UniformKind};
use vkgl_icd::state::{translate, Rect, Viewport};
use vkgl_icd::{Category, IcdConfig, IcdError, RecordingState};

use common::{begin_info, harness, harness_with, harness_with_program, lock, stage};

fn commands(cb: &vkgl_icd::CommandBuffer) -> Vec<GlCmd> {
    cb.commands().iter().cloned().collect()
}

#[test]
fn begin_twice_is_rejected() {
    let h = harness();
    let cb = h.recording();
    let err = lock(&cb).begin(&BeginInfo::default()).unwrap_err();
    assert!(matches!(err, IcdError::InvalidCommandBufferState { .. }));
    assert_eq!(err.vk_result(), vk::Result::ERROR_VALIDATION_FAILED_EXT);
}

#[test]
fn commands_outside_recording_are_reported_and_dropped() {
    let h = harness();
    let cb = h.primary();
    let mut cb = lock(&cb);
    cb.set_line_width(2.0);
    assert!(cb.commands().is_empty());
    assert_eq!(h.reporter.count(Category::Validation), 1);
}

#[test]
fn reset_then_begin_starts_empty() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(64, 64);
    let pipeline = h.pipeline(h.empty_layout());

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    cb.bind_pipeline(&pipeline);
    cb.draw(3, 1, 0, 0);
    cb.end_render_pass();
    cb.end().unwrap();
    assert!(!cb.commands().is_empty());
    assert!(!cb.after_commands().is_empty());

    cb.reset();
    assert_eq!(cb.state(), RecordingState::Initial);
    cb.begin(&BeginInfo::default()).unwrap();
    assert!(cb.commands().is_empty());
    assert!(cb.after_commands().is_empty());
    assert!(cb.pending_actions().is_empty());
    assert!(cb.mapped_entries().is_empty());
}

#[test]
fn draw_without_vertex_input_uses_dummy_geometry() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(32, 32);
    let pipeline = h.pipeline(h.empty_layout());

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    cb.bind_pipeline(&pipeline);
    cb.draw(3, 1, 0, 0);

    let cmds = commands(&cb);
    let at = cmds
        .iter()
        .position(|c| *c == GlCmd::BindGeometry(h.device.dummy_geometry()))
        .expect("dummy geometry bound");
    assert!(matches!(cmds[at + 1], GlCmd::DrawArrays { count: 3, instances: 1, .. }));
    assert_eq!(cmds[at + 2], GlCmd::UnbindVertexArray);
}

#[test]
fn draw_outside_render_pass_is_skipped() {
    let h = harness();
    let pipeline = h.pipeline(h.empty_layout());
    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.bind_pipeline(&pipeline);
    cb.draw(3, 1, 0, 0);
    assert!(!commands(&cb).iter().any(|c| matches!(c, GlCmd::DrawArrays { .. })));
    assert_eq!(h.reporter.count(Category::Validation), 1);
}

#[test]
fn full_target_viewport_flips_to_origin() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(800, 600);
    let mut desc = GraphicsPipelineDesc::new(
        vec![stage(vk::ShaderStageFlags::VERTEX)],
        h.empty_layout(),
    );
    desc.viewports = vec![Viewport::new(0.0, 0.0, 800.0, 600.0)];
    let pipeline = h.device.create_graphics_pipeline(&desc).unwrap();

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    cb.bind_pipeline(&pipeline);

    let viewport = commands(&cb)
        .into_iter()
        .find(|c| matches!(c, GlCmd::ViewportArray { .. }))
        .expect("viewport encoded");
    assert_eq!(
        viewport,
        GlCmd::ViewportArray {
            first: 0,
            rects: vec![[0.0, 0.0, 800.0, 600.0]],
            depths: vec![[0.0, 1.0]],
        }
    );
}

#[test]
fn viewport_before_render_pass_is_patched_at_begin() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(800, 600);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.set_viewport(0, &[Viewport::new(0.0, 0.0, 800.0, 100.0)]);
    assert_eq!(cb.pending_actions().len(), 1);
    let at = cb.pending_actions()[0].at;
    assert_eq!(
        cb.commands().get(at),
        Some(&GlCmd::ViewportArray {
            first: 0,
            rects: vec![[0.0, 0.0, 800.0, 100.0]],
            depths: vec![[0.0, 1.0]],
        })
    );

    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    assert!(cb.pending_actions().is_empty());
    assert_eq!(
        cb.commands().get(at),
        Some(&GlCmd::ViewportArray {
            first: 0,
            rects: vec![[0.0, 500.0, 800.0, 100.0]],
            depths: vec![[0.0, 1.0]],
        })
    );
}

#[test]
fn clear_load_op_clears_through_draw_buffers() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::CLEAR);
    let fb = h.offscreen_target(16, 16);
    let mut info = begin_info(&pass, &fb);
    info.clear_values = vec![vkgl_icd::cmd::ClearValue::Color(vkgl_icd::cmd::ClearColor::Float([
        0.0, 0.5, 1.0, 1.0,
    ]))];

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&info, vk::SubpassContents::INLINE);
    let cmds = commands(&cb);
    assert!(cmds.contains(&GlCmd::BindFramebuffer {
        target: vkgl_gl::consts::FRAMEBUFFER,
        framebuffer: fb.gl_name(),
    }));
    assert!(cmds.contains(&GlCmd::ClearAttachment {
        buffer: vkgl_gl::consts::COLOR,
        draw_buffer: 0,
        value: info.clear_values[0],
    }));
}

#[test]
fn pipeline_unbind_is_queued_once() {
    let h = harness();
    let layout = h.empty_layout();
    let a = h.pipeline(layout.clone());
    let b = h.pipeline(layout);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.bind_pipeline(&a);
    cb.bind_pipeline(&b);
    assert_eq!(
        cb.after_commands().iter().cloned().collect::<Vec<_>>(),
        vec![GlCmd::UseProgram(0)]
    );
}

#[test]
fn window_target_selects_flipped_program() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let window = h
        .device
        .window_framebuffer(vk::Extent2D { width: 640, height: 480 });
    let pipeline = h.pipeline(h.empty_layout());
    let window_program = pipeline.variant(true).program.program;
    let offscreen_program = pipeline.variant(false).program.program;
    assert_ne!(window_program, offscreen_program);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &window), vk::SubpassContents::INLINE);
    cb.bind_pipeline(&pipeline);
    let cmds = commands(&cb);
    assert!(cmds.contains(&GlCmd::UseProgram(window_program)));
    assert!(!cmds.contains(&GlCmd::UseProgram(offscreen_program)));
}

#[test]
fn incompatible_layout_invalidates_trailing_descriptor_sets() {
    let h = harness();
    let ubo = h.device.create_descriptor_set_layout(vec![DescriptorBinding {
        binding: 0,
        descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
        count: 1,
        stages: vk::ShaderStageFlags::VERTEX,
    }]);
    let texture = h.device.create_descriptor_set_layout(vec![DescriptorBinding {
        binding: 0,
        descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        count: 1,
        stages: vk::ShaderStageFlags::FRAGMENT,
    }]);
    let first = h.device.create_pipeline_layout(vec![ubo.clone(), ubo.clone()], vec![]);
    let second = h.device.create_pipeline_layout(vec![ubo.clone(), texture], vec![]);
    let sets = [h.device.allocate_descriptor_set(&ubo), h.device.allocate_descriptor_set(&ubo)];

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.bind_descriptor_sets(vk::PipelineBindPoint::GRAPHICS, &first, 0, &sets, &[]);
    assert_eq!(cb.bound_descriptor_sets(vk::PipelineBindPoint::GRAPHICS), vec![0, 1]);

    cb.bind_pipeline(&h.pipeline(second));
    assert_eq!(cb.bound_descriptor_sets(vk::PipelineBindPoint::GRAPHICS), vec![0]);
}

#[test]
fn push_constant_mismatch_invalidates_every_set() {
    let h = harness();
    let ubo = h.device.create_descriptor_set_layout(vec![DescriptorBinding {
        binding: 0,
        descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
        count: 1,
        stages: vk::ShaderStageFlags::VERTEX,
    }]);
    let plain = h.device.create_pipeline_layout(vec![ubo.clone()], vec![]);
    let pushing = h.device.create_pipeline_layout(
        vec![ubo.clone()],
        vec![PushConstantRange {
            stages: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: 16,
        }],
    );
    let set = h.device.allocate_descriptor_set(&ubo);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.bind_descriptor_sets(vk::PipelineBindPoint::GRAPHICS, &plain, 0, &[set], &[]);
    cb.bind_pipeline(&h.pipeline(pushing));
    assert!(cb.bound_descriptor_sets(vk::PipelineBindPoint::GRAPHICS).is_empty());
}

#[test]
fn vertex_input_change_drops_vertex_buffers() {
    let h = harness();
    let layout = h.empty_layout();
    let with_stride = |stride| {
        let mut desc =
            GraphicsPipelineDesc::new(vec![stage(vk::ShaderStageFlags::VERTEX)], layout.clone());
        desc.vertex_input = VertexInputDesc {
            bindings: vec![VertexBindingDesc {
                binding: 0,
                stride,
                input_rate: vk::VertexInputRate::VERTEX,
            }],
            attributes: vec![],
        };
        h.device.create_graphics_pipeline(&desc).unwrap()
    };
    let narrow = with_stride(16);
    let narrow_again = with_stride(16);
    let wide = with_stride(32);
    let buffer = h.device.create_buffer(256, vk::BufferUsageFlags::VERTEX_BUFFER);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.bind_pipeline(&narrow);
    cb.bind_vertex_buffers(0, &[(buffer.clone(), 0)]);
    cb.bind_pipeline(&narrow_again);
    assert_eq!(cb.bound_vertex_buffers(), vec![0]);

    cb.bind_pipeline(&wide);
    assert!(cb.bound_vertex_buffers().is_empty());
}

#[test]
fn freeing_mapped_memory_drops_exactly_its_transfers() {
    let h = harness();
    let mapped = h.device.allocate_memory(64, true).unwrap();
    let other = h.device.allocate_memory(64, true).unwrap();
    let src = h.device.create_buffer(64, vk::BufferUsageFlags::TRANSFER_SRC);
    let dst = h.device.create_buffer(64, vk::BufferUsageFlags::TRANSFER_DST);
    h.device.bind_buffer_memory(&src, &mapped, 0);
    h.device.bind_buffer_memory(&dst, &other, 0);
    h.device
        .map_memory(vk::Handle::from_raw(mapped.id().raw), 0, vk::WHOLE_SIZE)
        .unwrap();

    let shared = h.recording();
    let before = {
        let mut cb = lock(&shared);
        cb.copy_buffer(
            &src,
            &dst,
            &[vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: 64,
            }],
        );
        assert_eq!(cb.mapped_entries().len(), 1);
        cb.commands().len()
    };

    h.device
        .free_memory(vk::Handle::from_raw(mapped.id().raw))
        .unwrap();

    let cb = lock(&shared);
    assert_eq!(cb.commands().len(), before - 1);
    assert!(cb.mapped_entries().is_empty());
    assert!(!commands(&cb).iter().any(|c| matches!(c, GlCmd::UploadMemory { .. })));
    assert_eq!(h.reporter.count(Category::ResourceLifetime), 1);
}

#[test]
fn executing_secondaries_inlines_every_command() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(100, 100);

    let secondary = h.device.allocate_command_buffer(vk::CommandBufferLevel::SECONDARY);
    let secondary_len = {
        let mut cb = lock(&secondary);
        cb.begin(&BeginInfo {
            flags: vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE,
            inheritance: Some(Inheritance {
                render_pass: pass.clone(),
                subpass: 0,
                framebuffer: None,
            }),
        })
        .unwrap();
        cb.set_line_width(3.0);
        cb.set_viewport(0, &[Viewport::new(0.0, 0.0, 100.0, 40.0)]);
        cb.end().unwrap();
        assert_eq!(cb.pending_actions().len(), 1);
        cb.commands().len()
    };

    let primary = h.recording();
    let mut cb = lock(&primary);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::SECONDARY_COMMAND_BUFFERS);
    let before = cb.commands().len();
    cb.execute_commands(&[secondary.clone()]);
    assert_eq!(cb.commands().len(), before + secondary_len);
    assert!(cb.pending_actions().is_empty());
    assert!(commands(&cb).contains(&GlCmd::ViewportArray {
        first: 0,
        rects: vec![[0.0, 60.0, 100.0, 40.0]],
        depths: vec![[0.0, 1.0]],
    }));

    cb.end_render_pass();
    let total = cb.commands().len();
    cb.end().unwrap();
    assert_eq!(cb.commands().len(), total);
    assert_eq!(cb.commands().segment_count(), 1);
}

#[test]
fn depth_bounds_are_unsupported() {
    let h = harness();
    let shared = h.recording();
    lock(&shared).set_depth_bounds(0.0, 1.0);
    assert_eq!(h.reporter.count(Category::UnsupportedFeature), 1);
}

#[test]
fn destroyed_pipeline_retires_cached_geometry() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(8, 8);
    let mut desc =
        GraphicsPipelineDesc::new(vec![stage(vk::ShaderStageFlags::VERTEX)], h.empty_layout());
    desc.vertex_input.bindings.push(VertexBindingDesc {
        binding: 0,
        stride: 12,
        input_rate: vk::VertexInputRate::VERTEX,
    });
    let pipeline = h.device.create_graphics_pipeline(&desc).unwrap();
    let buffer = h.device.create_buffer(96, vk::BufferUsageFlags::VERTEX_BUFFER);

    let shared = h.recording();
    {
        let mut cb = lock(&shared);
        cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
        cb.bind_pipeline(&pipeline);
        cb.bind_vertex_buffers(0, &[(buffer.clone(), 0)]);
        cb.draw(3, 1, 0, 0);
        cb.draw(3, 1, 3, 0);
    }
    assert_eq!(pipeline.cached_geometry_count(), 1);
    let registered = h.device.geometry().len();

    h.device.destroy_pipeline(vk::Handle::from_raw(pipeline.id().raw)).unwrap();
    assert_eq!(pipeline.cached_geometry_count(), 0);
    assert_eq!(h.device.geometry().len(), registered - 1);
}

fn mapped_buffer(h: &common::Harness, size: u64, usage: vk::BufferUsageFlags) -> Arc<Buffer> {
    let memory = h.device.allocate_memory(size, true).unwrap();
    let buffer = h.device.create_buffer(size, usage);
    h.device.bind_buffer_memory(&buffer, &memory, 0);
    h.device
        .map_memory(vk::Handle::from_raw(memory.id().raw), 0, vk::WHOLE_SIZE)
        .unwrap();
    buffer
}

fn memory_id(buffer: &Buffer) -> u64 {
    buffer.memory().unwrap().id().raw
}

#[test]
fn indexed_draws_set_the_restart_index_of_the_index_type() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(8, 8);
    let mut desc = GraphicsPipelineDesc::new(
        vec![
            stage(vk::ShaderStageFlags::VERTEX),
            stage(vk::ShaderStageFlags::FRAGMENT),
        ],
        h.empty_layout(),
    );
    desc.topology = vk::PrimitiveTopology::TRIANGLE_STRIP;
    desc.primitive_restart = true;
    let pipeline = h.device.create_graphics_pipeline(&desc).unwrap();
    let indices = h.device.create_buffer(64, vk::BufferUsageFlags::INDEX_BUFFER);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    cb.bind_pipeline(&pipeline);
    cb.bind_index_buffer(&indices, 0, vk::IndexType::UINT16);
    cb.draw_indexed(4, 1, 2, 0, 0);
    cb.draw_indexed(4, 1, 0, 0, 0);
    cb.bind_index_buffer(&indices, 0, vk::IndexType::UINT32);
    cb.draw_indexed(4, 1, 0, 0, 0);

    let cmds = commands(&cb);
    let restarts: Vec<_> = cmds
        .iter()
        .filter_map(|c| match c {
            GlCmd::PrimitiveRestartIndex(index) => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(restarts, vec![0xFFFF, 0xFFFF_FFFF]);
    assert!(cmds.contains(&GlCmd::Enable(gl::PRIMITIVE_RESTART)));
    let first_draw = cmds.iter().find(|c| matches!(c, GlCmd::DrawElements { .. }));
    assert!(matches!(
        first_draw,
        Some(GlCmd::DrawElements {
            count: 4,
            ty: gl::UNSIGNED_SHORT,
            offset: 4,
            ..
        })
    ));
}

#[test]
fn barriers_move_host_visible_buffers_around_the_memory_barrier() {
    let h = harness();
    let buffer = mapped_buffer(&h, 64, vk::BufferUsageFlags::STORAGE_BUFFER);
    let memory = memory_id(&buffer);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.pipeline_barrier(
        vk::AccessFlags::HOST_WRITE,
        vk::AccessFlags::SHADER_READ | vk::AccessFlags::HOST_READ,
        &[BufferBarrier {
            buffer: buffer.clone(),
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::empty(),
        }],
    );
    assert_eq!(
        commands(&cb),
        vec![
            GlCmd::UploadMemory {
                memory,
                offset: 0,
                size: 64,
            },
            GlCmd::MemoryBarrier(translate::barrier_bits(
                vk::AccessFlags::SHADER_READ | vk::AccessFlags::HOST_READ
            )),
            GlCmd::DownloadMemory {
                memory,
                offset: 0,
                size: 64,
            },
        ]
    );
}

#[test]
fn barriers_without_memory_barrier_support_only_move_host_data() {
    let h = harness_with(common::legacy_caps(), IcdConfig::default());
    let buffer = mapped_buffer(&h, 32, vk::BufferUsageFlags::UNIFORM_BUFFER);
    let unmapped = h.device.create_buffer(32, vk::BufferUsageFlags::UNIFORM_BUFFER);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.pipeline_barrier(
        vk::AccessFlags::empty(),
        vk::AccessFlags::UNIFORM_READ,
        &[
            BufferBarrier {
                buffer: buffer.clone(),
                src_access: vk::AccessFlags::HOST_WRITE,
                dst_access: vk::AccessFlags::empty(),
            },
            BufferBarrier {
                buffer: unmapped,
                src_access: vk::AccessFlags::HOST_WRITE,
                dst_access: vk::AccessFlags::empty(),
            },
        ],
    );
    assert_eq!(
        commands(&cb),
        vec![GlCmd::UploadMemory {
            memory: memory_id(&buffer),
            offset: 0,
            size: 32,
        }]
    );
}

#[test]
fn push_constants_wait_for_a_pipeline() {
    let h = harness_with_program(CompiledProgram {
        push_constants: vec![PushConstantUniform {
            offset: 0,
            location: 3,
            kind: UniformKind::Float(4),
            array_len: 0,
        }],
        ..Default::default()
    });
    let layout = h.device.create_pipeline_layout(
        vec![],
        vec![PushConstantRange {
            stages: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: 16,
        }],
    );
    let pipeline = h.pipeline(layout);
    let program = pipeline.variant(false).program.program;
    let bytes = |values: [f32; 4]| {
        values
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<u8>>()
    };
    let uniform = |values: [f32; 4]| GlCmd::Uniform {
        program,
        location: 3,
        value: UniformValue::F32 {
            components: 4,
            values: values.to_vec(),
        },
    };

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.push_constants(vk::ShaderStageFlags::VERTEX, 0, &bytes([1.0, 2.0, 3.0, 4.0]));
    assert!(cb.commands().is_empty());

    cb.bind_pipeline(&pipeline);
    let cmds = commands(&cb);
    let used = cmds.iter().position(|c| *c == GlCmd::UseProgram(program)).unwrap();
    let pushed = cmds.iter().position(|c| *c == uniform([1.0, 2.0, 3.0, 4.0])).unwrap();
    assert!(used < pushed);

    cb.push_constants(vk::ShaderStageFlags::VERTEX, 0, &bytes([5.0, 6.0, 7.0, 8.0]));
    assert_eq!(commands(&cb).last(), Some(&uniform([5.0, 6.0, 7.0, 8.0])));
}

#[test]
fn next_subpass_resolves_and_drops_vertex_buffers() {
    let h = harness();
    let color = || {
        AttachmentDesc::color(
            vk::Format::R8G8B8A8_UNORM,
            vk::AttachmentLoadOp::LOAD,
            vk::AttachmentStoreOp::STORE,
        )
    };
    let pass = h.device.create_render_pass(
        vec![color(), color()],
        vec![
            SubpassDesc {
                colors: vec![Some(0)],
                resolves: vec![Some(1)],
                ..Default::default()
            },
            SubpassDesc {
                colors: vec![Some(1)],
                ..Default::default()
            },
        ],
    );
    let (src, dst) = (h.color_view(16, 16), h.color_view(16, 16));
    let extent = vk::Extent2D {
        width: 16,
        height: 16,
    };
    let fb = h
        .device
        .create_framebuffer(vec![src.clone(), dst.clone()], extent, 1)
        .unwrap();
    let vertices = h.device.create_buffer(64, vk::BufferUsageFlags::VERTEX_BUFFER);

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    cb.bind_vertex_buffers(0, &[(vertices, 0)]);
    assert_eq!(cb.bound_vertex_buffers(), vec![0]);

    cb.next_subpass(vk::SubpassContents::INLINE);
    assert!(commands(&cb).contains(&GlCmd::BlitImage {
        src: src.subresource(0),
        dst: dst.subresource(0),
        src_rect: [0, 0, 16, 16],
        dst_rect: [0, 0, 16, 16],
        mask: gl::COLOR_BUFFER_BIT,
        filter: gl::NEAREST,
    }));
    assert!(cb.bound_vertex_buffers().is_empty());
}

fn blit(src: [i32; 3], src_end: [i32; 3], dst: [i32; 3], dst_end: [i32; 3]) -> vk::ImageBlit {
    let offset = |[x, y, z]: [i32; 3]| vk::Offset3D { x, y, z };
    let layers = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };
    vk::ImageBlit {
        src_subresource: layers,
        src_offsets: [offset(src), offset(src_end)],
        dst_subresource: layers,
        dst_offsets: [offset(dst), offset(dst_end)],
    }
}

#[test]
fn unscaled_blits_become_image_copies() {
    let h = harness();
    let format = vk::Format::R8G8B8A8_UNORM;
    let src = h.device.create_image(&ImageDesc::new_2d(format, 16, 16)).unwrap();
    let dst = h.device.create_image(&ImageDesc::new_2d(format, 16, 16)).unwrap();

    let shared = h.recording();
    let mut cb = lock(&shared);
    let unscaled = blit([0, 0, 0], [8, 8, 1], [4, 4, 0], [12, 12, 1]);
    cb.blit_image(&src, &dst, &[unscaled], vk::Filter::LINEAR);
    assert_eq!(
        commands(&cb),
        vec![GlCmd::CopyImage {
            src: src.gl_name(),
            src_target: src.target(),
            src_level: 0,
            src_origin: [0, 0, 0],
            dst: dst.gl_name(),
            dst_target: dst.target(),
            dst_level: 0,
            dst_origin: [4, 4, 0],
            extent: [8, 8, 1],
        }]
    );

    let halved = blit([0, 0, 0], [16, 16, 1], [0, 0, 0], [8, 8, 1]);
    cb.blit_image(&src, &dst, &[halved], vk::Filter::LINEAR);
    assert!(commands(&cb).iter().any(|c| matches!(c, GlCmd::BlitImage { .. })));
}

#[test]
fn volume_blit_copies_keep_their_slices() {
    let h = harness();
    let desc = ImageDesc {
        image_type: vk::ImageType::TYPE_3D,
        extent: vk::Extent3D {
            width: 8,
            height: 8,
            depth: 4,
        },
        ..ImageDesc::new_2d(vk::Format::R8G8B8A8_UNORM, 8, 8)
    };
    let src = h.device.create_image(&desc).unwrap();
    let dst = h.device.create_image(&desc).unwrap();

    let shared = h.recording();
    let mut cb = lock(&shared);
    let slices = blit([0, 0, 1], [8, 8, 3], [0, 0, 2], [8, 8, 4]);
    cb.blit_image(&src, &dst, &[slices], vk::Filter::NEAREST);
    assert_eq!(
        commands(&cb),
        vec![GlCmd::CopyImage {
            src: src.gl_name(),
            src_target: src.target(),
            src_level: 0,
            src_origin: [0, 0, 1],
            dst: dst.gl_name(),
            dst_target: dst.target(),
            dst_level: 0,
            dst_origin: [0, 0, 2],
            extent: [8, 8, 2],
        }]
    );
}

#[test]
fn first_instance_needs_base_instance_support() {
    let h = harness_with(common::legacy_caps(), IcdConfig::default());
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(8, 8);
    let pipeline = h.pipeline(h.empty_layout());

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    cb.bind_pipeline(&pipeline);
    let before = h.reporter.count(Category::UnsupportedFeature);
    cb.draw(3, 1, 0, 1);
    assert_eq!(h.reporter.count(Category::UnsupportedFeature), before + 1);
    assert!(!commands(&cb).iter().any(GlCmd::is_draw));

    cb.draw(3, 1, 0, 0);
    assert!(commands(&cb).iter().any(GlCmd::is_draw));
}

#[test]
fn nonzero_first_viewport_needs_viewport_arrays() {
    let h = harness_with(common::legacy_caps(), IcdConfig::default());
    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.set_viewport(1, &[Viewport::new(0.0, 0.0, 4.0, 4.0)]);
    cb.set_scissor(1, &[Rect::new(0, 0, 4, 4)]);
    assert!(cb.commands().is_empty());
    assert_eq!(h.reporter.count(Category::UnsupportedFeature), 2);
}

#[test]
fn storage_buffers_are_read_back_after_draws() {
    let h = harness();
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(8, 8);
    let storage = h.device.create_descriptor_set_layout(vec![DescriptorBinding {
        binding: 0,
        descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
        count: 1,
        stages: vk::ShaderStageFlags::FRAGMENT,
    }]);
    let layout = h.device.create_pipeline_layout(vec![storage.clone()], vec![]);
    let pipeline = h.pipeline(layout.clone());
    let buffer = mapped_buffer(&h, 128, vk::BufferUsageFlags::STORAGE_BUFFER);
    let set = h.device.allocate_descriptor_set(&storage);
    assert!(set.write(
        0,
        0,
        vec![Descriptor::StorageBuffer(BufferRange {
            buffer: buffer.clone(),
            offset: 0,
            range: vk::WHOLE_SIZE,
        })],
    ));

    let shared = h.recording();
    let mut cb = lock(&shared);
    cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
    cb.bind_pipeline(&pipeline);
    cb.bind_descriptor_sets(vk::PipelineBindPoint::GRAPHICS, &layout, 0, &[set], &[]);
    cb.draw(3, 1, 0, 0);

    let cmds = commands(&cb);
    let draw = cmds.iter().position(GlCmd::is_draw).unwrap();
    let download = GlCmd::DownloadMemory {
        memory: memory_id(&buffer),
        offset: 0,
        size: 128,
    };
    assert_eq!(cmds.iter().rposition(|c| *c == download), Some(cmds.len() - 1));
    assert!(draw < cmds.len() - 1);
}
