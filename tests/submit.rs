mod common;

use ash::vk;
use pretty_assertions::assert_eq;
use vkgl_gl::consts as gl;
use vkgl_icd::objects::{GraphicsPipelineDesc, VertexAttributeDesc, VertexBindingDesc};
use vkgl_icd::{Category, Fence, IcdConfig, IcdError, WaitOutcome};

use common::{begin_info, harness, harness_with, lock, stage, Harness};

/// Records one triangle into an offscreen target and ends the buffer.
fn triangle(h: &Harness) -> vkgl_icd::SharedCommandBuffer {
    let pass = h.color_pass(vk::AttachmentLoadOp::LOAD);
    let fb = h.offscreen_target(32, 32);
    let pipeline = h.pipeline(h.empty_layout());
    let shared = h.recording();
    {
        let mut cb = lock(&shared);
        cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
        cb.bind_pipeline(&pipeline);
        cb.draw(3, 1, 0, 0);
        cb.end_render_pass();
        cb.end().unwrap();
    }
    shared
}

#[test]
fn replays_recorded_then_after_submission_commands() {
    let h = harness();
    let cb = triangle(&h);
    h.log.clear();

    h.device.queue().submit(&[cb], None).unwrap();
    let draw = h
        .log
        .position(&format!("draw_arrays_instanced({}, 0, 3, 1)", gl::TRIANGLES))
        .expect("draw replayed");
    let unbind = h.log.position("use_program(0)").expect("program unbound");
    assert!(draw < unbind);
    assert_eq!(h.log.count("flush"), 1);
    assert!(h.reporter.reports().is_empty());
}

#[test]
fn dummy_geometry_draws_through_the_dummy_index_buffer() {
    let h = harness();
    let cb = triangle(&h);
    h.device.queue().submit(&[cb.clone(), cb], None).unwrap();
    assert_eq!(h.log.count("gen_vertex_array"), 1);
    assert!(h.log.contains(&format!(
        "bind_buffer({}, {})",
        gl::ELEMENT_ARRAY_BUFFER,
        h.device.dummy_index_buffer()
    )));
}

#[test]
fn non_executable_buffers_are_reported_and_skipped() {
    let h = harness();
    let recording = h.recording();
    let initial = h.primary();
    h.log.clear();

    h.device.queue().submit(&[recording, initial], None).unwrap();
    assert_eq!(h.reporter.count(Category::Validation), 2);
    assert_eq!(h.log.count("flush"), 1);
    assert_eq!(h.log.count("use_program"), 0);
}

#[test]
fn fence_signals_after_submission() {
    let h = harness();
    let fence = Fence::new(false);
    assert_eq!(fence.wait(&h.device, 0).unwrap(), WaitOutcome::TimedOut);

    h.device.queue().submit(&[triangle(&h)], Some(&fence)).unwrap();
    assert!(!fence.is_signaled());
    assert_eq!(h.log.count("fence_sync"), 1);

    assert_eq!(fence.wait(&h.device, 1_000).unwrap(), WaitOutcome::AlreadySignaled);
    assert!(fence.is_signaled());
    assert_eq!(h.log.count("delete_sync"), 1);
    assert_eq!(fence.wait(&h.device, 1_000).unwrap(), WaitOutcome::AlreadySignaled);
    assert_eq!(h.log.count("client_wait_sync"), 1);
}

#[test]
fn fence_wait_outcomes_follow_the_sync_status() {
    let h = harness();
    let fence = Fence::new(false);
    h.device.queue().submit(&[], Some(&fence)).unwrap();

    h.log.set_wait_status(gl::TIMEOUT_EXPIRED);
    assert_eq!(fence.wait(&h.device, 10).unwrap(), WaitOutcome::TimedOut);
    assert!(!fence.is_signaled());

    h.log.set_wait_status(gl::CONDITION_SATISFIED);
    assert_eq!(fence.wait(&h.device, 10).unwrap(), WaitOutcome::SignaledAfterWait);

    fence.reset(&h.device).unwrap();
    h.device.queue().submit(&[], Some(&fence)).unwrap();
    h.log.set_wait_status(gl::WAIT_FAILED);
    let err = fence.wait(&h.device, 10).unwrap_err();
    assert!(matches!(err, IcdError::DeviceLost(_)));
    assert_eq!(err.vk_result(), vk::Result::ERROR_DEVICE_LOST);
}

#[test]
fn resetting_a_pending_fence_deletes_its_sync() {
    let h = harness();
    let fence = Fence::new(false);
    h.device.queue().submit(&[], Some(&fence)).unwrap();
    assert_eq!(h.log.count("fence_sync"), 1);

    fence.reset(&h.device).unwrap();
    assert_eq!(h.log.count("delete_sync"), 1);
    assert!(!fence.is_signaled());
    assert_eq!(fence.wait(&h.device, 0).unwrap(), WaitOutcome::TimedOut);
    assert_eq!(h.log.count("client_wait_sync"), 0);

    h.device.queue().submit(&[], Some(&fence)).unwrap();
    assert_eq!(fence.wait(&h.device, 10).unwrap(), WaitOutcome::AlreadySignaled);
}

#[test]
fn mapped_writes_reach_gl_before_the_copy() {
    let h = harness();
    let memory = h.device.allocate_memory(16, true).unwrap();
    let target = h.device.allocate_memory(16, false).unwrap();
    let src = h.device.create_buffer(16, vk::BufferUsageFlags::TRANSFER_SRC);
    let dst = h.device.create_buffer(16, vk::BufferUsageFlags::TRANSFER_DST);
    h.device.bind_buffer_memory(&src, &memory, 0);
    h.device.bind_buffer_memory(&dst, &target, 0);
    h.device
        .map_memory(vk::Handle::from_raw(memory.id().raw), 0, vk::WHOLE_SIZE)
        .unwrap();

    let cb = h.recording();
    {
        let mut cb = lock(&cb);
        cb.copy_buffer(
            &src,
            &dst,
            &[vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: 16,
            }],
        );
        cb.end().unwrap();
    }
    memory.write(0, &[7; 16]);
    h.device.queue().submit(&[cb], None).unwrap();
    assert_eq!(h.log.buffer_contents(memory.gl_buffer()), Some(vec![7; 16]));
}

#[test]
fn memory_freed_after_recording_is_not_touched() {
    let h = harness();
    let memory = h.device.allocate_memory(16, true).unwrap();
    let buffer = h.device.create_buffer(16, vk::BufferUsageFlags::TRANSFER_DST);
    h.device.bind_buffer_memory(&buffer, &memory, 0);
    h.device
        .map_memory(vk::Handle::from_raw(memory.id().raw), 0, vk::WHOLE_SIZE)
        .unwrap();

    let cb = h.recording();
    {
        let mut cb = lock(&cb);
        cb.fill_buffer(&buffer, 0, vk::WHOLE_SIZE, 0xdead_beef);
        cb.end().unwrap();
        assert_eq!(cb.mapped_entries().len(), 2);
    }
    h.device.free_memory(vk::Handle::from_raw(memory.id().raw)).unwrap();
    h.log.clear();

    h.device.queue().submit(&[cb], None).unwrap();
    assert_eq!(h.log.count("named_buffer_sub_data"), 0);
    assert_eq!(h.log.count("get_named_buffer_sub_data"), 0);
    assert_eq!(h.reporter.count(Category::ResourceLifetime), 1);
}

#[test]
fn retired_vertex_arrays_are_deleted_on_the_next_submit() {
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
    desc.vertex_input.attributes.push(VertexAttributeDesc {
        location: 0,
        binding: 0,
        format: vk::Format::R32G32B32_SFLOAT,
        offset: 0,
    });
    let pipeline = h.device.create_graphics_pipeline(&desc).unwrap();
    let vertices = h.device.create_buffer(36, vk::BufferUsageFlags::VERTEX_BUFFER);
    let memory = h.device.allocate_memory(36, false).unwrap();
    h.device.bind_buffer_memory(&vertices, &memory, 0);

    let cb = h.recording();
    {
        let mut cb = lock(&cb);
        cb.begin_render_pass(&begin_info(&pass, &fb), vk::SubpassContents::INLINE);
        cb.bind_pipeline(&pipeline);
        cb.bind_vertex_buffers(0, &[(vertices.clone(), 0)]);
        cb.draw(3, 1, 0, 0);
        cb.end_render_pass();
        cb.end().unwrap();
    }
    h.device.queue().submit(&[cb], None).unwrap();
    assert_eq!(h.log.count("gen_vertex_array"), 1);

    h.device.destroy_pipeline(vk::Handle::from_raw(pipeline.id().raw)).unwrap();
    assert_eq!(h.log.count("delete_vertex_array"), 0);
    h.device.queue().submit(&[], None).unwrap();
    assert_eq!(h.log.count("delete_vertex_array"), 1);
}

#[test]
fn gl_errors_are_reported_when_checking_is_enabled() {
    let config = IcdConfig {
        check_gl_errors: true,
        ..Default::default()
    };
    let h = harness_with(vkgl_gl::GlCapabilities::for_core_version(4, 6), config);
    let cb = triangle(&h);
    h.log.push_error(gl::INVALID_OPERATION);

    h.device.queue().submit(&[cb], None).unwrap();
    assert_eq!(h.reporter.count(Category::Backend), 1);
    assert!(h.log.count("draw_arrays_instanced") == 1);
}

#[test]
fn legacy_backend_replays_the_same_draw() {
    let h = harness_with(common::legacy_caps(), IcdConfig::default());
    let cb = triangle(&h);
    h.device.queue().submit(&[cb], None).unwrap();
    assert!(h
        .log
        .contains(&format!("draw_arrays_instanced({}, 0, 3, 1)", gl::TRIANGLES)));
    assert_eq!(h.log.count("named_buffer_sub_data"), 0);
}
