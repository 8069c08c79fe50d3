//! In-memory [`GlApi`] used by unit and integration tests.
//!
//! [`RecordingGl`] logs every call as `name(arg, arg, ...)` with each argument
//! formatted through `Debug`, hands out monotonically increasing object names
//! starting at 1, and keeps buffer contents so upload/download paths can be
//! checked end to end.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::GlApi;
use crate::consts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlCall {
    pub name: &'static str,
    pub args: String,
}

impl std::fmt::Display for GlCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.args)
    }
}

#[derive(Debug)]
struct Shared {
    calls: Vec<GlCall>,
    next_name: u32,
    buffers: HashMap<u32, Vec<u8>>,
    bound: HashMap<u32, u32>,
    pending_errors: VecDeque<u32>,
    wait_status: u32,
}

/// Handle onto the log of a [`RecordingGl`]; stays usable after the GL object
/// has been moved into a context.
#[derive(Debug, Clone)]
pub struct CallLog(Arc<Mutex<Shared>>);

impl CallLog {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.shared().calls.clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.shared().calls.iter().map(|c| c.name).collect()
    }

    /// Every call rendered as `name(args)`.
    pub fn lines(&self) -> Vec<String> {
        self.shared().calls.iter().map(ToString::to_string).collect()
    }

    /// Whether a call rendering exactly as `line` was made.
    pub fn contains(&self, line: &str) -> bool {
        self.shared().calls.iter().any(|c| c.to_string() == line)
    }

    pub fn count(&self, name: &str) -> usize {
        self.shared().calls.iter().filter(|c| c.name == name).count()
    }

    pub fn position(&self, line: &str) -> Option<usize> {
        self.shared().calls.iter().position(|c| c.to_string() == line)
    }

    pub fn last_name(&self) -> Option<&'static str> {
        self.shared().calls.last().map(|c| c.name)
    }

    pub fn clear(&self) {
        self.shared().calls.clear();
    }

    pub fn buffer_contents(&self, buffer: u32) -> Option<Vec<u8>> {
        self.shared().buffers.get(&buffer).cloned()
    }

    /// Queues `code` to be returned by the next `get_error`.
    pub fn push_error(&self, code: u32) {
        self.shared().pending_errors.push_back(code);
    }

    /// Status returned by every subsequent `client_wait_sync`.
    pub fn set_wait_status(&self, status: u32) {
        self.shared().wait_status = status;
    }
}

#[derive(Debug)]
pub struct RecordingGl {
    log: CallLog,
}

impl RecordingGl {
    pub fn new() -> (Self, CallLog) {
        let log = CallLog(Arc::new(Mutex::new(Shared {
            calls: Vec::new(),
            next_name: 1,
            buffers: HashMap::new(),
            bound: HashMap::new(),
            pending_errors: VecDeque::new(),
            wait_status: consts::ALREADY_SIGNALED,
        })));
        (Self { log: log.clone() }, log)
    }

    fn record(&self, name: &'static str, args: String) {
        self.log.shared().calls.push(GlCall { name, args });
    }

    fn gen(&self, name: &'static str) -> u32 {
        let mut shared = self.log.shared();
        let id = shared.next_name;
        shared.next_name += 1;
        shared.calls.push(GlCall {
            name,
            args: String::new(),
        });
        id
    }

    fn bound(&self, target: u32) -> u32 {
        self.log.shared().bound.get(&target).copied().unwrap_or(0)
    }

    fn write(&self, buffer: u32, offset: u64, data: &[u8]) {
        let mut shared = self.log.shared();
        let storage = shared.buffers.entry(buffer).or_default();
        let start = offset as usize;
        let end = start + data.len();
        if storage.len() < end {
            storage.resize(end, 0);
        }
        storage[start..end].copy_from_slice(data);
    }

    fn read(&self, buffer: u32, offset: u64, out: &mut [u8]) {
        let shared = self.log.shared();
        let Some(storage) = shared.buffers.get(&buffer) else {
            return;
        };
        let start = (offset as usize).min(storage.len());
        let end = (start + out.len()).min(storage.len());
        out[..end - start].copy_from_slice(&storage[start..end]);
    }

    fn copy(&self, src: u32, dst: u32, src_offset: u64, dst_offset: u64, size: u64) {
        let mut data = vec![0u8; size as usize];
        self.read(src, src_offset, &mut data);
        self.write(dst, dst_offset, &data);
    }
}

macro_rules! rec {
    ($self:ident, $name:literal) => {
        $self.record($name, String::new())
    };
    ($self:ident, $name:literal, $first:expr $(, $rest:expr)*) => {{
        #[allow(unused_mut)]
        let mut args = format!("{:?}", $first);
        $(
            args.push_str(", ");
            args.push_str(&format!("{:?}", $rest));
        )*
        $self.record($name, args)
    }};
}

impl GlApi for RecordingGl {
    fn make_current(&mut self) {
        rec!(self, "make_current")
    }
    fn release_current(&mut self) {
        rec!(self, "release_current")
    }
    fn swap_buffers(&mut self) {
        rec!(self, "swap_buffers")
    }

    fn get_error(&mut self) -> u32 {
        let code = self.log.shared().pending_errors.pop_front().unwrap_or(consts::NO_ERROR);
        rec!(self, "get_error");
        code
    }
    fn flush(&mut self) {
        rec!(self, "flush")
    }
    fn finish(&mut self) {
        rec!(self, "finish")
    }

    fn enable(&mut self, cap: u32) {
        rec!(self, "enable", cap)
    }
    fn disable(&mut self, cap: u32) {
        rec!(self, "disable", cap)
    }
    fn enable_i(&mut self, cap: u32, index: u32) {
        rec!(self, "enable_i", cap, index)
    }
    fn disable_i(&mut self, cap: u32, index: u32) {
        rec!(self, "disable_i", cap, index)
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        rec!(self, "blend_func_separate", src_rgb, dst_rgb, src_alpha, dst_alpha)
    }
    fn blend_func_separate_i(
        &mut self,
        buf: u32,
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    ) {
        rec!(self, "blend_func_separate_i", buf, src_rgb, dst_rgb, src_alpha, dst_alpha)
    }
    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        rec!(self, "blend_equation_separate", mode_rgb, mode_alpha)
    }
    fn blend_equation_separate_i(&mut self, buf: u32, mode_rgb: u32, mode_alpha: u32) {
        rec!(self, "blend_equation_separate_i", buf, mode_rgb, mode_alpha)
    }
    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        rec!(self, "blend_color", r, g, b, a)
    }
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        rec!(self, "color_mask", r, g, b, a)
    }
    fn color_mask_i(&mut self, buf: u32, r: bool, g: bool, b: bool, a: bool) {
        rec!(self, "color_mask_i", buf, r, g, b, a)
    }
    fn logic_op(&mut self, op: u32) {
        rec!(self, "logic_op", op)
    }

    fn depth_func(&mut self, func: u32) {
        rec!(self, "depth_func", func)
    }
    fn depth_mask(&mut self, flag: bool) {
        rec!(self, "depth_mask", flag)
    }
    fn depth_range(&mut self, near: f64, far: f64) {
        rec!(self, "depth_range", near, far)
    }
    fn depth_range_array(&mut self, first: u32, ranges: &[[f64; 2]]) {
        rec!(self, "depth_range_array", first, ranges)
    }
    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        rec!(self, "stencil_func_separate", face, func, reference, mask)
    }
    fn stencil_op_separate(&mut self, face: u32, sfail: u32, dpfail: u32, dppass: u32) {
        rec!(self, "stencil_op_separate", face, sfail, dpfail, dppass)
    }
    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        rec!(self, "stencil_mask_separate", face, mask)
    }

    fn polygon_mode(&mut self, face: u32, mode: u32) {
        rec!(self, "polygon_mode", face, mode)
    }
    fn cull_face(&mut self, mode: u32) {
        rec!(self, "cull_face", mode)
    }
    fn front_face(&mut self, mode: u32) {
        rec!(self, "front_face", mode)
    }
    fn polygon_offset(&mut self, factor: f32, units: f32) {
        rec!(self, "polygon_offset", factor, units)
    }
    fn polygon_offset_clamp(&mut self, factor: f32, units: f32, clamp: f32) {
        rec!(self, "polygon_offset_clamp", factor, units, clamp)
    }
    fn line_width(&mut self, width: f32) {
        rec!(self, "line_width", width)
    }
    fn min_sample_shading(&mut self, value: f32) {
        rec!(self, "min_sample_shading", value)
    }
    fn sample_mask_i(&mut self, index: u32, mask: u32) {
        rec!(self, "sample_mask_i", index, mask)
    }
    fn patch_parameter_i(&mut self, pname: u32, value: i32) {
        rec!(self, "patch_parameter_i", pname, value)
    }
    fn primitive_restart_index(&mut self, index: u32) {
        rec!(self, "primitive_restart_index", index)
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        rec!(self, "viewport", x, y, width, height)
    }
    fn viewport_array(&mut self, first: u32, viewports: &[[f32; 4]]) {
        rec!(self, "viewport_array", first, viewports)
    }
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        rec!(self, "scissor", x, y, width, height)
    }
    fn scissor_array(&mut self, first: u32, rects: &[[i32; 4]]) {
        rec!(self, "scissor_array", first, rects)
    }

    fn gen_buffer(&mut self) -> u32 {
        self.gen("gen_buffer")
    }
    fn delete_buffer(&mut self, buffer: u32) {
        self.log.shared().buffers.remove(&buffer);
        rec!(self, "delete_buffer", buffer)
    }
    fn bind_buffer(&mut self, target: u32, buffer: u32) {
        self.log.shared().bound.insert(target, buffer);
        rec!(self, "bind_buffer", target, buffer)
    }
    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: u32, offset: u64, size: u64) {
        rec!(self, "bind_buffer_range", target, index, buffer, offset, size)
    }
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        let buffer = self.bound(target);
        self.log.shared().buffers.insert(buffer, data.to_vec());
        rec!(self, "buffer_data", target, data.len(), usage)
    }
    fn buffer_sub_data(&mut self, target: u32, offset: u64, data: &[u8]) {
        let buffer = self.bound(target);
        self.write(buffer, offset, data);
        rec!(self, "buffer_sub_data", target, offset, data.len())
    }
    fn get_buffer_sub_data(&mut self, target: u32, offset: u64, out: &mut [u8]) {
        let buffer = self.bound(target);
        self.read(buffer, offset, out);
        rec!(self, "get_buffer_sub_data", target, offset, out.len())
    }
    fn copy_buffer_sub_data(
        &mut self,
        read_target: u32,
        write_target: u32,
        read_offset: u64,
        write_offset: u64,
        size: u64,
    ) {
        let (src, dst) = (self.bound(read_target), self.bound(write_target));
        self.copy(src, dst, read_offset, write_offset, size);
        rec!(
            self,
            "copy_buffer_sub_data",
            read_target,
            write_target,
            read_offset,
            write_offset,
            size
        )
    }
    fn clear_buffer_sub_data(
        &mut self,
        target: u32,
        internal_format: u32,
        offset: u64,
        size: u64,
        format: u32,
        ty: u32,
        data: &[u8],
    ) {
        if !data.is_empty() {
            let buffer = self.bound(target);
            let fill: Vec<u8> = data.iter().copied().cycle().take(size as usize).collect();
            self.write(buffer, offset, &fill);
        }
        rec!(self, "clear_buffer_sub_data", target, internal_format, offset, size, format, ty, data)
    }
    fn named_buffer_sub_data(&mut self, buffer: u32, offset: u64, data: &[u8]) {
        self.write(buffer, offset, data);
        rec!(self, "named_buffer_sub_data", buffer, offset, data.len())
    }
    fn get_named_buffer_sub_data(&mut self, buffer: u32, offset: u64, out: &mut [u8]) {
        self.read(buffer, offset, out);
        rec!(self, "get_named_buffer_sub_data", buffer, offset, out.len())
    }
    fn copy_named_buffer_sub_data(
        &mut self,
        read_buffer: u32,
        write_buffer: u32,
        read_offset: u64,
        write_offset: u64,
        size: u64,
    ) {
        self.copy(read_buffer, write_buffer, read_offset, write_offset, size);
        rec!(
            self,
            "copy_named_buffer_sub_data",
            read_buffer,
            write_buffer,
            read_offset,
            write_offset,
            size
        )
    }

    fn gen_texture(&mut self) -> u32 {
        self.gen("gen_texture")
    }
    fn delete_texture(&mut self, texture: u32) {
        rec!(self, "delete_texture", texture)
    }
    fn tex_storage(
        &mut self,
        target: u32,
        levels: u32,
        internal_format: u32,
        extent: [u32; 3],
        samples: u32,
    ) {
        rec!(self, "tex_storage", target, levels, internal_format, extent, samples)
    }
    fn gen_sampler(&mut self) -> u32 {
        self.gen("gen_sampler")
    }
    fn delete_sampler(&mut self, sampler: u32) {
        rec!(self, "delete_sampler", sampler)
    }
    fn sampler_parameter_i(&mut self, sampler: u32, pname: u32, value: i32) {
        rec!(self, "sampler_parameter_i", sampler, pname, value)
    }
    fn active_texture(&mut self, unit: u32) {
        rec!(self, "active_texture", unit)
    }
    fn bind_texture(&mut self, target: u32, texture: u32) {
        rec!(self, "bind_texture", target, texture)
    }
    fn bind_sampler(&mut self, unit: u32, sampler: u32) {
        rec!(self, "bind_sampler", unit, sampler)
    }
    fn bind_image_texture(
        &mut self,
        unit: u32,
        texture: u32,
        level: u32,
        layered: bool,
        layer: u32,
        access: u32,
        format: u32,
    ) {
        rec!(self, "bind_image_texture", unit, texture, level, layered, layer, access, format)
    }
    fn pixel_store_i(&mut self, pname: u32, value: i32) {
        rec!(self, "pixel_store_i", pname, value)
    }
    fn tex_sub_image(
        &mut self,
        target: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        offset: usize,
    ) {
        rec!(self, "tex_sub_image", target, level, origin, extent, format, ty, offset)
    }
    fn compressed_tex_sub_image(
        &mut self,
        target: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        internal_format: u32,
        image_size: u32,
        offset: usize,
    ) {
        rec!(
            self,
            "compressed_tex_sub_image",
            target,
            level,
            origin,
            extent,
            internal_format,
            image_size,
            offset
        )
    }
    fn get_texture_sub_image(
        &mut self,
        texture: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        buf_size: u32,
        offset: usize,
    ) {
        rec!(
            self,
            "get_texture_sub_image",
            texture,
            level,
            origin,
            extent,
            format,
            ty,
            buf_size,
            offset
        )
    }
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: u32,
        ty: u32,
        offset: usize,
    ) {
        rec!(self, "read_pixels", x, y, width, height, format, ty, offset)
    }
    fn copy_image_sub_data(
        &mut self,
        src: u32,
        src_target: u32,
        src_level: u32,
        src_origin: [i32; 3],
        dst: u32,
        dst_target: u32,
        dst_level: u32,
        dst_origin: [i32; 3],
        extent: [u32; 3],
    ) {
        rec!(
            self,
            "copy_image_sub_data",
            src,
            src_target,
            src_level,
            src_origin,
            dst,
            dst_target,
            dst_level,
            dst_origin,
            extent
        )
    }
    fn clear_tex_sub_image(
        &mut self,
        texture: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        data: &[u8],
    ) {
        rec!(self, "clear_tex_sub_image", texture, level, origin, extent, format, ty, data)
    }

    fn gen_framebuffer(&mut self) -> u32 {
        self.gen("gen_framebuffer")
    }
    fn delete_framebuffer(&mut self, framebuffer: u32) {
        rec!(self, "delete_framebuffer", framebuffer)
    }
    fn bind_framebuffer(&mut self, target: u32, framebuffer: u32) {
        rec!(self, "bind_framebuffer", target, framebuffer)
    }
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        tex_target: u32,
        texture: u32,
        level: u32,
    ) {
        rec!(self, "framebuffer_texture_2d", target, attachment, tex_target, texture, level)
    }
    fn framebuffer_texture_layer(
        &mut self,
        target: u32,
        attachment: u32,
        texture: u32,
        level: u32,
        layer: u32,
    ) {
        rec!(self, "framebuffer_texture_layer", target, attachment, texture, level, layer)
    }
    fn draw_buffers(&mut self, buffers: &[u32]) {
        rec!(self, "draw_buffers", buffers)
    }
    fn read_buffer(&mut self, src: u32) {
        rec!(self, "read_buffer", src)
    }
    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        rec!(self, "blit_framebuffer", src, dst, mask, filter)
    }
    fn clear_buffer_fv(&mut self, buffer: u32, draw_buffer: i32, value: &[f32; 4]) {
        rec!(self, "clear_buffer_fv", buffer, draw_buffer, value)
    }
    fn clear_buffer_iv(&mut self, buffer: u32, draw_buffer: i32, value: &[i32; 4]) {
        rec!(self, "clear_buffer_iv", buffer, draw_buffer, value)
    }
    fn clear_buffer_uiv(&mut self, buffer: u32, draw_buffer: i32, value: &[u32; 4]) {
        rec!(self, "clear_buffer_uiv", buffer, draw_buffer, value)
    }
    fn clear_buffer_fi(&mut self, buffer: u32, draw_buffer: i32, depth: f32, stencil: i32) {
        rec!(self, "clear_buffer_fi", buffer, draw_buffer, depth, stencil)
    }
    fn invalidate_framebuffer(&mut self, target: u32, attachments: &[u32]) {
        rec!(self, "invalidate_framebuffer", target, attachments)
    }

    fn use_program(&mut self, program: u32) {
        rec!(self, "use_program", program)
    }
    fn delete_program(&mut self, program: u32) {
        rec!(self, "delete_program", program)
    }
    fn uniform_f32(&mut self, location: i32, components: u32, values: &[f32]) {
        rec!(self, "uniform_f32", location, components, values)
    }
    fn uniform_i32(&mut self, location: i32, components: u32, values: &[i32]) {
        rec!(self, "uniform_i32", location, components, values)
    }
    fn uniform_u32(&mut self, location: i32, components: u32, values: &[u32]) {
        rec!(self, "uniform_u32", location, components, values)
    }
    fn uniform_matrix_f32(&mut self, location: i32, columns: u32, rows: u32, values: &[f32]) {
        rec!(self, "uniform_matrix_f32", location, columns, rows, values)
    }
    fn program_uniform_f32(
        &mut self,
        program: u32,
        location: i32,
        components: u32,
        values: &[f32],
    ) {
        rec!(self, "program_uniform_f32", program, location, components, values)
    }
    fn program_uniform_i32(
        &mut self,
        program: u32,
        location: i32,
        components: u32,
        values: &[i32],
    ) {
        rec!(self, "program_uniform_i32", program, location, components, values)
    }
    fn program_uniform_u32(
        &mut self,
        program: u32,
        location: i32,
        components: u32,
        values: &[u32],
    ) {
        rec!(self, "program_uniform_u32", program, location, components, values)
    }
    fn program_uniform_matrix_f32(
        &mut self,
        program: u32,
        location: i32,
        columns: u32,
        rows: u32,
        values: &[f32],
    ) {
        rec!(self, "program_uniform_matrix_f32", program, location, columns, rows, values)
    }

    fn gen_vertex_array(&mut self) -> u32 {
        self.gen("gen_vertex_array")
    }
    fn delete_vertex_array(&mut self, vao: u32) {
        rec!(self, "delete_vertex_array", vao)
    }
    fn bind_vertex_array(&mut self, vao: u32) {
        rec!(self, "bind_vertex_array", vao)
    }
    fn enable_vertex_attrib_array(&mut self, index: u32) {
        rec!(self, "enable_vertex_attrib_array", index)
    }
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: u32,
        ty: u32,
        normalized: bool,
        stride: u32,
        offset: u64,
    ) {
        rec!(self, "vertex_attrib_pointer", index, size, ty, normalized, stride, offset)
    }
    fn vertex_attrib_i_pointer(
        &mut self,
        index: u32,
        size: u32,
        ty: u32,
        stride: u32,
        offset: u64,
    ) {
        rec!(self, "vertex_attrib_i_pointer", index, size, ty, stride, offset)
    }
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        rec!(self, "vertex_attrib_divisor", index, divisor)
    }
    fn vertex_attrib_format(
        &mut self,
        index: u32,
        size: u32,
        ty: u32,
        normalized: bool,
        relative_offset: u32,
    ) {
        rec!(self, "vertex_attrib_format", index, size, ty, normalized, relative_offset)
    }
    fn vertex_attrib_i_format(&mut self, index: u32, size: u32, ty: u32, relative_offset: u32) {
        rec!(self, "vertex_attrib_i_format", index, size, ty, relative_offset)
    }
    fn vertex_attrib_binding(&mut self, index: u32, binding: u32) {
        rec!(self, "vertex_attrib_binding", index, binding)
    }
    fn bind_vertex_buffer(&mut self, binding: u32, buffer: u32, offset: u64, stride: u32) {
        rec!(self, "bind_vertex_buffer", binding, buffer, offset, stride)
    }
    fn vertex_binding_divisor(&mut self, binding: u32, divisor: u32) {
        rec!(self, "vertex_binding_divisor", binding, divisor)
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: u32, instances: u32) {
        rec!(self, "draw_arrays_instanced", mode, first, count, instances)
    }
    fn draw_arrays_instanced_base_instance(
        &mut self,
        mode: u32,
        first: i32,
        count: u32,
        instances: u32,
        base_instance: u32,
    ) {
        rec!(
            self,
            "draw_arrays_instanced_base_instance",
            mode,
            first,
            count,
            instances,
            base_instance
        )
    }
    fn draw_elements_instanced_base_vertex(
        &mut self,
        mode: u32,
        count: u32,
        ty: u32,
        offset: u64,
        instances: u32,
        base_vertex: i32,
    ) {
        rec!(
            self,
            "draw_elements_instanced_base_vertex",
            mode,
            count,
            ty,
            offset,
            instances,
            base_vertex
        )
    }
    fn draw_elements_instanced_base_vertex_base_instance(
        &mut self,
        mode: u32,
        count: u32,
        ty: u32,
        offset: u64,
        instances: u32,
        base_vertex: i32,
        base_instance: u32,
    ) {
        rec!(
            self,
            "draw_elements_instanced_base_vertex_base_instance",
            mode,
            count,
            ty,
            offset,
            instances,
            base_vertex,
            base_instance
        )
    }
    fn draw_arrays_indirect(&mut self, mode: u32, offset: u64) {
        rec!(self, "draw_arrays_indirect", mode, offset)
    }
    fn draw_elements_indirect(&mut self, mode: u32, ty: u32, offset: u64) {
        rec!(self, "draw_elements_indirect", mode, ty, offset)
    }
    fn multi_draw_arrays_indirect(&mut self, mode: u32, offset: u64, draw_count: u32, stride: u32) {
        rec!(self, "multi_draw_arrays_indirect", mode, offset, draw_count, stride)
    }
    fn multi_draw_elements_indirect(
        &mut self,
        mode: u32,
        ty: u32,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        rec!(self, "multi_draw_elements_indirect", mode, ty, offset, draw_count, stride)
    }
    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        rec!(self, "dispatch_compute", x, y, z)
    }
    fn dispatch_compute_indirect(&mut self, offset: u64) {
        rec!(self, "dispatch_compute_indirect", offset)
    }
    fn memory_barrier(&mut self, barriers: u32) {
        rec!(self, "memory_barrier", barriers)
    }

    fn gen_query(&mut self) -> u32 {
        self.gen("gen_query")
    }
    fn delete_query(&mut self, query: u32) {
        rec!(self, "delete_query", query)
    }
    fn begin_query(&mut self, target: u32, query: u32) {
        rec!(self, "begin_query", target, query)
    }
    fn end_query(&mut self, target: u32) {
        rec!(self, "end_query", target)
    }
    fn query_counter(&mut self, query: u32, target: u32) {
        rec!(self, "query_counter", query, target)
    }
    fn get_query_buffer_object(
        &mut self,
        query: u32,
        buffer: u32,
        pname: u32,
        offset: u64,
        wide: bool,
    ) {
        rec!(self, "get_query_buffer_object", query, buffer, pname, offset, wide)
    }

    fn push_debug_group(&mut self, source: u32, id: u32, message: &str) {
        rec!(self, "push_debug_group", source, id, message)
    }
    fn pop_debug_group(&mut self) {
        rec!(self, "pop_debug_group")
    }
    fn debug_message_insert(
        &mut self,
        source: u32,
        ty: u32,
        id: u32,
        severity: u32,
        message: &str,
    ) {
        rec!(self, "debug_message_insert", source, ty, id, severity, message)
    }

    fn fence_sync(&mut self) -> u64 {
        u64::from(self.gen("fence_sync"))
    }
    fn client_wait_sync(&mut self, sync: u64, flags: u32, timeout_ns: u64) -> u32 {
        let status = self.log.shared().wait_status;
        rec!(self, "client_wait_sync", sync, flags, timeout_ns);
        status
    }
    fn delete_sync(&mut self, sync: u64) {
        rec!(self, "delete_sync", sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_monotonic_across_kinds() {
        let (mut gl, _log) = RecordingGl::new();
        assert_eq!(gl.gen_buffer(), 1);
        assert_eq!(gl.gen_framebuffer(), 2);
        assert_eq!(gl.gen_vertex_array(), 3);
    }

    #[test]
    fn buffer_storage_follows_bindings() {
        let (mut gl, log) = RecordingGl::new();
        let buf = gl.gen_buffer();
        gl.bind_buffer(consts::ARRAY_BUFFER, buf);
        gl.buffer_data(consts::ARRAY_BUFFER, &[0; 8], consts::DYNAMIC_DRAW);
        gl.named_buffer_sub_data(buf, 2, &[7, 7]);

        let mut out = [0u8; 4];
        gl.get_buffer_sub_data(consts::ARRAY_BUFFER, 1, &mut out);
        assert_eq!(out, [0, 7, 7, 0]);
        assert_eq!(log.buffer_contents(buf).unwrap().len(), 8);
        assert!(log.contains("named_buffer_sub_data(1, 2, 2)"));
    }

    #[test]
    fn queued_errors_drain_in_order() {
        let (mut gl, log) = RecordingGl::new();
        log.push_error(consts::INVALID_ENUM);
        assert_eq!(gl.get_error(), consts::INVALID_ENUM);
        assert_eq!(gl.get_error(), consts::NO_ERROR);
    }
}
