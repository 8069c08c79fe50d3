/// Raw GL entry points used by the command replayer.
///
/// Every method maps onto exactly one GL call (or a small fixed sequence for the
/// `*_v` array forms). Object names are plain `u32`s with `0` meaning "none",
/// exactly as GL itself treats them. Offsets into bound pixel/indirect buffers
/// are passed as byte offsets rather than pointers.
///
/// Implementations are provided by the platform layer, which owns the actual
/// function-pointer table loaded for the current context. The trait itself
/// performs no validation.
pub trait GlApi: Send {
    /// Called when the context lock is acquired.
    fn make_current(&mut self) {}
    /// Called when the context lock is released.
    fn release_current(&mut self) {}
    fn swap_buffers(&mut self) {}

    fn get_error(&mut self) -> u32;
    fn flush(&mut self);
    fn finish(&mut self);

    // Fixed-function toggles.
    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn enable_i(&mut self, cap: u32, index: u32);
    fn disable_i(&mut self, cap: u32, index: u32);

    // Blending.
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn blend_func_separate_i(
        &mut self,
        buf: u32,
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    );
    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32);
    fn blend_equation_separate_i(&mut self, buf: u32, mode_rgb: u32, mode_alpha: u32);
    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn color_mask_i(&mut self, buf: u32, r: bool, g: bool, b: bool, a: bool);
    fn logic_op(&mut self, op: u32);

    // Depth/stencil.
    fn depth_func(&mut self, func: u32);
    fn depth_mask(&mut self, flag: bool);
    fn depth_range(&mut self, near: f64, far: f64);
    fn depth_range_array(&mut self, first: u32, ranges: &[[f64; 2]]);
    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32);
    fn stencil_op_separate(&mut self, face: u32, sfail: u32, dpfail: u32, dppass: u32);
    fn stencil_mask_separate(&mut self, face: u32, mask: u32);

    // Rasterizer.
    fn polygon_mode(&mut self, face: u32, mode: u32);
    fn cull_face(&mut self, mode: u32);
    fn front_face(&mut self, mode: u32);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn polygon_offset_clamp(&mut self, factor: f32, units: f32, clamp: f32);
    fn line_width(&mut self, width: f32);
    fn min_sample_shading(&mut self, value: f32);
    fn sample_mask_i(&mut self, index: u32, mask: u32);
    fn patch_parameter_i(&mut self, pname: u32, value: i32);
    fn primitive_restart_index(&mut self, index: u32);

    // Viewport and scissor.
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn viewport_array(&mut self, first: u32, viewports: &[[f32; 4]]);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn scissor_array(&mut self, first: u32, rects: &[[i32; 4]]);

    // Buffers.
    fn gen_buffer(&mut self) -> u32;
    fn delete_buffer(&mut self, buffer: u32);
    fn bind_buffer(&mut self, target: u32, buffer: u32);
    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: u32, offset: u64, size: u64);
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: u64, data: &[u8]);
    fn get_buffer_sub_data(&mut self, target: u32, offset: u64, out: &mut [u8]);
    fn copy_buffer_sub_data(
        &mut self,
        read_target: u32,
        write_target: u32,
        read_offset: u64,
        write_offset: u64,
        size: u64,
    );
    fn clear_buffer_sub_data(
        &mut self,
        target: u32,
        internal_format: u32,
        offset: u64,
        size: u64,
        format: u32,
        ty: u32,
        data: &[u8],
    );
    fn named_buffer_sub_data(&mut self, buffer: u32, offset: u64, data: &[u8]);
    fn get_named_buffer_sub_data(&mut self, buffer: u32, offset: u64, out: &mut [u8]);
    fn copy_named_buffer_sub_data(
        &mut self,
        read_buffer: u32,
        write_buffer: u32,
        read_offset: u64,
        write_offset: u64,
        size: u64,
    );

    // Textures, samplers and image units.
    fn gen_texture(&mut self) -> u32;
    fn delete_texture(&mut self, texture: u32);
    /// `glTexStorage{2,3}D` or the multisample variant when `samples > 1`.
    fn tex_storage(
        &mut self,
        target: u32,
        levels: u32,
        internal_format: u32,
        extent: [u32; 3],
        samples: u32,
    );
    fn gen_sampler(&mut self) -> u32;
    fn delete_sampler(&mut self, sampler: u32);
    fn sampler_parameter_i(&mut self, sampler: u32, pname: u32, value: i32);
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: u32, texture: u32);
    fn bind_sampler(&mut self, unit: u32, sampler: u32);
    fn bind_image_texture(
        &mut self,
        unit: u32,
        texture: u32,
        level: u32,
        layered: bool,
        layer: u32,
        access: u32,
        format: u32,
    );
    fn pixel_store_i(&mut self, pname: u32, value: i32);
    /// `glTexSubImage{2,3}D` sourcing from the bound `PIXEL_UNPACK_BUFFER` at `offset`.
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image(
        &mut self,
        target: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        offset: usize,
    );
    #[allow(clippy::too_many_arguments)]
    fn compressed_tex_sub_image(
        &mut self,
        target: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        internal_format: u32,
        image_size: u32,
        offset: usize,
    );
    /// `glGetTextureSubImage` writing into the bound `PIXEL_PACK_BUFFER` at `offset`.
    #[allow(clippy::too_many_arguments)]
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
    );
    /// `glReadPixels` writing into the bound `PIXEL_PACK_BUFFER` at `offset`.
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: u32,
        ty: u32,
        offset: usize,
    );
    #[allow(clippy::too_many_arguments)]
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
    );
    #[allow(clippy::too_many_arguments)]
    fn clear_tex_sub_image(
        &mut self,
        texture: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        data: &[u8],
    );

    // Framebuffers.
    fn gen_framebuffer(&mut self) -> u32;
    fn delete_framebuffer(&mut self, framebuffer: u32);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: u32);
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        tex_target: u32,
        texture: u32,
        level: u32,
    );
    fn framebuffer_texture_layer(
        &mut self,
        target: u32,
        attachment: u32,
        texture: u32,
        level: u32,
        layer: u32,
    );
    fn draw_buffers(&mut self, buffers: &[u32]);
    fn read_buffer(&mut self, src: u32);
    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32);
    fn clear_buffer_fv(&mut self, buffer: u32, draw_buffer: i32, value: &[f32; 4]);
    fn clear_buffer_iv(&mut self, buffer: u32, draw_buffer: i32, value: &[i32; 4]);
    fn clear_buffer_uiv(&mut self, buffer: u32, draw_buffer: i32, value: &[u32; 4]);
    fn clear_buffer_fi(&mut self, buffer: u32, draw_buffer: i32, depth: f32, stencil: i32);
    fn invalidate_framebuffer(&mut self, target: u32, attachments: &[u32]);

    // Programs and uniforms.
    fn use_program(&mut self, program: u32);
    fn delete_program(&mut self, program: u32);
    fn uniform_f32(&mut self, location: i32, components: u32, values: &[f32]);
    fn uniform_i32(&mut self, location: i32, components: u32, values: &[i32]);
    fn uniform_u32(&mut self, location: i32, components: u32, values: &[u32]);
    fn uniform_matrix_f32(&mut self, location: i32, columns: u32, rows: u32, values: &[f32]);
    fn program_uniform_f32(&mut self, program: u32, location: i32, components: u32, values: &[f32]);
    fn program_uniform_i32(&mut self, program: u32, location: i32, components: u32, values: &[i32]);
    fn program_uniform_u32(&mut self, program: u32, location: i32, components: u32, values: &[u32]);
    fn program_uniform_matrix_f32(
        &mut self,
        program: u32,
        location: i32,
        columns: u32,
        rows: u32,
        values: &[f32],
    );

    // Vertex arrays.
    fn gen_vertex_array(&mut self) -> u32;
    fn delete_vertex_array(&mut self, vao: u32);
    fn bind_vertex_array(&mut self, vao: u32);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: u32,
        ty: u32,
        normalized: bool,
        stride: u32,
        offset: u64,
    );
    fn vertex_attrib_i_pointer(&mut self, index: u32, size: u32, ty: u32, stride: u32, offset: u64);
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);
    fn vertex_attrib_format(
        &mut self,
        index: u32,
        size: u32,
        ty: u32,
        normalized: bool,
        relative_offset: u32,
    );
    fn vertex_attrib_i_format(&mut self, index: u32, size: u32, ty: u32, relative_offset: u32);
    fn vertex_attrib_binding(&mut self, index: u32, binding: u32);
    fn bind_vertex_buffer(&mut self, binding: u32, buffer: u32, offset: u64, stride: u32);
    fn vertex_binding_divisor(&mut self, binding: u32, divisor: u32);

    // Draws and dispatch.
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: u32, instances: u32);
    fn draw_arrays_instanced_base_instance(
        &mut self,
        mode: u32,
        first: i32,
        count: u32,
        instances: u32,
        base_instance: u32,
    );
    #[allow(clippy::too_many_arguments)]
    fn draw_elements_instanced_base_vertex(
        &mut self,
        mode: u32,
        count: u32,
        ty: u32,
        offset: u64,
        instances: u32,
        base_vertex: i32,
    );
    #[allow(clippy::too_many_arguments)]
    fn draw_elements_instanced_base_vertex_base_instance(
        &mut self,
        mode: u32,
        count: u32,
        ty: u32,
        offset: u64,
        instances: u32,
        base_vertex: i32,
        base_instance: u32,
    );
    fn draw_arrays_indirect(&mut self, mode: u32, offset: u64);
    fn draw_elements_indirect(&mut self, mode: u32, ty: u32, offset: u64);
    fn multi_draw_arrays_indirect(&mut self, mode: u32, offset: u64, draw_count: u32, stride: u32);
    fn multi_draw_elements_indirect(
        &mut self,
        mode: u32,
        ty: u32,
        offset: u64,
        draw_count: u32,
        stride: u32,
    );
    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32);
    fn dispatch_compute_indirect(&mut self, offset: u64);
    fn memory_barrier(&mut self, barriers: u32);

    // Queries.
    fn gen_query(&mut self) -> u32;
    fn delete_query(&mut self, query: u32);
    fn begin_query(&mut self, target: u32, query: u32);
    fn end_query(&mut self, target: u32);
    fn query_counter(&mut self, query: u32, target: u32);
    /// `glGetQueryBufferObjectui64v` (or `uiv` when `wide` is false) into
    /// `buffer` at `offset`.
    fn get_query_buffer_object(
        &mut self,
        query: u32,
        buffer: u32,
        pname: u32,
        offset: u64,
        wide: bool,
    );

    // Debug output.
    fn push_debug_group(&mut self, source: u32, id: u32, message: &str);
    fn pop_debug_group(&mut self);
    fn debug_message_insert(&mut self, source: u32, ty: u32, id: u32, severity: u32, message: &str);

    // Sync objects.
    fn fence_sync(&mut self) -> u64;
    fn client_wait_sync(&mut self, sync: u64, flags: u32, timeout_ns: u64) -> u32;
    fn delete_sync(&mut self, sync: u64);
}
