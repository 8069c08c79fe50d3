//! Transfer commands.
//!
//! Copies between buffers go straight to `glCopyBufferSubData`. Anything
//! involving an image either uses a texture entry point (`glCopyImageSubData`,
//! `glTexSubImage*`, `glClearTexSubImage`) when the context has it, or falls
//! back to blits and clears through the scratch framebuffers. The fallbacks
//! disturb the framebuffer binding, which the state stack is told about.

use std::sync::Arc;

use ash::vk;
use tracing::trace;
use vkgl_gl::consts as gl;
use vkgl_gl::GlFeatures;

use crate::cmd::{ClearColor, ClearValue, GlCmd};
use crate::format::FormatInfo;
use crate::objects::{Buffer, Image};
use crate::state::translate;

use super::CommandBuffer;

fn offset3(o: vk::Offset3D) -> [i32; 3] {
    [o.x, o.y, o.z]
}

fn corners(o: vk::Offset3D, e: vk::Extent3D) -> [i32; 4] {
    [o.x, o.y, o.x + e.width as i32, o.y + e.height as i32]
}

fn blit_corners(offsets: &[vk::Offset3D; 2]) -> [i32; 4] {
    [offsets[0].x, offsets[0].y, offsets[1].x, offsets[1].y]
}

/// Extent of a blit region whose corners are in increasing order.
fn blit_extent(offsets: &[vk::Offset3D; 2]) -> [u32; 3] {
    [
        (offsets[1].x - offsets[0].x) as u32,
        (offsets[1].y - offsets[0].y) as u32,
        (offsets[1].z - offsets[0].z) as u32,
    ]
}

fn is_ascending(offsets: &[vk::Offset3D; 2]) -> bool {
    offsets[0].x <= offsets[1].x && offsets[0].y <= offsets[1].y && offsets[0].z <= offsets[1].z
}

/// Whether a blit region is an unscaled, unmirrored copy that
/// `glCopyImageSubData` can do without the scratch framebuffers.
fn blit_is_copy(features: GlFeatures, src: &Image, dst: &Image, r: &vk::ImageBlit) -> bool {
    features.contains(GlFeatures::COPY_IMAGE)
        && src.info().copy_compatible(dst.info())
        && src.is_3d() == dst.is_3d()
        && is_ascending(&r.src_offsets)
        && is_ascending(&r.dst_offsets)
        && blit_extent(&r.src_offsets) == blit_extent(&r.dst_offsets)
}

/// Z origin of a texture copy: the slice for 3D images, the layer otherwise.
fn origin_z(image: &Image, offset: vk::Offset3D, sub: &vk::ImageSubresourceLayers) -> i32 {
    if image.is_3d() {
        offset.z
    } else {
        sub.base_array_layer as i32
    }
}

fn layer_count(image: &Image, subresource: &vk::ImageSubresourceLayers) -> u32 {
    if subresource.layer_count == vk::REMAINING_ARRAY_LAYERS {
        image.array_layers().saturating_sub(subresource.base_array_layer)
    } else {
        subresource.layer_count
    }
}

/// Packed size of one layer of a buffer/image copy region.
fn region_layer_size(info: &FormatInfo, region: &vk::BufferImageCopy) -> u64 {
    let width = if region.buffer_row_length == 0 {
        region.image_extent.width
    } else {
        region.buffer_row_length
    };
    let height = if region.buffer_image_height == 0 {
        region.image_extent.height
    } else {
        region.buffer_image_height
    };
    info.region_size(width, height, region.image_extent.depth)
}

/// Pixel data for `glClearTexSubImage` and the matching format/type pair.
fn clear_tex_data(info: &FormatInfo, color: ClearColor) -> (u32, u32, Vec<u8>) {
    match color.reinterpret(info) {
        ClearColor::Float(v) => (gl::RGBA, gl::FLOAT, bytemuck::cast_slice(&v).to_vec()),
        ClearColor::Int(v) => (gl::RGBA_INTEGER, gl::INT, bytemuck::cast_slice(&v).to_vec()),
        ClearColor::Uint(v) => {
            (gl::RGBA_INTEGER, gl::UNSIGNED_INT, bytemuck::cast_slice(&v).to_vec())
        }
    }
}

impl CommandBuffer {
    /// `vkCmdCopyBuffer`.
    pub fn copy_buffer(
        &mut self,
        src: &Arc<Buffer>,
        dst: &Arc<Buffer>,
        regions: &[vk::BufferCopy],
    ) {
        if !self.recording("vkCmdCopyBuffer") {
            return;
        }
        self.upload_buffer(src);
        self.upload_buffer(dst);
        for r in regions {
            self.push(GlCmd::CopyBuffer {
                src: src.gl_name(),
                dst: dst.gl_name(),
                src_offset: src.gl_offset(r.src_offset),
                dst_offset: dst.gl_offset(r.dst_offset),
                size: r.size,
            });
        }
        self.download_buffer(dst);
    }

    /// `vkCmdUpdateBuffer`.
    pub fn update_buffer(&mut self, buffer: &Arc<Buffer>, offset: u64, data: &[u8]) {
        if !self.recording("vkCmdUpdateBuffer") {
            return;
        }
        if data.len() % 4 != 0 || data.len() > 65536 {
            self.reporter().validation(
                Some(self.id()),
                format!(
                    "vkCmdUpdateBuffer data size {} is not a multiple of 4 up to 65536",
                    data.len()
                ),
            );
            return;
        }
        self.upload_buffer(buffer);
        self.push(GlCmd::UpdateBuffer {
            buffer: buffer.gl_name(),
            offset: buffer.gl_offset(offset),
            data: data.to_vec(),
        });
        self.download_buffer(buffer);
    }

    /// `vkCmdFillBuffer`. `VK_WHOLE_SIZE` fills to the end of the buffer,
    /// rounded down to a multiple of four.
    pub fn fill_buffer(&mut self, buffer: &Arc<Buffer>, offset: u64, size: u64, data: u32) {
        if !self.recording("vkCmdFillBuffer") {
            return;
        }
        let size = if size == vk::WHOLE_SIZE {
            buffer.size().saturating_sub(offset) & !3
        } else {
            size
        };
        self.upload_buffer(buffer);
        self.push(GlCmd::FillBuffer {
            buffer: buffer.gl_name(),
            offset: buffer.gl_offset(offset),
            size,
            data,
            use_clear: self.features().contains(GlFeatures::CLEAR_BUFFER_DATA),
        });
        self.download_buffer(buffer);
    }

    /// `vkCmdCopyImage`. Falls back to per-layer blits when the formats
    /// are not copy compatible or `glCopyImageSubData` is missing.
    pub fn copy_image(&mut self, src: &Arc<Image>, dst: &Arc<Image>, regions: &[vk::ImageCopy]) {
        if !self.recording("vkCmdCopyImage") {
            return;
        }
        let direct = self.features().contains(GlFeatures::COPY_IMAGE)
            && src.info().copy_compatible(dst.info());
        let mut blitted = false;
        for r in regions {
            let layers = layer_count(src, &r.src_subresource);
            if direct {
                let depth = if src.is_3d() { r.extent.depth } else { layers };
                self.push(GlCmd::CopyImage {
                    src: src.gl_name(),
                    src_target: src.target(),
                    src_level: r.src_subresource.mip_level,
                    src_origin: [
                        r.src_offset.x,
                        r.src_offset.y,
                        origin_z(src, r.src_offset, &r.src_subresource),
                    ],
                    dst: dst.gl_name(),
                    dst_target: dst.target(),
                    dst_level: r.dst_subresource.mip_level,
                    dst_origin: [
                        r.dst_offset.x,
                        r.dst_offset.y,
                        origin_z(dst, r.dst_offset, &r.dst_subresource),
                    ],
                    extent: [r.extent.width, r.extent.height, depth],
                });
                continue;
            }
            if !blitted {
                self.stack.prepare_clear(&mut self.during);
                blitted = true;
            }
            let mask = src.info().blit_mask() & dst.info().blit_mask();
            for layer in 0..layers {
                self.push(GlCmd::BlitImage {
                    src: src.subresource(
                        r.src_subresource.mip_level,
                        r.src_subresource.base_array_layer + layer,
                        0,
                    ),
                    dst: dst.subresource(
                        r.dst_subresource.mip_level,
                        r.dst_subresource.base_array_layer + layer,
                        0,
                    ),
                    src_rect: corners(r.src_offset, r.extent),
                    dst_rect: corners(r.dst_offset, r.extent),
                    mask,
                    filter: gl::NEAREST,
                });
            }
        }
        if blitted {
            self.stack.forget_framebuffer();
        }
        self.read_back_image(dst);
    }

    /// `vkCmdBlitImage`.
    pub fn blit_image(
        &mut self,
        src: &Arc<Image>,
        dst: &Arc<Image>,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        if !self.recording("vkCmdBlitImage") {
            return;
        }
        let mask = src.info().blit_mask() & dst.info().blit_mask();
        // Depth/stencil blits only support NEAREST.
        let filter = if mask == gl::COLOR_BUFFER_BIT {
            translate::filter(filter)
        } else {
            gl::NEAREST
        };
        let copy_all = regions.iter().all(|r| blit_is_copy(self.features(), src, dst, r));
        if !copy_all {
            self.stack.prepare_clear(&mut self.during);
        }
        for r in regions {
            if blit_is_copy(self.features(), src, dst, r) {
                self.push_blit_copy(src, dst, r);
                continue;
            }
            for layer in 0..layer_count(src, &r.src_subresource) {
                let src_layer = r.src_subresource.base_array_layer + layer;
                let dst_layer = r.dst_subresource.base_array_layer + layer;
                self.push(GlCmd::BlitImage {
                    src: src.subresource(r.src_subresource.mip_level, src_layer, 0),
                    dst: dst.subresource(r.dst_subresource.mip_level, dst_layer, 0),
                    src_rect: blit_corners(&r.src_offsets),
                    dst_rect: blit_corners(&r.dst_offsets),
                    mask,
                    filter,
                });
            }
        }
        if !copy_all {
            self.stack.forget_framebuffer();
        }
        self.read_back_image(dst);
    }

    /// An unscaled blit as `glCopyImageSubData`, one call per layer. 3D
    /// images carry their slice range in z.
    fn push_blit_copy(&mut self, src: &Image, dst: &Image, r: &vk::ImageBlit) {
        let [width, height, depth] = blit_extent(&r.src_offsets);
        let (layers, depth) = if src.is_3d() {
            (1, depth)
        } else {
            (layer_count(src, &r.src_subresource), 1)
        };
        for layer in 0..layers {
            let z = |offsets: &[vk::Offset3D; 2], sub: &vk::ImageSubresourceLayers, image: &Image| {
                if image.is_3d() {
                    offsets[0].z
                } else {
                    (sub.base_array_layer + layer) as i32
                }
            };
            self.push(GlCmd::CopyImage {
                src: src.gl_name(),
                src_target: src.target(),
                src_level: r.src_subresource.mip_level,
                src_origin: [
                    r.src_offsets[0].x,
                    r.src_offsets[0].y,
                    z(&r.src_offsets, &r.src_subresource, src),
                ],
                dst: dst.gl_name(),
                dst_target: dst.target(),
                dst_level: r.dst_subresource.mip_level,
                dst_origin: [
                    r.dst_offsets[0].x,
                    r.dst_offsets[0].y,
                    z(&r.dst_offsets, &r.dst_subresource, dst),
                ],
                extent: [width, height, depth],
            });
        }
    }

    /// `vkCmdResolveImage`.
    pub fn resolve_image(
        &mut self,
        src: &Arc<Image>,
        dst: &Arc<Image>,
        regions: &[vk::ImageResolve],
    ) {
        if !self.recording("vkCmdResolveImage") {
            return;
        }
        self.stack.prepare_clear(&mut self.during);
        for r in regions {
            for layer in 0..layer_count(src, &r.src_subresource) {
                self.push(GlCmd::BlitImage {
                    src: src.subresource(
                        r.src_subresource.mip_level,
                        r.src_subresource.base_array_layer + layer,
                        0,
                    ),
                    dst: dst.subresource(
                        r.dst_subresource.mip_level,
                        r.dst_subresource.base_array_layer + layer,
                        0,
                    ),
                    src_rect: corners(r.src_offset, r.extent),
                    dst_rect: corners(r.dst_offset, r.extent),
                    mask: gl::COLOR_BUFFER_BIT,
                    filter: gl::NEAREST,
                });
            }
        }
        self.stack.forget_framebuffer();
        self.read_back_image(dst);
    }

    /// `vkCmdCopyBufferToImage`. Cube maps are uploaded one face at a time;
    /// every other target takes all layers in one call.
    pub fn copy_buffer_to_image(
        &mut self,
        buffer: &Arc<Buffer>,
        image: &Arc<Image>,
        regions: &[vk::BufferImageCopy],
    ) {
        if !self.recording("vkCmdCopyBufferToImage") {
            return;
        }
        self.upload_buffer(buffer);
        let info = *image.info();
        for r in regions {
            let sub = &r.image_subresource;
            let layers = layer_count(image, sub);
            let layer_size = region_layer_size(&info, r);
            let compressed_size = |count: u32| {
                info.is_compressed()
                    .then(|| (layer_size * u64::from(count)) as u32)
            };
            let upload =
                |target: u32, origin: [i32; 3], extent: [u32; 3], offset: u64, count: u32| {
                    GlCmd::TexSubImage {
                        texture: image.gl_name(),
                        bind_target: image.target(),
                        target,
                        level: sub.mip_level,
                        origin,
                        extent,
                        format: info.format,
                        ty: info.ty,
                        compressed_size: compressed_size(count),
                        buffer: buffer.gl_name(),
                        offset: buffer.gl_offset(offset),
                        row_length: r.buffer_row_length,
                        image_height: r.buffer_image_height,
                    }
                };
            let (w, h) = (r.image_extent.width, r.image_extent.height);

            let cmds: Vec<GlCmd> = match image.target() {
                gl::TEXTURE_CUBE_MAP => (0..layers)
                    .map(|l| {
                        upload(
                            image.upload_target(sub.base_array_layer + l),
                            [r.image_offset.x, r.image_offset.y, 0],
                            [w, h, 1],
                            r.buffer_offset + u64::from(l) * layer_size,
                            1,
                        )
                    })
                    .collect(),
                gl::TEXTURE_1D_ARRAY => vec![upload(
                    image.target(),
                    [r.image_offset.x, sub.base_array_layer as i32, 0],
                    [w, layers, 1],
                    r.buffer_offset,
                    layers,
                )],
                _ if image.is_3d() => vec![upload(
                    image.target(),
                    offset3(r.image_offset),
                    [w, h, r.image_extent.depth],
                    r.buffer_offset,
                    1,
                )],
                _ => vec![upload(
                    image.target(),
                    [r.image_offset.x, r.image_offset.y, sub.base_array_layer as i32],
                    [w, h, layers],
                    r.buffer_offset,
                    layers,
                )],
            };
            for cmd in cmds {
                self.push(cmd);
            }
        }
        self.read_back_image(image);
    }

    /// `vkCmdCopyImageToBuffer`. Reads back one layer at a time.
    pub fn copy_image_to_buffer(
        &mut self,
        image: &Arc<Image>,
        buffer: &Arc<Buffer>,
        regions: &[vk::BufferImageCopy],
    ) {
        if !self.recording("vkCmdCopyImageToBuffer") {
            return;
        }
        self.upload_buffer(buffer);
        let info = *image.info();
        for r in regions {
            let sub = &r.image_subresource;
            let layer_size = region_layer_size(&info, r);
            let (layers, base) = if image.is_3d() {
                (r.image_extent.depth, r.image_offset.z as u32)
            } else {
                (layer_count(image, sub), sub.base_array_layer)
            };
            let slice_size = if image.is_3d() {
                layer_size / u64::from(r.image_extent.depth.max(1))
            } else {
                layer_size
            };
            for l in 0..layers {
                let layer = base + l;
                self.push(GlCmd::ReadImage {
                    src: image.subresource(sub.mip_level, layer, 0),
                    origin: [r.image_offset.x, r.image_offset.y, layer as i32],
                    extent: [r.image_extent.width, r.image_extent.height, 1],
                    format: info.format,
                    ty: info.ty,
                    buffer: buffer.gl_name(),
                    offset: buffer.gl_offset(r.buffer_offset + u64::from(l) * slice_size),
                    buf_size: slice_size as u32,
                    row_length: r.buffer_row_length,
                    image_height: r.buffer_image_height,
                });
            }
        }
        self.stack.forget_framebuffer();
        self.download_buffer(buffer);
    }

    /// `vkCmdClearColorImage`.
    pub fn clear_color_image(
        &mut self,
        image: &Arc<Image>,
        color: ClearColor,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        if !self.recording("vkCmdClearColorImage") {
            return;
        }
        let info = *image.info();
        let value = ClearValue::Color(color.reinterpret(&info));
        if self.features().contains(GlFeatures::CLEAR_TEXTURE) {
            let (format, ty, data) = clear_tex_data(&info, color);
            self.clear_tex(image, ranges, format, ty, &data);
        } else {
            self.clear_layers(image, ranges, value);
        }
        self.read_back_image(image);
    }

    /// `vkCmdClearDepthStencilImage`.
    pub fn clear_depth_stencil_image(
        &mut self,
        image: &Arc<Image>,
        depth: f32,
        stencil: u32,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        if !self.recording("vkCmdClearDepthStencilImage") {
            return;
        }
        let info = *image.info();
        if self.features().contains(GlFeatures::CLEAR_TEXTURE) {
            let (format, ty, data) = if info.has_stencil() {
                let mut data = depth.to_ne_bytes().to_vec();
                data.extend_from_slice(&(stencil & 0xff).to_ne_bytes());
                (gl::DEPTH_STENCIL, gl::FLOAT_32_UNSIGNED_INT_24_8_REV, data)
            } else {
                (gl::DEPTH_COMPONENT, gl::FLOAT, depth.to_ne_bytes().to_vec())
            };
            self.clear_tex(image, ranges, format, ty, &data);
        } else {
            self.clear_layers(image, ranges, ClearValue::DepthStencil { depth, stencil });
        }
    }

    fn clear_tex(
        &mut self,
        image: &Image,
        ranges: &[vk::ImageSubresourceRange],
        format: u32,
        ty: u32,
        data: &[u8],
    ) {
        for range in ranges {
            for level in levels(image, range) {
                let [w, h, d] = image.level_extent(level);
                let (origin_z, depth) = if image.is_3d() {
                    (0, d)
                } else {
                    (range.base_array_layer as i32, range_layers(image, range))
                };
                self.push(GlCmd::ClearTexImage {
                    texture: image.gl_name(),
                    level,
                    origin: [0, 0, origin_z],
                    extent: [w, h, depth],
                    format,
                    ty,
                    data: data.to_vec(),
                });
            }
        }
    }

    fn clear_layers(
        &mut self,
        image: &Image,
        ranges: &[vk::ImageSubresourceRange],
        value: ClearValue,
    ) {
        trace!(
            cb = %self.id(),
            image = image.gl_name(),
            "clearing through the scratch framebuffer"
        );
        self.stack.prepare_clear(&mut self.during);
        for range in ranges {
            for level in levels(image, range) {
                let layers = if image.is_3d() {
                    image.level_extent(level)[2]
                } else {
                    range_layers(image, range)
                };
                let base = if image.is_3d() { 0 } else { range.base_array_layer };
                for layer in base..base + layers {
                    self.push(GlCmd::ClearImageLayer {
                        dst: image.subresource(level, layer, 0),
                        value,
                    });
                }
            }
        }
        self.stack.forget_framebuffer();
    }

    /// Copies the texels of a host-mapped image back into its memory so the
    /// application sees what the GPU wrote.
    fn read_back_image(&mut self, image: &Image) {
        let Some(binding) = image.mappable_binding().cloned() else {
            return;
        };
        if !binding.memory.is_mapped() {
            return;
        }
        let info = *image.info();
        let mut offset = binding.offset;
        for level in 0..image.mip_levels() {
            let [w, h, d] = image.level_extent(level);
            let layer_size = image.layer_size(level);
            let slices = if image.is_3d() { d } else { image.array_layers() };
            let slice_size = if image.is_3d() { layer_size / u64::from(d) } else { layer_size };
            for layer in 0..slices {
                self.push(GlCmd::ReadImage {
                    src: image.subresource(level, layer, 0),
                    origin: [0, 0, layer as i32],
                    extent: [w, h, 1],
                    format: info.format,
                    ty: info.ty,
                    buffer: binding.memory.gl_buffer(),
                    offset,
                    buf_size: slice_size as u32,
                    row_length: 0,
                    image_height: 0,
                });
                offset += slice_size;
            }
        }
        self.stack.forget_framebuffer();
        let size = offset - binding.offset;
        self.download_memory(&binding.memory, binding.offset, size);
    }
}

fn levels(image: &Image, range: &vk::ImageSubresourceRange) -> std::ops::Range<u32> {
    let count = if range.level_count == vk::REMAINING_MIP_LEVELS {
        image.mip_levels().saturating_sub(range.base_mip_level)
    } else {
        range.level_count
    };
    range.base_mip_level..range.base_mip_level + count
}

fn range_layers(image: &Image, range: &vk::ImageSubresourceRange) -> u32 {
    if range.layer_count == vk::REMAINING_ARRAY_LAYERS {
        image.array_layers().saturating_sub(range.base_array_layer)
    } else {
        range.layer_count
    }
}
