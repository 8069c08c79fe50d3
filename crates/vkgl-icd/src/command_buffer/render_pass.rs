use std::sync::Arc;

use ash::vk;
use tracing::debug;
use vkgl_gl::consts as gl;
use vkgl_gl::GlFeatures;

use crate::cmd::{ClearValue, GlCmd};
use crate::format::format_info;
use crate::objects::{Framebuffer, RenderPass};
use crate::state::{Rect, RenderArea};

use super::{ActiveRenderPass, ClearAttachmentDesc, CommandBuffer, RenderPassBeginInfo};

/// `ClearValue` as seen by an attachment of `format`.
fn attachment_value(value: ClearValue, format: vk::Format) -> ClearValue {
    match (value, format_info(format)) {
        (ClearValue::Color(color), Some(info)) => ClearValue::Color(color.reinterpret(&info)),
        _ => value,
    }
}

/// `glClearBuffer` buffer for a depth and/or stencil clear.
fn depth_stencil_buffer(depth: bool, stencil: bool) -> Option<u32> {
    match (depth, stencil) {
        (true, true) => Some(gl::DEPTH_STENCIL),
        (true, false) => Some(gl::DEPTH),
        (false, true) => Some(gl::STENCIL),
        (false, false) => None,
    }
}

fn rect_corners(r: Rect) -> [i32; 4] {
    [r.x, r.y, r.x + r.width as i32, r.y + r.height as i32]
}

impl CommandBuffer {
    /// `vkCmdBeginRenderPass`. Binds the framebuffer, clears every attachment
    /// with a `CLEAR` load op and sets up the first subpass.
    pub fn begin_render_pass(&mut self, info: &RenderPassBeginInfo, contents: vk::SubpassContents) {
        if !self.recording("vkCmdBeginRenderPass") {
            return;
        }
        if !self.is_primary() {
            self.reporter()
                .validation(Some(self.id()), "vkCmdBeginRenderPass in a secondary command buffer");
            return;
        }
        if self.render_pass.is_some() {
            self.reporter()
                .validation(Some(self.id()), "vkCmdBeginRenderPass inside an active render pass");
            return;
        }
        let fb = info.framebuffer.clone();
        debug!(
            cb = %self.id(),
            framebuffer = fb.gl_name(),
            window = fb.is_window_surface(),
            ?contents,
            "begin render pass"
        );

        self.stack.disable_blending(&mut self.during);
        self.bind_target(&fb);
        self.render_pass = Some(ActiveRenderPass {
            render_pass: info.render_pass.clone(),
            framebuffer: Some(fb.clone()),
            subpass: 0,
            area: info.render_area,
        });
        self.clear_on_load(&info.render_pass, &fb, info.render_area, &info.clear_values);
        self.begin_subpass();
    }

    /// `vkCmdNextSubpass`.
    pub fn next_subpass(&mut self, contents: vk::SubpassContents) {
        if !self.recording("vkCmdNextSubpass") {
            return;
        }
        let Some(active) = self.render_pass.clone() else {
            self.reporter()
                .validation(Some(self.id()), "vkCmdNextSubpass outside a render pass");
            return;
        };
        if active.subpass + 1 >= active.render_pass.subpasses().len() as u32 {
            self.reporter()
                .validation(Some(self.id()), "vkCmdNextSubpass past the last subpass");
            return;
        }
        if self.resolve_subpass(&active) {
            if let Some(fb) = &active.framebuffer {
                self.stack.forget_framebuffer();
                self.bind_target(fb);
            }
        }
        if let Some(rp) = &mut self.render_pass {
            rp.subpass += 1;
        }
        debug!(cb = %self.id(), subpass = active.subpass + 1, ?contents, "next subpass");
        self.begin_subpass();
        self.vertex_buffers.clear();
        self.index_buffer = None;
        self.selected_geometry = None;
    }

    /// `vkCmdEndRenderPass`. Resolves multisample attachments, invalidates
    /// attachments whose contents are not stored and drops every binding
    /// scoped to the render pass.
    pub fn end_render_pass(&mut self) {
        if !self.recording("vkCmdEndRenderPass") {
            return;
        }
        let Some(active) = self.render_pass.clone() else {
            self.reporter()
                .validation(Some(self.id()), "vkCmdEndRenderPass outside a render pass");
            return;
        };
        let blitted = self.resolve_subpass(&active);

        let invalidate = self.features().contains(GlFeatures::INVALIDATE_SUBDATA);
        if let (Some(fb), true) = (&active.framebuffer, invalidate) {
            let discarded = discarded_attachments(&active.render_pass, fb);
            if !discarded.is_empty() {
                if blitted {
                    self.stack.forget_framebuffer();
                    self.bind_target(fb);
                }
                self.push(GlCmd::InvalidateFramebuffer {
                    target: gl::FRAMEBUFFER,
                    attachments: discarded,
                });
            }
        } else if blitted {
            self.stack.forget_framebuffer();
        }

        self.render_pass = None;
        self.vertex_buffers.clear();
        self.index_buffer = None;
        self.selected_geometry = None;
        self.graphics.sets.clear();
        self.graphics.dirty_sets.clear();
        self.compute.sets.clear();
        self.compute.dirty_sets.clear();
        self.push_data.clear();
        debug!(cb = %self.id(), "end render pass");
    }

    /// `vkCmdClearAttachments`. Each rect becomes a scissor followed by one
    /// `glClearBuffer*` per attachment.
    pub fn clear_attachments(
        &mut self,
        attachments: &[ClearAttachmentDesc],
        rects: &[vk::ClearRect],
    ) {
        if !self.recording("vkCmdClearAttachments") {
            return;
        }
        let Some(active) = self.render_pass.clone() else {
            self.reporter()
                .validation(Some(self.id()), "vkCmdClearAttachments outside a render pass");
            return;
        };
        let Some(subpass) = active.render_pass.subpass(active.subpass).cloned() else {
            return;
        };

        self.stack.prepare_clear(&mut self.during);
        for rect in rects {
            let scissor = [Rect::from(rect.rect)];
            self.stack
                .apply_scissors(&mut self.during, &mut self.pending, 0, &scissor, false);
            for desc in attachments {
                if desc.aspect.contains(vk::ImageAspectFlags::COLOR) {
                    let slot = desc.color_attachment as usize;
                    let Some(attachment) = subpass.colors.get(slot).copied().flatten() else {
                        continue;
                    };
                    let Some(format) = active.render_pass.attachment(attachment).map(|a| a.format)
                    else {
                        continue;
                    };
                    self.push(GlCmd::ClearAttachment {
                        buffer: gl::COLOR,
                        draw_buffer: desc.color_attachment as i32,
                        value: attachment_value(desc.value, format),
                    });
                    continue;
                }
                let buffer = depth_stencil_buffer(
                    desc.aspect.contains(vk::ImageAspectFlags::DEPTH),
                    desc.aspect.contains(vk::ImageAspectFlags::STENCIL),
                );
                if let (Some(buffer), Some(_)) = (buffer, subpass.depth_stencil) {
                    self.push(GlCmd::ClearAttachment {
                        buffer,
                        draw_buffer: 0,
                        value: desc.value,
                    });
                }
            }
        }
    }

    fn bind_target(&mut self, fb: &Framebuffer) {
        self.stack.bind_framebuffer(
            &mut self.during,
            fb.gl_name(),
            RenderArea::from(fb.extent()),
            fb.is_window_surface(),
        );
    }

    fn clear_on_load(
        &mut self,
        render_pass: &RenderPass,
        fb: &Framebuffer,
        area: Rect,
        values: &[ClearValue],
    ) {
        let mut clears = Vec::new();
        for (index, att) in render_pass.attachments().iter().enumerate() {
            let Some(info) = format_info(att.format) else {
                continue;
            };
            let color = info.aspects.contains(vk::ImageAspectFlags::COLOR)
                && att.load_op == vk::AttachmentLoadOp::CLEAR;
            let depth = info.has_depth() && att.load_op == vk::AttachmentLoadOp::CLEAR;
            let stencil = info.has_stencil() && att.stencil_load_op == vk::AttachmentLoadOp::CLEAR;
            if !(color || depth || stencil) {
                continue;
            }
            let Some(&value) = values.get(index) else {
                self.reporter().validation(
                    Some(self.id()),
                    format!("no clear value for attachment {index} with a CLEAR load op"),
                );
                continue;
            };
            if color {
                let Some(slot) = fb.color_slot(index as u32) else {
                    continue;
                };
                clears.push(GlCmd::ClearAttachment {
                    buffer: gl::COLOR,
                    draw_buffer: slot as i32,
                    value: attachment_value(value, att.format),
                });
            } else if let Some(buffer) = depth_stencil_buffer(depth, stencil) {
                clears.push(GlCmd::ClearAttachment {
                    buffer,
                    draw_buffer: 0,
                    value,
                });
            }
        }
        if clears.is_empty() {
            return;
        }

        let draw_buffers = if fb.is_window_surface() {
            vec![gl::BACK]
        } else {
            (0..fb.attachments().len() as u32)
                .filter_map(|a| fb.color_slot(a))
                .map(|slot| gl::COLOR_ATTACHMENT0 + slot)
                .collect()
        };
        self.push(GlCmd::DrawBuffers(draw_buffers));
        self.stack.prepare_clear(&mut self.during);
        let extent = fb.extent();
        let full = area.x <= 0
            && area.y <= 0
            && area.width >= extent.width
            && area.height >= extent.height;
        if !full {
            self.stack
                .apply_scissors(&mut self.during, &mut self.pending, 0, &[area], false);
        }
        for clear in clears {
            self.push(clear);
        }
    }

    /// Points the draw buffers at the current subpass' color attachments and
    /// patches every placeholder waiting for the render area.
    fn begin_subpass(&mut self) {
        let Some(active) = self.render_pass.clone() else {
            return;
        };
        let Some(fb) = active.framebuffer.clone() else {
            return;
        };
        let Some(subpass) = active.render_pass.subpass(active.subpass) else {
            self.reporter()
                .validation(
                    Some(self.id()),
                    format!("render pass has no subpass {}", active.subpass),
                );
            return;
        };

        let draw_buffers = if fb.is_window_surface() {
            let any = subpass.colors.iter().any(Option::is_some);
            vec![if any { gl::BACK } else { gl::NONE }]
        } else {
            subpass
                .colors
                .iter()
                .map(|c| {
                    c.and_then(|a| fb.color_slot(a))
                        .map_or(gl::NONE, |slot| gl::COLOR_ATTACHMENT0 + slot)
                })
                .collect()
        };
        self.push(GlCmd::DrawBuffers(draw_buffers));
        let srgb = active.render_pass.subpass_is_srgb(active.subpass);
        self.stack.apply_srgb_status(&mut self.during, srgb);

        let area = self.stack.current().render_area;
        if area.is_known() && !self.pending.is_empty() {
            let features = self.features();
            for action in std::mem::take(&mut self.pending) {
                action.resolve(&mut self.during, features, area);
            }
        }
    }

    /// Blits each color attachment of the current subpass into its resolve
    /// attachment. Returns whether anything was blitted.
    fn resolve_subpass(&mut self, active: &ActiveRenderPass) -> bool {
        let subpass = active.render_pass.subpass(active.subpass);
        let (Some(fb), Some(subpass)) = (&active.framebuffer, subpass) else {
            return false;
        };
        let mut blits = Vec::new();
        for (color, resolve) in subpass.colors.iter().zip(&subpass.resolves) {
            let (Some(c), Some(r)) = (color, resolve) else {
                continue;
            };
            let (Some(src), Some(dst)) = (fb.attachment(*c), fb.attachment(*r)) else {
                continue;
            };
            if src.same_subresource(dst) {
                continue;
            }
            let rect = rect_corners(active.area);
            blits.push(GlCmd::BlitImage {
                src: src.subresource(0),
                dst: dst.subresource(0),
                src_rect: rect,
                dst_rect: rect,
                mask: gl::COLOR_BUFFER_BIT,
                filter: gl::NEAREST,
            });
        }
        if blits.is_empty() {
            return false;
        }
        self.stack.prepare_clear(&mut self.during);
        for blit in blits {
            self.push(blit);
        }
        true
    }
}

/// Attachment points whose contents the render pass does not store.
fn discarded_attachments(render_pass: &Arc<RenderPass>, fb: &Framebuffer) -> Vec<u32> {
    render_pass
        .attachments()
        .iter()
        .enumerate()
        .filter(|(_, att)| {
            let Some(info) = format_info(att.format) else {
                return false;
            };
            let dont_care = vk::AttachmentStoreOp::DONT_CARE;
            match (info.has_depth(), info.has_stencil()) {
                (true, true) => att.store_op == dont_care && att.stencil_store_op == dont_care,
                (false, true) => att.stencil_store_op == dont_care,
                _ => att.store_op == dont_care,
            }
        })
        .filter_map(|(index, att)| fb.attachment_point(index as u32, att.format))
        .collect()
}
