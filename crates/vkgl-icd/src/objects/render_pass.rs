use std::sync::Arc;

use ash::vk;
use vkgl_gl::consts as gl;
use vkgl_gl::GlApi;

use crate::format::format_info;
use crate::objects::ImageView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub format: vk::Format,
    pub samples: u32,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
}

impl AttachmentDesc {
    pub fn color(
        format: vk::Format,
        load_op: vk::AttachmentLoadOp,
        store_op: vk::AttachmentStoreOp,
    ) -> Self {
        Self {
            format,
            samples: 1,
            load_op,
            store_op,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        }
    }
}

/// Attachment references are indices into the render pass attachment list;
/// `None` is `VK_ATTACHMENT_UNUSED`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubpassDesc {
    pub colors: Vec<Option<u32>>,
    /// Parallel to `colors` when present.
    pub resolves: Vec<Option<u32>>,
    pub depth_stencil: Option<u32>,
    pub inputs: Vec<Option<u32>>,
}

#[derive(Debug)]
pub struct RenderPass {
    handle: vk::RenderPass,
    attachments: Vec<AttachmentDesc>,
    subpasses: Vec<SubpassDesc>,
}

impl RenderPass {
    pub fn new(
        handle: vk::RenderPass,
        attachments: Vec<AttachmentDesc>,
        subpasses: Vec<SubpassDesc>,
    ) -> Self {
        Self {
            handle,
            attachments,
            subpasses,
        }
    }

    pub fn handle(&self) -> vk::RenderPass {
        self.handle
    }

    pub fn attachments(&self) -> &[AttachmentDesc] {
        &self.attachments
    }

    pub fn attachment(&self, index: u32) -> Option<&AttachmentDesc> {
        self.attachments.get(index as usize)
    }

    pub fn subpasses(&self) -> &[SubpassDesc] {
        &self.subpasses
    }

    pub fn subpass(&self, index: u32) -> Option<&SubpassDesc> {
        self.subpasses.get(index as usize)
    }

    /// Whether any color attachment of `subpass` has an sRGB format.
    pub fn subpass_is_srgb(&self, subpass: u32) -> bool {
        self.subpass(subpass).is_some_and(|s| {
            s.colors
                .iter()
                .flatten()
                .filter_map(|&a| self.attachment(a))
                .any(|a| format_info(a.format).is_some_and(|f| f.srgb))
        })
    }
}

/// A `VkFramebuffer`. The window-system target is GL framebuffer 0 and has no
/// attachment views of its own.
#[derive(Debug)]
pub struct Framebuffer {
    handle: vk::Framebuffer,
    gl_name: u32,
    window_surface: bool,
    extent: vk::Extent2D,
    layers: u32,
    attachments: Vec<Arc<ImageView>>,
    color_slots: Vec<Option<u32>>,
}

impl Framebuffer {
    /// Builds a GL framebuffer object with every view attached. Color views
    /// take consecutive `COLOR_ATTACHMENTi` slots in attachment order.
    pub fn create(
        gl: &mut dyn GlApi,
        handle: vk::Framebuffer,
        attachments: Vec<Arc<ImageView>>,
        extent: vk::Extent2D,
        layers: u32,
    ) -> Self {
        let fbo = gl.gen_framebuffer();
        gl.bind_framebuffer(gl::FRAMEBUFFER, fbo);

        let mut color_slots = Vec::with_capacity(attachments.len());
        let mut next_slot = 0;
        for view in &attachments {
            let is_color = view.info().aspects.contains(vk::ImageAspectFlags::COLOR);
            let slot = is_color.then(|| {
                next_slot += 1;
                next_slot - 1
            });
            color_slots.push(slot);

            let sub = view.subresource(slot.unwrap_or(0));
            match sub.target {
                gl::TEXTURE_2D | gl::TEXTURE_2D_MULTISAMPLE => gl.framebuffer_texture_2d(
                    gl::FRAMEBUFFER,
                    sub.attachment,
                    sub.target,
                    sub.texture,
                    sub.level,
                ),
                gl::TEXTURE_CUBE_MAP => gl.framebuffer_texture_2d(
                    gl::FRAMEBUFFER,
                    sub.attachment,
                    gl::TEXTURE_CUBE_MAP_POSITIVE_X + sub.layer,
                    sub.texture,
                    sub.level,
                ),
                _ => gl.framebuffer_texture_layer(
                    gl::FRAMEBUFFER,
                    sub.attachment,
                    sub.texture,
                    sub.level,
                    sub.layer,
                ),
            }
        }
        gl.bind_framebuffer(gl::FRAMEBUFFER, 0);

        Self {
            handle,
            gl_name: fbo,
            window_surface: false,
            extent,
            layers,
            attachments,
            color_slots,
        }
    }

    pub fn window(handle: vk::Framebuffer, extent: vk::Extent2D) -> Self {
        Self {
            handle,
            gl_name: 0,
            window_surface: true,
            extent,
            layers: 1,
            attachments: Vec::new(),
            color_slots: Vec::new(),
        }
    }

    pub fn handle(&self) -> vk::Framebuffer {
        self.handle
    }

    pub fn gl_name(&self) -> u32 {
        self.gl_name
    }

    pub fn is_window_surface(&self) -> bool {
        self.window_surface
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    pub fn attachments(&self) -> &[Arc<ImageView>] {
        &self.attachments
    }

    pub fn attachment(&self, index: u32) -> Option<&Arc<ImageView>> {
        self.attachments.get(index as usize)
    }

    /// Draw-buffer slot of a color attachment.
    pub fn color_slot(&self, attachment: u32) -> Option<u32> {
        if self.window_surface {
            return Some(0);
        }
        self.color_slots.get(attachment as usize).copied().flatten()
    }

    /// GL attachment point of `attachment`, as accepted by draw buffers and
    /// `glInvalidateFramebuffer`.
    pub fn attachment_point(&self, attachment: u32, format: vk::Format) -> Option<u32> {
        let info = format_info(format)?;
        if self.window_surface {
            return Some(match (info.has_depth(), info.has_stencil()) {
                (true, true) => gl::DEPTH_STENCIL,
                (true, false) => gl::DEPTH,
                (false, true) => gl::STENCIL,
                (false, false) => gl::COLOR,
            });
        }
        match self.color_slot(attachment) {
            Some(slot) => Some(gl::COLOR_ATTACHMENT0 + slot),
            None => Some(info.attachment_point(0)),
        }
    }
}
