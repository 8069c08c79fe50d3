use vkgl_gl::GlFeatures;

use crate::cmd::{CmdIndex, CmdStream, GlCmd};
use crate::state::{encode_scissors, encode_viewports, Rect, RenderArea, Viewport};

/// Command fields that depend on the render area.
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    Viewports { first: u32, viewports: Vec<Viewport> },
    Scissors { first: u32, rects: Vec<Rect> },
}

impl Deferred {
    /// Encodes against `area`; an unknown area yields the unflipped placeholder.
    pub fn encode(&self, features: GlFeatures, area: RenderArea) -> GlCmd {
        let height = area.is_known().then_some(area.height);
        match self {
            Deferred::Viewports { first, viewports } => {
                encode_viewports(features, *first, viewports, height)
            }
            Deferred::Scissors { first, rects } => encode_scissors(features, *first, rects, height),
        }
    }
}

/// A placeholder command plus what it has to become once the render area is
/// known. Resolution is a second pass over already encoded commands.
#[derive(Debug, Clone, PartialEq)]
pub struct PreExecuteAction {
    pub at: CmdIndex,
    pub deferred: Deferred,
}

impl PreExecuteAction {
    pub fn new(at: CmdIndex, deferred: Deferred) -> Self {
        Self { at, deferred }
    }

    /// Replaces the placeholder in `stream`. Returns false if the index no
    /// longer names a command.
    pub fn resolve(&self, stream: &mut CmdStream, features: GlFeatures, area: RenderArea) -> bool {
        let cmd = self.deferred.encode(features, area);
        match stream.get_mut(self.at) {
            Some(slot) => {
                *slot = cmd;
                true
            }
            None => false,
        }
    }
}
