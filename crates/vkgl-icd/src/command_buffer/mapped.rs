//! Host-mapped memory bookkeeping.
//!
//! Every reference to a buffer whose memory is currently mapped gets an
//! explicit upload before it (host writes reach GL) or download after it
//! (GPU writes reach the host). The position of each inserted command is
//! remembered so it can be removed again if the memory is freed before the
//! buffer is submitted.

use std::sync::{Arc, Weak};

use ash::vk;

use crate::cmd::{CmdIndex, GlCmd};
use crate::dependents::{DestructionListener, ObjectId};
use crate::objects::{Buffer, DeviceMemory};

use super::CommandBuffer;

/// An upload or download command recorded for mapped memory.
#[derive(Debug, Clone)]
pub struct MappedEntry {
    pub memory: ObjectId,
    pub at: CmdIndex,
    source: Weak<DeviceMemory>,
}

fn shift_after(index: &mut CmdIndex, removed: CmdIndex) {
    if index.segment == removed.segment && index.index > removed.index {
        index.index -= 1;
    }
}

impl CommandBuffer {
    pub fn mapped_entries(&self) -> &[MappedEntry] {
        &self.mapped
    }

    /// Schedules an upload of `buffer`'s bound range if its memory is mapped.
    pub(super) fn upload_buffer(&mut self, buffer: &Buffer) {
        if let Some((memory, offset, size)) = mapped_range(buffer) {
            let cmd = GlCmd::UploadMemory {
                memory: memory.id().raw,
                offset,
                size,
            };
            self.track(&memory, cmd);
        }
    }

    /// Schedules a download of `buffer`'s bound range if its memory is mapped.
    pub(super) fn download_buffer(&mut self, buffer: &Buffer) {
        if let Some((memory, offset, size)) = mapped_range(buffer) {
            let cmd = GlCmd::DownloadMemory {
                memory: memory.id().raw,
                offset,
                size,
            };
            self.track(&memory, cmd);
        }
    }

    /// Download of a raw memory range, e.g. image memory after a readback.
    pub(super) fn download_memory(&mut self, memory: &Arc<DeviceMemory>, offset: u64, size: u64) {
        let size = size.min(memory.size().saturating_sub(offset));
        let cmd = GlCmd::DownloadMemory {
            memory: memory.id().raw,
            offset,
            size,
        };
        self.track(memory, cmd);
    }

    fn track(&mut self, memory: &Arc<DeviceMemory>, cmd: GlCmd) {
        let at = self.during.push(cmd);
        self.watch(memory);
        self.mapped.push(MappedEntry {
            memory: memory.id(),
            at,
            source: Arc::downgrade(memory),
        });
    }

    fn watch(&self, memory: &DeviceMemory) {
        let listener: Weak<dyn DestructionListener> = self.this.clone();
        memory.dependents().register(listener);
    }

    /// Takes over entries recorded by a secondary buffer; `place` maps their
    /// indices into this buffer's stream.
    pub(super) fn adopt_mapped(
        &mut self,
        entries: &[MappedEntry],
        place: impl Fn(CmdIndex) -> CmdIndex,
    ) {
        for entry in entries {
            let Some(memory) = entry.source.upgrade() else {
                continue;
            };
            self.watch(&memory);
            self.mapped.push(MappedEntry {
                memory: entry.memory,
                at: place(entry.at),
                source: entry.source.clone(),
            });
        }
    }

    /// Drops every command recorded for `object` and keeps the remaining
    /// indices pointing at their commands.
    pub(super) fn forget_memory(&mut self, object: ObjectId) {
        let mut removed: Vec<CmdIndex> = self
            .mapped
            .iter()
            .filter(|e| e.memory == object)
            .map(|e| e.at)
            .collect();
        if removed.is_empty() {
            return;
        }
        self.mapped.retain(|e| e.memory != object);
        removed.sort_unstable_by(|a, b| b.cmp(a));

        for at in &removed {
            if self.during.remove(*at).is_none() {
                continue;
            }
            for entry in &mut self.mapped {
                shift_after(&mut entry.at, *at);
            }
            for action in &mut self.pending {
                shift_after(&mut action.at, *at);
            }
        }
        self.reporter().warning(
            Some(object),
            vk::Result::SUCCESS,
            crate::report::Category::ResourceLifetime,
            format!(
                "memory freed while referenced by {}; dropped {} transfer command(s)",
                self.id(),
                removed.len()
            ),
        );
    }
}

/// Memory, offset and size to synchronise for `buffer`, if it is mapped.
fn mapped_range(buffer: &Buffer) -> Option<(Arc<DeviceMemory>, u64, u64)> {
    let binding = buffer.binding()?;
    if !binding.memory.is_mapped() {
        return None;
    }
    let size = buffer.size().min(binding.memory.size().saturating_sub(binding.offset));
    Some((binding.memory.clone(), binding.offset, size))
}
