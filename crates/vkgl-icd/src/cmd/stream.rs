use crate::cmd::GlCmd;

/// Position of a command inside a [`CmdStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CmdIndex {
    pub segment: usize,
    pub index: usize,
}

/// One contiguous run of encoded commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CmdList {
    cmds: Vec<GlCmd>,
}

impl CmdList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: GlCmd) -> usize {
        self.cmds.push(cmd);
        self.cmds.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&GlCmd> {
        self.cmds.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut GlCmd> {
        self.cmds.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<GlCmd> {
        (index < self.cmds.len()).then(|| self.cmds.remove(index))
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GlCmd> {
        self.cmds.iter()
    }

    pub fn as_slice(&self) -> &[GlCmd] {
        &self.cmds
    }
}

impl<'a> IntoIterator for &'a CmdList {
    type Item = &'a GlCmd;
    type IntoIter = std::slice::Iter<'a, GlCmd>;

    fn into_iter(self) -> Self::IntoIter {
        self.cmds.iter()
    }
}

impl FromIterator<GlCmd> for CmdList {
    fn from_iter<I: IntoIterator<Item = GlCmd>>(iter: I) -> Self {
        Self {
            cmds: iter.into_iter().collect(),
        }
    }
}

/// Sequence of command lists. New commands always go to the last segment;
/// inlined secondary command buffers land in segments of their own so
/// indices recorded into earlier segments stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct CmdStream {
    segments: Vec<CmdList>,
}

impl Default for CmdStream {
    fn default() -> Self {
        Self {
            segments: vec![CmdList::new()],
        }
    }
}

impl CmdStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: GlCmd) -> CmdIndex {
        let segment = self.segments.len() - 1;
        let index = self.segments[segment].push(cmd);
        CmdIndex { segment, index }
    }

    pub fn get(&self, at: CmdIndex) -> Option<&GlCmd> {
        self.segments.get(at.segment)?.get(at.index)
    }

    pub fn get_mut(&mut self, at: CmdIndex) -> Option<&mut GlCmd> {
        self.segments.get_mut(at.segment)?.get_mut(at.index)
    }

    /// Removes the command at `at`. Later commands of the same segment shift
    /// down by one; the caller fixes up any indices it holds.
    pub fn remove(&mut self, at: CmdIndex) -> Option<GlCmd> {
        self.segments.get_mut(at.segment)?.remove(at.index)
    }

    /// Appends `list` as a segment of its own followed by a fresh segment for
    /// subsequent commands. Returns the segment `list` landed in.
    pub fn append_list(&mut self, list: CmdList) -> usize {
        if self.segments.last().is_some_and(CmdList::is_empty) {
            self.segments.pop();
        }
        self.segments.push(list);
        self.segments.push(CmdList::new());
        self.segments.len() - 2
    }

    /// Merges every segment into one, preserving order. The returned [`Remap`]
    /// maps indices taken before the merge to their new position.
    pub fn flatten(&mut self) -> Remap {
        let mut starts = Vec::with_capacity(self.segments.len());
        let mut merged = CmdList::new();
        for segment in self.segments.drain(..) {
            starts.push(merged.len());
            merged.cmds.extend(segment.cmds);
        }
        self.segments.push(merged);
        Remap { starts }
    }

    /// Flattened copy of the stream as a single list.
    pub fn to_list(&self) -> (CmdList, Remap) {
        let mut copy = self.clone();
        let remap = copy.flatten();
        let list = copy.segments.pop().unwrap_or_default();
        (list, remap)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, segment: usize) -> Option<&CmdList> {
        self.segments.get(segment)
    }

    /// Total command count over every segment.
    pub fn len(&self) -> usize {
        self.segments.iter().map(CmdList::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlCmd> {
        self.segments.iter().flat_map(CmdList::iter)
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.segments.push(CmdList::new());
    }
}

/// Index translation produced by [`CmdStream::flatten`].
#[derive(Debug, Clone)]
pub struct Remap {
    starts: Vec<usize>,
}

impl Remap {
    pub fn apply(&self, at: CmdIndex) -> CmdIndex {
        CmdIndex {
            segment: 0,
            index: self.starts.get(at.segment).copied().unwrap_or(0) + at.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flatten_keeps_order_and_remaps() {
        let mut stream = CmdStream::new();
        stream.push(GlCmd::Enable(1));
        let inlined: CmdList = [GlCmd::Enable(2), GlCmd::Enable(3)].into_iter().collect();
        let seg = stream.append_list(inlined);
        let tail = stream.push(GlCmd::Enable(4));
        assert_eq!(stream.segment_count(), 3);

        let remap = stream.flatten();
        assert_eq!(stream.segment_count(), 1);
        assert_eq!(stream.len(), 4);
        assert_eq!(
            remap.apply(CmdIndex { segment: seg, index: 1 }),
            CmdIndex { segment: 0, index: 2 }
        );
        assert_eq!(remap.apply(tail), CmdIndex { segment: 0, index: 3 });
        assert_eq!(
            stream.iter().cloned().collect::<Vec<_>>(),
            vec![GlCmd::Enable(1), GlCmd::Enable(2), GlCmd::Enable(3), GlCmd::Enable(4)]
        );
    }

    #[test]
    fn appending_to_empty_stream_drops_the_empty_head() {
        let mut stream = CmdStream::new();
        let seg = stream.append_list([GlCmd::PopDebugGroup].into_iter().collect());
        assert_eq!(seg, 0);
        assert_eq!(stream.push(GlCmd::UseProgram(0)), CmdIndex { segment: 1, index: 0 });
    }
}
