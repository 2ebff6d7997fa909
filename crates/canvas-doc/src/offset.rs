//! Mapping between live selections in a [`RenderTree`] and stable
//! [`TextRange`]s over its canonical text.

use canvas_core::range::{char_len, TextRange};

use crate::render::{NodeId, NodeKind, RenderTree};

/// A boundary point with DOM semantics: inside a text node `offset` counts
/// characters, inside an element it counts children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection as reported by the host, in either direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveSelection {
    pub anchor: DomPoint,
    pub focus: DomPoint,
}

impl LiveSelection {
    pub fn new(anchor: DomPoint, focus: DomPoint) -> Self {
        Self { anchor, focus }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissReason {
    OutsideContainer,
    InvalidPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMapping {
    Range(TextRange),
    /// Caret only. Not the same thing as a range over an empty string.
    Collapsed { offset: usize },
    Miss(MissReason),
}

pub struct OffsetMapper<'a> {
    tree: &'a RenderTree,
    container: NodeId,
}

impl<'a> OffsetMapper<'a> {
    pub fn new(tree: &'a RenderTree, container: NodeId) -> Self {
        Self { tree, container }
    }

    pub fn canonical_text(&self) -> String {
        self.tree.text_content(self.container)
    }

    /// Canonical offset of a boundary point, `None` if the point lies outside
    /// the container or names a position its node doesn't have.
    pub fn text_offset(&self, point: DomPoint) -> Option<usize> {
        if !self.tree.is_inclusive_descendant(point.node, self.container) {
            return None;
        }
        let order = self.tree.preorder(self.container);
        let position = order.iter().position(|id| *id == point.node)?;

        let boundary = match self.tree.kind(point.node)? {
            NodeKind::Text(text) => {
                if point.offset > char_len(text) {
                    return None;
                }
                return Some(self.chars_before(&order[..position]) + point.offset);
            }
            NodeKind::Element { .. } => {
                let children = self.tree.children(point.node);
                match point.offset.cmp(&children.len()) {
                    std::cmp::Ordering::Less => {
                        let child = children[point.offset];
                        order.iter().position(|id| *id == child)?
                    }
                    std::cmp::Ordering::Equal => order[position..]
                        .iter()
                        .position(|id| !self.tree.is_inclusive_descendant(*id, point.node))
                        .map_or(order.len(), |rel| position + rel),
                    std::cmp::Ordering::Greater => return None,
                }
            }
        };
        Some(self.chars_before(&order[..boundary]))
    }

    fn chars_before(&self, nodes: &[NodeId]) -> usize {
        nodes
            .iter()
            .filter_map(|id| self.tree.text(*id))
            .map(char_len)
            .sum()
    }

    /// Forward mapping. Selections reaching outside the container are a miss,
    /// never clamped.
    pub fn map_selection(&self, selection: &LiveSelection) -> SelectionMapping {
        let inside = |p: &DomPoint| self.tree.is_inclusive_descendant(p.node, self.container);
        if !inside(&selection.anchor) || !inside(&selection.focus) {
            return SelectionMapping::Miss(MissReason::OutsideContainer);
        }
        let (Some(a), Some(b)) = (
            self.text_offset(selection.anchor),
            self.text_offset(selection.focus),
        ) else {
            return SelectionMapping::Miss(MissReason::InvalidPoint);
        };
        if a == b {
            SelectionMapping::Collapsed { offset: a }
        } else {
            SelectionMapping::Range(TextRange::spanning(a, b))
        }
    }

    /// Reverse mapping. The start boundary lands at the beginning of the
    /// following text node when it falls between nodes; the end boundary at
    /// the end of the preceding one.
    pub fn restore(&self, range: TextRange) -> Option<LiveSelection> {
        if range.start > range.end {
            return None;
        }
        let anchor = self.locate(range.start, true)?;
        let focus = self.locate(range.end, false)?;
        Some(LiveSelection { anchor, focus })
    }

    fn locate(&self, target: usize, prefer_next: bool) -> Option<DomPoint> {
        let mut running = 0;
        let mut last = None;
        for id in self.tree.text_nodes(self.container) {
            let len = self.tree.text(id).map(char_len).unwrap_or(0);
            if len == 0 {
                continue;
            }
            let hit = if prefer_next {
                target < running + len
            } else {
                target <= running + len
            };
            if hit {
                return Some(DomPoint::new(id, target - running));
            }
            running += len;
            last = Some((id, len));
        }
        if target != running {
            return None;
        }
        Some(match last {
            Some((id, len)) => DomPoint::new(id, len),
            None => DomPoint::new(self.container, 0),
        })
    }
}
