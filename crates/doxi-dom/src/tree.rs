//! DOM Tree (arena-based allocation)
//!
//! Nodes are addressed by [`NodeId`]. Every mutation keeps four views of a
//! parent's children consistent: the child vector (with each child's
//! `child_index`), the full sibling list, and the by-name and by-tag
//! sublists.

use std::fmt;

use crate::child_index::{ChildIndex, IndexKind, IndexSlots, Which};
use crate::list::{LinkKind, LinkRead, LinkSlots, Links, List, ListIter};
use crate::{DomError, DomResult, Node, NodeId};

/// Tree mutation hooks
pub trait TreeObserver: Send {
    /// `child` was inserted under `parent`
    fn on_added(&mut self, _parent: NodeId, _child: NodeId) {}

    /// `child` was removed from `parent`
    fn on_removed(&mut self, _parent: NodeId, _child: NodeId) {}
}

/// Arena-based DOM tree
#[derive(Default)]
pub struct DomTree {
    /// `None` marks a slot whose node moved to another document
    nodes: Vec<Option<Node>>,
    observer: Option<Box<dyn TreeObserver>>,
}

/// Link records of one list kind, viewed across the arena
#[derive(Clone, Copy)]
pub struct ArenaView<'a> {
    nodes: &'a [Option<Node>],
    kind: LinkKind,
}

impl LinkRead for ArenaView<'_> {
    fn links(&self, id: NodeId) -> Option<&Links> {
        node(self.nodes, id).map(|n| &n.links[self.kind as usize])
    }
}

struct Arena<'a> {
    nodes: &'a mut [Option<Node>],
    kind: LinkKind,
}

impl<'a> Arena<'a> {
    fn siblings(nodes: &'a mut [Option<Node>]) -> Self {
        Self {
            nodes,
            kind: LinkKind::Siblings,
        }
    }

    fn indexed(nodes: &'a mut [Option<Node>], kind: IndexKind) -> Self {
        let kind = match kind {
            IndexKind::Name => LinkKind::SameName,
            IndexKind::Tag => LinkKind::SameTag,
        };
        Self { nodes, kind }
    }

    fn key_slot(&self) -> Option<usize> {
        match self.kind {
            LinkKind::Siblings => None,
            LinkKind::SameName => Some(IndexKind::Name as usize),
            LinkKind::SameTag => Some(IndexKind::Tag as usize),
        }
    }
}

impl LinkRead for Arena<'_> {
    fn links(&self, id: NodeId) -> Option<&Links> {
        node(self.nodes, id).map(|n| &n.links[self.kind as usize])
    }
}

impl LinkSlots for Arena<'_> {
    fn links_mut(&mut self, id: NodeId) -> Option<&mut Links> {
        let kind = self.kind as usize;
        node_mut(self.nodes, id).map(|n| &mut n.links[kind])
    }
}

impl IndexSlots for Arena<'_> {
    fn take_key(&mut self, id: NodeId) -> Option<String> {
        let slot = self.key_slot()?;
        node_mut(self.nodes, id)?.index_keys[slot].take()
    }

    fn set_key(&mut self, id: NodeId, key: Option<String>) {
        let Some(slot) = self.key_slot() else {
            return;
        };
        if let Some(n) = node_mut(self.nodes, id) {
            n.index_keys[slot] = key;
        }
    }
}

fn node(nodes: &[Option<Node>], id: NodeId) -> Option<&Node> {
    nodes.get(id.index()).and_then(Option::as_ref)
}

fn node_mut(nodes: &mut [Option<Node>], id: NodeId) -> Option<&mut Node> {
    nodes.get_mut(id.index()).and_then(Option::as_mut)
}

/// Child bookkeeping of one parent, taken out of the arena while the
/// children's own slots are rewritten
struct Parts {
    children: Vec<NodeId>,
    siblings: List,
    indexes: [ChildIndex; 2],
}

impl Parts {
    fn renumber(&self, nodes: &mut [Option<Node>], from: usize) {
        for (i, &child) in self.children.iter().enumerate().skip(from) {
            if let Some(n) = node_mut(nodes, child) {
                n.child_index = i;
            }
        }
    }

    fn sync(&mut self, nodes: &mut [Option<Node>], child: NodeId, position: usize) -> DomResult<()> {
        for kind in [IndexKind::Name, IndexKind::Tag] {
            let key = node(nodes, child).and_then(|n| n.index_key(kind));
            self.indexes[kind as usize].sync(&mut Arena::indexed(nodes, kind), &self.children, child, position, key)?;
        }
        Ok(())
    }

    fn unindex(&mut self, nodes: &mut [Option<Node>], child: NodeId) -> DomResult<()> {
        for kind in [IndexKind::Name, IndexKind::Tag] {
            self.indexes[kind as usize].remove(&mut Arena::indexed(nodes, kind), child)?;
        }
        Ok(())
    }
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        node(&self.nodes, id)
    }

    /// Mutable access bypasses index upkeep, so it stays in the crate
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        node_mut(&mut self.nodes, id)
    }

    pub(crate) fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound(id))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live nodes in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut().flatten()
    }

    /// Add a detached node
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Take a detached node out of the arena, leaving its slot empty
    pub(crate) fn take(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.get_mut(id.index())?.take()
    }

    pub fn set_observer(&mut self, observer: impl TreeObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) -> Option<Box<dyn TreeObserver>> {
        self.observer.take()
    }

    // Runs `f` with the child bookkeeping of `parent` taken out, restoring
    // it afterwards whatever `f` returns
    fn with_parts<R>(
        &mut self,
        parent: NodeId,
        f: impl FnOnce(&mut [Option<Node>], &mut Parts) -> DomResult<R>,
    ) -> DomResult<R> {
        let owner = self.node_mut(parent)?;
        let mut parts = Parts {
            children: std::mem::take(&mut owner.children),
            siblings: std::mem::replace(&mut owner.siblings, List::empty()),
            indexes: std::mem::take(&mut owner.indexes),
        };

        let result = f(&mut self.nodes, &mut parts);

        if let Some(owner) = self.get_mut(parent) {
            owner.children = parts.children;
            owner.siblings = parts.siblings;
            owner.indexes = parts.indexes;
        }
        result
    }

    /// True if `ancestor` is `id` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.get(c).and_then(Node::parent);
        }
        false
    }

    /// Insert `child` under `parent` in front of `reference`, or at the end
    /// when `reference` is `None` or not a child of `parent`. The child is
    /// detached from any previous parent first.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<NodeId> {
        self.node(parent)?;
        self.node(child)?;

        if child == parent {
            return Err(DomError::SelfInsertion);
        }
        if reference == Some(child) {
            return Err(DomError::InsertBeforeSelf);
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }

        self.remove(child)?;

        self.with_parts(parent, |nodes, parts| {
            let len = parts.children.len();
            let position = reference
                .and_then(|r| parts.children.iter().position(|&c| c == r))
                .unwrap_or(len);

            parts.children.insert(position, child);
            if let Some(n) = node_mut(nodes, child) {
                n.parent = Some(parent);
            }
            parts.renumber(nodes, position);

            let next = parts.children.get(position + 1).copied();
            parts.siblings.insert(&mut Arena::siblings(nodes), child, next)?;
            parts.sync(nodes, child, position)
        })?;

        tracing::trace!(?parent, ?child, "inserted node");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_added(parent, child);
        }
        Ok(child)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Remove `child` from `parent`. Not being a child of `parent` is a
    /// no-op.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.node(child)?.parent != Some(parent) {
            tracing::trace!(?parent, ?child, "remove_child on a non-child");
            return Ok(child);
        }

        self.with_parts(parent, |nodes, parts| {
            let position = parts
                .children
                .iter()
                .position(|&c| c == child)
                .ok_or(DomError::NotAChild)?;

            parts.children.remove(position);
            parts.renumber(nodes, position);
            parts.siblings.remove(&mut Arena::siblings(nodes), child)?;
            parts.unindex(nodes, child)?;

            if let Some(n) = node_mut(nodes, child) {
                n.parent = None;
                n.child_index = 0;
            }
            Ok(())
        })?;

        tracing::trace!(?parent, ?child, "removed node");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_removed(parent, child);
        }
        Ok(child)
    }

    /// Put `new_child` where `old_child` is and detach `old_child`, which is
    /// returned
    pub fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> DomResult<NodeId> {
        if new_child == old_child {
            return Err(DomError::SelfReplacement);
        }
        if self.node(old_child)?.parent != Some(parent) {
            return Err(DomError::NotAChild);
        }

        self.insert_before(parent, new_child, Some(old_child))?;
        self.remove_child(parent, old_child)
    }

    /// Detach `id` from its parent. Returns whether it was attached.
    pub fn remove(&mut self, id: NodeId) -> DomResult<bool> {
        match self.node(id)?.parent {
            Some(parent) => {
                self.remove_child(parent, id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-derive the index membership of `id` after its name or tag changed
    pub fn resync(&mut self, id: NodeId) -> DomResult<()> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Ok(());
        };
        let position = node.child_index;

        self.with_parts(parent, |nodes, parts| parts.sync(nodes, id, position))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        self.get(id)?.child_index()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.siblings.first()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.siblings.last()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.links[LinkKind::Siblings as usize].next
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.links[LinkKind::Siblings as usize].prev
    }

    pub fn next_sibling_same_name(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.links[LinkKind::SameName as usize].next
    }

    pub fn previous_sibling_same_name(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.links[LinkKind::SameName as usize].prev
    }

    pub fn next_sibling_same_tag(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.links[LinkKind::SameTag as usize].next
    }

    pub fn previous_sibling_same_tag(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.links[LinkKind::SameTag as usize].prev
    }

    /// Children in sibling-list order
    pub fn sibling_list(&self, parent: NodeId) -> ListIter<ArenaView<'_>> {
        let list = self.get(parent).map_or(&crate::child_index::EMPTY, |n| &n.siblings);
        list.iter(self.view(LinkKind::Siblings))
    }

    /// Children of `parent` whose `name` is `name`, in child order
    pub fn children_named(&self, parent: NodeId, name: &str) -> ListIter<ArenaView<'_>> {
        self.indexed(parent, IndexKind::Name, name)
    }

    /// Children of `parent` with tag `tag_name`, in child order
    pub fn children_tagged(&self, parent: NodeId, tag_name: &str) -> ListIter<ArenaView<'_>> {
        self.indexed(parent, IndexKind::Tag, tag_name)
    }

    pub fn child_named(&self, parent: NodeId, name: &str, which: Which) -> Option<NodeId> {
        self.get(parent)?.indexes[IndexKind::Name as usize].endpoint(name, which)
    }

    pub fn child_tagged(&self, parent: NodeId, tag_name: &str, which: Which) -> Option<NodeId> {
        self.get(parent)?.indexes[IndexKind::Tag as usize].endpoint(tag_name, which)
    }

    /// The index of `kind` over the children of `parent`
    pub fn child_index_of(&self, parent: NodeId, kind: IndexKind) -> Option<&ChildIndex> {
        Some(&self.get(parent)?.indexes[kind as usize])
    }

    fn indexed(&self, parent: NodeId, kind: IndexKind, key: &str) -> ListIter<ArenaView<'_>> {
        let list = self
            .get(parent)
            .map_or(&crate::child_index::EMPTY, |n| n.indexes[kind as usize].get(key));
        let link = match kind {
            IndexKind::Name => LinkKind::SameName,
            IndexKind::Tag => LinkKind::SameTag,
        };
        list.iter(self.view(link))
    }

    fn view(&self, kind: LinkKind) -> ArenaView<'_> {
        ArenaView {
            nodes: &self.nodes,
            kind,
        }
    }

    /// Descendants of `id` in document order, not including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Detached copy of `id`, with copies of its descendants when `deep`
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> DomResult<NodeId> {
        let copy = self.node(id)?.shallow_clone();
        let copy = self.insert(copy);

        if deep {
            for child in self.children(id).to_vec() {
                let child_copy = self.clone_node(child, true)?;
                self.append_child(copy, child_copy)?;
            }
        }
        Ok(copy)
    }
}

impl fmt::Debug for DomTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomTree")
            .field("nodes", &self.nodes)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
