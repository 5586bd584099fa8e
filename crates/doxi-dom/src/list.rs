//! Ordered sibling lists
//!
//! A doubly linked list whose `prev`/`next` pointers live on the member
//! nodes. A node carries one [`Links`] record per list kind, so it can sit
//! in the full sibling list and in its same-name and same-tag sublists at the
//! same time. Membership is tracked with a [`ListTag`]: removing a node that
//! is not a member is an error rather than a silent corruption.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{DomError, DomResult, NodeId};

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

/// Identity of one list instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListTag(u64);

impl ListTag {
    fn fresh() -> Self {
        Self(NEXT_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which of a node's link records a list threads through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Siblings = 0,
    SameName = 1,
    SameTag = 2,
}

/// Per-node link record for one list kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Links {
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub(crate) tag: Option<ListTag>,
}

/// Read access to link records
pub trait LinkRead {
    fn links(&self, id: NodeId) -> Option<&Links>;
}

impl<T: LinkRead + ?Sized> LinkRead for &T {
    fn links(&self, id: NodeId) -> Option<&Links> {
        (**self).links(id)
    }
}

/// Write access to link records
pub trait LinkSlots: LinkRead {
    fn links_mut(&mut self, id: NodeId) -> Option<&mut Links>;
}

#[derive(Debug, Clone)]
pub struct List {
    first: Option<NodeId>,
    last: Option<NodeId>,
    len: usize,
    tag: ListTag,
}

impl List {
    pub fn new() -> Self {
        Self {
            tag: ListTag::fresh(),
            ..Self::empty()
        }
    }

    /// A list no node can join
    pub(crate) const fn empty() -> Self {
        Self {
            first: None,
            last: None,
            len: 0,
            tag: ListTag(0),
        }
    }

    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn tag(&self) -> ListTag {
        self.tag
    }

    pub fn contains(&self, slots: &impl LinkRead, item: NodeId) -> bool {
        slots.links(item).is_some_and(|l| l.tag == Some(self.tag))
    }

    /// Position of `item`, walking from the front
    pub fn index_of(&self, slots: &impl LinkRead, item: NodeId) -> Option<usize> {
        if !self.contains(slots, item) {
            return None;
        }
        self.iter(slots).position(|id| id == item)
    }

    pub fn iter<S: LinkRead>(&self, slots: S) -> ListIter<S> {
        ListIter {
            slots,
            next: self.first,
        }
    }

    pub fn append(&mut self, slots: &mut impl LinkSlots, item: NodeId) -> DomResult<()> {
        self.insert(slots, item, None)
    }

    /// Link `item` in front of `before`, or at the end when `before` is `None`
    pub fn insert(&mut self, slots: &mut impl LinkSlots, item: NodeId, before: Option<NodeId>) -> DomResult<()> {
        if before == Some(item) {
            return Err(DomError::InsertBeforeSelf);
        }

        let links = slots.links(item).ok_or(DomError::NotFound(item))?;
        if links.tag.is_some() {
            return Err(DomError::AlreadyLinked);
        }

        let (prev, next) = match before {
            Some(before) => {
                let links = slots.links(before).ok_or(DomError::NotFound(before))?;
                if links.tag != Some(self.tag) {
                    return Err(DomError::InvalidReference);
                }
                (links.prev, Some(before))
            }
            None => (self.last, None),
        };

        match prev {
            Some(prev) => set_next(slots, prev, Some(item)),
            None => self.first = Some(item),
        }
        match next {
            Some(next) => set_prev(slots, next, Some(item)),
            None => self.last = Some(item),
        }

        if let Some(links) = slots.links_mut(item) {
            *links = Links {
                prev,
                next,
                tag: Some(self.tag),
            };
        }

        self.len += 1;
        Ok(())
    }

    pub fn remove(&mut self, slots: &mut impl LinkSlots, item: NodeId) -> DomResult<()> {
        if !self.contains(&*slots, item) {
            return Err(DomError::NotAMember);
        }

        let Links { prev, next, .. } = slots.links(item).copied().unwrap_or_default();

        match prev {
            Some(prev) => set_next(slots, prev, next),
            None => self.first = next,
        }
        match next {
            Some(next) => set_prev(slots, next, prev),
            None => self.last = prev,
        }

        if let Some(links) = slots.links_mut(item) {
            *links = Links::default();
        }

        self.len -= 1;
        Ok(())
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

fn set_next(slots: &mut impl LinkSlots, id: NodeId, next: Option<NodeId>) {
    if let Some(links) = slots.links_mut(id) {
        links.next = next;
    }
}

fn set_prev(slots: &mut impl LinkSlots, id: NodeId, prev: Option<NodeId>) {
    if let Some(links) = slots.links_mut(id) {
        links.prev = prev;
    }
}

/// Front-to-back iterator over a [`List`]
pub struct ListIter<S> {
    slots: S,
    next: Option<NodeId>,
}

impl<S: LinkRead> Iterator for ListIter<S> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.slots.links(current).and_then(|l| l.next);
        Some(current)
    }
}
