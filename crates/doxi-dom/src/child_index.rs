//! Secondary child indexes
//!
//! Partitions a parent's children by a derived key (`name` or tag name). Each
//! key owns a [`List`] threaded through the children that share it, kept in
//! the same relative order as the full child sequence.

use std::collections::HashMap;

use crate::list::{LinkSlots, List};
use crate::{DomResult, NodeId};

/// The key a child index partitions by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Name = 0,
    Tag = 1,
}

/// Which end of a sublist to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    First,
    Last,
}

/// Link slots that also remember the key each node is indexed under
pub trait IndexSlots: LinkSlots {
    fn take_key(&mut self, id: NodeId) -> Option<String>;
    fn set_key(&mut self, id: NodeId, key: Option<String>);
}

/// Shared result for keys with no members. Nothing links into it.
pub(crate) static EMPTY: List = List::empty();

#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    lists: HashMap<String, List>,
}

impl ChildIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sublist for `key`, or an empty list when no child has it
    pub fn get(&self, key: &str) -> &List {
        self.lists.get(key).unwrap_or(&EMPTY)
    }

    pub fn endpoint(&self, key: &str, which: Which) -> Option<NodeId> {
        let list = self.lists.get(key)?;
        match which {
            Which::First => list.first(),
            Which::Last => list.last(),
        }
    }

    /// Number of distinct keys in use
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    /// Unlink `item` from whatever sublist holds it. Returns whether it was
    /// indexed.
    pub fn remove(&mut self, slots: &mut impl IndexSlots, item: NodeId) -> DomResult<bool> {
        let Some(key) = slots.take_key(item) else {
            return Ok(false);
        };

        if let Some(list) = self.lists.get_mut(&key) {
            list.remove(slots, item)?;
            if list.is_empty() {
                self.lists.remove(&key);
            }
        }
        Ok(true)
    }

    /// Re-derive the sublist membership of `item`, which sits at `position`
    /// in `children`, under its current `key`.
    ///
    /// Only the shorter side of `children` is scanned for a neighbor that
    /// already belongs to the target sublist.
    pub fn sync(
        &mut self,
        slots: &mut impl IndexSlots,
        children: &[NodeId],
        item: NodeId,
        position: usize,
        key: Option<String>,
    ) -> DomResult<()> {
        self.remove(slots, item)?;

        let Some(key) = key else {
            return Ok(());
        };

        let list = self.lists.entry(key.clone()).or_default();
        let view = &*slots;
        let len = children.len();

        let next = if 2 * position < len {
            // Nearest earlier member decides; with none, item becomes first
            let mut next = list.first();
            for &c in children[..position].iter().rev() {
                if list.contains(view, c) {
                    next = view.links(c).and_then(|l| l.next);
                    break;
                }
            }
            next
        } else {
            children
                .get(position + 1..)
                .unwrap_or_default()
                .iter()
                .copied()
                .find(|&c| list.contains(view, c))
        };

        list.insert(slots, item, next)?;
        slots.set_key(item, Some(key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{LinkRead, Links};

    #[derive(Default)]
    struct Slots {
        links: Vec<Links>,
        keys: Vec<Option<String>>,
    }

    impl LinkRead for Slots {
        fn links(&self, id: NodeId) -> Option<&Links> {
            self.links.get(id.index())
        }
    }

    impl LinkSlots for Slots {
        fn links_mut(&mut self, id: NodeId) -> Option<&mut Links> {
            self.links.get_mut(id.index())
        }
    }

    impl IndexSlots for Slots {
        fn take_key(&mut self, id: NodeId) -> Option<String> {
            self.keys.get_mut(id.index())?.take()
        }

        fn set_key(&mut self, id: NodeId, key: Option<String>) {
            if let Some(slot) = self.keys.get_mut(id.index()) {
                *slot = key;
            }
        }
    }

    fn build(keys: &[&str]) -> (Slots, Vec<NodeId>, ChildIndex) {
        let mut slots = Slots {
            links: vec![Links::default(); keys.len()],
            keys: vec![None; keys.len()],
        };
        let children: Vec<NodeId> = (0..keys.len() as u32).map(NodeId).collect();
        let mut index = ChildIndex::new();

        for (i, key) in keys.iter().enumerate() {
            index
                .sync(&mut slots, &children[..=i], children[i], i, Some(key.to_string()))
                .unwrap();
        }
        (slots, children, index)
    }

    fn members(index: &ChildIndex, slots: &Slots, key: &str) -> Vec<u32> {
        index.get(key).iter(slots).map(|id| id.0).collect()
    }

    #[test]
    fn test_partitions_in_child_order() {
        let (slots, _, index) = build(&["c", "d", "c", "d", "c", "d"]);

        assert_eq!(index.len(), 2);
        assert_eq!(members(&index, &slots, "c"), vec![0, 2, 4]);
        assert_eq!(members(&index, &slots, "d"), vec![1, 3, 5]);
        assert_eq!(index.endpoint("d", Which::Last), Some(NodeId(5)));
        assert!(index.get("x").is_empty());
        assert_eq!(index.endpoint("x", Which::First), None);
    }

    #[test]
    fn test_rekey_relinks_at_position() {
        let (mut slots, children, mut index) = build(&["c", "d", "c", "d", "c", "d"]);

        index.sync(&mut slots, &children, NodeId(0), 0, Some("d".into())).unwrap();
        assert_eq!(members(&index, &slots, "c"), vec![2, 4]);
        assert_eq!(members(&index, &slots, "d"), vec![0, 1, 3, 5]);

        index.sync(&mut slots, &children, NodeId(4), 4, Some("d".into())).unwrap();
        assert_eq!(members(&index, &slots, "c"), vec![2]);
        assert_eq!(members(&index, &slots, "d"), vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_null_key_leaves_index() {
        let (mut slots, children, mut index) = build(&["a", "b"]);

        index.sync(&mut slots, &children, NodeId(1), 1, None).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get("b").is_empty());

        assert!(index.remove(&mut slots, NodeId(0)).unwrap());
        assert!(!index.remove(&mut slots, NodeId(0)).unwrap());
        assert!(index.is_empty());
    }
}
