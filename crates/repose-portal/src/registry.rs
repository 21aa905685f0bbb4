//! Sorted linked registry with O(1) removal by handle.
//!
//! Nodes live in a [`SlotMap`] arena and are linked through their keys, so a
//! [`NodeKey`] is a stable handle: unlinking it never searches the chain, and
//! re-inserting it keeps its identity.
//!
//! - O(n) iteration
//! - O(n) insertion: a new node goes after every node it compares greater
//!   than, and before the first one it does not, so among equal keys the
//!   newest comes first and the others keep their relative order
//! - O(1) removal

use std::cmp::Ordering;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle to one node of an [`OrderedRegistry`].
    pub struct NodeKey;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    Head,
    Node(NodeKey),
}

struct Node<T> {
    value: T,
    // `None` while the node is free-standing
    prev: Option<Link>,
    next: Option<NodeKey>,
}

pub struct OrderedRegistry<T> {
    nodes: SlotMap<NodeKey, Node<T>>,
    head: Option<NodeKey>,
    linked: usize,
}

impl<T> Default for OrderedRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedRegistry<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            head: None,
            linked: 0,
        }
    }

    /// Allocates a free-standing node. It is not visible until [`insert`]ed.
    ///
    /// [`insert`]: OrderedRegistry::insert
    pub fn node(&mut self, value: T) -> NodeKey {
        self.nodes.insert(Node {
            value,
            prev: None,
            next: None,
        })
    }

    /// Links `key` in sorted position and returns it.
    ///
    /// Walks from the head while `cmp(node, current)` is `Greater`. A node
    /// that is already linked is first unlinked, so this doubles as a
    /// re-sort after its key changed.
    pub fn insert(&mut self, key: NodeKey, mut cmp: impl FnMut(&T, &T) -> Ordering) -> NodeKey {
        if !self.nodes.contains_key(key) {
            log::warn!("insert of a node that does not belong to this registry; ignored");
            return key;
        }
        self.remove(key);

        let mut prev = Link::Head;
        let mut cur = self.head;
        while let Some(c) = cur {
            if cmp(&self.nodes[key].value, &self.nodes[c].value) != Ordering::Greater {
                break;
            }
            prev = Link::Node(c);
            cur = self.nodes[c].next;
        }

        match prev {
            Link::Head => self.head = Some(key),
            Link::Node(p) => self.nodes[p].next = Some(key),
        }
        if let Some(c) = cur {
            self.nodes[c].prev = Some(Link::Node(key));
        }
        let node = &mut self.nodes[key];
        node.prev = Some(prev);
        node.next = cur;
        self.linked += 1;
        key
    }

    /// Unlinks `key` in O(1). Returns `false` if it was not linked.
    ///
    /// The node stays allocated and can be inserted again.
    pub fn remove(&mut self, key: NodeKey) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        let Some(prev) = node.prev.take() else {
            return false;
        };
        let next = node.next.take();

        match prev {
            Link::Head => self.head = next,
            Link::Node(p) => self.nodes[p].next = next,
        }
        if let Some(n) = next {
            self.nodes[n].prev = Some(prev);
        }
        self.linked -= 1;
        true
    }

    /// Unlinks and frees `key`, handing its value back.
    pub fn release(&mut self, key: NodeKey) -> Option<T> {
        self.remove(key);
        self.nodes.remove(key).map(|node| node.value)
    }

    pub fn get(&self, key: NodeKey) -> Option<&T> {
        self.nodes.get(key).map(|node| &node.value)
    }

    pub fn is_linked(&self, key: NodeKey) -> bool {
        self.nodes.get(key).is_some_and(|node| node.prev.is_some())
    }

    /// Number of linked nodes.
    pub fn len(&self) -> usize {
        self.linked
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Walks the chain as it is now, head to tail.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            registry: self,
            cur: self.head,
        }
    }
}

impl<'a, T> IntoIterator for &'a OrderedRegistry<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T> {
    registry: &'a OrderedRegistry<T>,
    cur: Option<NodeKey>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry,
            cur: self.cur,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.registry.nodes.get(self.cur?)?;
        self.cur = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn by_key(a: &(i32, char), b: &(i32, char)) -> Ordering {
        a.0.cmp(&b.0)
    }

    fn collect(r: &OrderedRegistry<(i32, char)>) -> Vec<char> {
        r.iter().map(|v| v.1).collect()
    }

    #[test]
    fn inserts_sorted_newest_first_on_ties() {
        let mut r = OrderedRegistry::new();
        for v in [(2, 'b'), (1, 'a'), (2, 'c'), (0, 'z'), (1, 'd')] {
            let k = r.node(v);
            r.insert(k, by_key);
        }
        assert_eq!(collect(&r), vec!['z', 'd', 'a', 'c', 'b']);
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn removes_head_middle_and_tail() {
        let mut r = OrderedRegistry::new();
        let keys: Vec<_> = (0..4)
            .map(|i| {
                let k = r.node((i, (b'a' + i as u8) as char));
                r.insert(k, by_key)
            })
            .collect();

        assert!(r.remove(keys[0]));
        assert_eq!(collect(&r), vec!['b', 'c', 'd']);
        assert!(r.remove(keys[2]));
        assert_eq!(collect(&r), vec!['b', 'd']);
        assert!(r.remove(keys[3]));
        assert_eq!(collect(&r), vec!['b']);
        assert!(r.remove(keys[1]));
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.iter().count(), 0);
    }

    #[test]
    fn remove_of_unlinked_node_is_noop() {
        let mut r = OrderedRegistry::new();
        let a = r.node((1, 'a'));
        assert!(!r.remove(a));
        r.insert(a, by_key);
        let b = r.node((2, 'b'));
        r.insert(b, by_key);

        assert!(r.remove(a));
        assert!(!r.remove(a));
        assert_eq!(collect(&r), vec!['b']);
        assert_eq!(r.release(a), Some((1, 'a')));
        assert!(!r.remove(a));
        assert_eq!(r.release(a), None);
    }

    #[test]
    fn reinsert_keeps_handle() {
        let mut r = OrderedRegistry::new();
        let a = r.node((5, 'a'));
        r.insert(a, by_key);
        let b = r.node((1, 'b'));
        r.insert(b, by_key);
        assert_eq!(collect(&r), vec!['b', 'a']);

        r.remove(a);
        r.insert(a, |_, other| 0.cmp(&other.0));
        assert_eq!(collect(&r), vec!['a', 'b']);
        assert!(r.is_linked(a));
        assert_eq!(r.get(a), Some(&(5, 'a')));
    }

    #[test]
    fn iteration_reflects_live_state() {
        let mut r = OrderedRegistry::new();
        let a = r.node((1, 'a'));
        r.insert(a, by_key);
        let it = r.iter();
        assert_eq!(it.clone().count(), 1);
        assert_eq!(it.map(|v| v.1).collect::<String>(), "a");

        let b = r.node((0, 'b'));
        r.insert(b, by_key);
        assert_eq!(collect(&r), vec!['b', 'a']);
    }

    #[test]
    fn removal_never_compares() {
        const N: usize = 64;
        let calls = Cell::new(0usize);
        let mut r = OrderedRegistry::new();

        let keys: Vec<_> = (0..N)
            .map(|i| {
                let k = r.node(i);
                r.insert(k, |a: &usize, b: &usize| {
                    calls.set(calls.get() + 1);
                    a.cmp(b)
                })
            })
            .collect();
        let insert_calls = calls.get();
        assert!(insert_calls <= N * (N - 1) / 2);

        for k in keys.into_iter().rev() {
            assert!(r.remove(k));
        }
        assert_eq!(calls.get(), insert_calls);
        assert!(r.is_empty());
    }
}
