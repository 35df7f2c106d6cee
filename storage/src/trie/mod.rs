// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The radix trie: compressed edges over a byte alphabet, nodes in an
//! [`Arena`], strict byte-lexicographic key order.
//!
//! Mutations allocate everything they need before linking anything, so an
//! arena exhausted mid-split rolls back to the exact prior tree. The one
//! deliberate exception is the merge step of deletion: if the parent's
//! array cannot grow to take the spliced suffix, the merge is skipped and
//! the tree stays correct but keeps one mergeable node (see
//! [`CheckError::TransientNode`]).

mod check;
mod iter;

pub use check::CheckError;
pub use iter::{Iter, IterDesc};

use smallvec::SmallVec;

use crate::arena::Arena;
use crate::logger::trace;
use crate::node::RadixNode;
use crate::{ElementRef, NodeRef, TrieError};

/// Result of a predecessor probe: the node holding the greatest stored key
/// less than or equal to the probe, and whether it is an exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predecessor {
    /// The node carrying the answering element
    pub node: NodeRef,
    /// True when the node's key equals the probe key
    pub exact: bool,
}

/// An ordered map from byte keys to [`ElementRef`] records, stored as a
/// compressed radix trie inside an arena.
///
/// Node references handed out by [`RadixTrie::insert`] and
/// [`RadixTrie::search`] stay valid until the node is deleted; they are
/// relative to the arena, not addresses.
#[derive(Debug)]
pub struct RadixTrie<A> {
    arena: A,
    count: u64,
}

impl<A: Arena> RadixTrie<A> {
    /// Create an empty trie over `arena`.
    pub const fn new(arena: A) -> Self {
        Self { arena, count: 0 }
    }

    /// The backing arena.
    pub const fn arena(&self) -> &A {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut A {
        &mut self.arena
    }

    /// Number of stored elements.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.count
    }

    /// Whether the trie stores no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The element carried by `node`, if any.
    #[must_use]
    pub fn element(&self, node: NodeRef) -> Option<ElementRef> {
        self.arena.node(node).element()
    }

    /// Walk down from the root, consuming one selector byte plus its edge
    /// suffix at a time. Returns the deepest fully-matched node and the
    /// number of key bytes it accounts for; `None` on an empty trie.
    fn descend(&self, key: &[u8]) -> Option<(NodeRef, usize)> {
        let mut node = self.arena.root()?;
        let mut pos = 0;
        loop {
            let current = self.arena.node(node);
            let Some(&byte) = key.get(pos) else {
                return Some((node, pos));
            };
            let Some(child) = current.children().child(byte) else {
                return Some((node, pos));
            };
            let suffix = current.children().suffix(byte);
            if !key[pos + 1..].starts_with(suffix) {
                return Some((node, pos));
            }
            pos += 1 + suffix.len();
            node = child;
        }
    }

    /// Insert `key` mapping to `element`.
    ///
    /// Returns the node now carrying the element. The reference stays valid
    /// until that key is deleted, across any other mutations.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] if the key is already present (the tree
    /// is untouched), or [`TrieError::AllocationFailure`] if the arena is
    /// exhausted (the tree rolls back to its prior state).
    pub fn insert(&mut self, key: &[u8], element: ElementRef) -> Result<NodeRef, TrieError> {
        let target = match self.descend(key) {
            None => self.bootstrap(key)?,
            Some((node, pos)) if pos == key.len() => {
                if self.arena.node(node).element().is_some() {
                    return Err(TrieError::DuplicateKey);
                }
                node
            }
            Some((node, pos)) => {
                let byte = key[pos];
                if self.arena.node(node).children().child(byte).is_some() {
                    self.split_edge(node, byte, &key[pos + 1..])?
                } else {
                    self.attach_leaf(node, byte, &key[pos + 1..])?
                }
            }
        };
        let (target_node, log) = self.arena.node_and_log(target);
        target_node.set_element(target, Some(element), log);
        self.count += 1;
        trace!("inserted {} at {target:#x}", hex::encode(key));
        Ok(target)
    }

    /// First insert into an empty trie: the root spells the empty key, and
    /// a non-empty key hangs off it as a single leaf edge.
    fn bootstrap(&mut self, key: &[u8]) -> Result<NodeRef, TrieError> {
        let root = self.arena.allocate_node(RadixNode::new())?;
        if key.is_empty() {
            self.arena.set_root(Some(root));
            return Ok(root);
        }
        let leaf = match self.arena.allocate_node(RadixNode::new()) {
            Ok(leaf) => leaf,
            Err(e) => {
                self.arena.delete_node(root);
                return Err(e);
            }
        };
        if let Err(e) = self.ensure_slot(root, key[0], key.len() - 1) {
            self.arena.delete_node(leaf);
            self.arena.delete_node(root);
            return Err(e);
        }
        let (root_node, log) = self.arena.node_and_log(root);
        root_node
            .children_mut()
            .set_edge(root, key[0], &key[1..], leaf, log);
        let (leaf_node, log) = self.arena.node_and_log(leaf);
        leaf_node.set_parent(leaf, Some((root, 0)), log);
        self.arena.set_root(Some(root));
        Ok(leaf)
    }

    /// Hang a new leaf off `parent` at a vacant or not-yet-existing slot.
    fn attach_leaf(&mut self, parent: NodeRef, byte: u8, suffix: &[u8]) -> Result<NodeRef, TrieError> {
        let leaf = self.arena.allocate_node(RadixNode::new())?;
        if let Err(e) = self.ensure_slot(parent, byte, suffix.len()) {
            self.arena.delete_node(leaf);
            return Err(e);
        }
        let (parent_node, log) = self.arena.node_and_log(parent);
        parent_node
            .children_mut()
            .set_edge(parent, byte, suffix, leaf, log);
        let index = byte - self.arena.node(parent).children().offset();
        let (leaf_node, log) = self.arena.node_and_log(leaf);
        leaf_node.set_parent(leaf, Some((parent, index)), log);
        Ok(leaf)
    }

    /// Split the occupied edge at `parent[byte]`, whose stored suffix
    /// disagrees with `rest` (the key bytes after the selector).
    ///
    /// The pre-existing child keeps its reference in all three cases; only
    /// its parent back-reference moves.
    fn split_edge(&mut self, parent: NodeRef, byte: u8, rest: &[u8]) -> Result<NodeRef, TrieError> {
        let children = self.arena.node(parent).children();
        let child = children.child(byte).expect("slot is occupied");
        let stored: SmallVec<[u8; 64]> = SmallVec::from_slice(children.suffix(byte));
        let common = stored
            .iter()
            .zip(rest.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let target = if common == rest.len() {
            // the new remainder is a strict prefix of the stored suffix:
            // the new element node takes over the slot, and the old child
            // hangs under it carrying the leftover tail
            //
            //   parent ──rest──> mid ──stored[common..]──> child
            let mid = self.arena.allocate_node(RadixNode::new())?;
            let tail_byte = stored[common];
            let tail = &stored[common + 1..];
            if let Err(e) = self.ensure_slot(mid, tail_byte, tail.len()) {
                self.arena.delete_node(mid);
                return Err(e);
            }
            let (mid_node, log) = self.arena.node_and_log(mid);
            mid_node.children_mut().set_edge(mid, tail_byte, tail, child, log);
            let (child_node, log) = self.arena.node_and_log(child);
            child_node.set_parent(child, Some((mid, 0)), log);
            let (parent_node, log) = self.arena.node_and_log(parent);
            parent_node.children_mut().set_edge(parent, byte, rest, mid, log);
            let index = byte - self.arena.node(parent).children().offset();
            let (mid_node, log) = self.arena.node_and_log(mid);
            mid_node.set_parent(mid, Some((parent, index)), log);
            mid
        } else if common == stored.len() {
            // the stored suffix is a strict prefix of the remainder; the
            // tail extends below the existing child
            self.attach_leaf(child, rest[common], &rest[common + 1..])?
        } else {
            // true divergence: a new branch point takes the slot, holding
            // the old child and the new leaf as its two edges
            //
            //   parent ──stored[..common]──> branch ─┬──> child
            //                                        └──> leaf
            let branch = self.arena.allocate_node(RadixNode::new())?;
            let leaf = match self.arena.allocate_node(RadixNode::new()) {
                Ok(leaf) => leaf,
                Err(e) => {
                    self.arena.delete_node(branch);
                    return Err(e);
                }
            };
            let stored_byte = stored[common];
            let new_byte = rest[common];
            let planned = self
                .ensure_slot(branch, stored_byte, stored.len() - common - 1)
                .and_then(|()| self.ensure_slot(branch, new_byte, rest.len() - common - 1));
            if let Err(e) = planned {
                self.arena.delete_node(leaf);
                self.arena.delete_node(branch);
                return Err(e);
            }
            let (branch_node, log) = self.arena.node_and_log(branch);
            branch_node
                .children_mut()
                .set_edge(branch, stored_byte, &stored[common + 1..], child, log);
            branch_node
                .children_mut()
                .set_edge(branch, new_byte, &rest[common + 1..], leaf, log);
            let offset = self.arena.node(branch).children().offset();
            let (child_node, log) = self.arena.node_and_log(child);
            child_node.set_parent(child, Some((branch, stored_byte - offset)), log);
            let (leaf_node, log) = self.arena.node_and_log(leaf);
            leaf_node.set_parent(leaf, Some((branch, new_byte - offset)), log);
            let (parent_node, log) = self.arena.node_and_log(parent);
            parent_node
                .children_mut()
                .set_edge(parent, byte, &stored[..common], branch, log);
            let index = byte - self.arena.node(parent).children().offset();
            let (branch_node, log) = self.arena.node_and_log(branch);
            branch_node.set_parent(branch, Some((parent, index)), log);
            leaf
        };
        // splits shorten the parent's stored suffix; shrink if warranted
        self.compact_node(parent);
        Ok(target)
    }

    /// Make `owner`'s array able to hold an edge at `byte` with a
    /// `suffix_len`-byte suffix, reserving any growth with the arena first.
    fn ensure_slot(&mut self, owner: NodeRef, byte: u8, suffix_len: usize) -> Result<(), TrieError> {
        let (plan, growth) = {
            let children = self.arena.node(owner).children();
            match children.plan_slot(byte, suffix_len as u16) {
                Some(plan) => (plan, children.growth_bytes(&plan)),
                None => return Ok(()),
            }
        };
        self.arena.reserve(growth)?;
        let (owner_node, log) = self.arena.node_and_log(owner);
        owner_node.children_mut().apply_plan(owner, plan, log);
        self.fix_parent_indexes(owner);
        Ok(())
    }

    /// Restore the recorded window index of every child after a reshape of
    /// `owner`'s array moved its slots.
    fn fix_parent_indexes(&mut self, owner: NodeRef) {
        let children = self.arena.node(owner).children();
        let offset = children.offset();
        let moved: SmallVec<[(NodeRef, u8); 16]> = children
            .iter_present()
            .map(|(byte, child)| (child, byte - offset))
            .collect();
        for (child, index) in moved {
            self.arena.node_mut(child).set_parent_index(index);
        }
    }

    /// Compact `owner`'s array and return the freed bytes to the arena.
    fn compact_node(&mut self, owner: NodeRef) {
        let (owner_node, log) = self.arena.node_and_log(owner);
        let freed = owner_node.children_mut().compact(owner, log);
        if freed > 0 {
            self.arena.release(freed);
            self.fix_parent_indexes(owner);
        }
    }

    /// Delete the element carried by `node` and clean up the structure it
    /// leaves behind. Returns the removed element, or `None` if the node
    /// carried none (in which case nothing changes).
    ///
    /// `node` must be a live reference obtained from [`RadixTrie::insert`]
    /// or [`RadixTrie::search`].
    pub fn delete(&mut self, node: NodeRef) -> Option<ElementRef> {
        let (target, log) = self.arena.node_and_log(node);
        let element = target.element()?;
        target.set_element(node, None, log);
        self.count -= 1;
        self.cleanup(node);
        Some(element)
    }

    /// [`RadixTrie::search`] followed by [`RadixTrie::delete`]. A key that
    /// is not present is a no-op returning `None`.
    pub fn remove(&mut self, key: &[u8]) -> Option<ElementRef> {
        let node = self.search(key)?;
        self.delete(node)
    }

    /// Walk upward from a node that just lost its element or a child,
    /// merging and dropping transient nodes until the structure is tight
    /// again.
    fn cleanup(&mut self, mut node: NodeRef) {
        loop {
            let current = self.arena.node(node);
            let parent = current.parent();
            let has_element = current.element().is_some();
            let child_count = current.children().child_count();

            if has_element || child_count >= 2 {
                self.compact_node(node);
                return;
            }
            if child_count == 1 {
                let Some((parent_ref, _)) = parent else {
                    // the root may keep a single child
                    self.compact_node(node);
                    return;
                };
                if self.merge_into_parent(node, parent_ref).is_err() {
                    // arena exhausted: the unmerged node stays behind; the
                    // tree is still correct, just less compact
                    self.compact_node(node);
                    return;
                }
                node = parent_ref;
            } else {
                match parent {
                    None => {
                        self.arena.set_root(None);
                        self.release_node(node);
                        return;
                    }
                    Some((parent_ref, index)) => {
                        let byte = self.arena.node(parent_ref).children().offset() + index;
                        let (parent_node, log) = self.arena.node_and_log(parent_ref);
                        parent_node.children_mut().clear_edge(parent_ref, byte, log);
                        self.release_node(node);
                        node = parent_ref;
                    }
                }
            }
        }
    }

    /// Splice `node`'s only child up into `node`'s slot in `parent`,
    /// concatenating the two edge strings, and release `node`.
    fn merge_into_parent(&mut self, node: NodeRef, parent: NodeRef) -> Result<(), TrieError> {
        let current = self.arena.node(node);
        let (child_byte, child) = current.children().sole_child().expect("exactly one child");
        let (_, index) = current.parent().expect("parent is known");
        let parent_byte = self.arena.node(parent).children().offset() + index;

        let mut merged: SmallVec<[u8; 64]> =
            SmallVec::from_slice(self.arena.node(parent).children().suffix(parent_byte));
        merged.push(child_byte);
        merged.extend_from_slice(self.arena.node(node).children().suffix(child_byte));

        self.ensure_slot(parent, parent_byte, merged.len())?;
        trace!("merging {node:#x} into {parent:#x} at {parent_byte:#04x}");

        let (merged_away, log) = self.arena.node_and_log(node);
        merged_away.children_mut().clear_edge(node, child_byte, log);
        let (parent_node, log) = self.arena.node_and_log(parent);
        parent_node
            .children_mut()
            .set_edge(parent, parent_byte, &merged, child, log);
        let index = parent_byte - self.arena.node(parent).children().offset();
        let (child_node, log) = self.arena.node_and_log(child);
        child_node.set_parent(child, Some((parent, index)), log);
        self.release_node(node);
        Ok(())
    }

    /// Zero every stored reference in `node` through the write primitives,
    /// then free it.
    fn release_node(&mut self, node: NodeRef) {
        let bytes: SmallVec<[u8; 16]> = self
            .arena
            .node(node)
            .children()
            .iter_present()
            .map(|(byte, _)| byte)
            .collect();
        let (released, log) = self.arena.node_and_log(node);
        for byte in bytes {
            released.children_mut().clear_edge(node, byte, log);
        }
        released.set_element(node, None, log);
        released.set_parent(node, None, log);
        self.arena.delete_node(node);
    }

    /// The node storing exactly `key`, if that key is present.
    ///
    /// Allocation-free; a structural node spelling `key` without carrying
    /// an element does not count as present.
    #[must_use]
    pub fn search(&self, key: &[u8]) -> Option<NodeRef> {
        let (node, pos) = self.descend(key)?;
        (pos == key.len() && self.arena.node(node).element().is_some()).then_some(node)
    }

    /// The greatest stored key less than or equal to `key`, or `None` when
    /// `key` sorts before everything stored.
    #[must_use]
    pub fn predecessor_or_equal(&self, key: &[u8]) -> Option<Predecessor> {
        let (node, pos) = self.descend(key)?;
        if pos == key.len() {
            if self.arena.node(node).element().is_some() {
                return Some(Predecessor { node, exact: true });
            }
            return self.prev(node).map(|node| Predecessor { node, exact: false });
        }

        let byte = key[pos];
        let children = self.arena.node(node).children();
        // an occupied slot whose whole subtree sorts below the probe wins;
        // otherwise the nearest lesser sibling edge does
        let below = match children.child(byte) {
            Some(child) if children.suffix(byte) < &key[pos + 1..] => Some(child),
            _ => children
                .present_before(byte)
                .and_then(|lesser| children.child(lesser)),
        };
        if let Some(child) = below {
            return Some(Predecessor {
                node: self.last_in_subtree(child),
                exact: false,
            });
        }
        if self.arena.node(node).element().is_some() {
            return Some(Predecessor { node, exact: false });
        }
        self.prev(node).map(|node| Predecessor { node, exact: false })
    }

    /// The node holding the smallest stored key.
    #[must_use]
    pub fn first(&self) -> Option<NodeRef> {
        self.arena.root().map(|root| self.first_in_subtree(root))
    }

    /// The node holding the greatest stored key.
    #[must_use]
    pub fn last(&self) -> Option<NodeRef> {
        self.arena.root().map(|root| self.last_in_subtree(root))
    }

    /// The node holding the smallest stored key strictly greater than
    /// `node`'s key.
    #[must_use]
    pub fn next(&self, node: NodeRef) -> Option<NodeRef> {
        let current = self.arena.node(node);
        if let Some(byte) = current.children().first_present() {
            let child = current.children().child(byte).expect("slot is occupied");
            return Some(self.first_in_subtree(child));
        }
        let mut current = node;
        loop {
            let (parent, index) = self.arena.node(current).parent()?;
            let children = self.arena.node(parent).children();
            let byte = children.offset() + index;
            if let Some(greater) = children.present_after(byte) {
                let child = children.child(greater).expect("slot is occupied");
                return Some(self.first_in_subtree(child));
            }
            current = parent;
        }
    }

    /// The node holding the greatest stored key strictly less than `node`'s
    /// key.
    #[must_use]
    pub fn prev(&self, node: NodeRef) -> Option<NodeRef> {
        let mut current = node;
        loop {
            let (parent, index) = self.arena.node(current).parent()?;
            let children = self.arena.node(parent).children();
            let byte = children.offset() + index;
            if let Some(lesser) = children.present_before(byte) {
                let child = children.child(lesser).expect("slot is occupied");
                return Some(self.last_in_subtree(child));
            }
            if self.arena.node(parent).element().is_some() {
                return Some(parent);
            }
            current = parent;
        }
    }

    /// Shallowest element-bearing node under (and including) `node`. Every
    /// non-empty subtree has one: elementless nodes keep at least two
    /// children.
    fn first_in_subtree(&self, mut node: NodeRef) -> NodeRef {
        loop {
            let current = self.arena.node(node);
            if current.element().is_some() {
                return node;
            }
            let byte = current
                .children()
                .first_present()
                .expect("elementless node has children");
            node = current.children().child(byte).expect("slot is occupied");
        }
    }

    /// Deepest node along the greatest edges under `node`; it always
    /// carries the subtree's greatest key.
    fn last_in_subtree(&self, mut node: NodeRef) -> NodeRef {
        loop {
            let current = self.arena.node(node);
            let Some(byte) = current.children().last_present() else {
                return node;
            };
            node = current.children().child(byte).expect("slot is occupied");
        }
    }

    /// Reconstruct the key stored at `node` by walking the parent chain.
    #[must_use]
    pub fn key(&self, node: NodeRef) -> Vec<u8> {
        let mut key: SmallVec<[u8; 64]> = SmallVec::new();
        let mut current = node;
        while let Some((parent, index)) = self.arena.node(current).parent() {
            let children = self.arena.node(parent).children();
            let byte = children.offset() + index;
            key.extend(children.suffix(byte).iter().rev().copied());
            key.push(byte);
            current = parent;
        }
        key.reverse();
        key.to_vec()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::arena::{MemArena, RefLog};
    use crate::{CheckError, RefSlot};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::{BTreeMap, HashMap};
    use std::num::NonZeroU64;
    use test_case::test_case;

    fn elem(value: u64) -> ElementRef {
        NonZeroU64::new(value).unwrap()
    }

    fn trie_of(keys: &[&[u8]]) -> RadixTrie<MemArena> {
        let mut trie = RadixTrie::new(MemArena::new());
        for (i, key) in keys.iter().enumerate() {
            trie.insert(key, elem(i as u64 + 1)).unwrap();
            trie.check().unwrap();
        }
        trie
    }

    /// The worked example:
    ///
    ///   (root) ──a──> [a:E1] ──b──> [ab:E2] ──c──> [abc:E3]
    ///      └───b──> [b:E4]
    #[test]
    fn insert_search_delete_scenario() {
        let mut trie = RadixTrie::new(MemArena::new());
        let a = trie.insert(b"a", elem(1)).unwrap();
        trie.insert(b"ab", elem(2)).unwrap();
        trie.insert(b"abc", elem(3)).unwrap();
        trie.insert(b"b", elem(4)).unwrap();
        trie.check().unwrap();
        assert_eq!(trie.len(), 4);

        let ab = trie.search(b"ab").unwrap();
        assert_eq!(trie.element(ab), Some(elem(2)));
        assert_eq!(trie.next(a), Some(ab));

        assert_eq!(trie.remove(b"ab"), Some(elem(2)));
        trie.check().unwrap();
        assert_eq!(trie.search(b"ab"), None);
        assert_eq!(trie.remove(b"ab"), None);
        assert_eq!(trie.element(trie.search(b"a").unwrap()), Some(elem(1)));
        assert_eq!(trie.element(trie.search(b"abc").unwrap()), Some(elem(3)));

        let pred = trie.predecessor_or_equal(b"ac").unwrap();
        assert!(!pred.exact);
        assert_eq!(trie.key(pred.node), b"abc".to_vec());
    }

    #[test]
    fn duplicate_key_leaves_the_tree_alone() {
        let mut trie = trie_of(&[b"a"]);
        let bytes = trie.arena().bytes_used();
        assert_eq!(trie.insert(b"a", elem(7)), Err(TrieError::DuplicateKey));
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.arena().bytes_used(), bytes);
        assert_eq!(trie.element(trie.search(b"a").unwrap()), Some(elem(1)));
    }

    #[test]
    fn empty_key_lives_at_the_root() {
        let mut trie = trie_of(&[b"", b"x"]);
        let root = trie.search(b"").unwrap();
        assert_eq!(trie.key(root), Vec::<u8>::new());
        assert_eq!(trie.first(), Some(root));

        assert_eq!(trie.remove(b""), Some(elem(1)));
        trie.check().unwrap();
        assert_eq!(trie.search(b""), None);
        assert!(trie.search(b"x").is_some());
    }

    #[test]
    fn splits_preserve_existing_references() {
        let mut trie = RadixTrie::new(MemArena::new());
        let romane = trie.insert(b"romane", elem(1)).unwrap();
        // every later insert splits an edge somewhere above the first key
        for (i, key) in [&b"romanus"[..], b"rom", b"romulus", b"r"].iter().enumerate() {
            trie.insert(key, elem(i as u64 + 2)).unwrap();
            trie.check().unwrap();
            assert_eq!(trie.element(romane), Some(elem(1)));
            assert_eq!(trie.key(romane), b"romane".to_vec());
        }
    }

    #[test]
    fn longer_key_extends_below_an_existing_leaf() {
        let mut trie = trie_of(&[b"team", b"toast"]);
        trie.insert(b"teamwork", elem(3)).unwrap();
        trie.check().unwrap();
        assert!(trie.search(b"teamwork").is_some());
        assert!(trie.search(b"team").is_some());
    }

    #[test_case(b"a", Some((&b"a"[..], true)); "exact")]
    #[test_case(b"ab", Some((&b"ab"[..], true)); "exact nested")]
    #[test_case(b"aa", Some((&b"a"[..], false)); "node's own element")]
    #[test_case(b"ac", Some((&b"abc"[..], false)); "dives into lesser edge")]
    #[test_case(b"az", Some((&b"ax"[..], false)); "last under the branch")]
    #[test_case(b"zz", Some((&b"b"[..], false)); "after everything")]
    #[test_case(b"0", None; "before everything")]
    fn predecessor(probe: &[u8], expected: Option<(&[u8], bool)>) {
        let trie = trie_of(&[b"a", b"ab", b"abc", b"ax", b"b"]);
        let found = trie
            .predecessor_or_equal(probe)
            .map(|pred| (trie.key(pred.node), pred.exact));
        assert_eq!(found, expected.map(|(key, exact)| (key.to_vec(), exact)));
    }

    #[test]
    fn deleting_everything_returns_all_storage() {
        let keys: [&[u8]; 6] = [b"romane", b"romanus", b"romulus", b"rubens", b"ruber", b"rubicon"];
        let mut trie = trie_of(&keys);
        for key in keys {
            assert!(trie.remove(key).is_some());
            trie.check().unwrap();
        }
        assert!(trie.is_empty());
        assert_eq!(trie.arena().root(), None);
        assert_eq!(trie.arena().bytes_used(), 0);
    }

    #[test]
    fn random_soak_matches_btreemap() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut model: BTreeMap<Vec<u8>, ElementRef> = BTreeMap::new();
        let mut trie = RadixTrie::new(MemArena::new());
        let mut next_element = 1u64;

        for _ in 0..2000 {
            let len = rng.random_range(0..8);
            let key: Vec<u8> = (0..len)
                .map(|_| b"abcd"[rng.random_range(0..4)])
                .collect();
            if rng.random_bool(0.6) {
                match trie.insert(&key, elem(next_element)) {
                    Ok(_) => {
                        assert!(model.insert(key, elem(next_element)).is_none());
                        next_element += 1;
                    }
                    Err(TrieError::DuplicateKey) => assert!(model.contains_key(&key)),
                    Err(e) => panic!("unexpected {e}"),
                }
            } else {
                assert_eq!(trie.remove(&key), model.remove(&key));
            }
            trie.check().unwrap();
            assert_eq!(trie.len(), model.len() as u64);
        }

        let stored: Vec<_> = trie.iter().collect();
        let expected: Vec<_> = model.iter().map(|(k, &v)| (k.clone(), v)).collect();
        assert_eq!(stored, expected);

        // predecessor agrees with the model on random probes
        for _ in 0..200 {
            let len = rng.random_range(0..8);
            let probe: Vec<u8> = (0..len)
                .map(|_| b"abcd"[rng.random_range(0..4)])
                .collect();
            let found = trie
                .predecessor_or_equal(&probe)
                .map(|pred| (trie.key(pred.node), pred.exact));
            let expected = model
                .range(..=probe.clone())
                .next_back()
                .map(|(key, _)| (key.clone(), *key == probe));
            assert_eq!(found, expected, "probe {}", hex::encode(&probe));
        }

        for key in model.into_keys() {
            assert!(trie.remove(&key).is_some());
        }
        assert_eq!(trie.arena().bytes_used(), 0);
    }

    /// Delegates to a [`MemArena`] until its budget of allocations and
    /// reservations runs out, then fails everything.
    struct FlakyArena {
        inner: MemArena,
        budget: Option<u32>,
    }

    impl FlakyArena {
        fn new() -> Self {
            Self {
                inner: MemArena::new(),
                budget: None,
            }
        }

        fn spend(&mut self) -> Result<(), TrieError> {
            match self.budget.as_mut() {
                Some(0) => Err(TrieError::AllocationFailure { requested: 1 }),
                Some(left) => {
                    *left -= 1;
                    Ok(())
                }
                None => Ok(()),
            }
        }
    }

    impl Arena for FlakyArena {
        fn allocate_node(&mut self, node: RadixNode) -> Result<NodeRef, TrieError> {
            self.spend()?;
            self.inner.allocate_node(node)
        }

        fn delete_node(&mut self, node_ref: NodeRef) {
            self.inner.delete_node(node_ref);
        }

        fn node(&self, node_ref: NodeRef) -> &RadixNode {
            self.inner.node(node_ref)
        }

        fn node_mut(&mut self, node_ref: NodeRef) -> &mut RadixNode {
            self.inner.node_mut(node_ref)
        }

        fn node_and_log(&mut self, node_ref: NodeRef) -> (&mut RadixNode, &mut dyn RefLog) {
            self.inner.node_and_log(node_ref)
        }

        fn log(&mut self) -> &mut dyn RefLog {
            self.inner.log()
        }

        fn reserve(&mut self, bytes: u64) -> Result<(), TrieError> {
            self.spend()?;
            self.inner.reserve(bytes)
        }

        fn release(&mut self, bytes: u64) {
            self.inner.release(bytes);
        }

        fn root(&self) -> Option<NodeRef> {
            self.inner.root()
        }

        fn set_root(&mut self, root: Option<NodeRef>) {
            self.inner.set_root(root);
        }
    }

    #[test]
    fn failed_inserts_roll_back() {
        for budget in 0..6 {
            let mut trie = RadixTrie::new(FlakyArena::new());
            trie.insert(b"romane", elem(1)).unwrap();
            trie.insert(b"romanus", elem(2)).unwrap();
            let bytes = trie.arena().inner.bytes_used();

            trie.arena_mut().budget = Some(budget);
            match trie.insert(b"romulus", elem(3)) {
                Ok(_) => assert_eq!(trie.len(), 3),
                Err(TrieError::AllocationFailure { .. }) => {
                    assert_eq!(trie.len(), 2);
                    assert_eq!(trie.arena().inner.bytes_used(), bytes);
                    assert_eq!(trie.search(b"romulus"), None);
                }
                Err(e) => panic!("unexpected {e}"),
            }
            trie.arena_mut().budget = None;
            trie.check().unwrap();
            assert!(trie.search(b"romane").is_some());
            assert!(trie.search(b"romanus").is_some());
        }
    }

    #[test]
    fn skipped_merge_degrades_but_stays_correct() {
        let mut trie = RadixTrie::new(FlakyArena::new());
        trie.insert(b"ab", elem(1)).unwrap();
        trie.insert(b"abcd", elem(2)).unwrap();

        let node = trie.search(b"ab").unwrap();
        trie.arena_mut().budget = Some(0);
        assert_eq!(trie.delete(node), Some(elem(1)));
        trie.arena_mut().budget = None;

        // the merge was skipped; lookups still work around the leftover node
        assert_eq!(trie.search(b"ab"), None);
        assert!(trie.search(b"abcd").is_some());
        assert!(matches!(
            trie.check(),
            Err(CheckError::TransientNode { .. })
        ));

        // deleting the remaining key clears the whole tree
        assert_eq!(trie.remove(b"abcd"), Some(elem(2)));
        trie.check().unwrap();
        assert!(trie.is_empty());
        assert_eq!(trie.arena().inner.bytes_used(), 0);
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Node(RefSlot, Option<NodeRef>),
        Element(NodeRef, Option<ElementRef>),
    }

    /// Journals the new value of every reference overwrite.
    #[derive(Debug, Default)]
    struct JournalLog(Vec<Event>);

    impl RefLog for JournalLog {
        fn node_ref_written(&mut self, slot: RefSlot, _old: Option<NodeRef>, new: Option<NodeRef>) {
            self.0.push(Event::Node(slot, new));
        }

        fn element_ref_written(
            &mut self,
            node: NodeRef,
            _old: Option<ElementRef>,
            new: Option<ElementRef>,
        ) {
            self.0.push(Event::Element(node, new));
        }
    }

    /// Replaying the journal alone must rebuild the exact link structure:
    /// proof that no reference write bypasses the primitives.
    #[test]
    fn journal_replay_rebuilds_the_tree() {
        let mut trie = RadixTrie::new(MemArena::with_log(JournalLog::default()));
        let keys: [&[u8]; 6] = [b"romane", b"romanus", b"romulus", b"rubens", b"ruber", b"rubicon"];
        for (i, key) in keys.iter().enumerate() {
            trie.insert(key, elem(i as u64 + 1)).unwrap();
        }
        for key in [&b"romanus"[..], b"rubens", b"romane"] {
            trie.remove(key).unwrap();
        }

        let mut root = None;
        let mut parents: HashMap<NodeRef, NodeRef> = HashMap::new();
        let mut edges: HashMap<(NodeRef, u8), NodeRef> = HashMap::new();
        let mut elements: HashMap<NodeRef, ElementRef> = HashMap::new();
        for event in &trie.arena().ref_log().0 {
            match *event {
                Event::Node(RefSlot::Root, new) => root = new,
                Event::Node(RefSlot::Parent(node), Some(parent)) => {
                    parents.insert(node, parent);
                }
                Event::Node(RefSlot::Parent(node), None) => {
                    parents.remove(&node);
                }
                Event::Node(RefSlot::Child(node, byte), Some(child)) => {
                    edges.insert((node, byte), child);
                }
                Event::Node(RefSlot::Child(node, byte), None) => {
                    edges.remove(&(node, byte));
                }
                Event::Element(node, Some(element)) => {
                    elements.insert(node, element);
                }
                Event::Element(node, None) => {
                    elements.remove(&node);
                }
            }
        }

        assert_eq!(root, trie.arena().root());
        let mut live_parents = HashMap::new();
        let mut live_edges = HashMap::new();
        let mut live_elements = HashMap::new();
        let mut stack: Vec<NodeRef> = root.into_iter().collect();
        while let Some(node) = stack.pop() {
            let current = trie.arena().node(node);
            if let Some((parent, _)) = current.parent() {
                live_parents.insert(node, parent);
            }
            if let Some(element) = current.element() {
                live_elements.insert(node, element);
            }
            for (byte, child) in current.children().iter_present() {
                live_edges.insert((node, byte), child);
                stack.push(child);
            }
        }
        assert_eq!(parents, live_parents);
        assert_eq!(edges, live_edges);
        assert_eq!(elements, live_elements);
    }
}
