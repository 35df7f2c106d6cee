// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! An owned in-memory arena: a slab of nodes with a free list of recycled
//! slots. References are slab indices, so they survive any reallocation of
//! the slab itself, and an optional byte limit makes exhaustion testable.

use std::mem::size_of;
use std::num::NonZeroU64;

use crate::logger::trace;
use crate::node::RadixNode;
use crate::{Arena, NodeRef, RefSlot, TrieError};

use super::{NoopLog, RefLog, write_node_ref};

/// Bytes charged per node, over and above its child-array storage.
const NODE_BYTES: u64 = size_of::<RadixNode>() as u64;

/// An in-memory [`Arena`].
///
/// Deleted slots are recycled before the slab grows. Byte accounting covers
/// node headers plus reserved child-array storage and is checked against the
/// optional limit, so tests can drive allocation failure deterministically.
///
/// The installed [`RefLog`] defaults to a no-op; a different log can be
/// plugged in to observe every reference overwrite.
#[derive(Debug, Default)]
pub struct MemArena<L: RefLog = NoopLog> {
    slab: Vec<Option<RadixNode>>,
    free_list: Vec<usize>,
    used: u64,
    limit: Option<u64>,
    root: Option<NodeRef>,
    log: L,
}

impl MemArena {
    /// Create an unbounded arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena that fails allocations once `limit` bytes are in use.
    #[must_use]
    pub fn bounded(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

impl<L: RefLog> MemArena<L> {
    /// Create an unbounded arena observing reference writes through `log`.
    pub fn with_log(log: L) -> Self {
        Self {
            slab: Vec::new(),
            free_list: Vec::new(),
            used: 0,
            limit: None,
            root: None,
            log,
        }
    }

    /// The installed [`RefLog`].
    pub const fn ref_log(&self) -> &L {
        &self.log
    }

    /// Bytes currently accounted for: node headers plus child-array storage.
    #[must_use]
    pub const fn bytes_used(&self) -> u64 {
        self.used
    }

    fn charge(&mut self, bytes: u64) -> Result<(), TrieError> {
        let after = self.used.saturating_add(bytes);
        if self.limit.is_some_and(|limit| after > limit) {
            return Err(TrieError::AllocationFailure { requested: bytes });
        }
        self.used = after;
        Ok(())
    }

    fn index(node_ref: NodeRef) -> usize {
        // references are slab indices offset by one; 0 is the null reference
        (node_ref.get() - 1) as usize
    }

    fn node_ref(index: usize) -> NodeRef {
        NonZeroU64::new(index as u64 + 1).expect("index + 1 is nonzero")
    }
}

impl<L: RefLog> Arena for MemArena<L> {
    fn allocate_node(&mut self, node: RadixNode) -> Result<NodeRef, TrieError> {
        self.charge(NODE_BYTES)?;
        let index = match self.free_list.pop() {
            Some(index) => {
                self.slab[index] = Some(node);
                index
            }
            None => {
                self.slab.push(Some(node));
                self.slab.len() - 1
            }
        };
        let node_ref = Self::node_ref(index);
        trace!("allocated node {node_ref:#x} ({NODE_BYTES} bytes)");
        Ok(node_ref)
    }

    fn delete_node(&mut self, node_ref: NodeRef) {
        let index = Self::index(node_ref);
        let node = self.slab[index].take().expect("deleting a live reference");
        // the node's remaining array storage goes back with it
        let bytes = NODE_BYTES + node.children().layout_bytes();
        self.used = self.used.saturating_sub(bytes);
        self.free_list.push(index);
        trace!("freed node {node_ref:#x} ({bytes} bytes)");
    }

    fn node(&self, node_ref: NodeRef) -> &RadixNode {
        self.slab[Self::index(node_ref)]
            .as_ref()
            .expect("resolving a live reference")
    }

    fn node_mut(&mut self, node_ref: NodeRef) -> &mut RadixNode {
        self.slab[Self::index(node_ref)]
            .as_mut()
            .expect("resolving a live reference")
    }

    fn node_and_log(&mut self, node_ref: NodeRef) -> (&mut RadixNode, &mut dyn RefLog) {
        let node = self.slab[Self::index(node_ref)]
            .as_mut()
            .expect("resolving a live reference");
        (node, &mut self.log)
    }

    fn log(&mut self) -> &mut dyn RefLog {
        &mut self.log
    }

    fn reserve(&mut self, bytes: u64) -> Result<(), TrieError> {
        self.charge(bytes)?;
        trace!("reserved {bytes} bytes ({} in use)", self.used);
        Ok(())
    }

    fn release(&mut self, bytes: u64) {
        self.used = self.used.saturating_sub(bytes);
        trace!("released {bytes} bytes ({} in use)", self.used);
    }

    fn root(&self) -> Option<NodeRef> {
        self.root
    }

    fn set_root(&mut self, root: Option<NodeRef>) {
        let mut field = self.root;
        write_node_ref(&mut field, RefSlot::Root, root, &mut self.log);
        self.root = field;
    }
}
