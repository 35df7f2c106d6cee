// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The arena owns every trie node and hands out relative references to them.
//!
//! A [`NodeRef`] is not a pointer. It is resolved to a borrow at the point of
//! use and never retained across an operation boundary, which is what lets a
//! backing store relocate between operations. The trie mutates stored
//! reference fields only through [`write_node_ref`] and [`write_element_ref`],
//! which report every overwrite to the arena's [`RefLog`].

pub(crate) mod memory;

pub use memory::MemArena;

use std::num::NonZeroU64;

use crate::node::RadixNode;
use crate::{RefSlot, TrieError};

/// A relative reference to a [`RadixNode`] inside an [`Arena`].
///
/// Nonzero so that `Option<NodeRef>` is free; `None` is the null reference.
pub type NodeRef = NonZeroU64;

/// An opaque relative reference to an element record owned by the caller.
///
/// The trie stores and returns these without interpreting them.
pub type ElementRef = NonZeroU64;

/// Observer for stored-reference overwrites.
///
/// A relocating or persisted arena implements this to keep its bookkeeping
/// (dirty tracking, relocation fixup tables) in sync with the tree. The
/// in-memory arena installs a no-op.
pub trait RefLog {
    /// A node-reference field identified by `slot` was overwritten.
    fn node_ref_written(&mut self, slot: RefSlot, old: Option<NodeRef>, new: Option<NodeRef>);

    /// The element reference of `node` was overwritten.
    fn element_ref_written(&mut self, node: NodeRef, old: Option<ElementRef>, new: Option<ElementRef>);
}

/// A [`RefLog`] that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLog;

impl RefLog for NoopLog {
    fn node_ref_written(&mut self, _slot: RefSlot, _old: Option<NodeRef>, _new: Option<NodeRef>) {}

    fn element_ref_written(
        &mut self,
        _node: NodeRef,
        _old: Option<ElementRef>,
        _new: Option<ElementRef>,
    ) {
    }
}

/// Backing storage for a trie: node allocation, transient resolution, byte
/// accounting for child arrays, and the root reference.
///
/// Borrows returned by [`Arena::node`] and [`Arena::node_mut`] are transient;
/// callers hold them only within a single trie operation.
pub trait Arena {
    /// Store `node` and return its reference.
    ///
    /// # Errors
    ///
    /// [`TrieError::AllocationFailure`] if the arena is exhausted. `node` is
    /// dropped in that case.
    fn allocate_node(&mut self, node: RadixNode) -> Result<NodeRef, TrieError>;

    /// Free the node at `node_ref`. The reference must be live and must not
    /// be resolved again.
    fn delete_node(&mut self, node_ref: NodeRef);

    /// Resolve `node_ref` for reading.
    fn node(&self, node_ref: NodeRef) -> &RadixNode;

    /// Resolve `node_ref` for writing.
    fn node_mut(&mut self, node_ref: NodeRef) -> &mut RadixNode;

    /// Resolve `node_ref` for writing together with the arena's [`RefLog`],
    /// as a split borrow, so reference overwrites inside the node can be
    /// reported while the node is borrowed.
    fn node_and_log(&mut self, node_ref: NodeRef) -> (&mut RadixNode, &mut dyn RefLog);

    /// The arena's [`RefLog`].
    fn log(&mut self) -> &mut dyn RefLog;

    /// Account for `bytes` of child-array storage about to be allocated.
    ///
    /// # Errors
    ///
    /// [`TrieError::AllocationFailure`] if the arena is exhausted; nothing is
    /// reserved in that case.
    fn reserve(&mut self, bytes: u64) -> Result<(), TrieError>;

    /// Return `bytes` of child-array storage to the arena.
    fn release(&mut self, bytes: u64);

    /// The root reference, or `None` for an empty tree.
    fn root(&self) -> Option<NodeRef>;

    /// Overwrite the root reference, reporting it to the [`RefLog`].
    fn set_root(&mut self, root: Option<NodeRef>);
}

/// Overwrite a stored node-reference field.
///
/// This is the only legal way to store into such a field; it reports
/// `(slot, old, new)` to the log so relocation bookkeeping stays correct.
pub(crate) fn write_node_ref(
    field: &mut Option<NodeRef>,
    slot: RefSlot,
    value: Option<NodeRef>,
    log: &mut dyn RefLog,
) {
    let old = *field;
    *field = value;
    log.node_ref_written(slot, old, value);
}

/// Overwrite a stored element-reference field. See [`write_node_ref`].
pub(crate) fn write_element_ref(
    field: &mut Option<ElementRef>,
    node: NodeRef,
    value: Option<ElementRef>,
    log: &mut dyn RefLog,
) {
    let old = *field;
    *field = value;
    log.element_ref_written(node, old, value);
}
