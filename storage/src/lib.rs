// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]
#![deny(unsafe_code)]

//! # `zonedb-storage` implements an order-preserving radix trie on top of an [`Arena`]
//!
//! Nodes are stored at a [`NodeRef`] within an [`Arena`]. References are
//! relative: the arena resolves them to transient borrows that are never
//! retained across an operation boundary, so a backing store may be unmapped
//! and remapped at a different base address between operations.
//!
//! Every overwrite of a stored reference field goes through a single write
//! primitive which reports the change to the arena's [`RefLog`], the seam a
//! relocating or persisted arena uses to keep its bookkeeping current.
//!
//! The [`RadixTrie`] maps variable-length binary keys (canonicalized domain
//! names, produced by the `zonedb` crate) to opaque [`ElementRef`] records in
//! strict byte-lexicographic order, supporting exact search, predecessor
//! search and ordered traversal in both directions.

use std::fmt::{Formatter, LowerHex, Result as FmtResult};

mod arena;
mod node;
mod trie;

/// Logger module for handling logging functionality
pub mod logger;

pub use arena::{Arena, ElementRef, MemArena, NodeRef, NoopLog, RefLog};
pub use node::RadixNode;
pub use node::children::ChildArray;
pub use trie::{CheckError, Iter, IterDesc, Predecessor, RadixTrie};

/// Errors returned by mutating trie operations.
///
/// Absent keys are not errors: searches and predecessor probes report them
/// as `None`, and deleting an element twice is a no-op.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrieError {
    /// The arena could not satisfy an allocation. Structural edits committed
    /// before the failing allocation remain in place; the tree stays correct
    /// but may be under-compacted.
    #[error("arena exhausted while allocating {requested} bytes")]
    AllocationFailure {
        /// The size of the allocation that failed
        requested: u64,
    },

    /// An insert found an exact node already carrying an element. Nothing
    /// was mutated.
    #[error("key is already present in the trie")]
    DuplicateKey,
}

/// This enum identifies a stored node-reference field inside the arena.
///
/// A [`RefLog`] receives one of these with every reference overwrite so the
/// backing store knows exactly which field changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefSlot {
    /// The root reference held by the arena header
    Root,
    /// The weak parent back-reference of the given node
    Parent(NodeRef),
    /// The child reference of the given node's edge for the given selector byte
    Child(NodeRef, u8),
}

impl LowerHex for RefSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RefSlot::Root => f.write_str("Root"),
            RefSlot::Parent(node) => {
                f.write_str("Parent@")?;
                LowerHex::fmt(node, f)
            }
            RefSlot::Child(node, byte) => {
                f.write_str("Child@")?;
                LowerHex::fmt(node, f)?;
                f.write_fmt(format_args!("[{byte:#04x}]"))
            }
        }
    }
}
