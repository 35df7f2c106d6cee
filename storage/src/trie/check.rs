// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Structural verification of a trie: every invariant the mutation paths
//! promise to maintain, checked by brute force. Cheap enough to run after
//! every operation in tests.

use crate::arena::Arena;
use crate::NodeRef;

use super::RadixTrie;

/// A violated structural invariant, naming the offending node.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CheckError {
    /// A window extends past the end of the byte alphabet.
    #[error("node {node:#x}: window offset {offset} + length {len} exceeds 256")]
    WindowOutOfRange {
        /// The node owning the window
        node: NodeRef,
        /// Byte value of the first slot
        offset: u8,
        /// Window length
        len: u16,
    },

    /// A non-root node carries no element and fewer than two children; it
    /// should have been merged or released.
    #[error("node {node:#x}: elementless non-root node with {children} children")]
    TransientNode {
        /// The mergeable node
        node: NodeRef,
        /// Its child count
        children: usize,
    },

    /// Slot capacity more than twice the occupied span, or a window with a
    /// vacant end.
    #[error("node {node:#x}: {cap} slots allocated for an occupied span of {span}")]
    OversizedArray {
        /// The node owning the array
        node: NodeRef,
        /// Allocated slots
        cap: u16,
        /// Distance from first to last occupied slot, inclusive
        span: u16,
    },

    /// String capacity more than twice the longest stored suffix.
    #[error("node {node:#x}: string capacity {str_cap} for a longest suffix of {longest}")]
    OversizedStrings {
        /// The node owning the array
        node: NodeRef,
        /// Shared per-slot suffix capacity
        str_cap: u16,
        /// Longest stored suffix
        longest: u16,
    },

    /// A child's parent back-reference does not point at the edge that owns
    /// it.
    #[error("node {node:#x}: parent back-reference does not match its edge")]
    BadParent {
        /// The child with the stale back-reference
        node: NodeRef,
    },

    /// The root carries a parent back-reference.
    #[error("root {node:#x} has a parent back-reference")]
    RootParent {
        /// The root node
        node: NodeRef,
    },

    /// Reachable elements disagree with the recorded count.
    #[error("element count is {expected} but {found} elements are reachable")]
    BadCount {
        /// The recorded count
        expected: u64,
        /// Elements found by walking the tree
        found: u64,
    },
}

impl<A: Arena> RadixTrie<A> {
    /// Walk the whole tree and verify every structural invariant.
    ///
    /// # Errors
    ///
    /// The first [`CheckError`] encountered.
    pub fn check(&self) -> Result<(), CheckError> {
        let Some(root) = self.arena().root() else {
            return if self.len() == 0 {
                Ok(())
            } else {
                Err(CheckError::BadCount {
                    expected: self.len(),
                    found: 0,
                })
            };
        };
        if self.arena().node(root).parent().is_some() {
            return Err(CheckError::RootParent { node: root });
        }

        let mut found = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let current = self.arena().node(node);
            let children = current.children();

            if u16::from(children.offset()).saturating_add(children.len()) > 256 {
                return Err(CheckError::WindowOutOfRange {
                    node,
                    offset: children.offset(),
                    len: children.len(),
                });
            }

            let count = children.child_count();
            if current.element().is_some() {
                found += 1;
            } else if node != root && count < 2 {
                return Err(CheckError::TransientNode {
                    node,
                    children: count,
                });
            }

            if count == 0 {
                if children.cap() != 0 {
                    return Err(CheckError::OversizedArray {
                        node,
                        cap: children.cap(),
                        span: 0,
                    });
                }
            } else {
                let first = children.first_present().unwrap_or(children.offset());
                let last = children.last_present().unwrap_or(children.offset());
                let span = u16::from(last) - u16::from(first) + 1;
                if children.len() != span || children.cap() > span.saturating_mul(2) {
                    return Err(CheckError::OversizedArray {
                        node,
                        cap: children.cap(),
                        span,
                    });
                }
                let longest = children
                    .iter_present()
                    .map(|(byte, _)| children.suffix(byte).len() as u16)
                    .max()
                    .unwrap_or(0);
                if children.str_cap() > longest.saturating_mul(2) {
                    return Err(CheckError::OversizedStrings {
                        node,
                        str_cap: children.str_cap(),
                        longest,
                    });
                }
            }

            for (byte, child) in children.iter_present() {
                match self.arena().node(child).parent() {
                    Some((parent, index))
                        if parent == node
                            && u16::from(children.offset()) + u16::from(index)
                                == u16::from(byte) => {}
                    _ => return Err(CheckError::BadParent { node: child }),
                }
                stack.push(child);
            }
        }

        if found == self.len() {
            Ok(())
        } else {
            Err(CheckError::BadCount {
                expected: self.len(),
                found,
            })
        }
    }
}
