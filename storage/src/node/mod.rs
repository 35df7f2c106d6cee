// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! A node of the radix trie.
//!
//! A node may or may not carry an element, and owns its fan-out array. The
//! parent back-reference is lookup-only: ownership flows strictly downward,
//! from a node's array to its children, so there is no reference cycle.

pub mod children;

use crate::arena::{RefLog, write_element_ref, write_node_ref};
use crate::{ElementRef, NodeRef, RefSlot};

use children::ChildArray;

/// One trie node: optional element, weak parent back-reference plus the
/// node's index within the parent's window, and the owned fan-out array.
///
/// The element and parent fields are stored references; they are only ever
/// overwritten through [`RadixNode::set_element`] and
/// [`RadixNode::set_parent`], which report to the arena's [`RefLog`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RadixNode {
    element: Option<ElementRef>,
    parent: Option<NodeRef>,
    parent_index: u8,
    children: ChildArray,
}

impl RadixNode {
    /// A detached node: no element, no parent, empty array.
    #[must_use]
    pub fn new() -> Self {
        Self {
            element: None,
            parent: None,
            parent_index: 0,
            children: ChildArray::new(),
        }
    }

    /// The element carried by this node, if any.
    #[must_use]
    pub const fn element(&self) -> Option<ElementRef> {
        self.element
    }

    /// The parent back-reference and this node's window index within the
    /// parent's array. `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<(NodeRef, u8)> {
        match self.parent {
            Some(parent) => Some((parent, self.parent_index)),
            None => None,
        }
    }

    /// The fan-out array.
    #[must_use]
    pub const fn children(&self) -> &ChildArray {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut ChildArray {
        &mut self.children
    }

    /// Overwrite the element reference of the node at `self_ref`.
    pub(crate) fn set_element(
        &mut self,
        self_ref: NodeRef,
        element: Option<ElementRef>,
        log: &mut dyn RefLog,
    ) {
        write_element_ref(&mut self.element, self_ref, element, log);
    }

    /// Overwrite the parent back-reference of the node at `self_ref`.
    pub(crate) fn set_parent(
        &mut self,
        self_ref: NodeRef,
        parent: Option<(NodeRef, u8)>,
        log: &mut dyn RefLog,
    ) {
        let (parent, index) = match parent {
            Some((parent, index)) => (Some(parent), index),
            None => (None, 0),
        };
        write_node_ref(&mut self.parent, RefSlot::Parent(self_ref), parent, log);
        self.parent_index = index;
    }

    /// Update only the recorded window index; the index is plain data, so
    /// no log is involved. Used when a window reshape shifts slots.
    pub(crate) fn set_parent_index(&mut self, index: u8) {
        self.parent_index = index;
    }
}
