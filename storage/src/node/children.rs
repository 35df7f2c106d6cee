// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The fan-out array of a [`RadixNode`](crate::RadixNode).
//!
//! A node's outgoing edges live in one growable window over the byte
//! alphabet. Slot `byte - offset` carries the edge taken for `byte`: a
//! compressed suffix (up to the array's shared per-slot string capacity) and
//! a child reference. A `None` child marks a slot reserved only by capacity.
//!
//! Growth is split into a pure planning step ([`ChildArray::plan_slot`]) and
//! an applying step ([`ChildArray::apply_plan`]) so the caller can reserve
//! the byte delta with the arena first and abort cleanly on exhaustion.
//! Any relocation of slot storage clears the child references out of the old
//! storage through the reference-write primitive before writing them into
//! the new one, so the arena's bookkeeping never sees a raw copy.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::mem::size_of;

use crate::arena::{RefLog, write_node_ref};
use crate::logger::trace;
use crate::{NodeRef, RefSlot};

/// Bytes charged per slot beyond the shared string capacity: the suffix
/// length and the child reference.
const SLOT_OVERHEAD: u64 = (size_of::<u16>() + size_of::<Option<NodeRef>>()) as u64;

/// The whole byte alphabet; a window never addresses more than this.
const MAX_SLOTS: u16 = 256;

/// Storage cost of an array with `cap` slots of `str_cap` suffix bytes each.
pub(crate) const fn layout_bytes_for(cap: u16, str_cap: u16) -> u64 {
    cap as u64 * (str_cap as u64 + SLOT_OVERHEAD)
}

/// Doubling-style growth from `cap` to at least `want`, never more than
/// twice `want`, clamped to `max`. Keeps capacity within a factor of two of
/// what is actually needed.
const fn grown(cap: u16, want: u16, max: u16) -> u16 {
    if want <= cap {
        cap
    } else {
        let a = want.saturating_mul(2);
        let b = cap.saturating_mul(2);
        let doubled = if a < b { a } else { b };
        let grown = if want > doubled { want } else { doubled };
        if grown > max {
            max
        } else {
            grown
        }
    }
}

/// The target layout of a pending array reshape, computed without mutating
/// anything. `bytes()` is what the caller must reserve (growth) or may
/// release (compaction) before applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LayoutPlan {
    offset: u8,
    len: u16,
    cap: u16,
    str_cap: u16,
}

impl LayoutPlan {
    pub(crate) const fn bytes(&self) -> u64 {
        layout_bytes_for(self.cap, self.str_cap)
    }
}

/// A byte-indexed window of outgoing edges.
///
/// Slot and string capacity grow and shrink independently; both are kept
/// within a factor of two of the minimum needed.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct ChildArray {
    /// Byte value addressed by slot 0
    offset: u8,
    /// Window length; `offset + len <= 256`
    len: u16,
    /// Allocated slots, `len..cap` being spare
    cap: u16,
    /// Shared per-slot suffix capacity
    str_cap: u16,
    /// Suffix length per slot, `cap` entries
    lens: Vec<u16>,
    /// Packed suffix bytes, `cap * str_cap` entries
    strings: Vec<u8>,
    /// Child reference per slot, `cap` entries
    children: Vec<Option<NodeRef>>,
}

impl ChildArray {
    pub(crate) const fn new() -> Self {
        Self {
            offset: 0,
            len: 0,
            cap: 0,
            str_cap: 0,
            lens: Vec::new(),
            strings: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Byte value addressed by slot 0.
    #[must_use]
    pub const fn offset(&self) -> u8 {
        self.offset
    }

    /// Window length in slots, vacant ones included.
    #[must_use]
    pub const fn len(&self) -> u16 {
        self.len
    }

    /// Whether the window is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated slots.
    #[must_use]
    pub const fn cap(&self) -> u16 {
        self.cap
    }

    /// Shared per-slot suffix capacity.
    #[must_use]
    pub const fn str_cap(&self) -> u16 {
        self.str_cap
    }

    /// Current storage cost in bytes.
    #[must_use]
    pub const fn layout_bytes(&self) -> u64 {
        layout_bytes_for(self.cap, self.str_cap)
    }

    /// The window slot addressed by `byte`, if any.
    fn slot_index(&self, byte: u8) -> Option<usize> {
        let byte = u16::from(byte);
        let offset = u16::from(self.offset);
        (byte >= offset && byte < offset + self.len).then(|| (byte - offset) as usize)
    }

    fn byte_at(&self, index: usize) -> u8 {
        (u16::from(self.offset) + index as u16) as u8
    }

    /// The child reference for `byte`; `None` outside the window or for a
    /// vacant slot.
    #[must_use]
    pub fn child(&self, byte: u8) -> Option<NodeRef> {
        self.slot_index(byte).and_then(|index| self.children[index])
    }

    /// The stored suffix for `byte`. Empty outside the window.
    #[must_use]
    pub fn suffix(&self, byte: u8) -> &[u8] {
        match self.slot_index(byte) {
            Some(index) => self.suffix_at(index),
            None => &[],
        }
    }

    fn suffix_at(&self, index: usize) -> &[u8] {
        let start = index * self.str_cap as usize;
        &self.strings[start..start + self.lens[index] as usize]
    }

    /// Occupied edges in ascending byte order.
    pub fn iter_present(&self) -> impl DoubleEndedIterator<Item = (u8, NodeRef)> + '_ {
        (0..self.len as usize)
            .filter_map(move |index| self.children[index].map(|child| (self.byte_at(index), child)))
    }

    /// Number of occupied edges.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.iter_present().count()
    }

    /// The only occupied edge, if there is exactly one.
    #[must_use]
    pub fn sole_child(&self) -> Option<(u8, NodeRef)> {
        let mut present = self.iter_present();
        let first = present.next()?;
        present.next().is_none().then_some(first)
    }

    /// Lowest occupied byte.
    #[must_use]
    pub fn first_present(&self) -> Option<u8> {
        self.iter_present().next().map(|(byte, _)| byte)
    }

    /// Highest occupied byte.
    #[must_use]
    pub fn last_present(&self) -> Option<u8> {
        self.iter_present().next_back().map(|(byte, _)| byte)
    }

    /// Lowest occupied byte strictly greater than `byte`.
    #[must_use]
    pub fn present_after(&self, byte: u8) -> Option<u8> {
        self.iter_present()
            .map(|(b, _)| b)
            .find(|&b| b > byte)
    }

    /// Highest occupied byte strictly less than `byte`.
    #[must_use]
    pub fn present_before(&self, byte: u8) -> Option<u8> {
        self.iter_present()
            .map(|(b, _)| b)
            .take_while(|&b| b < byte)
            .last()
    }

    /// Plan the reshape needed before `byte` can hold an edge with a
    /// `suffix_len`-byte suffix. `None` means the slot already fits.
    ///
    /// An empty array gets exactly one slot at `offset = byte`; otherwise
    /// the window is extended to cover `byte` and slot/string capacity grows
    /// doubling-style, capped at twice what is needed.
    pub(crate) fn plan_slot(&self, byte: u8, suffix_len: u16) -> Option<LayoutPlan> {
        let (offset, len) = if self.len == 0 {
            (byte, 1)
        } else {
            let offset = self.offset.min(byte);
            let end = (u16::from(self.offset) + self.len - 1).max(u16::from(byte));
            (offset, end - u16::from(offset) + 1)
        };
        let cap = grown(self.cap, len, MAX_SLOTS);
        let str_cap = grown(self.str_cap, suffix_len, u16::MAX);

        let plan = LayoutPlan {
            offset,
            len,
            cap,
            str_cap,
        };
        (plan.offset != self.offset
            || plan.len != self.len
            || plan.cap != self.cap
            || plan.str_cap != self.str_cap)
            .then_some(plan)
    }

    /// Bytes the caller must reserve with the arena before applying `plan`.
    pub(crate) fn growth_bytes(&self, plan: &LayoutPlan) -> u64 {
        plan.bytes().saturating_sub(self.layout_bytes())
    }

    /// Apply a previously planned reshape. `owner` is the node holding this
    /// array; every moved child reference is cleared out of the old storage
    /// and rewritten through the reference-write primitive.
    pub(crate) fn apply_plan(&mut self, owner: NodeRef, plan: LayoutPlan, log: &mut dyn RefLog) {
        trace!(
            "array of {owner:#x}: offset {} len {} cap {} str {} -> offset {} len {} cap {} str {}",
            self.offset,
            self.len,
            self.cap,
            self.str_cap,
            plan.offset,
            plan.len,
            plan.cap,
            plan.str_cap
        );
        let mut lens = vec![0u16; plan.cap as usize];
        let mut strings = vec![0u8; plan.cap as usize * plan.str_cap as usize];
        let mut children = vec![None; plan.cap as usize];

        // negative when the window's leading edge moves up (compaction)
        let shift = i32::from(self.offset) - i32::from(plan.offset);
        for index in 0..self.len as usize {
            let Some(child) = self.children[index] else {
                continue;
            };
            let byte = self.byte_at(index);
            let slot = RefSlot::Child(owner, byte);
            write_node_ref(&mut self.children[index], slot, None, log);

            let moved = (index as i32 + shift) as usize;
            lens[moved] = self.lens[index];
            let start = moved * plan.str_cap as usize;
            let suffix = self.suffix_at(index);
            strings[start..start + suffix.len()].copy_from_slice(suffix);
            write_node_ref(&mut children[moved], slot, Some(child), log);
        }

        self.offset = plan.offset;
        self.len = plan.len;
        self.cap = plan.cap;
        self.str_cap = plan.str_cap;
        self.lens = lens;
        self.strings = strings;
        self.children = children;
    }

    /// Store the edge at `byte`: suffix bytes plus child reference. The slot
    /// must have been planned to fit.
    pub(crate) fn set_edge(
        &mut self,
        owner: NodeRef,
        byte: u8,
        suffix: &[u8],
        child: NodeRef,
        log: &mut dyn RefLog,
    ) {
        self.set_suffix(byte, suffix);
        let index = self.slot_index(byte).expect("slot was planned");
        write_node_ref(
            &mut self.children[index],
            RefSlot::Child(owner, byte),
            Some(child),
            log,
        );
    }

    /// Overwrite just the suffix of the slot at `byte`. Suffixes are plain
    /// data, not references, so no log is involved.
    pub(crate) fn set_suffix(&mut self, byte: u8, suffix: &[u8]) {
        let index = self.slot_index(byte).expect("slot was planned");
        debug_assert!(suffix.len() <= self.str_cap as usize);
        self.lens[index] = suffix.len() as u16;
        let start = index * self.str_cap as usize;
        self.strings[start..start + suffix.len()].copy_from_slice(suffix);
    }

    /// Clear the edge at `byte`, leaving a vacant slot. Returns the removed
    /// child reference.
    pub(crate) fn clear_edge(
        &mut self,
        owner: NodeRef,
        byte: u8,
        log: &mut dyn RefLog,
    ) -> Option<NodeRef> {
        let index = self.slot_index(byte)?;
        let old = self.children[index];
        write_node_ref(&mut self.children[index], RefSlot::Child(owner, byte), None, log);
        self.lens[index] = 0;
        old
    }

    /// Shrink the window and capacities back toward what is occupied: trim
    /// vacant slots off both ends, halve slot and string capacity once usage
    /// falls to half or less, and release everything when the array empties.
    ///
    /// Returns the number of freed bytes for the caller to release.
    pub(crate) fn compact(&mut self, owner: NodeRef, log: &mut dyn RefLog) -> u64 {
        let before = self.layout_bytes();
        let Some(first) = self.first_present() else {
            if self.cap == 0 {
                return 0;
            }
            trace!("array of {owner:#x}: emptied, releasing {before} bytes");
            *self = Self::new();
            return before;
        };
        let last = self.last_present().expect("array is non-empty");
        let span = u16::from(last) - u16::from(first) + 1;

        let longest = self
            .iter_present()
            .map(|(byte, _)| self.suffix(byte).len() as u16)
            .max()
            .unwrap_or(0);

        let cap = if span * 2 <= self.cap { span } else { self.cap };
        let str_cap = if longest * 2 <= self.str_cap {
            longest
        } else {
            self.str_cap
        };

        let plan = LayoutPlan {
            offset: first,
            len: span,
            cap,
            str_cap,
        };
        if plan.offset == self.offset
            && plan.len == self.len
            && plan.cap == self.cap
            && plan.str_cap == self.str_cap
        {
            return 0;
        }
        self.apply_plan(owner, plan, log);
        before.saturating_sub(self.layout_bytes())
    }
}

impl Debug for ChildArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut map = f.debug_map();
        for (byte, child) in self.iter_present() {
            map.entry(
                &format_args!("{byte:#04x}+{}", hex::encode(self.suffix(byte))),
                &format_args!("{child:#x}"),
            );
        }
        map.finish()
    }
}
