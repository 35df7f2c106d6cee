// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Ordered traversal over a trie, built on `next`/`prev`.

use crate::arena::Arena;
use crate::ElementRef;
use crate::NodeRef;

use super::RadixTrie;

/// Ascending iterator over `(key, element)` pairs.
#[derive(Debug)]
pub struct Iter<'a, A> {
    trie: &'a RadixTrie<A>,
    cursor: Option<NodeRef>,
}

impl<A: Arena> Iterator for Iter<'_, A> {
    type Item = (Vec<u8>, ElementRef);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.cursor = self.trie.next(node);
        let element = self.trie.element(node).expect("cursor visits element nodes");
        Some((self.trie.key(node), element))
    }
}

/// Descending iterator over `(key, element)` pairs.
#[derive(Debug)]
pub struct IterDesc<'a, A> {
    trie: &'a RadixTrie<A>,
    cursor: Option<NodeRef>,
}

impl<A: Arena> Iterator for IterDesc<'_, A> {
    type Item = (Vec<u8>, ElementRef);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.cursor = self.trie.prev(node);
        let element = self.trie.element(node).expect("cursor visits element nodes");
        Some((self.trie.key(node), element))
    }
}

impl<A: Arena> RadixTrie<A> {
    /// Iterate all `(key, element)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, A> {
        Iter {
            trie: self,
            cursor: self.first(),
        }
    }

    /// Iterate all `(key, element)` pairs in descending key order.
    pub fn iter_desc(&self) -> IterDesc<'_, A> {
        IterDesc {
            trie: self,
            cursor: self.last(),
        }
    }
}
