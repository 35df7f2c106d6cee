// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The zone → domain → rrset → rr hierarchy.
//!
//! One trie per zone maps encoded names to domain records held in a slab;
//! the trie's element references are slab handles. Rrsets within a domain
//! stay sorted by record type, records within an rrset are unordered.

use std::num::NonZeroU64;

use zonedb_storage::{ElementRef, MemArena, RadixTrie, TrieError};

use crate::name::{decode_name, encode_name, NameError};

/// Errors from zone mutations.
///
/// Absent names, rrsets or records are not errors; lookups return `None`
/// and deletions report `false`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ZoneError {
    /// The domain name cannot be canonically encoded.
    #[error(transparent)]
    Name(#[from] NameError),

    /// The underlying trie failed, which for a zone means storage
    /// exhaustion.
    #[error(transparent)]
    Storage(#[from] TrieError),
}

/// A single resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rr {
    /// Record class (IN for almost everything)
    pub class: u16,
    /// Time to live, in seconds
    pub ttl: u32,
    /// Raw record data
    pub rdata: Vec<u8>,
}

/// All records of one type under one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rrset {
    /// Record type (A, NS, TXT, ...)
    pub rtype: u16,
    /// The records, in insertion order
    pub rrs: Vec<Rr>,
}

/// Everything stored under one name: its rrsets, sorted by type.
#[derive(Debug, Default)]
struct Domain {
    rrsets: Vec<Rrset>,
}

/// An in-memory DNS zone.
///
/// Names live in an order-preserving trie, so [`Zone::names`] yields them
/// in canonical DNS order. Emptied levels are cleaned up eagerly: deleting
/// the last record of the last rrset of a domain removes the domain from
/// the trie and frees its slab entry.
#[derive(Debug)]
pub struct Zone {
    trie: RadixTrie<MemArena>,
    domains: Vec<Option<Domain>>,
    free: Vec<usize>,
}

impl Default for Zone {
    fn default() -> Self {
        Self::new()
    }
}

impl Zone {
    /// Create an empty zone.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trie: RadixTrie::new(MemArena::new()),
            domains: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of names currently holding at least one record.
    #[must_use]
    pub fn domain_count(&self) -> u64 {
        self.trie.len()
    }

    /// Whether the zone holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    fn domain_ref(index: usize) -> ElementRef {
        NonZeroU64::new(index as u64 + 1).expect("index + 1 is nonzero")
    }

    fn domain_index(element: ElementRef) -> usize {
        (element.get() - 1) as usize
    }

    fn domain(&self, element: ElementRef) -> &Domain {
        self.domains[Self::domain_index(element)]
            .as_ref()
            .expect("trie elements reference live domains")
    }

    /// Add one record, creating the domain and rrset as needed.
    ///
    /// Re-adding a record with the same class and rdata refreshes its ttl
    /// instead of duplicating it.
    ///
    /// # Errors
    ///
    /// [`ZoneError::Name`] for an unencodable name, [`ZoneError::Storage`]
    /// when the trie's arena is exhausted (the zone is unchanged).
    pub fn add_rr(
        &mut self,
        name: &str,
        rtype: u16,
        class: u16,
        ttl: u32,
        rdata: &[u8],
    ) -> Result<(), ZoneError> {
        let key = encode_name(name)?;
        let element = match self.trie.search(&key) {
            Some(node) => self
                .trie
                .element(node)
                .expect("search returns element nodes"),
            None => {
                let index = match self.free.pop() {
                    Some(index) => {
                        self.domains[index] = Some(Domain::default());
                        index
                    }
                    None => {
                        self.domains.push(Some(Domain::default()));
                        self.domains.len() - 1
                    }
                };
                let element = Self::domain_ref(index);
                if let Err(e) = self.trie.insert(&key, element) {
                    self.domains[index] = None;
                    self.free.push(index);
                    return Err(e.into());
                }
                element
            }
        };

        let domain = self.domains[Self::domain_index(element)]
            .as_mut()
            .expect("trie elements reference live domains");
        let rrset = match domain
            .rrsets
            .binary_search_by_key(&rtype, |rrset| rrset.rtype)
        {
            Ok(at) => &mut domain.rrsets[at],
            Err(at) => {
                domain.rrsets.insert(
                    at,
                    Rrset {
                        rtype,
                        rrs: Vec::new(),
                    },
                );
                &mut domain.rrsets[at]
            }
        };
        match rrset
            .rrs
            .iter_mut()
            .find(|rr| rr.class == class && rr.rdata == rdata)
        {
            Some(rr) => rr.ttl = ttl,
            None => rrset.rrs.push(Rr {
                class,
                ttl,
                rdata: rdata.to_vec(),
            }),
        }
        Ok(())
    }

    /// Delete the record under `name` with the given type and rdata.
    ///
    /// Returns whether a record was removed. Any level left empty is
    /// dropped: the rrset, and then the domain itself.
    ///
    /// # Errors
    ///
    /// [`ZoneError::Name`] for an unencodable name.
    pub fn delete_rr(&mut self, name: &str, rtype: u16, rdata: &[u8]) -> Result<bool, ZoneError> {
        let key = encode_name(name)?;
        let Some(node) = self.trie.search(&key) else {
            return Ok(false);
        };
        let element = self
            .trie
            .element(node)
            .expect("search returns element nodes");
        let index = Self::domain_index(element);
        let domain = self.domains[index]
            .as_mut()
            .expect("trie elements reference live domains");

        let Ok(set_at) = domain
            .rrsets
            .binary_search_by_key(&rtype, |rrset| rrset.rtype)
        else {
            return Ok(false);
        };
        let rrset = &mut domain.rrsets[set_at];
        let Some(rr_at) = rrset.rrs.iter().position(|rr| rr.rdata == rdata) else {
            return Ok(false);
        };

        rrset.rrs.remove(rr_at);
        if rrset.rrs.is_empty() {
            domain.rrsets.remove(set_at);
        }
        if domain.rrsets.is_empty() {
            self.trie.delete(node);
            self.domains[index] = None;
            self.free.push(index);
        }
        Ok(true)
    }

    /// The rrset of the given type under `name`, if present.
    ///
    /// # Errors
    ///
    /// [`NameError`] for an unencodable name.
    pub fn find_rrset(&self, name: &str, rtype: u16) -> Result<Option<&Rrset>, NameError> {
        let key = encode_name(name)?;
        let Some(node) = self.trie.search(&key) else {
            return Ok(None);
        };
        let domain = self.domain(
            self.trie
                .element(node)
                .expect("search returns element nodes"),
        );
        Ok(domain
            .rrsets
            .binary_search_by_key(&rtype, |rrset| rrset.rtype)
            .ok()
            .map(|at| &domain.rrsets[at]))
    }

    /// All rrsets under `name`, sorted by type.
    ///
    /// # Errors
    ///
    /// [`NameError`] for an unencodable name.
    pub fn find_domain(&self, name: &str) -> Result<Option<&[Rrset]>, NameError> {
        let key = encode_name(name)?;
        Ok(self.trie.search(&key).map(|node| {
            let domain = self.domain(
                self.trie
                    .element(node)
                    .expect("search returns element nodes"),
            );
            domain.rrsets.as_slice()
        }))
    }

    /// Stored names in canonical DNS order.
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.trie.iter().map(|(key, _)| decode_name(&key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const A: u16 = 1;
    const IN: u16 = 1;

    #[test]
    fn slab_entries_recycle() {
        let mut zone = Zone::new();
        zone.add_rr("a.example.org", A, IN, 60, &[1, 1, 1, 1]).unwrap();
        zone.delete_rr("a.example.org", A, &[1, 1, 1, 1]).unwrap();
        zone.add_rr("b.example.org", A, IN, 60, &[2, 2, 2, 2]).unwrap();

        // the freed domain slot was reused
        assert_eq!(zone.domains.len(), 1);
        assert_eq!(zone.domain_count(), 1);
    }
}
