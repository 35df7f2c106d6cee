// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]
#![deny(unsafe_code)]

//! # zonedb is an embedded DNS zone store
//!
//! A [`Zone`] keeps its domains in one order-preserving radix trie from
//! [`zonedb_storage`], keyed by the canonical binary encoding of each domain
//! name, so iteration yields names in canonical DNS order and the zone apex
//! sorts before everything under it. Each domain owns its rrsets (keyed by
//! record type), and each rrset owns its records.
//!
//! [`Zone::add_rr`] and [`Zone::delete_rr`] work find-or-create / find /
//! delete at each of the three levels, and deletion eagerly drops any level
//! left empty, so an emptied domain disappears from the trie at once.

pub mod name;
pub mod zone;

pub use name::{decode_name, encode_name, NameError};
pub use zone::{Rr, Rrset, Zone, ZoneError};
