// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Canonical binary keys for domain names.
//!
//! A name is encoded as its labels in reversed order, lowercased, joined by
//! a zero byte: `www.example.org` becomes `org\0example\0www`. Reversing
//! puts a parent before every name under it, and the zero separator sorts
//! before any label byte, so byte-lexicographic order over keys equals
//! canonical DNS order over names.

/// Label separator inside an encoded key; sorts before every label byte.
const SEPARATOR: u8 = 0;

/// Longest permitted label, in bytes.
pub const MAX_LABEL_LEN: usize = 63;

/// Longest permitted encoded name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// A domain name that cannot be canonically encoded.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NameError {
    /// A label between two dots is empty.
    #[error("empty label")]
    EmptyLabel,

    /// A label exceeds [`MAX_LABEL_LEN`] bytes.
    #[error("label is {len} bytes, limit {MAX_LABEL_LEN}")]
    LabelTooLong {
        /// Length of the offending label
        len: usize,
    },

    /// The encoded name exceeds [`MAX_NAME_LEN`] bytes.
    #[error("encoded name is {len} bytes, limit {MAX_NAME_LEN}")]
    NameTooLong {
        /// Length of the full encoding
        len: usize,
    },

    /// A label contains a byte outside the printable ASCII range, or a dot.
    #[error("invalid byte {byte:#04x} in label")]
    InvalidByte {
        /// The offending byte
        byte: u8,
    },
}

/// Encode `name` into its canonical ordered key.
///
/// Uppercase ASCII is folded to lowercase; a single trailing dot is
/// accepted and ignored. The empty name (or `"."`) encodes to the empty
/// key, which sorts before every other name.
///
/// # Errors
///
/// [`NameError`] when a label is empty, a label or the whole encoding is
/// too long, or a label holds a byte outside printable ASCII.
pub fn encode_name(name: &str) -> Result<Vec<u8>, NameError> {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() {
        return Ok(Vec::new());
    }

    let mut key = Vec::with_capacity(name.len());
    for label in name.split('.').rev() {
        if label.is_empty() {
            return Err(NameError::EmptyLabel);
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(NameError::LabelTooLong { len: label.len() });
        }
        if !key.is_empty() {
            key.push(SEPARATOR);
        }
        for &byte in label.as_bytes() {
            if !byte.is_ascii_graphic() || byte == b'.' {
                return Err(NameError::InvalidByte { byte });
            }
            key.push(byte.to_ascii_lowercase());
        }
    }
    if key.len() > MAX_NAME_LEN {
        return Err(NameError::NameTooLong { len: key.len() });
    }
    Ok(key)
}

/// Decode a canonical key back into dotted text. The inverse of
/// [`encode_name`] for every key it produces.
#[must_use]
pub fn decode_name(key: &[u8]) -> String {
    let mut name = String::with_capacity(key.len());
    for label in key.split(|&byte| byte == SEPARATOR).rev() {
        if !name.is_empty() {
            name.push('.');
        }
        for &byte in label {
            // encoded labels are printable ASCII by construction
            name.push(char::from(byte));
        }
    }
    name
}
