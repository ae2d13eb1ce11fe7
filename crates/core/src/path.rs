//! Helpers for slash-delimited secret addresses
//!
//! A secret address has two halves: the engine mount (`kv`) and the
//! hierarchical path below it (`infra/app1`). These helpers normalize,
//! split, and URL-encode the path half; the engine mount is a single
//! component and only needs encoding.

use crate::error::{Error, Result};

/// Normalize a secret path: trim whitespace and drop empty segments, so
/// `/infra//app1/` becomes `infra/app1`. An all-slash input normalizes
/// to the empty string (the engine root).
#[must_use]
pub fn normalize(path: &str) -> String {
    path.trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a normalized path into its parent folder and final segment.
/// Single-segment paths have no parent (their folder is the engine root).
#[must_use]
pub fn split_parent(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('/') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    }
}

/// Resolve the folder whose children a listing of `path` returns: the
/// parent folder when the path is nested, otherwise the path itself.
/// The store lists one level per call, so deeper paths are addressed
/// through the folder that contains their final segment.
#[must_use]
pub fn list_target(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => path,
    }
}

/// Reject an empty or whitespace-only address component before it turns
/// into a malformed URL.
pub fn ensure_component(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::precondition(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Percent-encode a single URL path component.
#[must_use]
pub fn encode_component(input: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        let safe = b.is_ascii_uppercase()
            || b.is_ascii_lowercase()
            || b.is_ascii_digit()
            || matches!(b, b'-' | b'_' | b'.' | b'~');
        if safe {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[usize::from(b >> 4)] as char);
            out.push(HEX[usize::from(b & 0x0F)] as char);
        }
    }
    out
}

/// Percent-encode each segment of a slash-delimited secret path.
#[must_use]
pub fn encode(path: &str) -> String {
    path.split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/")
}
