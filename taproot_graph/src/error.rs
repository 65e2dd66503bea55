// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use core::fmt;

use taproot_heap::{NameId, ObjectId};

/// Error returned when registering a reference-type override on a sealed
/// meta record.
///
/// Sealing freezes an object's override map so it can be shared across
/// objects of the same shape. Reconfiguring shared metadata after sharing
/// has occurred is a programming mistake in the host layer, so the failure
/// is surfaced as a first-class result rather than applied partially.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedMetaError {
    /// The object whose meta record is sealed.
    pub object: ObjectId,
    /// The property the caller tried to override.
    pub property: NameId,
}

impl fmt::Debug for SealedMetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SealedMetaError {{ object: {:?}, property: {:?} }}",
            self.object, self.property
        )
    }
}

impl fmt::Display for SealedMetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot register a reference type for {:?} on {:?}: meta record is sealed",
            self.property, self.object
        )
    }
}

impl core::error::Error for SealedMetaError {}
