// Copyright 2026 the Taproot Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dynamic value model.

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use crate::handle::ObjectId;

/// A dynamic value: the unit of data flowing through the reference graph.
///
/// `Value` is deliberately small and cheap to clone: strings are
/// reference-counted and objects are handles into a [`Heap`](crate::Heap).
///
/// There is no separate "undefined": reading a missing field, a field of a
/// freed object, or a field of a non-object value all yield [`Value::Null`].
///
/// # Identity
///
/// The reference graph invalidates caches based on *identity* changes, not
/// structural equality. [`Value::identity_eq`] compares objects by handle
/// (two distinct objects with equal contents are different identities),
/// floats by bit pattern, and everything else structurally.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The absent value. Also the result of any failed read.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A double-precision float.
    Float(f64),
    /// An immutable, reference-counted string.
    Str(Arc<str>),
    /// A handle to a heap object.
    Object(ObjectId),
}

impl Value {
    /// Returns `true` if this is [`Value::Null`].
    #[must_use]
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if this is an object handle.
    #[must_use]
    #[inline]
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns the object handle, if this is an object value.
    #[must_use]
    #[inline]
    pub const fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Compares two values by identity.
    ///
    /// Object values are identical only when they are the same handle; float
    /// values compare by bit pattern (so `NaN` is identical to itself and
    /// `0.0` differs from `-0.0`); all other values compare structurally.
    #[must_use]
    pub fn identity_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Object(id) => write!(f, "{id:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Arc::from(v))
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Self::Object(v)
    }
}
