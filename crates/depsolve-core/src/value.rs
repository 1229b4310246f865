//! Caller-owned values the resolver handles without knowing their type.
//!
//! Project identities and version metadata belong to the caller. The core only
//! needs to compare, order, hash and describe them, and to release them when
//! done. [`Value`] is that capability set; any type with the right standard
//! trait implementations qualifies. [`OpaqueValue`] erases the concrete type for
//! callers that need to mix several identity types behind one handle.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Capability set required of caller-defined values.
///
/// `Eq` supplies equality, `Ord` the strict weak ordering, `Hash` hashing,
/// `Display` the human description used in diagnostics, and `Drop` release.
pub trait Value: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// Object-safe view of a [`Value`], used behind [`OpaqueValue`].
trait ErasedValue: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn value_type(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn equals(&self, other: &dyn ErasedValue) -> bool;
    fn compare(&self, other: &dyn ErasedValue) -> Ordering;
    fn hash_value(&self) -> u64;
    fn describe(&self) -> String;
    fn debug(&self) -> String;
}

impl<T: Value> ErasedValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn equals(&self, other: &dyn ErasedValue) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn compare(&self, other: &dyn ErasedValue) -> Ordering {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self.cmp(other),
            None => self.value_type().cmp(&other.value_type()),
        }
    }

    fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    fn debug(&self) -> String {
        format!("{self:?}")
    }
}

/// A type-erased, reference-counted user value.
///
/// Use it as the project type (`ProjectIdentifier<OpaqueValue>`) when one
/// resolution mixes identities of different concrete types, such as
/// registry package names next to numeric workspace member ids.
///
/// Two opaque values are equal only when they wrap the same concrete type and
/// that type's `Eq` says so. Values of different types order by type identity,
/// which is stable within one process. The wrapped value is dropped exactly
/// once, when the last clone goes away.
#[derive(Clone)]
pub struct OpaqueValue {
    inner: Arc<dyn ErasedValue>,
}

impl OpaqueValue {
    pub fn new<T: Value>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Borrow the wrapped value if it is a `T`.
    pub fn downcast_ref<T: Value>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Value>(&self) -> bool {
        self.inner.value_type() == TypeId::of::<T>()
    }

    /// Human-readable description of the wrapped value.
    pub fn describe(&self) -> String {
        self.inner.describe()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        self.inner.equals(other.inner.as_ref())
    }
}

impl Eq for OpaqueValue {}

impl PartialOrd for OpaqueValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpaqueValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.compare(other.inner.as_ref())
    }
}

impl Hash for OpaqueValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.value_type().hash(state);
        state.write_u64(self.inner.hash_value());
    }
}

impl fmt::Display for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.describe())
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueValue<{}>({})", self.inner.type_name(), self.inner.debug())
    }
}
