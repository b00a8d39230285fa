//! Opaque handles for open sites, partitions and CRTCs.
//!
//! Backends assign these; the core treats them as opaque and only hands them
//! back to the backend that issued them.

use std::collections::HashMap;
use std::fmt;

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

handle_id!(
    /// An open site.
    SiteId
);
handle_id!(
    /// An open partition.
    PartitionId
);
handle_id!(
    /// An open CRTC.
    CrtcId
);

/// Id → state store with monotonically increasing ids.
///
/// Ids are never reused within one arena, so a stale handle can only miss.
pub struct HandleArena<I, T> {
    next: u64,
    entries: HashMap<I, T>,
}

impl<I, T> HandleArena<I, T>
where
    I: From<u64> + Copy + Eq + std::hash::Hash,
{
    pub fn new() -> Self {
        Self {
            next: 1,
            entries: HashMap::new(),
        }
    }

    /// Store `state` and return its new id.
    pub fn insert(&mut self, state: T) -> I {
        let id = I::from(self.next);
        self.next += 1;
        self.entries.insert(id, state);
        id
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: I) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<I, T> Default for HandleArena<I, T>
where
    I: From<u64> + Copy + Eq + std::hash::Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I: fmt::Debug, T> fmt::Debug for HandleArena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleArena")
            .field("next", &self.next)
            .field("open", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_not_reused() {
        let mut arena: HandleArena<CrtcId, &str> = HandleArena::new();
        let first = arena.insert("a");
        assert_eq!(arena.remove(first), Some("a"));
        let second = arena.insert("b");
        assert_ne!(first, second);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"b"));
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", SiteId(7)), "SiteId(7)");
    }
}
