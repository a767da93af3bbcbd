//! Interned identifiers.
//!
//! Declaration, parameter and protocol names are interned once per module
//! and compared as 32-bit handles.

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Interned string identifier.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

struct InternTable {
    map: FxHashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

/// String interner with `&self` interning.
///
/// Strings are leaked on insertion so lookups can hand out `&'static str`
/// without holding the lock.
pub struct StringInterner {
    table: RwLock<InternTable>,
}

impl StringInterner {
    pub fn new() -> Self {
        let empty: &'static str = "";
        let mut map = FxHashMap::default();
        map.insert(empty, Name::EMPTY);
        Self {
            table: RwLock::new(InternTable {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its Name.
    pub fn intern(&self, s: &str) -> Name {
        {
            let guard = self.table.read();
            if let Some(&name) = guard.map.get(s) {
                return name;
            }
        }

        let mut guard = self.table.write();
        // Double-check after acquiring write lock
        if let Some(&name) = guard.map.get(s) {
            return name;
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let raw = u32::try_from(guard.strings.len())
            .unwrap_or_else(|_| panic!("interner exceeded u32::MAX strings"));
        let name = Name(raw);
        guard.strings.push(leaked);
        guard.map.insert(leaked, name);
        name
    }

    /// Look up the string for a Name.
    ///
    /// Names from another interner resolve to the empty string.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table
            .read()
            .strings
            .get(name.0 as usize)
            .copied()
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        // The empty string is always present.
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("Point");
        let b = interner.intern("Point");
        let c = interner.intern("Line");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.lookup(a), "Point");
        assert_eq!(interner.lookup(c), "Line");
    }

    #[test]
    fn empty_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn foreign_name_resolves_to_empty() {
        let interner = StringInterner::new();
        assert_eq!(interner.lookup(Name::from_raw(999)), "");
    }
}
