//! Declarative flag definitions and their resolution into a [`FlagMap`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::map::normalize_name;
use crate::{FlagError, FlagMap, FlagResult};

/// One declared flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagEntry {
    /// Name only; receives the next free power of two.
    Auto(String),
    /// Name with an explicit single-bit value.
    Named { name: String, bit: u64 },
}

impl FlagEntry {
    pub fn name(&self) -> &str {
        match self {
            FlagEntry::Auto(name) | FlagEntry::Named { name, .. } => name,
        }
    }
}

/// Ordered list of flag declarations for one record type.
///
/// Explicit and auto-numbered entries may be mixed. Auto-numbered entries
/// take powers of two from `1` upward, skipping any bit claimed by an
/// explicit entry anywhere in the list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagDefinition {
    entries: Vec<FlagEntry>,
}

impl FlagDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Definition made only of auto-numbered names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names.into_iter().map(|n| FlagEntry::Auto(n.into())).collect(),
        }
    }

    /// Add a flag with an explicit bit value.
    pub fn named(mut self, name: impl Into<String>, bit: u64) -> Self {
        self.entries.push(FlagEntry::Named {
            name: name.into(),
            bit,
        });
        self
    }

    /// Add an auto-numbered flag.
    pub fn auto(mut self, name: impl Into<String>) -> Self {
        self.entries.push(FlagEntry::Auto(name.into()));
        self
    }

    pub fn push(&mut self, entry: FlagEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FlagEntry] {
        &self.entries
    }

    /// Resolve into a name to bit map.
    ///
    /// Explicit values are validated first so that auto-numbering can skip
    /// every claimed bit, then entries are emitted in declaration order.
    pub fn resolve(&self) -> FlagResult<FlagMap> {
        let mut claimed = 0u64;
        for entry in &self.entries {
            if let FlagEntry::Named { name, bit } = entry {
                if !is_power_of_two(*bit) {
                    return Err(FlagError::NotPowerOfTwo {
                        name: normalize_name(name),
                        value: *bit,
                    });
                }
                if claimed & bit != 0 {
                    return Err(FlagError::DuplicateBit {
                        name: normalize_name(name),
                        value: *bit,
                    });
                }
                claimed |= bit;
            }
        }

        let mut next_index = 0u32;
        let mut seen = HashSet::new();
        let mut pairs = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let name = normalize_name(entry.name());
            let bit = match entry {
                FlagEntry::Named { bit, .. } => *bit,
                FlagEntry::Auto(_) => next_free_bit(&mut next_index, claimed)
                    .ok_or_else(|| FlagError::TooManyFlags(name.clone()))?,
            };
            if !seen.insert(name.clone()) {
                return Err(FlagError::DuplicateFlag(name));
            }
            pairs.push((name, bit));
        }

        tracing::debug!("Resolved {} flags", pairs.len());
        Ok(FlagMap::from_pairs(pairs))
    }
}

impl<S: Into<String>> FromIterator<S> for FlagDefinition {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_names(iter)
    }
}

fn is_power_of_two(value: u64) -> bool {
    value != 0 && value & (value - 1) == 0
}

// Auto-assigned bits are never reused because the index only moves forward.
fn next_free_bit(index: &mut u32, claimed: u64) -> Option<u64> {
    while *index < u64::BITS {
        let bit = 1u64 << *index;
        *index += 1;
        if claimed & bit == 0 {
            return Some(bit);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn auto_numbering_starts_at_one() {
        let map = FlagDefinition::from_names(["a", "b", "c"]).resolve().unwrap();
        let pairs: Vec<(&str, u64)> = map.iter().collect();
        assert_eq!(pairs, vec![("a", 1), ("b", 2), ("c", 4)]);
    }

    #[test]
    fn auto_numbering_skips_explicit_bits_declared_later() {
        let map = FlagDefinition::new()
            .auto("first")
            .auto("second")
            .named("pinned", 2)
            .named("hidden", 4)
            .resolve()
            .unwrap();
        assert_eq!(map.bit("first"), Some(1));
        assert_eq!(map.bit("second"), Some(8));
        assert_eq!(map.bit("pinned"), Some(2));
        assert_eq!(map.bit("hidden"), Some(4));
        let order: Vec<&str> = map.names().collect();
        assert_eq!(order, vec!["first", "second", "pinned", "hidden"]);
    }

    #[test]
    fn names_are_normalized() {
        let map = FlagDefinition::new()
            .named("  Active ", 1)
            .auto("EMAIL_Verified")
            .resolve()
            .unwrap();
        let order: Vec<&str> = map.names().collect();
        assert_eq!(order, vec!["active", "email_verified"]);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(6)]
    #[case(u64::MAX)]
    fn rejects_non_power_of_two(#[case] value: u64) {
        let err = FlagDefinition::new()
            .named("broken", value)
            .resolve()
            .unwrap_err();
        assert_eq!(
            err,
            FlagError::NotPowerOfTwo {
                name: "broken".to_string(),
                value
            }
        );
    }

    #[test]
    fn accepts_highest_bit() {
        let map = FlagDefinition::new().named("top", 1 << 63).resolve().unwrap();
        assert_eq!(map.bit("top"), Some(1 << 63));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = FlagDefinition::new()
            .named("active", 1)
            .auto("ACTIVE")
            .resolve()
            .unwrap_err();
        assert_eq!(err, FlagError::DuplicateFlag("active".to_string()));
    }

    #[test]
    fn rejects_shared_explicit_bit() {
        let err = FlagDefinition::new()
            .named("a", 4)
            .named("b", 4)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, FlagError::DuplicateBit { value: 4, .. }));
    }

    #[test]
    fn runs_out_of_bits() {
        let names: Vec<String> = (0..65).map(|i| format!("f{i}")).collect();
        let err = FlagDefinition::from_names(names).resolve().unwrap_err();
        assert_eq!(err, FlagError::TooManyFlags("f64".to_string()));
    }

    #[test]
    fn resolution_is_idempotent() {
        let def = FlagDefinition::new().auto("x").named("y", 1).auto("z");
        assert_eq!(def.resolve().unwrap(), def.resolve().unwrap());
    }
}
