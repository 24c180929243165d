//! Resolved flag map: normalized name to single-bit mask, in declaration order.

use std::collections::HashMap;

use crate::{FlagError, FlagResult};

/// Normalize a flag name or token: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Split flag text on commas and whitespace, dropping empty tokens.
pub fn split_flag_text(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

/// The resolved form of a [`FlagDefinition`](crate::FlagDefinition).
///
/// Every value is a power of two and no two names share a bit. Iteration
/// follows declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagMap {
    entries: Vec<(String, u64)>,
    index: HashMap<String, u64>,
}

impl FlagMap {
    /// Build from already validated, normalized pairs.
    pub(crate) fn from_pairs(entries: Vec<(String, u64)>) -> Self {
        let index = entries
            .iter()
            .map(|(name, bit)| (name.clone(), *bit))
            .collect();
        Self { entries, index }
    }

    /// Bit assigned to a flag name. The name is normalized before lookup.
    pub fn bit(&self, name: &str) -> Option<u64> {
        self.index.get(&normalize_name(name)).copied()
    }

    /// Like [`FlagMap::bit`] but fails with [`FlagError::UnknownFlag`].
    pub fn require(&self, name: &str) -> FlagResult<u64> {
        self.bit(name)
            .ok_or_else(|| FlagError::UnknownFlag(normalize_name(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bit(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, bit)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, bit)| (name.as_str(), *bit))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Union of every declared bit.
    pub fn all_bits(&self) -> u64 {
        self.entries.iter().fold(0, |acc, (_, bit)| acc | bit)
    }

    /// Name owning a given bit.
    pub fn name_of(&self, bit: u64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, b)| *b == bit)
            .map(|(name, _)| name.as_str())
    }

    /// Parse text like `"active, verified"` into a mask.
    ///
    /// Empty text yields 0. Any unknown token fails the whole parse.
    pub fn mask_from_text(&self, text: &str) -> FlagResult<u64> {
        self.mask_from_tokens(split_flag_text(text))
    }

    /// OR together the bits of already split tokens.
    pub fn mask_from_tokens<I, S>(&self, tokens: I) -> FlagResult<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .try_fold(0, |mask, token| Ok(mask | self.require(token.as_ref())?))
    }

    /// Flags whose bit is set in `mask`, in declaration order.
    pub fn names_in(&self, mask: u64) -> impl Iterator<Item = (&str, u64)> {
        self.iter().filter(move |(_, bit)| mask & bit == *bit)
    }
}
