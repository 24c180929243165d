//! Display labels for flags.

use std::collections::BTreeMap;

/// Explicit display text keyed by flag bit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagLabels {
    labels: BTreeMap<u64, String>,
}

impl FlagLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, bit: u64, label: impl Into<String>) -> Self {
        self.insert(bit, label);
        self
    }

    pub fn insert(&mut self, bit: u64, label: impl Into<String>) {
        self.labels.insert(bit, label.into());
    }

    pub fn get(&self, bit: u64) -> Option<&str> {
        self.labels.get(&bit).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(u64, String)> for FlagLabels {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Produces a label for a flag that has no explicit one.
pub trait LabelFormatter: Send + Sync {
    fn format(&self, name: &str) -> String;
}

/// Uses the normalized flag name as its label.
///
/// Text produced this way parses back to the same mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameLabel;

impl LabelFormatter for NameLabel {
    fn format(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Title-cases the words of a flag name: `email_verified` becomes `Email Verified`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanizedLabel;

impl LabelFormatter for HumanizedLabel {
    fn format(&self, name: &str) -> String {
        name.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<F> LabelFormatter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn format(&self, name: &str) -> String {
        self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("active", "Active")]
    #[case("email_verified", "Email Verified")]
    #[case("two-factor.enabled", "Two Factor Enabled")]
    #[case("__odd__", "Odd")]
    fn humanized(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(HumanizedLabel.format(name), expected);
    }

    #[test]
    fn name_label_is_identity() {
        assert_eq!(NameLabel.format("email_verified"), "email_verified");
    }

    #[test]
    fn closures_format() {
        let upper = |name: &str| name.to_uppercase();
        assert_eq!(upper.format("vip"), "VIP");
    }

    #[test]
    fn labels_lookup() {
        let labels = FlagLabels::new().with(4, "Verified user");
        assert_eq!(labels.get(4), Some("Verified user"));
        assert_eq!(labels.get(1), None);
        assert_eq!(labels.len(), 1);
    }
}
