//! Query criteria: SQL condition fragments combined with AND/OR.
//!
//! Flag operations only need to append conditions, so the seam to any host
//! query builder is the one-method [`CriteriaBuilder`] trait. [`Criteria`] is
//! the built-in accumulator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FlagError;

/// Boolean operator joining two conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Connector {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Connector::And),
            "OR" => Ok(Connector::Or),
            other => Err(FlagError::InvalidConfig(format!(
                "unknown condition operator: '{other}'"
            ))),
        }
    }
}

/// Anything that accumulates SQL conditions.
pub trait CriteriaBuilder {
    /// Append `condition`, joined to what is already there by `connector`.
    fn add_condition(&mut self, condition: &str, connector: Connector);
}

impl<T: CriteriaBuilder + ?Sized> CriteriaBuilder for &mut T {
    fn add_condition(&mut self, condition: &str, connector: Connector) {
        (**self).add_condition(condition, connector);
    }
}

/// A WHERE condition built up one fragment at a time.
///
/// Adding to a non-empty condition wraps both sides in parentheses:
/// `(existing) AND (new)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Criteria {
    condition: String,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing condition.
    pub fn from_condition(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
        }
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn is_empty(&self) -> bool {
        self.condition.is_empty()
    }

    /// AND another criteria into this one. Empty criteria change nothing.
    pub fn merge(&mut self, other: &Criteria) {
        self.add_condition(&other.condition, Connector::And);
    }

    /// `WHERE <condition>`, or an empty string when there is no condition.
    pub fn where_clause(&self) -> String {
        if self.condition.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.condition)
        }
    }
}

impl CriteriaBuilder for Criteria {
    fn add_condition(&mut self, condition: &str, connector: Connector) {
        if condition.is_empty() {
            return;
        }
        if self.condition.is_empty() {
            self.condition = condition.to_string();
        } else {
            self.condition = format!("({}) {} ({})", self.condition, connector, condition);
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.condition)
    }
}

/// Column reference, qualified by a table alias when one is given.
pub fn qualified_column(alias: &str, field: &str) -> String {
    if alias.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", alias, field)
    }
}

/// `<column> & <mask> <> 0`, or `= 0` when negated.
///
/// The mask is written as a signed 64-bit literal so bit 63 matches the
/// two's-complement value a SQL integer column stores.
pub fn flag_condition(column: &str, mask: u64, negated: bool) -> String {
    let comparison = if negated { "= 0" } else { "<> 0" };
    format!("{} & {} {}", column, mask as i64, comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn first_condition_is_bare() {
        let mut c = Criteria::new();
        c.add_condition("a = 1", Connector::Or);
        assert_eq!(c.condition(), "a = 1");
    }

    #[test]
    fn later_conditions_are_parenthesized() {
        let mut c = Criteria::new();
        c.add_condition("a = 1", Connector::And);
        c.add_condition("b = 2", Connector::Or);
        c.add_condition("c = 3", Connector::And);
        assert_eq!(c.condition(), "((a = 1) OR (b = 2)) AND (c = 3)");
        assert_eq!(c.where_clause(), "WHERE ((a = 1) OR (b = 2)) AND (c = 3)");
    }

    #[test]
    fn merge_ands_and_skips_empty() {
        let mut c = Criteria::from_condition("deleted = 0");
        c.merge(&Criteria::new());
        assert_eq!(c.condition(), "deleted = 0");
        c.merge(&Criteria::from_condition("x > 1"));
        assert_eq!(c.condition(), "(deleted = 0) AND (x > 1)");
    }

    #[test]
    fn empty_criteria_has_no_where_clause() {
        assert_eq!(Criteria::new().where_clause(), "");
    }

    #[rstest]
    #[case("and", Connector::And)]
    #[case(" OR ", Connector::Or)]
    #[case("Or", Connector::Or)]
    fn parses_connector(#[case] input: &str, #[case] expected: Connector) {
        assert_eq!(input.parse::<Connector>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_connector() {
        assert!("XOR".parse::<Connector>().is_err());
    }

    #[test]
    fn condition_syntax() {
        assert_eq!(flag_condition("t.flags", 4, false), "t.flags & 4 <> 0");
        assert_eq!(flag_condition("flags", 2, true), "flags & 2 = 0");
        assert_eq!(
            flag_condition("t.flags", 1 << 63, false),
            "t.flags & -9223372036854775808 <> 0"
        );
        assert_eq!(qualified_column("", "flags"), "flags");
        assert_eq!(qualified_column("u", "flags"), "u.flags");
    }
}
