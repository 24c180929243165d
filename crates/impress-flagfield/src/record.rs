//! Record-side flag access.
//!
//! Host entities implement [`FlagRecord`] (the integer field plus the shared
//! schema) and get flag get/set and text conversion for free. Named property
//! access (`isActive`), bulk attribute routing and query scopes are layered on
//! top through [`FlagAccessible`], [`FlagAttributes`] and [`ScopedRecord`].

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::criteria::{flag_condition, qualified_column};
use crate::{Connector, CriteriaBuilder, FlagResult, FlagSchema, FlagTerm};

/// A reference to one or more flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagRef<'a> {
    /// Raw mask.
    Bits(u64),
    /// A flag name, or several separated by commas or whitespace.
    Text(&'a str),
    /// Already split flag names.
    Tokens(Vec<&'a str>),
}

impl From<u64> for FlagRef<'_> {
    fn from(bits: u64) -> Self {
        FlagRef::Bits(bits)
    }
}

impl<'a> From<&'a str> for FlagRef<'a> {
    fn from(text: &'a str) -> Self {
        FlagRef::Text(text)
    }
}

impl<'a> From<&'a String> for FlagRef<'a> {
    fn from(text: &'a String) -> Self {
        FlagRef::Text(text.as_str())
    }
}

impl<'a> From<Vec<&'a str>> for FlagRef<'a> {
    fn from(tokens: Vec<&'a str>) -> Self {
        FlagRef::Tokens(tokens)
    }
}

impl<'a> From<&[&'a str]> for FlagRef<'a> {
    fn from(tokens: &[&'a str]) -> Self {
        FlagRef::Tokens(tokens.to_vec())
    }
}

impl<'a, const N: usize> From<[&'a str; N]> for FlagRef<'a> {
    fn from(tokens: [&'a str; N]) -> Self {
        FlagRef::Tokens(tokens.to_vec())
    }
}

/// Values accepted when switching a flag on or off.
///
/// Strings `"true"` and `"false"` are matched case-insensitively; `""` and
/// `"0"` are off, any other string is on. Numbers are on when non-zero.
pub trait FlagSwitch {
    fn is_on(&self) -> bool;
}

impl FlagSwitch for bool {
    fn is_on(&self) -> bool {
        *self
    }
}

impl FlagSwitch for i64 {
    fn is_on(&self) -> bool {
        *self != 0
    }
}

impl FlagSwitch for u64 {
    fn is_on(&self) -> bool {
        *self != 0
    }
}

impl FlagSwitch for str {
    fn is_on(&self) -> bool {
        let value = self.trim();
        if value.eq_ignore_ascii_case("true") {
            true
        } else if value.eq_ignore_ascii_case("false") {
            false
        } else {
            !(value.is_empty() || value == "0")
        }
    }
}

impl FlagSwitch for String {
    fn is_on(&self) -> bool {
        self.as_str().is_on()
    }
}

impl FlagSwitch for Value {
    fn is_on(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => s.is_on(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(_) => true,
        }
    }
}

impl<T: FlagSwitch + ?Sized> FlagSwitch for &T {
    fn is_on(&self) -> bool {
        (**self).is_on()
    }
}

/// A host entity with a bit-packed flags field.
pub trait FlagRecord {
    /// Schema shared by every record of this type.
    fn flag_schema(&self) -> &Arc<FlagSchema>;

    /// Current value of the flags field.
    fn flags_value(&self) -> u64;

    fn set_flags_value(&mut self, value: u64);

    /// True when every requested bit is set.
    fn get_flag<'a>(&self, flag: impl Into<FlagRef<'a>>) -> FlagResult<bool>
    where
        Self: Sized,
    {
        let mask = self.flag_schema().resolve_ref(flag)?;
        Ok(self.flags_value() & mask == mask)
    }

    /// Set or clear the requested bits, leaving all others alone.
    fn set_flag<'a>(&mut self, flag: impl Into<FlagRef<'a>>, value: impl FlagSwitch) -> FlagResult<()>
    where
        Self: Sized,
    {
        let mask = self.flag_schema().resolve_ref(flag)?;
        let current = self.flags_value();
        let next = if value.is_on() {
            current | mask
        } else {
            current & !mask
        };
        self.set_flags_value(next);
        Ok(())
    }

    fn flags_from_text(&self, text: &str) -> FlagResult<u64> {
        self.flag_schema().flags_from_text(text)
    }

    /// Labels of the flags currently set.
    fn flags_to_text(&self) -> String {
        self.flag_schema().flags_to_text(self.flags_value())
    }

    /// Labels of the flags set in an arbitrary value.
    fn flags_text_of(&self, value: u64) -> String {
        self.flag_schema().flags_to_text(value)
    }
}

/// Typed access to virtual flag properties such as `isActive`.
pub trait FlagAccessible {
    /// `None` when `name` is not a flag property.
    fn get_property(&self, name: &str) -> Option<bool>;

    /// Returns `false` when `name` is not a flag property; nothing changes
    /// in that case and the host should handle the name itself.
    fn set_property(&mut self, name: &str, value: impl FlagSwitch) -> bool;
}

impl<R: FlagRecord + ?Sized> FlagAccessible for R {
    fn get_property(&self, name: &str) -> Option<bool> {
        let bit = self.flag_schema().property_flag(name)?;
        Some(self.flags_value() & bit == bit)
    }

    fn set_property(&mut self, name: &str, value: impl FlagSwitch) -> bool {
        let Some(bit) = self.flag_schema().property_flag(name) else {
            return false;
        };
        let current = self.flags_value();
        self.set_flags_value(if value.is_on() { current | bit } else { current & !bit });
        true
    }
}

/// The host's own attribute storage.
pub trait AttributeHost {
    fn attribute(&self, name: &str) -> Option<Value>;

    fn set_attributes(&mut self, values: Map<String, Value>);
}

/// Bulk attribute access that understands flags.
///
/// A key is a flag key when it is a flag property (`isActive`) or a bare
/// flag name (`active`). Flag keys go through the flags field; every other
/// key goes to the host.
pub trait FlagAttributes: FlagRecord + AttributeHost {
    fn flag_key(&self, key: &str) -> Option<u64> {
        let schema = self.flag_schema();
        schema.property_flag(key).or_else(|| schema.map().bit(key))
    }

    fn assign_attributes(&mut self, values: Map<String, Value>) {
        let mut rest = Map::new();
        let mut flags = self.flags_value();
        for (key, value) in values {
            match self.flag_key(&key) {
                Some(bit) if value.is_on() => flags |= bit,
                Some(bit) => flags &= !bit,
                None => {
                    rest.insert(key, value);
                }
            }
        }
        self.set_flags_value(flags);
        if !rest.is_empty() {
            self.set_attributes(rest);
        }
    }

    /// Read the named attributes. Flags come back as booleans; names the
    /// host does not know are left out.
    fn read_attributes<I, S>(&self, names: I) -> Map<String, Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        Self: Sized,
    {
        let mut values = Map::new();
        for name in names {
            let name = name.as_ref();
            if let Some(bit) = self.flag_key(name) {
                values.insert(name.to_string(), Value::Bool(self.flags_value() & bit == bit));
            } else if let Some(value) = self.attribute(name) {
                values.insert(name.to_string(), value);
            }
        }
        values
    }
}

impl<R: FlagRecord + AttributeHost + ?Sized> FlagAttributes for R {}

/// A record that carries its own query criteria.
pub trait ScopedRecord: FlagRecord {
    type Criteria: CriteriaBuilder;

    fn criteria_mut(&mut self) -> &mut Self::Criteria;

    /// Alias qualifying the flags column in scope conditions.
    fn table_alias(&self) -> &str {
        "t"
    }

    /// Scope builder over this record's criteria.
    fn flag_scope(&mut self) -> FlagScope<'_, Self::Criteria> {
        let schema = Arc::clone(self.flag_schema());
        let alias = self.table_alias().to_string();
        FlagScope::new(schema, alias, self.criteria_mut())
    }
}

/// Chainable flag scopes over a borrowed criteria.
pub struct FlagScope<'r, C: CriteriaBuilder + ?Sized> {
    schema: Arc<FlagSchema>,
    alias: String,
    criteria: &'r mut C,
}

impl<'r, C: CriteriaBuilder + ?Sized> FlagScope<'r, C> {
    pub fn new(schema: Arc<FlagSchema>, alias: impl Into<String>, criteria: &'r mut C) -> Self {
        Self {
            schema,
            alias: alias.into(),
            criteria,
        }
    }

    pub fn with_flag<'a>(&mut self, flag: impl Into<FlagRef<'a>>) -> FlagResult<&mut Self> {
        self.schema.with_flag(&mut *self.criteria, &self.alias, flag)?;
        Ok(self)
    }

    pub fn without_flag<'a>(&mut self, flag: impl Into<FlagRef<'a>>) -> FlagResult<&mut Self> {
        self.schema.without_flag(&mut *self.criteria, &self.alias, flag)?;
        Ok(self)
    }

    /// Scope named after a flag, like `active()` for `with_flag("active")`.
    ///
    /// `None` when `method` is not a flag name.
    pub fn named(&mut self, method: &str) -> Option<&mut Self> {
        let bit = self.schema.method_flag(method)?;
        let column = qualified_column(&self.alias, self.schema.flags_field());
        self.criteria
            .add_condition(&flag_condition(&column, bit, false), Connector::And);
        Some(self)
    }

    pub fn apply_flags<I, T>(&mut self, terms: I, connector: Connector) -> FlagResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<FlagTerm>,
    {
        self.schema.apply_flags(&mut *self.criteria, terms, connector)?;
        Ok(self)
    }

    pub fn criteria(&mut self) -> &mut C {
        &mut *self.criteria
    }
}
