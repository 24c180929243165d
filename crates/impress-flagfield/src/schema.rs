//! Per-record-type flag schema.
//!
//! A [`FlagSchema`] is built once for a record type and shared (usually as
//! `Arc<FlagSchema>`) by every record of that type. It owns the resolved
//! flag map, the display labels and the naming/formatting knobs.

use std::fmt;
use std::sync::OnceLock;

use crate::criteria::{flag_condition, qualified_column};
use crate::{
    Connector, Criteria, CriteriaBuilder, FlagDefinition, FlagLabels, FlagMap, FlagRef,
    FlagResult, LabelFormatter, NameLabel,
};

/// Default name of the integer column holding the flags.
pub const DEFAULT_FLAGS_FIELD: &str = "flags";
/// Default prefix of virtual flag properties (`isActive`).
pub const DEFAULT_NAME_PREFIX: &str = "is";
/// Default separator used by [`FlagSchema::flags_to_text`].
pub const DEFAULT_TEXT_DELIMITER: &str = ", ";

type LabelLoader = Box<dyn Fn() -> FlagLabels + Send + Sync>;

/// One entry of an [`FlagSchema::apply_flags`] list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagTerm {
    /// Flag name or compound flag text; a leading `!` negates it.
    Name(String),
    /// Raw bit mask, never negated.
    Bits(u64),
}

impl From<&str> for FlagTerm {
    fn from(name: &str) -> Self {
        FlagTerm::Name(name.to_string())
    }
}

impl From<String> for FlagTerm {
    fn from(name: String) -> Self {
        FlagTerm::Name(name)
    }
}

impl From<u64> for FlagTerm {
    fn from(bits: u64) -> Self {
        FlagTerm::Bits(bits)
    }
}

/// Resolved flags of one record type plus how to name, label and query them.
pub struct FlagSchema {
    map: FlagMap,
    flags_field: String,
    name_prefix: String,
    text_delimiter: String,
    labels: OnceLock<FlagLabels>,
    label_loader: Option<LabelLoader>,
    formatter: Box<dyn LabelFormatter>,
}

impl FlagSchema {
    /// Schema with default field name, prefix, delimiter and labels.
    pub fn new(definition: FlagDefinition) -> FlagResult<Self> {
        Self::builder(definition).build()
    }

    pub fn builder(definition: FlagDefinition) -> FlagSchemaBuilder {
        FlagSchemaBuilder::new(definition)
    }

    pub fn map(&self) -> &FlagMap {
        &self.map
    }

    pub fn flags_field(&self) -> &str {
        &self.flags_field
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    pub fn text_delimiter(&self) -> &str {
        &self.text_delimiter
    }

    /// Explicit labels, loaded on first use.
    pub fn labels(&self) -> &FlagLabels {
        self.labels.get_or_init(|| match &self.label_loader {
            Some(load) => load(),
            None => FlagLabels::default(),
        })
    }

    /// Display text for one flag: its explicit label or a generated one.
    pub fn label(&self, name: &str, bit: u64) -> String {
        match self.labels().get(bit) {
            Some(label) => label.to_string(),
            None => self.formatter.format(name),
        }
    }

    /// Resolve a bit value, flag name or compound flag text to a mask.
    pub fn resolve_ref<'a>(&self, flag: impl Into<FlagRef<'a>>) -> FlagResult<u64> {
        match flag.into() {
            FlagRef::Bits(bits) => Ok(bits),
            FlagRef::Text(text) => self.map.mask_from_text(text),
            FlagRef::Tokens(tokens) => self.map.mask_from_tokens(tokens),
        }
    }

    pub fn flags_from_text(&self, text: &str) -> FlagResult<u64> {
        self.map.mask_from_text(text)
    }

    pub fn flags_from_tokens<I, S>(&self, tokens: I) -> FlagResult<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map.mask_from_tokens(tokens)
    }

    /// Labels of every flag fully set in `value`, in declaration order,
    /// joined by the text delimiter.
    pub fn flags_to_text(&self, value: u64) -> String {
        self.map
            .names_in(value)
            .map(|(name, bit)| self.label(name, bit))
            .collect::<Vec<_>>()
            .join(&self.text_delimiter)
    }

    /// Bit behind a virtual property such as `isActive`.
    ///
    /// The prefix is matched case-insensitively. Returns `None` when the
    /// prefix does not match or the remainder is not a flag.
    pub fn property_flag(&self, property: &str) -> Option<u64> {
        let prefix_len = self.name_prefix.len();
        let head = property.get(..prefix_len)?;
        if !head.eq_ignore_ascii_case(&self.name_prefix) {
            return None;
        }
        self.map.bit(&property[prefix_len..])
    }

    /// Bit behind a virtual scope method named after a flag.
    pub fn method_flag(&self, method: &str) -> Option<u64> {
        self.map.bit(method)
    }

    /// AND `<alias>.<field> & <mask> <> 0` into `criteria`.
    ///
    /// A zero mask leaves the criteria untouched.
    pub fn with_flag<'c, 'a, C>(
        &self,
        criteria: &'c mut C,
        alias: &str,
        flag: impl Into<FlagRef<'a>>,
    ) -> FlagResult<&'c mut C>
    where
        C: CriteriaBuilder + ?Sized,
    {
        self.scope_condition(criteria, alias, flag.into(), false)
    }

    /// AND `<alias>.<field> & <mask> = 0` into `criteria`.
    ///
    /// A zero mask leaves the criteria untouched.
    pub fn without_flag<'c, 'a, C>(
        &self,
        criteria: &'c mut C,
        alias: &str,
        flag: impl Into<FlagRef<'a>>,
    ) -> FlagResult<&'c mut C>
    where
        C: CriteriaBuilder + ?Sized,
    {
        self.scope_condition(criteria, alias, flag.into(), true)
    }

    fn scope_condition<'c, C>(
        &self,
        criteria: &'c mut C,
        alias: &str,
        flag: FlagRef<'_>,
        negated: bool,
    ) -> FlagResult<&'c mut C>
    where
        C: CriteriaBuilder + ?Sized,
    {
        let mask = self.resolve_ref(flag)?;
        if mask != 0 {
            let column = qualified_column(alias, &self.flags_field);
            let condition = flag_condition(&column, mask, negated);
            tracing::trace!(%condition, "Adding flag scope condition");
            criteria.add_condition(&condition, Connector::And);
        }
        Ok(criteria)
    }

    /// Build one condition per term, join them with `connector` into a
    /// group and AND the group into `criteria`.
    ///
    /// Terms resolving to a zero mask are skipped. An unknown name fails
    /// before anything is added to `criteria`.
    pub fn apply_flags<'c, C, I, T>(
        &self,
        criteria: &'c mut C,
        terms: I,
        connector: Connector,
    ) -> FlagResult<&'c mut C>
    where
        C: CriteriaBuilder + ?Sized,
        I: IntoIterator<Item = T>,
        T: Into<FlagTerm>,
    {
        let mut group = Criteria::new();
        for term in terms {
            let (mask, negated) = match term.into() {
                FlagTerm::Bits(bits) => (bits, false),
                FlagTerm::Name(name) => match name.strip_prefix('!') {
                    Some(rest) => (self.map.mask_from_text(rest)?, true),
                    None => (self.map.mask_from_text(&name)?, false),
                },
            };
            if mask == 0 {
                continue;
            }
            group.add_condition(&flag_condition(&self.flags_field, mask, negated), connector);
        }

        if !group.is_empty() {
            tracing::trace!(condition = %group, "Applying flag conditions");
            criteria.add_condition(group.condition(), Connector::And);
        }
        Ok(criteria)
    }
}

impl fmt::Debug for FlagSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSchema")
            .field("map", &self.map)
            .field("flags_field", &self.flags_field)
            .field("name_prefix", &self.name_prefix)
            .field("text_delimiter", &self.text_delimiter)
            .field("labels", &self.labels.get())
            .finish_non_exhaustive()
    }
}

/// Builder for [`FlagSchema`].
pub struct FlagSchemaBuilder {
    definition: FlagDefinition,
    flags_field: String,
    name_prefix: String,
    text_delimiter: String,
    label_loader: Option<LabelLoader>,
    formatter: Box<dyn LabelFormatter>,
}

impl FlagSchemaBuilder {
    pub fn new(definition: FlagDefinition) -> Self {
        Self {
            definition,
            flags_field: DEFAULT_FLAGS_FIELD.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            text_delimiter: DEFAULT_TEXT_DELIMITER.to_string(),
            label_loader: None,
            formatter: Box::new(NameLabel),
        }
    }

    pub fn flags_field(mut self, field: impl Into<String>) -> Self {
        self.flags_field = field.into();
        self
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn text_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.text_delimiter = delimiter.into();
        self
    }

    pub fn labels(self, labels: FlagLabels) -> Self {
        self.labels_with(move || labels.clone())
    }

    /// Labels produced on first use rather than at build time.
    pub fn labels_with<F>(mut self, load: F) -> Self
    where
        F: Fn() -> FlagLabels + Send + Sync + 'static,
    {
        self.label_loader = Some(Box::new(load));
        self
    }

    /// How labels are generated for flags without an explicit one.
    pub fn formatter(mut self, formatter: impl LabelFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Resolve the definition. Fails on any definition error.
    pub fn build(self) -> FlagResult<FlagSchema> {
        let map = self.definition.resolve()?;
        Ok(self.finish(map))
    }

    /// Resolve the definition, then derive the labels from the resolved map.
    pub(crate) fn build_with_labels<F>(self, labels: F) -> FlagResult<FlagSchema>
    where
        F: FnOnce(&FlagMap) -> FlagResult<FlagLabels>,
    {
        let map = self.definition.resolve()?;
        let labels = labels(&map)?;
        Ok(self.labels(labels).finish(map))
    }

    fn finish(self, map: FlagMap) -> FlagSchema {
        FlagSchema {
            map,
            flags_field: self.flags_field,
            name_prefix: self.name_prefix,
            text_delimiter: self.text_delimiter,
            labels: OnceLock::new(),
            label_loader: self.label_loader,
            formatter: self.formatter,
        }
    }
}
