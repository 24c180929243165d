//! Declarative flag configuration loaded from TOML.
//!
//! ```toml
//! flags_field = "status"
//! name_prefix = "is"
//! text_delimiter = ", "
//! label_style = "humanized"
//! flags = ["active", { name = "banned", bit = 4 }, "email_verified"]
//!
//! [labels]
//! banned = "Banned by moderator"
//! 1 = "Active account"
//! ```
//!
//! Label keys are either a bit value or a flag name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{DEFAULT_FLAGS_FIELD, DEFAULT_NAME_PREFIX, DEFAULT_TEXT_DELIMITER};
use crate::{
    FlagDefinition, FlagError, FlagLabels, FlagMap, FlagResult, FlagSchema, HumanizedLabel,
};

/// How labels are generated for flags without an explicit one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// The normalized flag name.
    #[default]
    Name,
    /// Title-cased words of the flag name.
    Humanized,
}

/// Flag configuration of one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagFieldConfig {
    pub flags_field: String,
    pub name_prefix: String,
    pub text_delimiter: String,
    pub label_style: LabelStyle,
    pub flags: FlagDefinition,
    pub labels: BTreeMap<String, String>,
}

impl Default for FlagFieldConfig {
    fn default() -> Self {
        Self {
            flags_field: DEFAULT_FLAGS_FIELD.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            text_delimiter: DEFAULT_TEXT_DELIMITER.to_string(),
            label_style: LabelStyle::default(),
            flags: FlagDefinition::default(),
            labels: BTreeMap::new(),
        }
    }
}

impl FlagFieldConfig {
    pub fn from_toml_str(input: &str) -> FlagResult<Self> {
        toml::from_str(input).map_err(|e| FlagError::InvalidConfig(e.to_string()))
    }

    /// Turn the label table into bit-keyed labels.
    ///
    /// A numeric key is a bit value; any other key must name a flag.
    pub fn resolve_labels(&self, map: &FlagMap) -> FlagResult<FlagLabels> {
        let mut labels = FlagLabels::new();
        for (key, text) in &self.labels {
            let bit = match key.trim().parse::<u64>() {
                Ok(bit) => {
                    if map.name_of(bit).is_none() {
                        tracing::warn!("Label for bit {} does not match any flag", bit);
                    }
                    bit
                }
                Err(_) => map.bit(key).ok_or_else(|| {
                    FlagError::InvalidConfig(format!("label for unknown flag '{}'", key.trim()))
                })?,
            };
            labels.insert(bit, text.clone());
        }
        Ok(labels)
    }
}

impl FlagSchema {
    /// Build a schema from a parsed configuration.
    pub fn from_config(config: FlagFieldConfig) -> FlagResult<Self> {
        let builder = FlagSchema::builder(config.flags.clone())
            .flags_field(config.flags_field.clone())
            .name_prefix(config.name_prefix.clone())
            .text_delimiter(config.text_delimiter.clone());
        let builder = match config.label_style {
            LabelStyle::Name => builder,
            LabelStyle::Humanized => builder.formatter(HumanizedLabel),
        };
        builder.build_with_labels(|map| config.resolve_labels(map))
    }

    pub fn from_toml_str(input: &str) -> FlagResult<Self> {
        Self::from_config(FlagFieldConfig::from_toml_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
flags_field = "status"
label_style = "humanized"
text_delimiter = "; "
flags = ["active", { name = "banned", bit = 4 }, "email_verified"]

[labels]
banned = "Banned by moderator"
1 = "Active account"
"#;

    #[test]
    fn parses_mixed_flag_list() {
        let config = FlagFieldConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.flags_field, "status");
        assert_eq!(config.name_prefix, "is");
        assert_eq!(config.label_style, LabelStyle::Humanized);
        assert_eq!(config.flags.entries().len(), 3);
    }

    #[test]
    fn schema_from_toml() {
        let schema = FlagSchema::from_toml_str(SAMPLE).unwrap();
        assert_eq!(schema.flags_field(), "status");
        assert_eq!(schema.map().bit("active"), Some(1));
        assert_eq!(schema.map().bit("banned"), Some(4));
        assert_eq!(schema.map().bit("email_verified"), Some(2));
        assert_eq!(
            schema.flags_to_text(7),
            "Active account; Banned by moderator; Email Verified"
        );
    }

    #[test]
    fn defaults_when_empty() {
        let config = FlagFieldConfig::from_toml_str("").unwrap();
        assert_eq!(config, FlagFieldConfig::default());
        let schema = FlagSchema::from_config(config).unwrap();
        assert!(schema.map().is_empty());
        assert_eq!(schema.text_delimiter(), ", ");
    }

    #[test]
    fn label_for_unknown_flag_is_rejected() {
        let err = FlagSchema::from_toml_str("flags = [\"a\"]\n[labels]\nb = \"B\"\n").unwrap_err();
        assert!(matches!(err, FlagError::InvalidConfig(_)));
    }

    #[test]
    fn definition_errors_surface_from_config() {
        let err = FlagSchema::from_toml_str("flags = [{ name = \"x\", bit = 3 }]").unwrap_err();
        assert!(err.is_definition_error());
    }

    #[test]
    fn malformed_toml() {
        let err = FlagFieldConfig::from_toml_str("flags = [").unwrap_err();
        assert!(matches!(err, FlagError::InvalidConfig(_)));
    }
}
