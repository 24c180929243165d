//! Process-wide registry of flag schemas, one per record type.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;

use crate::{FlagResult, FlagSchema, FlagSchemaBuilder};

/// Record type name to its shared [`FlagSchema`].
#[derive(Debug, Default)]
pub struct FlagRegistry {
    schemas: RwLock<HashMap<String, Arc<FlagSchema>>>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record_type: &str) -> Option<Arc<FlagSchema>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(record_type)
            .cloned()
    }

    /// Schema for `record_type`, building it with `init` on first access.
    ///
    /// `init` runs at most once per record type, even when several threads
    /// ask at the same time. A failed `init` registers nothing.
    pub fn get_or_try_register<F>(&self, record_type: &str, init: F) -> FlagResult<Arc<FlagSchema>>
    where
        F: FnOnce() -> FlagResult<FlagSchema>,
    {
        if let Some(schema) = self.get(record_type) {
            return Ok(schema);
        }

        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = schemas.get(record_type) {
            return Ok(Arc::clone(schema));
        }
        let schema = Arc::new(init()?);
        tracing::debug!(
            "Registered {} flags for record type '{}'",
            schema.map().len(),
            record_type
        );
        schemas.insert(record_type.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn contains(&self, record_type: &str) -> bool {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(record_type)
    }

    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    static ref GLOBAL_REGISTRY: FlagRegistry = FlagRegistry::new();
}

/// Registry shared by the whole process.
pub fn global_registry() -> &'static FlagRegistry {
    &GLOBAL_REGISTRY
}

/// A record type that declares its flags.
///
/// ```
/// use impress_flagfield::{FlagDeclaration, FlagDefinition, FlagSchema, FlagSchemaBuilder};
///
/// struct Member;
///
/// impl FlagDeclaration for Member {
///     const RECORD_TYPE: &'static str = "member";
///
///     fn declare_flags() -> FlagSchemaBuilder {
///         FlagSchema::builder(FlagDefinition::from_names(["active", "admin"]))
///     }
/// }
///
/// let schema = Member::shared_flag_schema().unwrap();
/// assert_eq!(schema.map().bit("admin"), Some(2));
/// ```
pub trait FlagDeclaration {
    /// Key of this type in the global registry.
    const RECORD_TYPE: &'static str;

    fn declare_flags() -> FlagSchemaBuilder;

    /// The type's schema, resolved on first call and shared afterwards.
    fn shared_flag_schema() -> FlagResult<Arc<FlagSchema>> {
        global_registry().get_or_try_register(Self::RECORD_TYPE, || Self::declare_flags().build())
    }
}
