//! impress-flagfield: named boolean flags packed into a single integer field.
//!
//! A record type declares its flags once (explicit bit values, auto-numbered
//! names, or both). The declaration resolves into a [`FlagSchema`] shared by
//! every record of that type, which maps names to bits, converts masks to and
//! from text, and builds SQL conditions for filtering on flag state.
//!
//! # Example
//!
//! ```
//! use impress_flagfield::{Criteria, FlagDefinition, FlagSchema};
//!
//! let schema = FlagSchema::new(
//!     FlagDefinition::new()
//!         .named("active", 1)
//!         .named("banned", 2)
//!         .named("verified", 4),
//! )
//! .unwrap();
//!
//! assert_eq!(schema.flags_to_text(5), "active, verified");
//! assert_eq!(schema.flags_from_text("verified, active").unwrap(), 5);
//!
//! let mut criteria = Criteria::new();
//! schema.with_flag(&mut criteria, "t", "active").unwrap();
//! assert_eq!(criteria.condition(), "t.flags & 1 <> 0");
//! ```

pub mod config;
pub mod criteria;
pub mod definition;
pub mod error;
pub mod labels;
pub mod map;
pub mod record;
pub mod registry;
pub mod schema;

pub use config::*;
pub use criteria::*;
pub use definition::*;
pub use error::*;
pub use labels::*;
pub use map::*;
pub use record::*;
pub use registry::*;
pub use schema::*;
