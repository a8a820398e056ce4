//! Formwright Config
//!
//! This crate contains the serializable form definition types for formwright.
//! A form definition bundles everything one render needs:
//! - the primary query whose result ("graph data") feeds table lookups
//! - named API descriptors that may reference each other and the graph data
//! - the component schema to hydrate
//!
//! Definitions are loaded from JSON files (via the CLI) or supplied by a host
//! application. Nothing in this crate performs I/O.

mod api;
mod component;
mod form;
mod query;

pub use api::ApiDescriptor;
pub use component::{ColumnDef, Component, ComponentData, ComponentType, SelectOption};
pub use form::{FormDef, FormSchema, SchedulerConfig};
pub use query::QueryDef;
