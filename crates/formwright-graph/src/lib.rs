//! Formwright Graph
//!
//! Static analysis of API descriptors, before anything is called:
//! - [`Template`] / [`Reference`]: parsing of `${api.…}`, `${graph.…}`,
//!   `${session.…}` and `${values.…}` markers
//! - [`JsonPath`]: dot-path addressing with `[index]` subscripts
//! - [`Dependencies`]: the API sources and graph paths a descriptor reads
//! - [`DependencyGraph`]: cycle detection and a topological batch plan

mod deps;
mod error;
mod graph;
mod path;
mod template;

pub use deps::{DependencyClass, Dependencies, for_each_string};
pub use error::GraphError;
pub use graph::{DependencyGraph, DependencyPlan};
pub use path::{JsonPath, PathSegment};
pub use template::{Reference, Segment, Template};
