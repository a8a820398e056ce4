//! Formwright Host
//!
//! The external systems a render talks to, each behind an `async` trait so
//! the runtime can be driven by real transports or in-memory fakes:
//!
//! | Trait | Purpose | Implementations |
//! |-------|---------|-----------------|
//! | [`ApiClient`] | named API source calls | [`HttpApiClient`] |
//! | [`QueryClient`] | the primary structured query | [`GraphQlClient`], [`StaticQuery`] |
//! | [`DirectoryClient`] | group membership lookup | [`StaticDirectory`] |
//! | [`ProcessEngine`] | workflow start / task completion | [`RestProcessEngine`] |

mod api;
mod directory;
mod error;
mod http;
mod process;
mod query;

pub use api::{ApiClient, HttpApiClient, ResolvedRequest};
pub use directory::{DirectoryClient, DirectoryMember, StaticDirectory};
pub use error::HostError;
pub use process::{ProcessEngine, RestProcessEngine};
pub use query::{GraphQlClient, QueryClient, StaticQuery};
