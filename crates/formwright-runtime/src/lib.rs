//! Formwright Runtime
//!
//! Renders a [`FormDef`](formwright_config::FormDef) in three steps:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  primary query          QueryClient::execute → graph data   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Scheduler              independent / graph-only sources,   │
//! │                         then a fixed-point loop over        │
//! │                         API-dependent sources               │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Hydrator               options, default values, rows and   │
//! │                         html for every component            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All state of one render lives in a [`FormState`] owned by that render.

mod error;
mod hydrate;
mod readiness;
mod renderer;
mod resolve;
mod result;
mod scheduler;
mod state;

pub use error::RenderError;
pub use hydrate::{ColumnTransform, Hydrator};
pub use readiness::{api_ready, graph_ready, is_ready, missing_dependencies};
pub use renderer::Renderer;
pub use resolve::{Expansion, ResolveContext, expand, merge_fan_out};
pub use result::{
  HydrationFailure, LoopOutcome, RenderOutput, RenderReport, SchedulerReport, StuckDescriptor,
};
pub use scheduler::Scheduler;
pub use state::FormState;
