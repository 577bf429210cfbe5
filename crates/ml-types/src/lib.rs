//! Core types and traits for the training/inference job kernel.
//!
//! Artifacts are the typed hand-off records between pipeline stages; job records carry the
//! lifecycle of one asynchronous invocation; DTOs are the JSON shapes of the HTTP surface.

mod artifact;
mod dto;
mod job;
mod traits;

pub use artifact::*;
pub use dto::*;
pub use job::*;
pub use traits::*;
