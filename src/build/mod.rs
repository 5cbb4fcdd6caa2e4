//! Build context resolution and build plan selection.
//!
//! - [`context`] - Resolve options into a [`context::BuildContext`]
//! - [`plan`] - Pick the artifact file and the command that builds it

pub mod context;
pub mod plan;
