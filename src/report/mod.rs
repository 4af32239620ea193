//! Report rendering.

pub mod generator;
pub mod message;

pub use generator::RenderOptions;
pub use message::{build_message, AudienceReport, DiagnosticMessage};
