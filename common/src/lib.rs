//! Wire types shared with the research backend.

pub mod types;

pub use types::{EventData, NodeKind, ResearchRequest, StepDescriptor, StreamEvent};
