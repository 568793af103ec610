//! Classifies one complete frame into a typed outcome.

use research_common::StreamEvent;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// What one frame turned out to contain.
#[derive(Debug)]
pub enum FrameOutcome {
    /// A well-formed event payload.
    Event(StreamEvent),
    /// The end-of-stream sentinel. Processing stops; not an error.
    Done,
    /// No data payload: blank separator, comment, or another SSE field.
    Ignored,
    /// A data payload that failed structural decoding. Local failure only;
    /// the caller logs it and moves on to the next frame.
    Malformed(serde_json::Error),
}

/// Classify one frame. Only `data:` lines carry payloads; the first such
/// line in the frame decides the outcome (this protocol never emits
/// multi-line data frames).
pub fn parse_frame(frame: &str) -> FrameOutcome {
    for line in frame.lines() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
            let rest = rest.trim();
            if rest == DONE_SENTINEL {
                return FrameOutcome::Done;
            }
            return match serde_json::from_str::<StreamEvent>(rest) {
                Ok(event) => FrameOutcome::Event(event),
                Err(e) => FrameOutcome::Malformed(e),
            };
        }
    }
    FrameOutcome::Ignored
}
