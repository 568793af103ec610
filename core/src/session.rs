//! Session orchestration.
//!
//! One spawned driver task owns the decode -> parse -> reduce pipeline and
//! all mutation of the session state. Consumers talk to it through an `Op`
//! channel and observe it through `watch` snapshots, so no lock ever guards
//! the reducers: there is exactly one logical writer.

use crate::client::{ResearchClient, TransportEvent};
use crate::error::{ResearchError, Result};
use crate::event::{parse_frame, FrameOutcome};
use crate::sse::FrameDecoder;
use crate::state::{Applied, SessionState};
use research_protocol::{Op, SessionStatus, Submission};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Handle to one research session.
#[derive(Clone)]
pub struct Session {
    tx_submit: mpsc::Sender<Submission>,
    state_rx: watch::Receiver<SessionState>,
}

impl Session {
    /// Spawn the driver task for one session bound to `client`.
    pub fn spawn(client: Arc<dyn ResearchClient + Send + Sync>) -> Self {
        let (tx_submit, mut rx_submit) = mpsc::channel::<Submission>(16);
        let (state_tx, state_rx) = watch::channel(SessionState::new());

        tokio::spawn(async move {
            let mut state = SessionState::new();
            while let Some(submission) = rx_submit.recv().await {
                match submission.op {
                    Op::Submit { query } => {
                        let query = query.trim().to_string();
                        if query.is_empty() {
                            tracing::debug!(id = %submission.id, "ignoring blank directive");
                            continue;
                        }
                        // One directive in flight per session. The driver
                        // processes submissions serially, so by the time a
                        // queued submit is seen the previous stream has
                        // already been torn down; this guard only catches
                        // states a crashed pipeline could leave behind.
                        if state.status == SessionStatus::Processing {
                            tracing::warn!(id = %submission.id, "directive ignored while processing");
                            continue;
                        }
                        tracing::info!(id = %submission.id, "starting research session");
                        state.begin(&query);
                        let _ = state_tx.send(state.clone());
                        run_stream(client.as_ref(), &query, &mut state, &state_tx).await;
                        let _ = state_tx.send(state.clone());
                    }
                    Op::Shutdown => break,
                }
            }
        });

        Self {
            tx_submit,
            state_rx,
        }
    }

    /// Queue an operation for the driver.
    pub async fn submit(&self, op: Op) -> Result<()> {
        self.tx_submit
            .send(Submission::new(op))
            .await
            .map_err(|_| ResearchError::ChannelSend)
    }

    /// Subscribe to state snapshots. Every reduction publishes one.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// The most recent snapshot.
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }
}

/// Drive decode -> parse -> reduce until the stream ends: sentinel frame,
/// clean transport close, or transport failure.
///
/// The transport receiver is dropped on return, releasing the underlying
/// connection on every exit path.
async fn run_stream(
    client: &(dyn ResearchClient + Send + Sync),
    query: &str,
    state: &mut SessionState,
    state_tx: &watch::Sender<SessionState>,
) {
    let mut rx = match client.open(query.to_string()).await {
        Ok(rx) => rx,
        Err(e) => {
            state.fail(&e.to_string());
            return;
        }
    };

    let mut decoder = FrameDecoder::new();
    let mut answered = false;

    'stream: while let Some(transport) = rx.recv().await {
        match transport {
            TransportEvent::Chunk(bytes) => {
                for frame in decoder.push(&bytes) {
                    match parse_frame(&frame) {
                        FrameOutcome::Event(event) => match state.apply_event(&event) {
                            Applied::Final => {
                                answered = true;
                                let _ = state_tx.send(state.clone());
                            }
                            Applied::Progress => {
                                let _ = state_tx.send(state.clone());
                            }
                            Applied::Noop => {}
                        },
                        FrameOutcome::Done => break 'stream,
                        FrameOutcome::Ignored => {}
                        FrameOutcome::Malformed(e) => {
                            tracing::warn!("skipping malformed frame: {e}");
                        }
                    }
                }
            }
            TransportEvent::Closed => break,
            TransportEvent::Failed(reason) => {
                tracing::error!("transport failure: {reason}");
                state.fail(&reason);
                return;
            }
        }
    }

    decoder.finish();
    if !answered && state.status == SessionStatus::Processing {
        // The stream ended without a reporter event. Degraded: the plan
        // shows how far execution got, but there is nothing to report and
        // no timeout policy to invent.
        tracing::warn!("stream ended before a final answer");
        state.status = SessionStatus::Idle;
    }
}
