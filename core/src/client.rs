//! Transport layer: opens the research stream and forwards raw chunks.
//!
//! Framing and parsing happen downstream; the client's only job is to get
//! bytes off the wire and to say how the stream ended. Dropping the
//! returned receiver aborts the forwarding task, which releases the
//! underlying connection.

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use research_common::ResearchRequest;
use tokio::sync::mpsc::{self, Receiver};

/// What the transport hands to the pipeline.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Chunk(Vec<u8>),
    /// The source ended cleanly.
    Closed,
    /// The source failed; carries a user-presentable description.
    Failed(String),
}

#[async_trait]
pub trait ResearchClient {
    /// Open one research stream for `query`.
    async fn open(&self, query: String) -> Result<Receiver<TransportEvent>>;
}

/// Streams from the HTTP research endpoint: one POST per directive, the
/// response body consumed incrementally.
pub struct HttpResearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResearchClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl ResearchClient for HttpResearchClient {
    async fn open(&self, query: String) -> Result<Receiver<TransportEvent>> {
        let (tx, rx) = mpsc::channel::<TransportEvent>(64);
        let request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&ResearchRequest { query });

        tokio::spawn(async move {
            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    let _ = tx.send(TransportEvent::Failed(e.to_string())).await;
                    return;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let _ = tx
                    .send(TransportEvent::Failed(format!(
                        "research endpoint returned {status}"
                    )))
                    .await;
                return;
            }

            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        if tx.send(TransportEvent::Chunk(bytes.to_vec())).await.is_err() {
                            // Receiver dropped: session cancelled or shut down.
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(TransportEvent::Failed(e.to_string())).await;
                        return;
                    }
                }
            }
            let _ = tx.send(TransportEvent::Closed).await;
        });

        Ok(rx)
    }
}

/// Replays a canned byte script. Used by tests and offline demos.
#[derive(Debug, Clone, Default)]
pub struct StubClient {
    chunks: Vec<Vec<u8>>,
    fail_with: Option<String>,
}

impl StubClient {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            fail_with: None,
        }
    }

    /// A stub whose stream fails after delivering `chunks`.
    pub fn failing(chunks: Vec<Vec<u8>>, reason: impl Into<String>) -> Self {
        Self {
            chunks,
            fail_with: Some(reason.into()),
        }
    }
}

#[async_trait]
impl ResearchClient for StubClient {
    async fn open(&self, _query: String) -> Result<Receiver<TransportEvent>> {
        let (tx, rx) = mpsc::channel(32);
        let chunks = self.chunks.clone();
        let fail_with = self.fail_with.clone();
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(TransportEvent::Chunk(chunk)).await.is_err() {
                    return;
                }
            }
            let end = match fail_with {
                Some(reason) => TransportEvent::Failed(reason),
                None => TransportEvent::Closed,
            };
            let _ = tx.send(end).await;
        });
        Ok(rx)
    }
}
