//! Thin observer binary: submits one directive and prints state snapshots
//! as the session evolves. All protocol and state logic lives in
//! `research-core`; this file only paints what it observes.

use anyhow::Result;
use research_core::client::HttpResearchClient;
use research_core::config::Config;
use research_core::{Session, SessionState};
use research_protocol::{Op, SessionStatus, StepStatus};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        anyhow::bail!("usage: deepresearch <research directive>");
    }

    let config = Config::from_env();
    let client = Arc::new(HttpResearchClient::new(&config));
    let session = Session::spawn(client);
    let mut updates = session.subscribe();

    session.submit(Op::Submit { query }).await?;

    let mut started = false;
    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();
        render(&state);
        match state.status {
            SessionStatus::Processing => started = true,
            _ if started => break,
            _ => {}
        }
    }

    session.submit(Op::Shutdown).await?;
    Ok(())
}

fn render(state: &SessionState) {
    for step in &state.plan {
        let marker = match step.status {
            StepStatus::Pending => ' ',
            StepStatus::Active => '>',
            StepStatus::Completed => 'x',
        };
        println!("[{marker}] {}. {} ({})", step.id + 1, step.title, step.tool);
        for log in &step.logs {
            println!("       {log}");
        }
    }
    if let Some(message) = state.transcript.last() {
        println!("--- {}: {}", message.role.as_str(), message.content);
    }
    println!();
}
