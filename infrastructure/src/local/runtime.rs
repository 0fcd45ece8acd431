//! Local execution runtime that streams canned worker output.

use super::words;
use async_trait::async_trait;
use conductor_application::{
    ExecutionRuntime, InterruptRequest, RuntimeError, WorkerAssignment, WorkerEvent, WorkerStream,
};
use conductor_domain::{OperationDescriptor, RiskLevel, truncate};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

/// Runtime that answers every assignment locally.
///
/// Output is streamed word by word. Instructions containing a risky keyword
/// raise an approval interrupt before any output; a denied approval ends the
/// step without output.
pub struct OfflineExecutionRuntime {
    risky_keywords: Vec<String>,
    chunk_delay: Duration,
}

impl OfflineExecutionRuntime {
    pub fn new(risky_keywords: impl IntoIterator<Item = String>) -> Self {
        Self {
            risky_keywords: risky_keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            chunk_delay: Duration::ZERO,
        }
    }

    /// Pause between streamed words.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    fn risky_keyword(&self, instructions: &str) -> Option<String> {
        words(instructions).find(|w| self.risky_keywords.contains(w))
    }
}

/// The line of the instructions the worker is answering.
fn focus(instructions: &str) -> &str {
    let mut lines = instructions.lines();
    while let Some(line) = lines.next() {
        if line.starts_with("Your part:") {
            return lines.next().unwrap_or(line);
        }
    }
    instructions
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("Task: ")
}

fn compose_output(assignment: &WorkerAssignment) -> String {
    let subject = focus(&assignment.instructions);
    if assignment.round == 0 {
        format!("{} handled: {}", assignment.worker, subject)
    } else {
        format!(
            "{} revised (round {}): {}",
            assignment.worker, assignment.round, subject
        )
    }
}

#[async_trait]
impl ExecutionRuntime for OfflineExecutionRuntime {
    async fn start(&self, assignment: WorkerAssignment) -> Result<WorkerStream, RuntimeError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let risky = self.risky_keyword(&assignment.instructions);
        let delay = self.chunk_delay;
        let output = compose_output(&assignment);
        let worker = assignment.worker.clone();

        tokio::spawn(async move {
            if let Some(keyword) = risky {
                let operation = OperationDescriptor::new(
                    keyword.clone(),
                    truncate(focus(&assignment.instructions), 120),
                )
                .with_payload(serde_json::json!({
                    "worker": worker.as_str(),
                    "keyword": keyword,
                }));
                let (request, reply) = InterruptRequest::new(operation, RiskLevel::High);
                if tx.send(WorkerEvent::Interrupt(request)).await.is_err() {
                    return;
                }
                match reply.await {
                    Ok(outcome) if outcome.is_allowed() => {}
                    _ => {
                        debug!("Worker {} stops: '{}' was not approved", worker, keyword);
                        return;
                    }
                }
            }

            let mut first = true;
            for word in output.split_whitespace() {
                let chunk = if first {
                    word.to_string()
                } else {
                    format!(" {}", word)
                };
                first = false;
                if tx.send(WorkerEvent::Delta(chunk)).await.is_err() {
                    return;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            let _ = tx.send(WorkerEvent::Completed(output)).await;
        });

        Ok(WorkerStream::new(rx))
    }
}
