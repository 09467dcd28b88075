//! Concurrent fan-out to generation backends with incremental merging.
//!
//! Each backend runs as its own task and reports back over a channel. The
//! receiving loop is the single owner of the `GenerationResult`, so
//! append, sort and publish happen as one step per completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::parser::{ParseMode, ResponseParser};
use super::sorter::{RankedOption, Sorter};
use crate::commit::prompt::AssembledPrompt;
use crate::llm::{GENERATION_LOG_TARGET, GenerationBackend, GenerationError, GenerationRequest};
use crate::providers::BackendTier;
use crate::types::CommitOption;
use crate::{log_debug, log_warn};

/// How one branch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchStatus {
    /// Still running; only seen before the invocation settles
    Pending,
    Succeeded { options: usize, mode: ParseMode },
    /// Transport, HTTP, timeout or task failure
    BackendFailed { error: String },
    /// The backend answered but nothing valid could be extracted
    ParseFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    pub backend_id: String,
    pub tier: BackendTier,
    pub status: BranchStatus,
}

impl BranchRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, BranchStatus::Succeeded { .. })
    }
}

/// Overall outcome once every branch has settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    /// Every branch produced options
    Success,
    /// Some options exist but at least one branch failed
    Partial,
    /// No branch produced any option
    Failed,
}

/// Accumulator for one invocation: sorted options plus per-branch records
#[derive(Debug, Clone)]
pub struct GenerationResult {
    invocation_id: Uuid,
    options: Vec<RankedOption>,
    branches: Vec<BranchRecord>,
}

impl GenerationResult {
    fn new(invocation_id: Uuid, backends: &[Arc<dyn GenerationBackend>]) -> Self {
        Self {
            invocation_id,
            options: Vec::new(),
            branches: backends
                .iter()
                .map(|b| BranchRecord {
                    backend_id: b.id().to_string(),
                    tier: b.tier(),
                    status: BranchStatus::Pending,
                })
                .collect(),
        }
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Options in canonical order
    pub fn options(&self) -> Vec<CommitOption> {
        self.options.iter().map(|r| r.option.clone()).collect()
    }


    pub fn branches(&self) -> &[BranchRecord] {
        &self.branches
    }

    pub fn status(&self) -> InvocationStatus {
        if self.options.is_empty() {
            InvocationStatus::Failed
        } else if self.branches.iter().all(BranchRecord::succeeded) {
            InvocationStatus::Success
        } else {
            InvocationStatus::Partial
        }
    }

    fn is_settled(&self, index: usize) -> bool {
        self.branches[index].status != BranchStatus::Pending
    }

    fn record(&mut self, index: usize, status: BranchStatus) {
        self.branches[index].status = status;
    }

    fn append(&mut self, index: usize, options: Vec<CommitOption>, sorter: &Sorter) {
        self.options.extend(
            options
                .into_iter()
                .enumerate()
                .map(|(position, option)| RankedOption {
                    option,
                    branch_index: index,
                    position,
                }),
        );
        sorter.sort(&mut self.options);
    }
}

/// Message sent by a branch task when it finishes
struct BranchCompletion {
    index: usize,
    outcome: Result<String, GenerationError>,
}

pub struct GenerationOrchestrator {
    backends: Vec<Arc<dyn GenerationBackend>>,
    sorter: Sorter,
    parser: ResponseParser,
    timeout: Duration,
}

impl GenerationOrchestrator {
    /// `backends` order is the tie-break order for equally ranked options
    pub fn new(backends: Vec<Arc<dyn GenerationBackend>>, sorter: Sorter, timeout: Duration) -> Self {
        Self {
            backends,
            sorter,
            parser: ResponseParser::new(),
            timeout,
        }
    }


    /// Runs every backend concurrently and returns once all have settled.
    ///
    /// `on_update` receives the accumulated, sorted list after each branch
    /// completes, including branches that contributed nothing.
    pub async fn run<F>(&self, prompt: Arc<AssembledPrompt>, on_update: F) -> GenerationResult
    where
        F: FnMut(&[CommitOption]),
    {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("generation", invocation = %invocation_id);
        self.run_inner(invocation_id, prompt, on_update)
            .instrument(span)
            .await
    }

    async fn run_inner<F>(
        &self,
        invocation_id: Uuid,
        prompt: Arc<AssembledPrompt>,
        mut on_update: F,
    ) -> GenerationResult
    where
        F: FnMut(&[CommitOption]),
    {
        let mut result = GenerationResult::new(invocation_id, &self.backends);
        crate::trace_info!(branches = self.backends.len(), "Starting generation");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles: Vec<JoinHandle<()>> = self
            .backends
            .iter()
            .enumerate()
            .map(|(index, backend)| {
                let request = GenerationRequest::new(Arc::clone(&prompt), backend.id());
                self.spawn_branch(index, Arc::clone(backend), request, tx.clone())
            })
            .collect();
        drop(tx);

        while let Some(completion) = rx.recv().await {
            self.settle(&mut result, completion);
            on_update(&result.options());
        }

        // A task that never reported panicked or was cancelled
        for (index, handle) in handles.into_iter().enumerate() {
            if result.is_settled(index) {
                continue;
            }
            let error = match handle.await {
                Err(e) if e.is_panic() => "branch task panicked".to_string(),
                Err(e) => e.to_string(),
                Ok(()) => "branch ended without reporting".to_string(),
            };
            self.settle(
                &mut result,
                BranchCompletion {
                    index,
                    outcome: Err(GenerationError::Aborted(error)),
                },
            );
            on_update(&result.options());
        }

        crate::trace_info!(
            options = result.options.len(),
            status = ?result.status(),
            "Generation settled"
        );
        result
    }

    fn spawn_branch(
        &self,
        index: usize,
        backend: Arc<dyn GenerationBackend>,
        request: GenerationRequest,
        tx: mpsc::UnboundedSender<BranchCompletion>,
    ) -> JoinHandle<()> {
        let timeout = self.timeout;
        let span = tracing::debug_span!("branch", backend = %backend.id());
        tokio::spawn(
            async move {
                let outcome = match tokio::time::timeout(timeout, backend.complete(&request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(GenerationError::Timeout(timeout)),
                };
                // The receiver only goes away if the invocation itself was dropped
                let _ = tx.send(BranchCompletion { index, outcome });
            }
            .instrument(span),
        )
    }

    fn settle(&self, result: &mut GenerationResult, completion: BranchCompletion) {
        let BranchCompletion { index, outcome } = completion;
        let backend_id = result.branches[index].backend_id.clone();

        match outcome {
            Ok(text) => {
                let report = self.parser.parse(&backend_id, &text);
                if report.options.is_empty() {
                    result.record(index, BranchStatus::ParseFailed);
                    return;
                }
                log_debug!(
                    "Backend {} produced {} option(s) ({:?})",
                    backend_id,
                    report.options.len(),
                    report.mode
                );
                result.record(
                    index,
                    BranchStatus::Succeeded {
                        options: report.options.len(),
                        mode: report.mode,
                    },
                );
                result.append(index, report.options, &self.sorter);
            }
            Err(error) => {
                log_warn!(
                    target: GENERATION_LOG_TARGET,
                    "Backend {} failed: {}",
                    backend_id,
                    error
                );
                result.record(
                    index,
                    BranchStatus::BackendFailed {
                        error: error.to_string(),
                    },
                );
            }
        }
    }
}
