use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::budget::{BudgetOutcome, ChunkBudgeter, DegradeReason};
use super::prompt::{AssembledPrompt, assemble};
use super::types::DiffBundle;
use crate::config::Config;
use crate::context::ProjectMetadata;
use crate::git::{CollectionError, DiffCollector, GitRepo};
use crate::llm::{GenerationBackend, backends_from_config};
use crate::services::{
    BranchRecord, GenerationOrchestrator, GenerationResult, GitMessageFile, InvocationStatus,
    MessageSlot, Sorter,
};
use crate::types::CommitOption;
use crate::log_debug;

/// Errors that end an invocation without any options
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error("Failed to build the prompt: {0}")]
    Prompt(#[from] serde_json::Error),
    #[error("No backend produced a usable commit message ({} tried)", branches.len())]
    AllBranchesFailed { branches: Vec<BranchRecord> },
}

/// A budgeted changeset and its prompt, ready to send
#[derive(Debug, Clone)]
pub struct PreparedInvocation {
    pub bundle: DiffBundle,
    pub degraded_because: Option<DegradeReason>,
    pub metadata: ProjectMetadata,
    pub prompt: Arc<AssembledPrompt>,
}

/// Result of the sequential half of the pipeline
#[derive(Debug, Clone)]
pub enum Preparation {
    /// Nothing is staged. Not an error.
    NoChanges,
    Ready(PreparedInvocation),
}

/// Service for generating commit messages from staged changes
pub struct CommitMessageService {
    config: Config,
    collector: DiffCollector<GitRepo>,
    backends: Vec<Arc<dyn GenerationBackend>>,
}

impl CommitMessageService {
    /// Discovers the repository at or above `repo_path` and builds one
    /// backend per enabled config entry.
    pub fn new(config: Config, repo_path: &Path) -> Result<Self, PipelineError> {
        let repo = GitRepo::discover(repo_path)?;
        let backends = backends_from_config(&config);
        Ok(Self {
            collector: DiffCollector::new(repo, config.budget.max_diff_bytes),
            config,
            backends,
        })
    }

    /// Replaces the configured backends, e.g. with in-process fakes
    pub fn with_backends(mut self, backends: Vec<Arc<dyn GenerationBackend>>) -> Self {
        self.backends = backends;
        self
    }

    pub fn repo(&self) -> &GitRepo {
        self.collector.source()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Collects, classifies and budgets the staged changes, then assembles the
    /// prompt. Runs strictly sequentially.
    pub fn prepare(&self) -> Result<Preparation, PipelineError> {
        let Some(snapshot) = self.collector.collect()? else {
            return Ok(Preparation::NoChanges);
        };

        let BudgetOutcome {
            bundle,
            reason,
            total_chars,
        } = ChunkBudgeter::new(&self.config.budget).build(&self.collector, &snapshot)?;
        log_debug!(
            "Bundle ready: {} files, {} chars, degraded: {}",
            bundle.file_count(),
            total_chars,
            bundle.is_degraded()
        );

        let repo = self.repo();
        let metadata = ProjectMetadata::resolve(repo.root(), &self.config.project)
            .with_branch(repo.current_branch())
            .with_recent_commits(repo.recent_commit_subjects(self.config.generation.recent_commits));

        let prompt = assemble(&self.config, &bundle, &metadata)?;
        Ok(Preparation::Ready(PreparedInvocation {
            bundle,
            degraded_because: reason,
            metadata,
            prompt: Arc::new(prompt),
        }))
    }

    /// Queries every backend concurrently. `on_update` sees the growing,
    /// sorted option list after each branch settles.
    pub async fn generate<F>(
        &self,
        prepared: &PreparedInvocation,
        on_update: F,
    ) -> Result<GenerationResult, PipelineError>
    where
        F: FnMut(&[CommitOption]),
    {
        let orchestrator = GenerationOrchestrator::new(
            self.backends.clone(),
            Sorter::new(&self.config.generation.style_priority),
            Duration::from_secs(self.config.generation.request_timeout_secs),
        );

        let result = orchestrator
            .run(Arc::clone(&prepared.prompt), on_update)
            .await;
        log_debug!(
            "Invocation {} settled: {:?}",
            result.invocation_id(),
            result.status()
        );
        if result.status() == InvocationStatus::Failed {
            return Err(PipelineError::AllBranchesFailed {
                branches: result.branches().to_vec(),
            });
        }
        Ok(result)
    }

    /// The repository's pending commit message file
    pub fn message_slot(&self) -> GitMessageFile {
        GitMessageFile::for_repo(self.repo(), &self.config.pending_message_file)
    }

    /// Writes the chosen option's message into `slot` exactly as generated,
    /// replacing its previous contents
    pub fn apply(&self, option: &CommitOption, slot: &dyn MessageSlot) -> anyhow::Result<()> {
        slot.write(&option.message)
    }
}
