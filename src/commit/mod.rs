mod cli;

pub mod budget;
pub mod classify;
pub mod prompt;
pub mod service;
pub mod types;

pub use budget::{BudgetOutcome, ChunkBudgeter, DegradeReason};
pub use classify::DiffClassifier;
pub use cli::{GenOptions, handle_gen_command, handle_inspect_command};
pub use prompt::AssembledPrompt;
pub use service::{CommitMessageService, PipelineError, Preparation, PreparedInvocation};
pub use types::{Category, DiffBundle, FileChange, StatEntry, StatSummary};
