//! Git-Quill - commit message options from staged changes
//!
//! This library turns a repository's staged changes into a bounded prompt,
//! queries one or more chat-completion backends concurrently, and merges
//! their answers into one ordered list of commit message options.

// Allow certain clippy warnings that are either stylistic or from external dependencies
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::future_not_send)] // Callbacks passed to the orchestrator need not be Send
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine
#![allow(clippy::redundant_clone)] // Sometimes more explicit is clearer

pub mod cli;
pub mod commit;
pub mod config;
pub mod context;
pub mod git;
pub mod llm;
pub mod logger;
pub mod providers;
pub mod services;
pub mod types;
pub mod ui;

// Re-export important structs and functions for easier testing
pub use commit::{CommitMessageService, PipelineError, Preparation};
pub use config::Config;
pub use providers::{BackendConfig, BackendTier};
pub use types::{CommitOption, format_commit_message};
