//! Structured output types produced by generation backends

mod commit;

pub use self::commit::{CommitOption, format_commit_message};
