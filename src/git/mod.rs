// Git module: read-only access to the staged changes of a repository

mod diff_split;
mod error;
mod files;
mod repository;
mod utils;

pub use diff_split::{DiffFragment, index_fragments, parse_header_destination, split_diff};
pub use error::CollectionError;
pub use files::{
    DiffCollector, LineStats, StagedEntry, StagedSnapshot, StagedSource, parse_name_status,
    parse_numstat,
};
pub use repository::GitRepo;
pub use utils::{CappedOutput, is_binary_diff, run_git_capped, run_git_command};
