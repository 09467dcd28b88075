use super::budget::ENTRY_SEPARATOR;
use super::types::DiffBundle;
use crate::config::Config;
use crate::context::ProjectMetadata;
use crate::types::CommitOption;

/// The finished prompt for one invocation, shared by every branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// Instructions and output schema
    pub system: String,
    /// Changeset entries (or the summary) followed by project metadata
    pub user: String,
    /// Rendered project metadata block
    pub metadata: String,
}

pub fn create_system_prompt(config: &Config) -> Result<String, serde_json::Error> {
    let option_schema = schemars::schema_for!(Vec<CommitOption>);
    let option_schema_str = serde_json::to_string_pretty(&option_schema)?;

    let mut prompt = String::from(
        "You write Git commit messages for the staged changes you are given.

        Produce several alternative commit messages, each in a different style. \
        Use these style tags for the `type` field where they fit:

        - concise: a single subject line, at most 50 characters
        - conventional: Conventional Commits format (`type(scope): subject`) with an optional body
        - detailed: a subject line, a blank line, then a body wrapped at 72 characters
        - historical: match the tone and format of the recent commits shown

        Guidelines:

        1. Use the imperative mood in the subject line.
        2. Never exceed 72 characters in a subject line.
        3. Describe only changes that are shown. Do not guess at intent.
        4. When only a file summary is given, describe the change at the level of files and areas.
        5. Do not wrap the answer in prose.

        Respond with a JSON array. Each element has a `type`, a one-line `description` \
        of the option, and the full `message`. Quote newlines inside strings.

        Example:

        [
          {\"type\": \"concise\", \"description\": \"Subject only\", \"message\": \"Add retry limit to uploader\"},
          {\"type\": \"detailed\", \"description\": \"Subject and body\", \"message\": \"Add retry limit to uploader\\n\\nStop after five failed attempts.\"}
        ]

        The response must match this JSON schema:
        ",
    );

    prompt.push_str(&option_schema_str);

    let instructions = config.generation.instructions.trim();
    if !instructions.is_empty() {
        prompt.push_str("\n\nAdditional instructions:\n");
        prompt.push_str(instructions);
    }

    Ok(prompt)
}

/// Entries in collector order, or the stat summary for a degraded bundle
pub fn format_changes(bundle: &DiffBundle) -> String {
    match bundle.summary() {
        Some(summary) => format!(
            "The changeset is too large to show in full. File summary only:\n\n{}",
            summary.render()
        ),
        None => bundle
            .files()
            .iter()
            .map(|f| f.entry_text.trim_end_matches('\n'))
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR),
    }
}

pub fn create_user_prompt(bundle: &DiffBundle, metadata: &str) -> String {
    format!(
        "Generate commit message options for the following staged changes.\n\n\
        Staged changes:\n{}\n\n\
        Project metadata:\n{}",
        format_changes(bundle),
        metadata
    )
}

/// Builds the single immutable prompt for an invocation
pub fn assemble(
    config: &Config,
    bundle: &DiffBundle,
    metadata: &ProjectMetadata,
) -> Result<AssembledPrompt, serde_json::Error> {
    let metadata = metadata.render();
    Ok(AssembledPrompt {
        system: create_system_prompt(config)?,
        user: create_user_prompt(bundle, &metadata),
        metadata,
    })
}
