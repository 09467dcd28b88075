use super::service::{CommitMessageService, PipelineError, Preparation, PreparedInvocation};
use super::prompt::format_changes;
use crate::config::Config;
use crate::services::{BranchStatus, GenerationResult, InvocationStatus, MessageSlot};
use crate::types::{CommitOption, format_commit_message};
use crate::ui;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Options for the `gen` command
#[derive(Debug, Clone, Default)]
pub struct GenOptions {
    pub path: Option<PathBuf>,
    pub print: bool,
    pub select: Option<usize>,
    pub fast_only: bool,
}

fn repo_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Failed to read the current directory"),
    }
}

fn create_service(path: Option<PathBuf>, fast_only: bool) -> Result<CommitMessageService> {
    let path = repo_path(path)?;
    let root = crate::git::GitRepo::discover(&path).ok().map(|r| r.root().to_path_buf());
    let mut config = Config::load(root.as_deref())?;
    if fast_only {
        config.restrict_to_fast();
    }
    config.validate()?;

    CommitMessageService::new(config, &path).map_err(|e| {
        ui::print_error(&format!("Error: {e}"));
        ui::print_info("\nPlease ensure the following:");
        ui::print_info("1. Git is installed and accessible from the command line.");
        ui::print_info("2. You are running this command from within a Git repository or pass --path.");
        e.into()
    })
}

/// Prepares the invocation, or reports that nothing is staged
fn prepare(service: &CommitMessageService) -> Result<Option<PreparedInvocation>> {
    match service.prepare()? {
        Preparation::NoChanges => {
            ui::print_warning(
                "No staged changes. Please stage your changes before generating a commit message.",
            );
            ui::print_info("You can stage changes using 'git add <file>' or 'git add .'");
            Ok(None)
        }
        Preparation::Ready(prepared) => Ok(Some(prepared)),
    }
}

pub async fn handle_gen_command(options: GenOptions) -> Result<()> {
    let service = create_service(options.path, options.fast_only)?;
    let Some(prepared) = prepare(&service)? else {
        return Ok(());
    };

    if let Some(reason) = prepared.degraded_because {
        ui::print_warning(&format!("Sending a file summary only: {reason}"));
    }

    let spinner = ui::create_spinner("Waiting for commit message options...");
    let generated = service
        .generate(&prepared, |current| {
            if let Some(first) = current.first() {
                spinner.set_message(format!(
                    "{} option(s) so far, leading: {}",
                    current.len(),
                    first.subject()
                ));
            }
        })
        .await;
    spinner.finish_and_clear();

    let result = match generated {
        Ok(result) => result,
        Err(PipelineError::AllBranchesFailed { branches }) => {
            ui::print_error("No backend produced a usable commit message.");
            for branch in &branches {
                let detail = match &branch.status {
                    BranchStatus::BackendFailed { error } => error.clone(),
                    BranchStatus::ParseFailed => "response could not be parsed".to_string(),
                    other => format!("{other:?}"),
                };
                ui::print_error(&format!("  {} ({}): {}", branch.backend_id, branch.tier, detail));
            }
            bail!("all {} backend(s) failed", branches.len());
        }
        Err(e) => return Err(e.into()),
    };

    report_partial(&result);
    let options_list = result.options();

    if options.print {
        let index = options.select.unwrap_or(1);
        let option = pick(&options_list, index)?;
        println!("{}", option.message.trim_end());
        return Ok(());
    }

    print_options(&options_list);

    let index = match options.select {
        Some(index) => index,
        None => match read_selection(options_list.len())? {
            Some(index) => index,
            None => {
                ui::print_info("No option selected.");
                return Ok(());
            }
        },
    };

    let option = pick(&options_list, index)?;
    let slot = service.message_slot();
    service.apply(option, &slot)?;
    ui::print_success(&format!("Commit message written to {}", slot.describe()));
    ui::print_info("Run 'git commit' to review and commit.");
    Ok(())
}

/// Shows the budgeted changeset and the assembled prompt without calling any backend
pub fn handle_inspect_command(path: Option<PathBuf>) -> Result<()> {
    let service = create_service(path, false)?;
    let Some(prepared) = prepare(&service)? else {
        return Ok(());
    };

    ui::print_info(&format!(
        "{} staged file(s), {}",
        prepared.bundle.file_count(),
        match prepared.degraded_because {
            Some(reason) => format!("degraded: {reason}"),
            None => "full entries".to_string(),
        }
    ));
    for file in prepared.bundle.files() {
        println!(
            "  {:<10} {:<9} {} (+{} -{}, {} chars)",
            file.category.as_ref(),
            file.change_type,
            file.relative_path,
            file.additions,
            file.deletions,
            file.char_count
        );
    }

    ui::print_newline();
    ui::print_bordered_content(&format_changes(&prepared.bundle));
    ui::print_info("System prompt:");
    ui::print_bordered_content(&prepared.prompt.system);
    ui::print_info("User prompt:");
    ui::print_bordered_content(&prepared.prompt.user);
    Ok(())
}

fn report_partial(result: &GenerationResult) {
    if result.status() != InvocationStatus::Partial {
        return;
    }
    for branch in result.branches().iter().filter(|b| !b.succeeded()) {
        ui::print_warning(&format!(
            "Backend {} produced no options; showing results from the others.",
            branch.backend_id
        ));
    }
}

fn pick(options: &[CommitOption], index: usize) -> Result<&CommitOption> {
    index
        .checked_sub(1)
        .and_then(|i| options.get(i))
        .with_context(|| format!("Option {index} does not exist (1-{} available)", options.len()))
}

fn print_options(options: &[CommitOption]) {
    for (i, option) in options.iter().enumerate() {
        let header = format!("[{}] {}", i + 1, option.kind);
        if option.description.is_empty() {
            println!("{}", header.cyan().bold());
        } else {
            println!("{} {}", header.cyan().bold(), option.description.dimmed());
        }
        for line in format_commit_message(option).lines() {
            for wrapped in textwrap::wrap(line, textwrap::Options::new(76).break_words(false)) {
                println!("    {wrapped}");
            }
        }
        println!();
    }
}

/// Reads a 1-based option number from stdin. Empty input cancels.
fn read_selection(count: usize) -> Result<Option<usize>> {
    let stdin = io::stdin();
    loop {
        print!("Select an option [1-{count}] (Enter to cancel): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => return Ok(Some(n)),
            _ => ui::print_warning(&format!("Please enter a number between 1 and {count}.")),
        }
    }
}
