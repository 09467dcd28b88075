use anyhow::Result;
use git_quill::{cli, logger};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logger::init() {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    cli::main().await
}
