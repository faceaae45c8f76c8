//! CLI binary for authoring, running and exporting Stagecraft pipelines.
//!
//! Every command operates on a pipeline document (`--file`, default
//! `pipeline.json`), the same JSON shape produced by `export`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use stagecraft_pipeline::{
    catalog, load_document, render_template, save_document, write_document, CancellationToken,
    ExecutionEvent, ExecutorConfig, MockExecutor, PipelineDocument, PipelineState, Position,
    RunOutcome,
};
use stagecraft_types::{field_label, BlockKind, LogStatus};

#[derive(Parser)]
#[command(name = "stagecraft", version, about = "CI/CD pipeline block editor and mock runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline document to operate on
    #[arg(short, long, global = true, default_value = "pipeline.json")]
    file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty pipeline document
    New {
        /// Pipeline name
        #[arg(default_value = stagecraft_pipeline::DEFAULT_PIPELINE_NAME)]
        name: String,

        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },

    /// Rename the pipeline
    Rename { name: String },

    /// List the available block types
    Catalog,

    /// Add a block of the given type (source, build, test, deploy, database, monitoring)
    Add {
        kind: String,

        /// Canvas x coordinate
        #[arg(long, default_value = "0")]
        x: f64,

        /// Canvas y coordinate
        #[arg(long, default_value = "0")]
        y: f64,
    },

    /// Show or edit a block's configuration
    Configure {
        /// Block id
        id: String,

        /// Field assignment; list fields take one item per line (use \n)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Delete a block and its connections
    Remove { id: String },

    /// Connect two blocks (from -> to)
    Connect { from: String, to: String },

    /// Show the pipeline's blocks and connections
    Info,

    /// Simulate a pipeline run
    Run {
        /// Seed for reproducible timing and outcomes
        #[arg(long)]
        seed: Option<u64>,

        /// Minimum simulated stage duration in milliseconds
        #[arg(long, default_value = "2000")]
        min_delay_ms: u64,

        /// Maximum simulated stage duration in milliseconds
        #[arg(long, default_value = "5000")]
        max_delay_ms: u64,

        /// Probability that a stage succeeds
        #[arg(long, default_value = "0.9")]
        success_rate: f64,
    },

    /// Print the generated CloudFormation template
    Template,

    /// Export the pipeline as `<name>-pipeline.json`
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file = cli.file.as_path();
    match cli.command {
        Commands::New { name, force } => cmd_new(file, &name, force).await?,
        Commands::Rename { name } => cmd_rename(file, name).await?,
        Commands::Catalog => cmd_catalog(),
        Commands::Add { kind, x, y } => cmd_add(file, &kind, x, y).await?,
        Commands::Configure { id, set } => cmd_configure(file, &id, &set).await?,
        Commands::Remove { id } => cmd_remove(file, &id).await?,
        Commands::Connect { from, to } => cmd_connect(file, &from, &to).await?,
        Commands::Info => cmd_info(file).await?,
        Commands::Run {
            seed,
            min_delay_ms,
            max_delay_ms,
            success_rate,
        } => {
            let config = ExecutorConfig {
                min_delay: Duration::from_millis(min_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
                success_rate,
                seed,
            };
            cmd_run(file, config).await?;
        }
        Commands::Template => cmd_template(file).await?,
        Commands::Export { out_dir } => {
            let path = cmd_export(file, &out_dir).await?;
            println!("Exported {}", path.display());
        }
    }

    Ok(())
}

async fn load_state(path: &Path) -> anyhow::Result<PipelineState> {
    let document = load_document(path)
        .await
        .with_context(|| format!("failed to load pipeline from {}", path.display()))?;
    Ok(document.into_state())
}

async fn save_state(path: &Path, state: &PipelineState) -> anyhow::Result<()> {
    let document = PipelineDocument::from_state(state)?;
    write_document(&document, path)
        .await
        .with_context(|| format!("failed to write pipeline to {}", path.display()))?;
    Ok(())
}

async fn cmd_new(path: &Path, name: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    save_state(path, &PipelineState::new(name)).await?;
    println!("Created pipeline '{}' at {}", name, path.display());
    Ok(())
}

async fn cmd_rename(path: &Path, name: String) -> anyhow::Result<()> {
    let mut state = load_state(path).await?;
    state.rename(name);
    save_state(path, &state).await?;
    println!("Renamed pipeline to '{}'", state.name());
    Ok(())
}

fn cmd_catalog() {
    println!("Pipeline Blocks:");
    for entry in catalog() {
        println!(
            "  {:<11} {:<19} {}  icon={}",
            entry.kind.key(),
            entry.name,
            entry.color,
            entry.icon
        );
    }
}

async fn cmd_add(path: &Path, kind: &str, x: f64, y: f64) -> anyhow::Result<()> {
    let kind: BlockKind = kind.parse()?;
    let mut state = load_state(path).await?;
    let id = state.add_block(kind, Position::new(x, y)).id().to_string();
    save_state(path, &state).await?;
    println!("Added {} ({})", id, kind.display_name());
    Ok(())
}

async fn cmd_configure(path: &Path, id: &str, assignments: &[String]) -> anyhow::Result<()> {
    let mut state = load_state(path).await?;
    state.require_block(id)?;
    state.select_block(Some(id));

    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected FIELD=VALUE, got '{}'", assignment))?;
        state.set_selected_field(field.trim(), &value.replace("\\n", "\n"))?;
    }
    if !assignments.is_empty() {
        save_state(path, &state).await?;
    }

    if let Some(block) = state.selected_block() {
        println!("Configure {} ({})", block.display_name(), block.id());
        for (field, value) in block.config().fields() {
            println!("  {}: {}", field_label(field), value.to_string().replace('\n', ", "));
        }
    }
    Ok(())
}

async fn cmd_remove(path: &Path, id: &str) -> anyhow::Result<()> {
    let mut state = load_state(path).await?;
    state.require_block(id)?;
    state.delete_block(id);
    save_state(path, &state).await?;
    println!("Removed {}", id);
    Ok(())
}

async fn cmd_connect(path: &Path, from: &str, to: &str) -> anyhow::Result<()> {
    let mut state = load_state(path).await?;
    for id in [from, to] {
        if state.block(id).is_none() {
            tracing::warn!(block = %id, "Connecting to a block that does not exist");
        }
    }
    if state.connect_blocks(from, to) {
        save_state(path, &state).await?;
        println!("Connected {} -> {}", from, to);
    } else {
        println!("Connection {} -> {} unchanged", from, to);
    }
    Ok(())
}

async fn cmd_info(path: &Path) -> anyhow::Result<()> {
    let state = load_state(path).await?;

    println!("Pipeline: {}", state.name());
    println!("Blocks: {}", state.blocks().len());
    println!("Connections: {}", state.connections().len());

    if state.is_empty() {
        println!("\nStart building your pipeline: stagecraft add <type>");
        return Ok(());
    }

    println!("\nBlocks (execution order):");
    for (index, block) in state.blocks().iter().enumerate() {
        let pos = block.position();
        println!(
            "  {}. {} [{}] at ({}, {})",
            index + 1,
            block.id(),
            block.display_name(),
            pos.x,
            pos.y
        );
    }

    if !state.connections().is_empty() {
        let resolved: HashSet<(&str, &str)> = state
            .resolved_connections()
            .map(|(from, to)| (from.id(), to.id()))
            .collect();
        println!("\nConnections:");
        for conn in state.connections() {
            let marker = if resolved.contains(&(conn.from.as_str(), conn.to.as_str())) {
                ""
            } else {
                " (dangling)"
            };
            println!("  {} -> {}{}", conn.from, conn.to, marker);
        }
    }

    Ok(())
}

async fn cmd_run(path: &Path, config: ExecutorConfig) -> anyhow::Result<()> {
    let state = load_state(path).await?;
    let mut executor = MockExecutor::with_config(config)?;

    // Print log entries as they arrive
    let mut events = executor.events().subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ExecutionEvent::LogAppended { entry, .. } = event {
                let tag = match entry.status {
                    LogStatus::Running => "RUN ",
                    LogStatus::Success => "OK  ",
                    LogStatus::Error => "FAIL",
                };
                println!("[{}] {} {}: {}", entry.time, tag, entry.stage, entry.message);
            }
        }
    });

    // Ctrl-C cancels the in-flight stage
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    println!("Executing pipeline: {}", state.name());
    let result = executor.execute_with_cancel(&state, cancel).await;
    drop(executor);
    let _ = printer.await;
    let report = result?;

    println!();
    match &report.outcome {
        RunOutcome::Completed => {
            println!(
                "Pipeline completed in {:.1}s",
                report.duration.as_secs_f64()
            );
        }
        RunOutcome::Halted { index, block_id } => {
            println!("Pipeline halted at stage {} ({})", index + 1, block_id);
            std::process::exit(1);
        }
        RunOutcome::Cancelled { index, block_id } => {
            println!("Pipeline cancelled at stage {} ({})", index + 1, block_id);
            std::process::exit(130);
        }
    }

    Ok(())
}

async fn cmd_template(path: &Path) -> anyhow::Result<()> {
    let state = load_state(path).await?;
    println!("{}", render_template(state.name(), state.blocks())?);
    Ok(())
}

async fn cmd_export(path: &Path, out_dir: &Path) -> anyhow::Result<PathBuf> {
    let state = load_state(path).await?;
    let document = PipelineDocument::from_state(&state)?;
    Ok(save_document(&document, out_dir).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_types::StagecraftError;

    async fn fixture(dir: &Path, kinds: &[&str]) -> PathBuf {
        let path = dir.join("pipeline.json");
        cmd_new(&path, "CLI Test", false).await.unwrap();
        for kind in kinds {
            cmd_add(&path, kind, 0.0, 0.0).await.unwrap();
        }
        path
    }

    fn block_not_found(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<StagecraftError>(),
            Some(StagecraftError::BlockNotFound { .. })
        )
    }

    #[tokio::test]
    async fn new_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), &[]).await;
        assert!(cmd_new(&path, "Again", false).await.is_err());
        cmd_new(&path, "Again", true).await.unwrap();
        assert_eq!(load_state(&path).await.unwrap().name(), "Again");
    }

    #[tokio::test]
    async fn rename_and_add_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), &["source", "build"]).await;
        cmd_rename(&path, "Renamed".into()).await.unwrap();

        let state = load_state(&path).await.unwrap();
        assert_eq!(state.name(), "Renamed");
        assert_eq!(state.blocks().len(), 2);
    }

    #[tokio::test]
    async fn remove_unknown_block_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), &["source"]).await;

        let err = cmd_remove(&path, "missing-1").await.unwrap_err();
        assert!(block_not_found(&err), "{err:?}");
        assert_eq!(load_state(&path).await.unwrap().blocks().len(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), &["source", "build"]).await;
        let id = load_state(&path).await.unwrap().blocks()[0].id().to_string();

        cmd_remove(&path, &id).await.unwrap();
        let state = load_state(&path).await.unwrap();
        assert_eq!(state.blocks().len(), 1);
        assert!(state.block(&id).is_none());
    }

    #[tokio::test]
    async fn configure_unknown_block_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), &["build"]).await;
        let err = cmd_configure(&path, "missing-1", &["runtime=rust".into()])
            .await
            .unwrap_err();
        assert!(block_not_found(&err), "{err:?}");
    }

    #[tokio::test]
    async fn configure_applies_assignments() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), &["build"]).await;
        let id = load_state(&path).await.unwrap().blocks()[0].id().to_string();

        cmd_configure(&path, &id, &["commands=make\\nmake test".into()])
            .await
            .unwrap();

        let state = load_state(&path).await.unwrap();
        assert_eq!(
            state.block(&id).unwrap().config().get("commands").unwrap().to_string(),
            "make\nmake test"
        );
    }

    #[tokio::test]
    async fn export_stays_in_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), &["build"]).await;
        cmd_rename(&path, "../escaped".into()).await.unwrap();

        let out = dir.path().join("out").join("sub");
        let exported = cmd_export(&path, &out).await.unwrap();
        assert_eq!(exported.parent(), Some(out.as_path()));
        assert!(exported.exists());
    }
}
