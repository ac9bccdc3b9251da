// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! `dfd` CLI: runs a document through the pipeline without a renderer.
//!
//! The diagram is loaded, measured at its declared sizes, optionally laid out, then written to
//! `--out` or printed to stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dfd_pipeline::config::{load_config, EditorConfig};
use dfd_pipeline::layout::LayoutAdapter;
use dfd_pipeline::model::{Bounds, DiagramModel};
use dfd_pipeline::ops::{measure_declared_bounds, Action, CommandContext, CommandRegistry};
use dfd_pipeline::stack::{CommandStack, DispatchOutcome};
use dfd_pipeline::store::{document_schema, serialize_document, FsStorage};

const HEADLESS_CANVAS: Bounds = Bounds {
    x: 0.0,
    y: 0.0,
    width: 1280.0,
    height: 800.0,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace); overrides RUST_LOG, defaults to info
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Load a diagram document
    Load {
        /// Path to the input document
        input: PathBuf,
        /// Run automatic layout after loading
        #[arg(long)]
        layout: bool,
        /// Where to write the result; stdout if omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Start from the built-in default diagram
    Default {
        #[arg(long)]
        layout: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the JSON schema of the document format
    Schema,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid log level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_deref())?;

    let (input, layout, out) = match args.command {
        Cmd::Schema => {
            println!("{}", serde_json::to_string_pretty(&document_schema())?);
            return Ok(());
        }
        Cmd::Load { input, layout, out } => (Some(input), layout, out),
        Cmd::Default { layout, out } => (None, layout, out),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(&config, input, layout, out))
}

async fn run(
    config: &EditorConfig,
    input: Option<PathBuf>,
    layout: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let out_dir = out
        .as_deref()
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let load = if input.is_some() {
        Action::Load
    } else {
        Action::LoadDefault
    };

    let context = CommandContext::new()
        .with_storage(Arc::new(FsStorage::new(input, out_dir)))
        .with_layout(LayoutAdapter::new(Arc::new(config.layout_engine())))
        .with_settings(config.command_settings());
    let stack = CommandStack::new(
        DiagramModel::empty(),
        context,
        CommandRegistry::with_defaults(),
        config.stack_options(),
    )
    .spawn();

    if stack.dispatch(load).await? == DispatchOutcome::Aborted {
        bail!("no document to load");
    }
    let loaded = stack.state().await?;
    stack
        .dispatch(measure_declared_bounds(&loaded.model, HEADLESS_CANVAS))
        .await?;
    if layout {
        stack.dispatch(Action::Layout).await?;
    }

    match out {
        Some(path) => {
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_owned)
                .with_context(|| format!("{} is not a file path", path.display()))?;
            stack
                .dispatch(Action::Save {
                    file_name: Some(file_name),
                })
                .await?;
            info!(path = %path.display(), "diagram written");
        }
        None => {
            let state = stack.state().await?;
            let text = serialize_document(&state.model, &state.label_types, state.editor_mode)?;
            println!("{text}");
        }
    }
    Ok(())
}
