use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::executor::WorkflowExecutor;
use crate::store;
use crate::types::{Execution, Workflow};
use crate::validator;

#[derive(Parser)]
#[command(name = "flowhost")]
#[command(about = "Flowhost - generated-workflow execution engine", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Statically validate a workflow script file
    Validate {
        /// Path to the script file
        file: String,
    },

    /// Register a script file as a ready workflow and execute it
    Run {
        /// Path to the script file
        file: String,

        /// Input passed to the entry point
        input: String,

        /// Optional workflow name
        #[arg(long)]
        name: Option<String>,

        /// Attached file id (repeatable, order preserved)
        #[arg(long = "attach")]
        attach: Vec<i64>,
    },

    /// Execute a stored workflow by id
    Exec {
        /// Workflow ID
        workflow_id: String,

        /// Input passed to the entry point
        input: String,

        /// Attached file id (repeatable, order preserved)
        #[arg(long = "attach")]
        attach: Vec<i64>,
    },

    /// Show a stored workflow
    Workflow {
        /// Workflow ID to query
        workflow_id: String,
    },

    /// Show an execution record
    Status {
        /// Execution ID to query
        execution_id: String,
    },
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    use std::sync::Arc;

    if let Some(config_path) = &cli.config {
        std::env::set_var("FLOWHOST_CONFIG_PATH", config_path);
    }

    // Load and validate configuration before touching any backend so config
    // errors are shown immediately, not after partial command output.
    let config = Arc::new(Config::load()?);

    // Validation needs no store; handle it before opening a backend.
    if let Commands::Validate { file } = &cli.command {
        let source = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read script file {file}"))?;
        let verdict = validator::validate_source(&source);
        if verdict.valid {
            println!("✓ {file} is a valid workflow script");
            return Ok(());
        }
        eprintln!(
            "✗ {file}: {}",
            verdict.error.unwrap_or_else(|| "invalid".to_string())
        );
        std::process::exit(1);
    }

    let store = store::open_store(&config).await?;
    let executor = WorkflowExecutor::new(Arc::clone(&config), Arc::clone(&store));

    match cli.command {
        Commands::Validate { .. } => unreachable!("handled above"),

        Commands::Run {
            file,
            input,
            name,
            attach,
        } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read script file {file}"))?;

            let verdict = validator::validate_source(&source);
            if !verdict.valid {
                eprintln!(
                    "✗ {file}: {}",
                    verdict.error.unwrap_or_else(|| "invalid".to_string())
                );
                std::process::exit(1);
            }

            let workflow = Workflow::ready(name, &format!("script file {file}"), &source);
            store.store_workflow(&workflow).await?;
            println!("✓ Registered workflow {}", workflow.id);

            let attach = if attach.is_empty() { None } else { Some(attach) };
            let execution = executor.execute_workflow(&workflow.id, &input, attach).await?;
            print_execution(&execution);
        }

        Commands::Exec {
            workflow_id,
            input,
            attach,
        } => {
            let attach = if attach.is_empty() { None } else { Some(attach) };
            let execution = executor.execute_workflow(&workflow_id, &input, attach).await?;
            print_execution(&execution);
        }

        Commands::Workflow { workflow_id } => match store.get_workflow(&workflow_id).await? {
            Some(workflow) => {
                println!("Workflow: {}", workflow.id);
                if let Some(name) = &workflow.name {
                    println!("Name: {name}");
                }
                println!("Description: {}", workflow.description);
                println!("Status: {}", workflow.status);
                println!("Created: {}", workflow.created_at);
                println!("Updated: {}", workflow.updated_at);
                if let Some(error) = &workflow.error {
                    println!("\nError:\n  {error}");
                }
                println!("\nGenerated code:\n{}", workflow.generated_code);
            }
            None => {
                eprintln!("Workflow {workflow_id} not found");
                std::process::exit(1);
            }
        },

        Commands::Status { execution_id } => match store.get_execution(&execution_id).await? {
            Some(execution) => print_execution(&execution),
            None => {
                eprintln!("Execution {execution_id} not found");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn print_execution(execution: &Execution) {
    println!("Execution: {}", execution.id);
    println!("Workflow: {}", execution.workflow_id);
    println!("Status: {:?}", execution.status);
    println!("Created: {}", execution.created_at);
    if let Some(seconds) = execution.execution_time {
        println!("Elapsed: {seconds:.3}s");
    }
    if let Some(result) = &execution.result {
        println!("\nResult:\n{result}");
    }
    if let Some(error) = &execution.error {
        println!("\nError:\n  {error}");
    }
}
