mod cmd;
mod executor;
mod output;

use clap::{Parser, Subcommand};
use cmd::convert::{AgentArgs, RunExit};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vbconvert",
    about = "Convert legacy VB.NET WinForms entities to ASP.NET Core, one analysis step at a time",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the project config file
    #[arg(
        long,
        global = true,
        env = "VBCONVERT_CONFIG",
        default_value = vbconvert_core::config::DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every pending step for an entity, halting on the first failure
    Convert(AgentArgs),

    /// Run a single step for an entity regardless of its recorded status
    Step {
        /// Step number within the entity's mode
        number: u32,

        #[command(flatten)]
        args: AgentArgs,
    },

    /// Show the conversion status document for an entity
    Status {
        #[arg(long)]
        entity: Option<String>,

        /// Output root (default: outputDir from the config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Report progress and missing outputs across all entities
    Audit {
        /// Output root (default: outputDir from the config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate spec.md, the quality checklist and task files from the analysis
    Spec {
        #[arg(long)]
        entity: Option<String>,

        /// Master plan to compare against (default: {masterPlanDir}/{entity}-master-plan.md)
        #[arg(long)]
        master_plan: Option<PathBuf>,

        /// Output root (default: outputDir from the config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List legacy forms grouped by entity, or scan one form for child forms
    Forms {
        /// Form name to scan for forms it opens
        #[arg(long)]
        children: Option<String>,
    },

    /// Print the resolved legacy, reference and target paths for an entity
    Paths {
        #[arg(long)]
        entity: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Convert(_) | Commands::Step { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_path();
    let result = match cli.command {
        Commands::Convert(args) => cmd::convert::run(config, args, cli.json),
        Commands::Step { number, args } => cmd::step::run(config, number, args, cli.json),
        Commands::Status { entity, output } => {
            cmd::status::run(config, entity.as_deref(), output.as_deref(), cli.json)
        }
        Commands::Audit { output } => cmd::audit::run(config, output.as_deref(), cli.json),
        Commands::Spec {
            entity,
            master_plan,
            output,
        } => cmd::spec::run(
            config,
            entity.as_deref(),
            master_plan.as_deref(),
            output.as_deref(),
            cli.json,
        ),
        Commands::Forms { children } => cmd::forms::run(config, children.as_deref(), cli.json),
        Commands::Paths { entity } => cmd::paths::run(config, entity.as_deref(), cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let code = e.downcast_ref::<RunExit>().map(RunExit::exit_code).unwrap_or(1);
        std::process::exit(code);
    }
}
