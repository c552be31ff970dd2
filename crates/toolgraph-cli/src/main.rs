use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolgraph::commands::{build, dev, list};
use toolgraph::{logger, GlobalOpts};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "toolgraph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "GraphQL operation manifest compiler",
    long_about = "toolgraph compiles the GraphQL operations embedded in your application source into a tool manifest for AI hosts."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every operation and write the manifest once
    Build(build::BuildCommand),
    /// Write the manifest now and keep it current while files change
    Dev(dev::DevCommand),
    /// Show the operations and tools of a written manifest
    List {
        /// Manifest file or directory containing one (default: current directory)
        path: Option<PathBuf>,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| logger::verbosity_to_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.quiet) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let result = match cli.command {
        Commands::Build(cmd) => build::handle_build(cmd, &cli.global).map_err(|e| e.to_string()),
        Commands::Dev(cmd) => dev::handle_dev(cmd, &cli.global).map_err(|e| e.to_string()),
        Commands::List { path } => {
            list::list_operations(path, &cli.global).map_err(|e| e.to_string())
        }
    };

    if let Err(e) = result {
        logger::error(&e);
        std::process::exit(1);
    }
}
