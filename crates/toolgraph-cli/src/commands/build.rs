use crate::errors::LifecycleError;
use crate::lifecycle::{CompilerSession, SessionOptions};
use crate::logger;
use crate::GlobalOpts;
use clap::Parser;
use std::path::PathBuf;
use toolgraph_ast::AstGrepExtractor;
use toolgraph_manifest::{BuildContext, PRODUCTION_MODE};

#[derive(Parser, Debug)]
pub struct BuildCommand {
    /// Build mode; selects `entry.<mode>` from the configuration
    #[arg(long, default_value = PRODUCTION_MODE)]
    pub mode: String,

    /// Output directory, overriding `out_dir` from the configuration
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,
}

/// One-shot build: scan everything, then write the manifest once
pub fn handle_build(cmd: BuildCommand, _opts: &GlobalOpts) -> Result<(), LifecycleError> {
    let root = match cmd.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    let mut options = SessionOptions::new(&root, BuildContext::build(cmd.mode.as_str()));
    if let Some(out_dir) = cmd.out_dir {
        options = options.with_out_dir(out_dir);
    }

    logger::spinner_start(&format!("Compiling operations ({} mode)", cmd.mode));
    let result = CompilerSession::start(options, AstGrepExtractor).and_then(|mut session| {
        let written = session.bundle_finalized()?;
        let count = session.manifest().map_or(0, |m| m.operations.len());
        Ok((written, count))
    });

    match result {
        Ok((written, count)) => {
            logger::spinner_success(&format!(
                "Wrote manifest with {} operation{} to {}",
                count,
                if count == 1 { "" } else { "s" },
                written[1].display()
            ));
            logger::debug(&format!("Also wrote {}", written[0].display()));
            Ok(())
        }
        Err(e) => {
            logger::spinner_error("Manifest build failed");
            Err(e)
        }
    }
}
