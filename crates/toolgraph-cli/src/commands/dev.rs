use crate::errors::LifecycleError;
use crate::lifecycle::{ChangeOutcome, CompilerSession, SessionOptions};
use crate::logger;
use crate::GlobalOpts;
use clap::Parser;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use toolgraph_ast::{AstGrepExtractor, DocumentExtractor};
use toolgraph_manifest::{BuildContext, ServerAddress, MANIFEST_FILE_NAME};

#[derive(Parser, Debug)]
pub struct DevCommand {
    /// Serve mode; selects `entry.<mode>` from the configuration
    #[arg(long, default_value = "development")]
    pub mode: String,

    /// Host the dev server listens on
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port the dev server listens on
    #[arg(long, default_value_t = 5173)]
    pub port: u16,

    /// Dev server uses TLS
    #[arg(long)]
    pub https: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,
}

impl DevCommand {
    pub fn server_address(&self) -> ServerAddress {
        let protocol = if self.https { "https" } else { "http" };
        ServerAddress::new(protocol, self.host.as_str(), self.port)
    }
}

/// Keep the manifest live: write on start, then once per relevant change
pub fn handle_dev(cmd: DevCommand, _opts: &GlobalOpts) -> Result<(), LifecycleError> {
    let root = match &cmd.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };
    let context = BuildContext::serve(cmd.mode.as_str(), Some(cmd.server_address()));

    let mut session = CompilerSession::start(SessionOptions::new(root, context), AstGrepExtractor)?;
    let root = session.root().to_path_buf();
    logger::success(&format!(
        "Manifest ready with {} operations; watching {}",
        session.manifest().map_or(0, |m| m.operations.len()),
        root.display()
    ));

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher =
        RecommendedWatcher::new(tx, NotifyConfig::default()).map_err(|e| LifecycleError::Watch {
            path: root.display().to_string(),
            message: e.to_string(),
        })?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| LifecycleError::Watch {
            path: root.display().to_string(),
            message: e.to_string(),
        })?;

    // Events are handled strictly one after another
    for res in rx {
        match res {
            Ok(event) if is_content_event(&event.kind) => {
                for path in &event.paths {
                    apply_change(&mut session, path);
                }
            }
            Ok(_) => {}
            Err(e) => logger::warn(&format!("Watcher error: {}", e)),
        }
    }
    Ok(())
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn is_own_output(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(MANIFEST_FILE_NAME))
}

/// Feed one changed path to the session, reporting the result
///
/// Returns whether the manifest was rewritten. Failures are reported and the
/// session keeps running with its last good state.
pub fn apply_change<E: DocumentExtractor>(session: &mut CompilerSession<E>, path: &Path) -> bool {
    if is_own_output(path) {
        return false;
    }

    match session.file_changed(path) {
        Ok(ChangeOutcome::Ignored) => false,
        Ok(ChangeOutcome::ConfigReloaded { .. }) => {
            logger::success("Configuration reloaded, manifest rewritten");
            true
        }
        Ok(ChangeOutcome::SourceUpdated { file, outcome, .. }) => {
            logger::info(&format!("{}: {:?}", file.display(), outcome));
            true
        }
        Err(e) => {
            logger::error(&e.to_string());
            false
        }
    }
}
