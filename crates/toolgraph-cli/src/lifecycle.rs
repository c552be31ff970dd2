//! Compiler session driven by host lifecycle triggers
//!
//! The host (bundler or dev server) calls three triggers:
//! - `start`: load the configuration, scan every source file, and in serve
//!   mode write the manifest right away.
//! - `file_changed`: serve mode only. Recompile one file, or reload the
//!   configuration, and rewrite the manifest.
//! - `bundle_finalized`: build mode only. Assemble and write the manifest once.
//!
//! Triggers are handled one at a time on an owned session, so a manifest
//! write always completes before the next trigger is looked at.

use crate::errors::LifecycleError;
use std::path::{Path, PathBuf};
use toolgraph_ast::{DocumentExtractor, FileOutcome, IncludeFilter, SourceCache};
use toolgraph_config::ProjectConfig;
use toolgraph_logger as logger;
use toolgraph_manifest::{assemble, write_manifest, BuildContext, CommandKind, Manifest};
use tracing::{debug, info};

/// Where the session runs and how it was invoked
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Project root; configuration and include globs are resolved against it
    pub root: PathBuf,
    pub context: BuildContext,
    /// Overrides the configured `out_dir`
    pub out_dir: Option<PathBuf>,
}

impl SessionOptions {
    pub fn new(root: impl Into<PathBuf>, context: BuildContext) -> Self {
        SessionOptions {
            root: root.into(),
            context,
            out_dir: None,
        }
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }
}

/// Result of a `file_changed` trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Neither the configuration nor a matching source file
    Ignored,
    /// Configuration reread, manifest rewritten without rescanning
    ConfigReloaded { written: [PathBuf; 2] },
    /// One source file reprocessed, manifest rewritten
    SourceUpdated {
        file: PathBuf,
        outcome: FileOutcome,
        written: [PathBuf; 2],
    },
}

pub struct CompilerSession<E: DocumentExtractor> {
    root: PathBuf,
    config_path: PathBuf,
    config: ProjectConfig,
    filter: IncludeFilter,
    out_dir_override: Option<PathBuf>,
    context: BuildContext,
    cache: SourceCache,
    extractor: E,
    finalized: bool,
    last_manifest: Option<Manifest>,
}

impl<E: DocumentExtractor> CompilerSession<E> {
    /// Handle the start trigger
    pub fn start(options: SessionOptions, extractor: E) -> Result<Self, LifecycleError> {
        let SessionOptions {
            root,
            context,
            out_dir,
        } = options;

        // Watchers report absolute paths, so the root must be absolute too
        let root = std::fs::canonicalize(&root)?;
        let config_path = ProjectConfig::path(&root);
        let config = ProjectConfig::load_from_path(&config_path)?;
        let config_path = std::fs::canonicalize(&config_path).unwrap_or(config_path);
        let filter = IncludeFilter::for_project(&config)?;
        logger::debug(&format!(
            "Loaded {} from {}",
            config.name,
            config_path.display()
        ));

        let mut session = CompilerSession {
            root,
            config_path,
            config,
            filter,
            out_dir_override: out_dir,
            context,
            cache: SourceCache::new(),
            extractor,
            finalized: false,
            last_manifest: None,
        };

        let summary = session
            .cache
            .scan(&session.root, &session.filter, &session.extractor)?;
        info!(
            "Initial scan: {} files, {} operations",
            summary.files_seen,
            session.cache.operations().count()
        );

        if session.context.is_serve() {
            session.regenerate()?;
        }
        Ok(session)
    }

    /// Handle a change notification for `path` (absolute or root-relative)
    pub fn file_changed(&mut self, path: &Path) -> Result<ChangeOutcome, LifecycleError> {
        self.require(CommandKind::Serve, "file_changed")?;

        let absolute = self.resolve(path);

        if absolute == self.config_path {
            self.reload_config()?;
            let written = self.regenerate()?;
            return Ok(ChangeOutcome::ConfigReloaded { written });
        }

        let Ok(relative) = absolute.strip_prefix(&self.root) else {
            return Ok(ChangeOutcome::Ignored);
        };
        if !self.filter.matches(relative) {
            debug!("Ignoring change to {:?}", relative);
            return Ok(ChangeOutcome::Ignored);
        }

        let relative = relative.to_path_buf();
        let outcome = self
            .cache
            .process_file(&self.root, &relative, &self.extractor)?;
        logger::step(&format!("{}: {:?}", relative.display(), outcome));
        let written = self.regenerate()?;
        Ok(ChangeOutcome::SourceUpdated {
            file: relative,
            outcome,
            written,
        })
    }

    /// Handle the end-of-build trigger
    pub fn bundle_finalized(&mut self) -> Result<[PathBuf; 2], LifecycleError> {
        self.require(CommandKind::Build, "bundle_finalized")?;
        if self.finalized {
            return Err(LifecycleError::AlreadyFinalized);
        }
        let written = self.regenerate()?;
        self.finalized = true;
        Ok(written)
    }

    fn require(&self, command: CommandKind, trigger: &'static str) -> Result<(), LifecycleError> {
        if self.context.command == command {
            return Ok(());
        }
        Err(LifecycleError::WrongMode {
            trigger,
            command: match self.context.command {
                CommandKind::Serve => "a dev server",
                CommandKind::Build => "a one-shot build",
            },
        })
    }

    /// Absolute form of a reported path, comparable with `root`
    ///
    /// Only the parent directory is canonicalized since the file itself may
    /// already be gone.
    fn resolve(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        if absolute.starts_with(&self.root) {
            return absolute;
        }
        match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => std::fs::canonicalize(parent)
                .map(|parent| parent.join(name))
                .unwrap_or(absolute),
            _ => absolute,
        }
    }

    fn reload_config(&mut self) -> Result<(), LifecycleError> {
        let config = ProjectConfig::load_from_path(&self.config_path)?;
        // Applies to later changes; already cached files stay as they are
        self.filter = IncludeFilter::for_project(&config)?;
        self.config = config;
        logger::debug(&format!("Reloaded {}", self.config_path.display()));
        Ok(())
    }

    fn out_dir(&self) -> PathBuf {
        match &self.out_dir_override {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.root.join(dir),
            None => self.config.out_dir_in(&self.root),
        }
    }

    fn regenerate(&mut self) -> Result<[PathBuf; 2], LifecycleError> {
        let manifest = assemble(self.cache.operations(), &self.config, &self.context)?;
        let written = write_manifest(&manifest, &self.root, &self.out_dir())?;
        self.last_manifest = Some(manifest);
        Ok(written)
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Manifest produced by the most recent write
    pub fn manifest(&self) -> Option<&Manifest> {
        self.last_manifest.as_ref()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use toolgraph_ast::AstGrepExtractor;
    use toolgraph_manifest::{ManifestError, ServerAddress, MANIFEST_FILE_NAME};

    const CONFIG: &str = r#"
name = "Shop"
description = "Storefront tools"

[entry]
production = "https://cdn.example.com/shop/index.html"
"#;

    fn project(files: &[(&str, &str)]) -> anyhow::Result<TempDir> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("toolgraph.toml"), CONFIG)?;
        for (path, contents) in files {
            let path = dir.path().join(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
        }
        Ok(dir)
    }

    fn serve_options(root: &Path) -> SessionOptions {
        SessionOptions::new(
            root,
            BuildContext::serve(
                "development",
                Some(ServerAddress::new("http", "localhost", 5173)),
            ),
        )
    }

    fn names(manifest: Option<&Manifest>) -> Vec<String> {
        manifest
            .map(|m| m.operations.iter().map(|op| op.name.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_build_writes_only_when_finalized() -> anyhow::Result<()> {
        let dir = project(&[(
            "src/product.ts",
            r#"export const Q = gql`query Product($id: ID!) @tool(name: "GetProduct", description: "Get a product") { product(id: $id) { id title } }`;"#,
        )])?;
        let root = dir.path();
        let options = SessionOptions::new(root, BuildContext::build("production"));
        let mut session = CompilerSession::start(options, AstGrepExtractor)?;
        assert!(!root.join(MANIFEST_FILE_NAME).exists());
        assert_eq!(session.cache().operations().count(), 1);

        let written = session.bundle_finalized()?;
        assert_eq!(written[0], session.root().join(MANIFEST_FILE_NAME));
        assert_eq!(written[1], session.root().join("dist").join(MANIFEST_FILE_NAME));
        assert!(written.iter().all(|p| p.is_file()));

        let manifest = Manifest::load_from_path(&written[1])?;
        assert_eq!(manifest.name.as_ref(), "Shop");
        assert_eq!(manifest.resource.as_ref(), "https://cdn.example.com/shop/index.html");
        assert_eq!(manifest.operations[0].tools[0].name.as_ref(), "GetProduct");

        assert!(matches!(
            session.bundle_finalized(),
            Err(LifecycleError::AlreadyFinalized)
        ));
        assert!(matches!(
            session.file_changed(Path::new("src/product.ts")),
            Err(LifecycleError::WrongMode { trigger: "file_changed", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_staging_build_without_entry_fails() -> anyhow::Result<()> {
        let dir = project(&[])?;
        let options = SessionOptions::new(dir.path(), BuildContext::build("staging"));
        let mut session = CompilerSession::start(options, AstGrepExtractor)?;
        let err = match session.bundle_finalized() {
            Ok(paths) => anyhow::bail!("expected missing entry, wrote {paths:?}"),
            Err(err) => err,
        };
        assert!(matches!(
            err,
            LifecycleError::Manifest(ManifestError::MissingEntryPoint(ref mode)) if mode == "staging"
        ));
        assert!(err.to_string().contains("\"staging\""));
        assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
        Ok(())
    }

    #[test]
    fn test_serve_writes_on_start_and_on_change() -> anyhow::Result<()> {
        let dir = project(&[("src/a.ts", "const A = gql`query A { a }`;")])?;
        let root = dir.path();
        let mut session = CompilerSession::start(serve_options(root), AstGrepExtractor)?;
        assert!(root.join(MANIFEST_FILE_NAME).is_file());
        assert_eq!(
            session.manifest().map(|m| m.resource.to_string()),
            Some("http://localhost:5173".to_string())
        );

        fs::write(
            root.join("src/a.ts"),
            "const A = gql`query A { a }`;\nconst B = gql`query B @prefetch { b }`;",
        )?;
        let outcome = session.file_changed(&root.join("src/a.ts"))?;
        assert!(matches!(
            outcome,
            ChangeOutcome::SourceUpdated {
                outcome: FileOutcome::Updated { operations: 2 },
                ..
            }
        ));
        assert_eq!(names(session.manifest()), vec!["A", "B"]);

        let on_disk = Manifest::load_from_path(&root.join(MANIFEST_FILE_NAME))?;
        assert!(on_disk.prefetch_operation().is_some());

        assert!(matches!(
            session.bundle_finalized(),
            Err(LifecycleError::WrongMode { trigger: "bundle_finalized", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_config_change_reloads_without_rescan() -> anyhow::Result<()> {
        let dir = project(&[("src/a.ts", "const A = gql`query A { a }`;")])?;
        let root = dir.path();
        let mut session = CompilerSession::start(serve_options(root), AstGrepExtractor)?;

        // Not reported to the session, so it must not show up
        fs::write(root.join("src/b.ts"), "const B = gql`query B { b }`;")?;
        fs::write(
            root.join("toolgraph.toml"),
            CONFIG.replace("name = \"Shop\"", "name = \"Renamed\""),
        )?;

        let outcome = session.file_changed(Path::new("toolgraph.toml"))?;
        assert!(matches!(outcome, ChangeOutcome::ConfigReloaded { .. }));
        assert_eq!(session.config().name, "Renamed");
        assert_eq!(
            session.manifest().map(|m| m.name.to_string()),
            Some("Renamed".to_string())
        );
        assert_eq!(names(session.manifest()), vec!["A"]);
        Ok(())
    }

    #[test]
    fn test_unrelated_changes_are_ignored() -> anyhow::Result<()> {
        let dir = project(&[("src/a.ts", "const A = gql`query A { a }`;")])?;
        let root = dir.path();
        let mut session = CompilerSession::start(serve_options(root), AstGrepExtractor)?;

        fs::write(root.join("README.md"), "gql`query Nope { a }`")?;
        assert_eq!(
            session.file_changed(&root.join("README.md"))?,
            ChangeOutcome::Ignored
        );
        assert_eq!(
            session.file_changed(Path::new("/elsewhere/src/a.ts"))?,
            ChangeOutcome::Ignored
        );
        Ok(())
    }

    #[test]
    fn test_compile_error_keeps_last_good_state() -> anyhow::Result<()> {
        let dir = project(&[("src/a.ts", "const A = gql`query A { a }`;")])?;
        let root = dir.path();
        let mut session = CompilerSession::start(serve_options(root), AstGrepExtractor)?;

        fs::write(root.join("src/a.ts"), "const A = gql`subscription A { a }`;")?;
        let result = session.file_changed(Path::new("src/a.ts"));
        assert!(matches!(result, Err(LifecycleError::Compile(_))));
        assert_eq!(names(session.manifest()), vec!["A"]);
        assert_eq!(session.cache().operations().count(), 1);
        Ok(())
    }

    #[test]
    fn test_second_prefetch_fails_the_change() -> anyhow::Result<()> {
        let dir = project(&[("src/home.ts", "const H = gql`query Home @prefetch { home }`;")])?;
        let root = dir.path();
        let mut session = CompilerSession::start(serve_options(root), AstGrepExtractor)?;

        fs::write(root.join("src/cart.ts"), "const C = gql`query Cart @prefetch { cart }`;")?;
        let err = match session.file_changed(Path::new("src/cart.ts")) {
            Ok(outcome) => anyhow::bail!("expected a prefetch conflict, got {outcome:?}"),
            Err(err) => err,
        };
        assert!(err
            .to_string()
            .contains("multiple operations marked as `@prefetch`"));
        Ok(())
    }

    #[test]
    fn test_out_dir_override() -> anyhow::Result<()> {
        let dir = project(&[])?;
        let root = dir.path();
        let options =
            SessionOptions::new(root, BuildContext::build("production")).with_out_dir("public");
        let mut session = CompilerSession::start(options, AstGrepExtractor)?;
        let written = session.bundle_finalized()?;
        assert_eq!(written[1], session.root().join("public").join(MANIFEST_FILE_NAME));
        Ok(())
    }

    #[test]
    fn test_relative_root_handles_absolute_and_config_paths() -> anyhow::Result<()> {
        let dir = TempDir::new_in(".")?;
        let cwd = std::env::current_dir()?;
        let relative_root = dir
            .path()
            .strip_prefix(&cwd)
            .unwrap_or(dir.path())
            .to_path_buf();
        assert!(relative_root.is_relative());

        fs::write(relative_root.join("toolgraph.toml"), CONFIG)?;
        fs::create_dir_all(relative_root.join("src"))?;
        fs::write(relative_root.join("src/a.ts"), "const A = gql`query A { a }`;")?;

        let mut session = CompilerSession::start(serve_options(&relative_root), AstGrepExtractor)?;
        assert!(session.root().is_absolute());

        fs::write(
            relative_root.join("src/a.ts"),
            "const A = gql`query A { a }`;\nconst B = gql`query B { b }`;",
        )?;
        let reported = fs::canonicalize(relative_root.join("src/a.ts"))?;
        let outcome = session.file_changed(&reported)?;
        assert!(matches!(
            outcome,
            ChangeOutcome::SourceUpdated {
                outcome: FileOutcome::Updated { operations: 2 },
                ..
            }
        ));
        assert_eq!(names(session.manifest()), vec!["A", "B"]);

        fs::write(
            relative_root.join("toolgraph.toml"),
            CONFIG.replace("name = \"Shop\"", "name = \"Renamed\""),
        )?;
        let outcome = session.file_changed(Path::new("toolgraph.toml"))?;
        assert!(matches!(outcome, ChangeOutcome::ConfigReloaded { .. }));
        assert_eq!(session.config().name, "Renamed");

        let on_disk = Manifest::load_from_path(&relative_root.join(MANIFEST_FILE_NAME))?;
        assert_eq!(on_disk.name.as_ref(), "Renamed");
        Ok(())
    }

    #[test]
    fn test_missing_config_fails_start() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let options = SessionOptions::new(dir.path(), BuildContext::build("production"));
        assert!(matches!(
            CompilerSession::start(options, AstGrepExtractor),
            Err(LifecycleError::Config(_))
        ));
        Ok(())
    }
}
