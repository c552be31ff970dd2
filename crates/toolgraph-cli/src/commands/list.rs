use crate::GlobalOpts;
use colored::Colorize;
use std::path::{Path, PathBuf};
use toolgraph_manifest::{Manifest, ManifestError, MANIFEST_FILE_NAME};

/// Resolve `path` to a manifest file; directories get the sentinel name appended
pub fn manifest_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(p) if p.is_dir() => p.join(MANIFEST_FILE_NAME),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(MANIFEST_FILE_NAME),
    }
}

pub fn list_operations(path: Option<PathBuf>, opts: &GlobalOpts) -> Result<(), ManifestError> {
    let path = manifest_path(path.as_deref());
    let manifest = Manifest::load_from_path(&path)?;

    if manifest.operations.is_empty() {
        println!("{} has no operations.", path.display());
        return Ok(());
    }

    println!(
        "{} {}",
        manifest.name.bold().green(),
        format!("({})", manifest.resource).dimmed()
    );
    for op in &manifest.operations {
        let mut line = format!(" {} {}", op.operation_type.to_string().cyan(), op.name.bold());
        if op.prefetch {
            line.push_str(&format!(" {}", "[prefetch]".yellow()));
        }
        if opts.verbose > 0 {
            line.push_str(&format!(" {}", op.id.dimmed()));
        }
        println!("{}", line);

        for tool in &op.tools {
            println!("   - {}: {}", tool.name.bold().blue(), tool.description);
            if opts.verbose > 0 {
                for input in &tool.extra_inputs {
                    println!(
                        "       {} ({}) {}",
                        input.name,
                        input.input_type,
                        input.description.dimmed()
                    );
                }
            }
        }
    }
    Ok(())
}
