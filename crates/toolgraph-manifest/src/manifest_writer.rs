//! Writing the manifest to its two sentinel locations
//!
//! Every regeneration writes the same JSON twice: once into the working
//! directory, where the application's own build picks it up, and once into the
//! build output directory, where the hosting environment reads it.

use crate::errors::ManifestError;
use crate::types::Manifest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sentinel file name used in both locations
pub const MANIFEST_FILE_NAME: &str = ".application-manifest.json";

/// Write the manifest into `cwd` and `out_dir`, returning both paths
pub fn write_manifest(
    manifest: &Manifest,
    cwd: &Path,
    out_dir: &Path,
) -> Result<[PathBuf; 2], ManifestError> {
    let json = to_json(manifest)?;
    let targets = [cwd.join(MANIFEST_FILE_NAME), out_dir.join(MANIFEST_FILE_NAME)];

    for target in &targets {
        write_atomic(target, json.as_bytes())?;
    }

    info!(
        "Manifest written ({} operations) to {:?} and {:?}",
        manifest.operations.len(),
        targets[0],
        targets[1]
    );
    Ok(targets)
}

/// Stable pretty JSON encoding of the manifest
pub fn to_json(manifest: &Manifest) -> Result<String, ManifestError> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    Ok(json)
}

/// Write a manifest to a single custom path
pub fn write_to_path(manifest: &Manifest, output_path: &Path) -> Result<(), ManifestError> {
    debug!("Writing manifest to custom path: {:?}", output_path);
    write_atomic(output_path, to_json(manifest)?.as_bytes())
}

/// Read a manifest back and rebuild its indexes
pub fn read_from_path(manifest_path: &Path) -> Result<Manifest, ManifestError> {
    debug!("Reading manifest from: {:?}", manifest_path);

    let content =
        fs::read_to_string(manifest_path).map_err(|e| ManifestError::io(manifest_path, e))?;
    let mut manifest: Manifest =
        serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
            path: manifest_path.to_path_buf(),
            source,
        })?;
    manifest.rebuild_indexes();
    Ok(manifest)
}

impl Manifest {
    /// Load a manifest from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ManifestError> {
        read_from_path(path)
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ManifestError::io(parent, e))?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let file = fs::File::create(&temp_path).map_err(|e| ManifestError::io(&temp_path, e))?;
        let mut writer = std::io::BufWriter::with_capacity(64 * 1024, file);
        writer
            .write_all(content)
            .and_then(|()| writer.flush())
            .map_err(|e| ManifestError::io(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| ManifestError::io(path, e))?;
    Ok(())
}
