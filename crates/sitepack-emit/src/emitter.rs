//! Atomic emission of the output directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sitepack_graph::OutputManifest;
use thiserror::Error;
use tracing::debug;

/// The build's only fatal, post-pipeline error class: the output tree
/// could not be produced. Always carries the destination and the io cause.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("failed to create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything the emitter needs: the bundle and the copies.
pub struct EmitPlan<'a> {
    /// Destination of the bundle file; its parent is the output directory.
    pub bundle_path: &'a Path,
    pub bundle_text: &'a str,
    pub manifest: &'a OutputManifest,
}

/// What was produced.
#[derive(Debug)]
pub struct EmitReport {
    pub bundle_path: PathBuf,
    pub bundle_bytes: usize,
    pub copied: usize,
}

/// Write the bundle and copy every manifest entry, creating directories
/// as needed. Every file goes through a temp sibling and a rename, so a
/// crash mid-emit never leaves a truncated file under a final name.
pub fn emit(plan: &EmitPlan) -> Result<EmitReport, EmitError> {
    let out_dir = plan.bundle_path.parent().unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(out_dir).map_err(|e| EmitError::CreateDir {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    write_atomic(plan.bundle_path, plan.bundle_text.as_bytes()).map_err(|e| {
        EmitError::Write {
            path: plan.bundle_path.to_path_buf(),
            source: e,
        }
    })?;
    debug!(path = %plan.bundle_path.display(), bytes = plan.bundle_text.len(), "wrote bundle");

    let mut copied = 0usize;
    for entry in plan.manifest.entries() {
        let dest = out_dir.join(&entry.dest);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| EmitError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        copy_atomic(&entry.source, &dest).map_err(|e| EmitError::Copy {
            from: entry.source.clone(),
            to: dest.clone(),
            source: e,
        })?;
        debug!(from = %entry.source.display(), to = %dest.display(), "copied asset");
        copied += 1;
    }

    Ok(EmitReport {
        bundle_path: plan.bundle_path.to_path_buf(),
        bundle_bytes: plan.bundle_text.len(),
        copied,
    })
}

/// A temp-file name that lands in the same directory as `dest`, so the
/// final rename cannot cross filesystems.
fn temp_sibling(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    dest.with_file_name(format!(".{}.sitepack-tmp-{}", name, std::process::id()))
}

fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_sibling(dest);
    fs::write(&tmp, bytes)?;
    match fs::rename(&tmp, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn copy_atomic(source: &Path, dest: &Path) -> io::Result<()> {
    let tmp = temp_sibling(dest);
    fs::copy(source, &tmp)?;
    match fs::rename(&tmp, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
