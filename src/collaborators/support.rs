use crate::error::CollaboratorError;
use image::{GrayImage, ImageFormat};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tokio::task;
use tracing::{debug, warn};
use uuid::Uuid;

/// PNG handed to an external program, deleted when dropped
pub(crate) struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    pub(crate) async fn write(
        dir: &Path,
        collaborator: &'static str,
        image: &GrayImage,
    ) -> Result<Self, CollaboratorError> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            CollaboratorError::unavailable(
                collaborator,
                format!("cannot create work directory {}: {}", dir.display(), e),
            )
        })?;

        let path = dir.join(format!("{}-{}.png", collaborator, Uuid::new_v4()));
        let target = path.clone();
        let owned = image.clone();

        task::spawn_blocking(move || owned.save_with_format(&target, ImageFormat::Png))
            .await
            .map_err(|e| CollaboratorError::unavailable(collaborator, e.to_string()))?
            .map_err(|e| {
                CollaboratorError::unavailable(
                    collaborator,
                    format!("cannot write {}: {}", path.display(), e),
                )
            })?;

        debug!("Wrote scratch image {}", path.display());
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Run `program` to completion, treating spawn failure and non-zero exit as
/// the collaborator being unavailable
pub(crate) async fn run_checked<I, S>(
    collaborator: &'static str,
    program: &str,
    args: I,
) -> Result<Output, CollaboratorError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            CollaboratorError::unavailable(collaborator, format!("failed to run {}: {}", program, e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CollaboratorError::unavailable(
            collaborator,
            format!("{} exited with {}: {}", program, output.status, stderr.trim()),
        ));
    }

    Ok(output)
}
