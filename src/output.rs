//! Writing export results to disk.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs;
use tracing::debug;

use crate::export::ExportOutput;

/// Write every exported file below `dir`, creating directories as needed
///
/// Returns the written paths in file name order.
pub async fn write_files(dir: &Path, output: &ExportOutput) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(output.files.len());
    for (name, content) in &output.files {
        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("Refusing to write file outside the output directory: {}", name);
        }

        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, content)
            .await
            .context(format!("Failed to write {}", path.display()))?;
        debug!("Wrote {} ({} bytes)", path.display(), content.len());
        written.push(path);
    }
    Ok(written)
}
