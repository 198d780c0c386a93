use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::assets::decode::from_dynamic;
use crate::foundation::core::ImageBuffer;
use crate::foundation::error::{CoverflowError, CoverflowResult};

/// File extensions picked up by [`load_images`], lowercase.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// Return `true` when `path` has a supported image extension (case-insensitive).
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Supported image files directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> CoverflowResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CoverflowError::validation(format!(
            "source directory '{}' does not exist",
            dir.display()
        )));
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read source directory '{}'", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("read entry in '{}'", dir.display()))?
            .path();
        if path.is_file() && is_image_path(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Decode one image file.
pub fn load_image(path: &Path) -> CoverflowResult<ImageBuffer> {
    let img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
    from_dynamic(img)
}

/// Decode every supported image in `dir`, in file-name order.
///
/// Files that fail to decode are skipped with a warning. Fails when nothing could be loaded.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_images(dir: &Path) -> CoverflowResult<Vec<ImageBuffer>> {
    let paths = list_images(dir)?;
    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        match load_image(path) {
            Ok(img) => images.push(img),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable image")
            }
        }
    }
    if images.is_empty() {
        return Err(CoverflowError::validation(format!(
            "no images found in '{}'",
            dir.display()
        )));
    }
    tracing::info!(count = images.len(), "loaded images");
    Ok(images)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
