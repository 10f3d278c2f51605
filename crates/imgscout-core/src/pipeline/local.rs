//! Local copies of downloaded images.

use std::path::{Path, PathBuf};

use super::naming::{guess_ext_and_type, safe_name};

/// Write `bytes` to `<root>/<provider_key>/<safe_product>[_<n>].<ext>`.
///
/// `index` is 1-based; the `_<n>` suffix is only added from the second image
/// on, so single-image runs get plain product names. Directories are created
/// as needed. Returns the written path.
pub fn save_local(
    root: &Path,
    provider_key: &str,
    product: &str,
    index: usize,
    url: &str,
    bytes: &[u8],
    content_type: Option<&str>,
) -> std::io::Result<PathBuf> {
    let dir = root.join(safe_name(provider_key, "provider"));
    std::fs::create_dir_all(&dir)?;

    let (ext, _) = guess_ext_and_type(content_type, url);
    let stem = safe_name(product, "image");
    let filename = if index > 1 {
        format!("{stem}_{index}{ext}")
    } else {
        format!("{stem}{ext}")
    };

    let path = dir.join(filename);
    std::fs::write(&path, bytes)?;
    tracing::debug!("Saved local copy to {:?}", path);
    Ok(path)
}
