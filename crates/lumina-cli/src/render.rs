use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lumina_contracts::attachment::{extension_for_mime, parse_data_url};

use crate::compact_timestamp;

/// Decodes a `data:` image URL and writes it into `out_dir`.
pub fn save_image(out_dir: &Path, image_url: &str, index: usize) -> Result<PathBuf> {
    let (mime, payload) = parse_data_url(image_url)
        .context("generated image is not a base64 data URL")?;
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("generated image payload is not valid base64")?;
    let image_path = out_dir.join(format!(
        "image-{}-{:02}.{}",
        compact_timestamp(),
        index,
        extension_for_mime(mime)
    ));
    fs::write(&image_path, bytes)
        .with_context(|| format!("failed to write {}", image_path.display()))?;
    Ok(image_path)
}
