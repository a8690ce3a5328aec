use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

const BASE64_MARKER: &str = "base64,";

/// Reference image sent alongside a prompt.
///
/// `data` is base64, either bare or carrying a `data:<mime>;base64,` header
/// as produced by a browser file reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub data: String,
    pub mime_type: String,
}

impl Attachment {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self::new(data_url(mime_type, &BASE64.encode(bytes)), mime_type)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let mime = mime_for_path(path).unwrap_or(DEFAULT_IMAGE_MIME);
        Ok(Self::from_bytes(&bytes, mime))
    }

    /// Raw base64 payload with any data-URI header removed.
    pub fn payload(&self) -> &str {
        strip_data_url_header(&self.data)
    }
}

pub fn strip_data_url_header(data: &str) -> &str {
    match data.find(BASE64_MARKER) {
        Some(idx) => &data[idx + BASE64_MARKER.len()..],
        None => data,
    }
}

pub fn data_url(mime_type: &str, payload: &str) -> String {
    format!("data:{mime_type};base64,{payload}")
}

/// Splits `data:<mime>;base64,<payload>` into mime and payload.
pub fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let lowered = mime.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    if lowered.contains("gif") {
        return "gif";
    }
    "png"
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn payload_strips_data_url_header() {
        let attachment = Attachment::new("data:image/png;base64,iVBORw0KGgo=", "image/png");
        assert_eq!(attachment.payload(), "iVBORw0KGgo=");
    }

    #[test]
    fn payload_passes_bare_base64_through() {
        let attachment = Attachment::new("iVBORw0KGgo=", "image/png");
        assert_eq!(attachment.payload(), "iVBORw0KGgo=");
    }

    #[test]
    fn from_path_builds_data_url_with_guessed_mime() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("ref.JPG");
        fs::write(&path, b"ref-bytes")?;

        let attachment = Attachment::from_path(&path)?;
        assert_eq!(attachment.mime_type, "image/jpeg");
        assert!(attachment.data.starts_with("data:image/jpeg;base64,"));
        assert_eq!(BASE64.decode(attachment.payload())?, b"ref-bytes");
        Ok(())
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = Attachment::from_path(Path::new("/definitely/missing.png"))
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.contains("failed reading /definitely/missing.png"));
    }

    #[test]
    fn parse_data_url_splits_mime_and_payload() {
        assert_eq!(
            parse_data_url("data:image/webp;base64,AAAA"),
            Some(("image/webp", "AAAA"))
        );
        assert_eq!(parse_data_url("image/webp;base64,AAAA"), None);
        assert_eq!(parse_data_url("data:text/plain,hello"), None);
    }

    #[test]
    fn extension_follows_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/WEBP"), "webp");
        assert_eq!(extension_for_mime("application/octet-stream"), "png");
        assert_eq!(mime_for_path(Path::new("model.obj")), None);
    }
}
