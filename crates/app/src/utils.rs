//! File helpers for attachments: loading prompts' files and saving
//! images the model sends back.

use anyhow::{bail, Context, Result};
use shared::Attachment;
use std::fs;
use std::path::{Path, PathBuf};

/// Inline data limit of the upstream API
pub const MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

/// MIME type from the file extension; `application/octet-stream` when unknown
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "js" | "mjs" => "text/javascript",
        "ts" => "text/x-typescript",
        "py" => "text/x-python",
        "rs" => "text/x-rust",
        "java" => "text/x-java",
        "c" | "h" => "text/x-c",
        "cpp" | "cc" | "hpp" => "text/x-c++",
        "go" => "text/x-go",
        "sh" => "application/x-sh",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

pub fn load_attachment(path: &Path) -> Result<Attachment> {
    let meta = fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a file", path.display());
    }
    if meta.len() > MAX_ATTACHMENT_BYTES {
        bail!(
            "{} is {} MB; attachments are limited to {} MB",
            path.display(),
            meta.len() / (1024 * 1024),
            MAX_ATTACHMENT_BYTES / (1024 * 1024)
        );
    }
    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(Attachment::from_bytes(name, guess_mime_type(path), &bytes))
}

/// Write a model-produced image under `dir`, returning its path.
///
/// Existing files are never overwritten; a numeric suffix is added instead.
pub fn save_attachment(attachment: &Attachment, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let bytes = attachment
        .decode()
        .with_context(|| format!("{} is not valid base64", attachment.name))?;
    let path = unused_path(dir, &attachment.name);
    fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// `dir/name`, or `dir/stem-N.ext` for the first free N
fn unused_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let name_path = Path::new(name);
    let stem = name_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = name_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (2..)
        .map(|n| dir.join(format!("{}-{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
