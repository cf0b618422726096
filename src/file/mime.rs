//! Content type detection and the dangerous-type denylist.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::SharingPolicy;
use crate::{Result, ShareError};

/// Fallback content type when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Type `infer` reports for PE images (`.exe`, `.dll`).
const PORTABLE_EXECUTABLE: &str = "application/vnd.microsoft.portable-executable";

/// Sniffed types refused whatever the file is called.
const NATIVE_EXECUTABLES: &[&str] = &[
    PORTABLE_EXECUTABLE,
    "application/x-executable",
    "application/x-mach-binary",
];

/// A two-byte `MZ` prefix only counts when `e_lfanew` points at `PE\0\0`.
fn has_pe_header(content: &[u8]) -> bool {
    let Some(raw) = content.get(0x3c..0x40) else {
        return false;
    };
    let offset = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    content.get(offset..offset.saturating_add(4)) == Some(&b"PE\0\0"[..])
}

/// Identify well-known formats from their leading bytes.
pub fn sniff(content: &[u8]) -> Option<&'static str> {
    let kind = infer::get(content)?;
    if kind.mime_type() == PORTABLE_EXECUTABLE && !has_pe_header(content) {
        return None;
    }
    Some(kind.mime_type())
}

fn is_native_executable(mime: &str) -> bool {
    NATIVE_EXECUTABLES.contains(&mime)
}

/// Lowercased extension of `filename`, without the dot.
pub fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Strip parameters (`; charset=...`) and normalize case.
fn base_type(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}

/// Best-effort content type for an upload.
///
/// Order: filename extension, leading-byte signature, client-declared type,
/// then `application/octet-stream`.
pub fn detect_mime_type(content: &[u8], filename: &str, declared: Option<&str>) -> String {
    if let Some(guess) = mime_guess::from_path(filename).first() {
        return guess.essence_str().to_string();
    }
    if let Some(sniffed) = sniff(content) {
        return sniffed.to_string();
    }
    match declared.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => OCTET_STREAM.to_string(),
    }
}

/// Refuse uploads whose extension or any known content type is denylisted.
///
/// Checked types: the client-declared one and the detected one. The
/// signature-sniffed type counts when the extension says nothing about the
/// content, or when it is a native executable, so renaming `tool.exe` to
/// `tool.txt` does not get a binary through.
pub fn ensure_allowed(
    policy: &SharingPolicy,
    filename: &str,
    declared: Option<&str>,
    detected: &str,
    content: &[u8],
) -> Result<()> {
    if let Some(ext) = extension(filename) {
        if policy.blocked_extensions.iter().any(|b| *b == ext) {
            warn!("Blocked file extension detected: {}", filename);
            return Err(ShareError::DisallowedFileType(format!(
                "{filename} (extension .{ext})"
            )));
        }
    }

    let known_extension = mime_guess::from_path(filename).first().is_some();
    let sniffed = sniff(content).filter(|m| !known_extension || is_native_executable(m));

    let candidates = [declared, Some(detected), sniffed];
    for mime in candidates.into_iter().flatten() {
        let mime = base_type(mime);
        if mime.is_empty() {
            continue;
        }
        if policy.blocked_mime_types.iter().any(|b| *b == mime) {
            warn!("MIME type blocked: {} for file: {}", mime, filename);
            return Err(ShareError::DisallowedFileType(format!(
                "{filename} (MIME: {mime})"
            )));
        }
    }

    debug!("File type allowed: {} ({})", filename, detected);
    Ok(())
}
