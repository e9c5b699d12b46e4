//! Pure pieces of the image upload pipeline.
//!
//! Everything here is I/O-free: data-URI parsing, payload safety checks,
//! storage key derivation, and content-type detection for serving stored
//! blobs. The API layer wires these to the blob store.

use crate::defaults::{UPLOAD_DEFAULT_EXT, UPLOAD_SUFFIX_LEN};
use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;
use uuid::Uuid;

/// Magic byte signatures for executable formats rejected on upload.
const EXECUTABLE_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),
    ("Mach-O Fat/Java class", &[0xCA, 0xFE, 0xBA, 0xBE]),
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]),
];

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A parsed `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Declared MIME type. Not trusted for serving; see
    /// [`detect_content_type`].
    pub mime: String,
    /// Decoded payload bytes.
    pub data: Vec<u8>,
}

impl DataUri {
    /// Parse and decode a data-URI.
    ///
    /// Anything that does not match the fixed `data:<mime>;base64,<payload>`
    /// pattern fails with "Invalid base64 format"; a matching pattern whose
    /// payload is not valid standard-alphabet base64 fails with
    /// "Invalid base64 payload".
    pub fn parse(input: &str) -> Result<Self> {
        let rest = input
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidInput("Invalid base64 format".to_string()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| Error::InvalidInput("Invalid base64 format".to_string()))?;
        if mime.is_empty() || payload.is_empty() {
            return Err(Error::InvalidInput("Invalid base64 format".to_string()));
        }

        let data = STANDARD
            .decode(payload)
            .map_err(|_| Error::InvalidInput("Invalid base64 payload".to_string()))?;

        Ok(Self {
            mime: mime.to_string(),
            data,
        })
    }
}

/// Validate a decoded upload payload against the size cap and the
/// executable-signature blocklist.
pub fn validate_payload(data: &[u8], max_bytes: usize) -> Result<()> {
    if data.len() > max_bytes {
        return Err(Error::InvalidInput(format!(
            "Payload exceeds maximum size of {} bytes",
            max_bytes
        )));
    }

    for (name, magic) in EXECUTABLE_SIGNATURES {
        if data.len() >= magic.len() && &data[..magic.len()] == *magic {
            return Err(Error::InvalidInput(format!(
                "Executable content is not allowed: {}",
                name
            )));
        }
    }

    Ok(())
}

/// Random lowercase-alphanumeric suffix guarding against same-millisecond
/// key collisions.
pub fn storage_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..UPLOAD_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SUFFIX_CHARSET.len());
            SUFFIX_CHARSET[idx] as char
        })
        .collect()
}

/// Derive the blob storage key for an upload:
/// `{user_id}/images/{millis}-{suffix}.{ext}`.
///
/// The extension comes from the original filename, lowercased and stripped
/// to alphanumerics, falling back to `jpg` when the name carries none.
pub fn storage_key(user_id: Uuid, filename: &str, millis: i64, suffix: &str) -> String {
    format!(
        "{}/images/{}-{}.{}",
        user_id,
        millis,
        suffix,
        file_extension(filename)
    )
}

fn file_extension(filename: &str) -> String {
    let ext = match filename.rsplit_once('.') {
        Some((_, ext)) => ext
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase(),
        None => String::new(),
    };
    if ext.is_empty() {
        UPLOAD_DEFAULT_EXT.to_string()
    } else {
        ext
    }
}

/// Detect the content type of a stored blob for serving.
///
/// Magic bytes win; formats without a signature (SVG, plain text) fall back
/// to the key's extension, then to `application/octet-stream`.
pub fn detect_content_type(key: &str, data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if let Some((_, ext)) = key.rsplit_once('.') {
        if let Some(mime) = mime_from_extension(&ext.to_lowercase()) {
            return mime.to_string();
        }
    }

    "application/octet-stream".to_string()
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "svg" => Some("image/svg+xml"),
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "html" => Some("text/html"),
        "json" => Some("application/json"),
        "csv" => Some("text/csv"),
        _ => None,
    }
}
