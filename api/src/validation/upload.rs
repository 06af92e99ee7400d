//! Validates an uploaded video file before it ever reaches the blob store:
//! size, declared content type, and the MP4 container signature. None of
//! these checks touch the filesystem.

use std::collections::HashMap;

use crate::errors::AppError;

const REQUIRED_CONTENT_TYPE: &str = "video/mp4";

/// True if `bytes` looks like an ISO base media file (MP4/MOV/M4V): the
/// 4-byte size field is followed by an `ftyp` box type at offset 4..8.
pub fn looks_like_mp4(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp"
}

/// Strips path separators and any leading dot so a client-supplied
/// filename can't be used to escape the intended directory or hide an
/// extension-less dotfile.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim_start_matches('.');
    if base.is_empty() {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

/// True if `name` ends with `.mp4`, case-insensitively.
pub fn has_mp4_extension(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".mp4")
}

pub fn validate_upload(
    bytes: &[u8],
    content_type: Option<&str>,
    filename: &str,
    max_size_bytes: u64,
) -> Result<(), AppError> {
    let mut errors: HashMap<String, Vec<String>> = HashMap::new();

    if bytes.len() as u64 > max_size_bytes {
        return Err(AppError::PayloadTooLarge);
    }

    if bytes.is_empty() {
        errors
            .entry("file".to_string())
            .or_default()
            .push("file is empty".to_string());
    } else if !looks_like_mp4(bytes) {
        errors
            .entry("file".to_string())
            .or_default()
            .push("file does not look like a supported video container".to_string());
    }

    if content_type != Some(REQUIRED_CONTENT_TYPE) {
        errors
            .entry("content_type".to_string())
            .or_default()
            .push(format!("content type must be {REQUIRED_CONTENT_TYPE}"));
    }

    if !has_mp4_extension(filename) {
        errors
            .entry("filename".to_string())
            .or_default()
            .push("filename must end with .mp4".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::FieldValidation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8, 0, 0, 24];
        bytes.extend_from_slice(b"ftypisom");
        bytes.extend_from_slice(&[0u8; 8]);
        bytes
    }

    #[test]
    fn accepts_valid_mp4() {
        let bytes = mp4_bytes();
        assert!(validate_upload(&bytes, Some("video/mp4"), "clip.mp4", 1024).is_ok());
    }

    #[test]
    fn rejects_oversized_upload() {
        let bytes = mp4_bytes();
        let err = validate_upload(&bytes, Some("video/mp4"), "clip.mp4", 4).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge));
    }

    #[test]
    fn rejects_bad_magic_bytes() {
        let bytes = vec![0u8; 16];
        let err = validate_upload(&bytes, Some("video/mp4"), "clip.mp4", 1024).unwrap_err();
        assert!(matches!(err, AppError::FieldValidation(_)));
    }

    #[test]
    fn rejects_unsupported_content_type() {
        let bytes = mp4_bytes();
        let err = validate_upload(&bytes, Some("video/quicktime"), "clip.mp4", 1024).unwrap_err();
        assert!(matches!(err, AppError::FieldValidation(_)));
    }

    #[test]
    fn rejects_non_mp4_extension_case_insensitively() {
        let bytes = mp4_bytes();
        let err = validate_upload(&bytes, Some("video/mp4"), "clip.MOV", 1024).unwrap_err();
        assert!(matches!(err, AppError::FieldValidation(_)));
        assert!(has_mp4_extension("clip.MP4"));
        assert!(!has_mp4_extension("clip.mov"));
    }

    #[test]
    fn sanitizes_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\a\\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
    }
}
