//! Shared name generation and validation for stored files.

use crate::traits::{StorageError, StorageResult};
use std::path::Path;
use uuid::Uuid;

/// Extension used for every annotated image.
pub const RENDERED_EXTENSION: &str = "jpg";

/// Generate a fresh file name: `{uuid-v4}.{extension}`.
///
/// The extension is lowercased; a leading dot is tolerated.
pub fn generate_name(extension: &str) -> String {
    let extension = extension.trim_start_matches('.').to_lowercase();
    if extension.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}.{}", Uuid::new_v4(), extension)
    }
}

/// Reject names that could escape the storage directory.
pub fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

/// Lowercased extension of a client file name, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_name_format() {
        let name = generate_name(".JPG");
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "jpg");
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_generate_name_unique() {
        let names: std::collections::HashSet<_> = (0..100).map(|_| generate_name("png")).collect();
        assert_eq!(names.len(), 100);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("abc.png").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("sub/abc.png").is_err());
        assert!(validate_name("sub\\abc.png").is_err());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Cat.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("noext"), None);
    }
}
