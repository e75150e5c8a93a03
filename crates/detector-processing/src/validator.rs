use image::ImageFormat;
use std::path::Path;

/// Client message for a missing or empty file field
pub const MISSING_FILE_MESSAGE: &str = "Please specify the image file.";

/// Client message for a file whose extension or contents are not an accepted image
pub const UNSUPPORTED_FORMAT_MESSAGE: &str = "Unsupported image format.";

/// Validation errors for uploaded image files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No file provided")]
    MissingFile,

    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Missing file extension (filename: {0})")]
    MissingExtension(String),

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File is not a decodable image: {0}")]
    UndecodableImage(String),

    #[error("File contents are {format:?} but the extension is {extension}")]
    ExtensionMismatch {
        extension: String,
        format: ImageFormat,
    },
}

impl ValidationError {
    /// Message shown to the client for this failure.
    pub fn client_message(&self) -> String {
        match self {
            ValidationError::MissingFile | ValidationError::EmptyFile => {
                MISSING_FILE_MESSAGE.to_string()
            }
            ValidationError::FileTooLarge { max, .. } => {
                format!("File is too large (maximum {} bytes).", max)
            }
            ValidationError::MissingExtension(_)
            | ValidationError::InvalidExtension { .. }
            | ValidationError::UndecodableImage(_)
            | ValidationError::ExtensionMismatch { .. } => UNSUPPORTED_FORMAT_MESSAGE.to_string(),
        }
    }
}

/// Upload validator
///
/// Checks run cheapest first: size, then extension, then a full decode. The
/// decoded format must be the one the extension names, since stored files are
/// served with a content type derived from their extension.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate the client filename's extension and return it lowercased.
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Validate that the bytes decode as an image in a format we can read back.
    pub fn validate_image_data(&self, data: &[u8]) -> Result<ImageFormat, ValidationError> {
        let format = image::guess_format(data)
            .map_err(|e| ValidationError::UndecodableImage(e.to_string()))?;

        image::load_from_memory_with_format(data, format)
            .map_err(|e| ValidationError::UndecodableImage(e.to_string()))?;

        Ok(format)
    }

    /// Run every check on an uploaded file and return its normalized extension.
    pub fn validate_all(&self, filename: &str, data: &[u8]) -> Result<String, ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::MissingFile);
        }
        self.validate_file_size(data.len())?;
        let extension = self.validate_extension(filename)?;
        let format = self.validate_image_data(data)?;

        if ImageFormat::from_extension(&extension) != Some(format) {
            return Err(ValidationError::ExtensionMismatch { extension, format });
        }

        tracing::debug!(
            filename = %filename,
            extension = %extension,
            format = ?format,
            size_bytes = data.len(),
            "Upload passed validation"
        );

        Ok(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn test_validator() -> UploadValidator {
        UploadValidator::new(
            1024 * 1024, // 1MB
            vec!["png".to_string(), "jpg".to_string(), "JPEG".to_string()],
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_validate_file_size_ok() {
        let validator = test_validator();
        assert!(validator.validate_file_size(512 * 1024).is_ok());
    }

    #[test]
    fn test_validate_file_size_too_large() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_file_size(2 * 1024 * 1024),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_file_size_empty() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_validate_extension_ok() {
        let validator = test_validator();
        assert_eq!(validator.validate_extension("cat.jpg").unwrap(), "jpg");
        assert_eq!(validator.validate_extension("cat.PNG").unwrap(), "png"); // case insensitive
        assert_eq!(validator.validate_extension("cat.jpeg").unwrap(), "jpeg");
    }

    #[test]
    fn test_validate_extension_invalid() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_extension("cat.gif"),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            validator.validate_extension("cat"),
            Err(ValidationError::MissingExtension(_))
        ));
    }

    #[test]
    fn test_validate_image_data() {
        let validator = test_validator();
        assert_eq!(
            validator.validate_image_data(&png_bytes()).unwrap(),
            ImageFormat::Png
        );
        assert!(matches!(
            validator.validate_image_data(b"definitely not an image"),
            Err(ValidationError::UndecodableImage(_))
        ));
    }

    #[test]
    fn test_validate_all() {
        let validator = test_validator();
        assert_eq!(validator.validate_all("cat.png", &png_bytes()).unwrap(), "png");
        assert!(matches!(
            validator.validate_all("", &png_bytes()),
            Err(ValidationError::MissingFile)
        ));
        assert!(matches!(
            validator.validate_all("cat.gif", &png_bytes()),
            Err(ValidationError::InvalidExtension { .. })
        ));
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_validate_all_rejects_mismatched_contents() {
        let validator = test_validator();

        let err = validator.validate_all("photo.jpg", &png_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ExtensionMismatch {
                format: ImageFormat::Png,
                ..
            }
        ));
        assert_eq!(err.client_message(), "Unsupported image format.");

        assert!(matches!(
            validator.validate_all("photo.png", &jpeg_bytes()),
            Err(ValidationError::ExtensionMismatch { .. })
        ));
        assert_eq!(validator.validate_all("photo.JPEG", &jpeg_bytes()).unwrap(), "jpeg");
        assert_eq!(validator.validate_all("photo.jpg", &jpeg_bytes()).unwrap(), "jpg");
    }

    #[test]
    fn test_client_messages() {
        assert_eq!(
            ValidationError::MissingFile.client_message(),
            "Please specify the image file."
        );
        assert_eq!(
            ValidationError::EmptyFile.client_message(),
            "Please specify the image file."
        );
        assert_eq!(
            ValidationError::InvalidExtension {
                extension: "gif".to_string(),
                allowed: vec![],
            }
            .client_message(),
            "Unsupported image format."
        );
    }
}
