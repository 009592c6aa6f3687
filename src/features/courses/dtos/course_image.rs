use axum::extract::Multipart;
use tracing::debug;
use utoipa::ToSchema;

use crate::core::error::AppError;
use crate::shared::validation::FieldErrors;

/// Image types accepted as a course cover, with the extension they are stored under
pub const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Maximum cover image size (5 MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Cover image upload form, for the OpenAPI document only.
/// Handlers read the body through [`CourseImageUpload::from_multipart`].
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CourseImageForm {
    /// JPEG, PNG, GIF or WebP, at most 5 MB
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
}

/// Cover image read from a multipart body
#[derive(Debug)]
pub struct CourseImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl CourseImageUpload {
    /// Read the `image` field; other fields are skipped.
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut upload = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            debug!("Failed to read multipart field: {}", e);
            AppError::BadRequest(format!("Failed to read multipart data: {}", e))
        })? {
            if field.name() != Some("image") {
                debug!("Ignoring unknown field: {:?}", field.name());
                continue;
            }

            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|e| {
                debug!("Failed to read image bytes: {}", e);
                AppError::BadRequest(format!("Failed to read image data: {}", e))
            })?;

            upload = Some(Self {
                data: data.to_vec(),
                content_type,
            });
        }

        upload.ok_or_else(|| AppError::Validation(FieldErrors::single("image", "This field is required.")))
    }

    /// Extension to store the image under, or the reasons it is refused
    pub fn check(&self) -> Result<&'static str, AppError> {
        let mut errors = FieldErrors::new();

        if self.data.is_empty() {
            errors.add("image", "The submitted file is empty.");
        } else if self.data.len() > MAX_IMAGE_SIZE {
            errors.add(
                "image",
                format!("Image is too large. Maximum size is {} MB.", MAX_IMAGE_SIZE / 1024 / 1024),
            );
        }

        let extension = image_extension(&self.content_type);
        if extension.is_none() {
            errors.add(
                "image",
                format!("File type '{}' is not an accepted image.", self.content_type),
            );
        }

        match extension {
            Some(ext) if errors.is_empty() => Ok(ext),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(allowed, _)| allowed.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> CourseImageUpload {
        CourseImageUpload {
            data: vec![0u8; len],
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[test]
    fn test_check_accepts_small_images() {
        assert_eq!(upload("image/webp", 1024).check().unwrap(), "webp");
    }

    #[test]
    fn test_check_rejects_other_types_and_sizes() {
        let err = upload("text/plain", 10).check().unwrap_err();
        let errors = err.field_errors().unwrap();
        assert!(errors.get("image")[0].contains("text/plain"));

        let err = upload("image/png", MAX_IMAGE_SIZE + 1).check().unwrap_err();
        assert!(err.field_errors().unwrap().get("image")[0].contains("too large"));

        assert!(upload("image/png", 0).check().is_err());
    }
}
