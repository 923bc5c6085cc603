use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::config::get_config;
use crate::errors::AppError;
use crate::{log_error, log_info};

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    success: bool,
    data: Option<ImgbbData>,
    error: Option<ImgbbError>,
    status_txt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImgbbData {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImgbbError {
    message: Option<String>,
}

/// Sniff the content type from leading magic bytes. Falls back to jpeg,
/// which the hosting service re-detects anyway.
pub fn detect_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Upload one image to the external hosting service and return its public
/// URL. The caller is expected to have already read the multipart field
/// into memory.
pub async fn upload_image(
    client: &Client,
    bytes: Vec<u8>,
    original_name: &str,
) -> Result<String, AppError> {
    let config = get_config();

    if bytes.is_empty() {
        return Err(AppError::Validation("Empty image file provided".to_string()));
    }
    if bytes.len() as u64 > config.upload.max_image_bytes {
        return Err(AppError::Validation(format!(
            "Image too large (max {}MB)",
            config.upload.max_image_bytes / (1024 * 1024)
        )));
    }

    let api_key = config
        .upload
        .imgbb_api_key
        .clone()
        .ok_or_else(|| AppError::Internal("Image hosting API key is not configured".to_string()))?;

    let mime = detect_mime_type(&bytes);
    let size = bytes.len();
    crate::log_debug!(
        "UPLOAD",
        "uploading image",
        serde_json::json!({ "name": original_name, "bytes": size, "mime": mime })
    );

    let part = Part::bytes(bytes)
        .file_name(original_name.to_string())
        .mime_str(mime)
        .map_err(|e| AppError::Internal(format!("Failed to build upload part: {}", e)))?;

    let form = Form::new().text("key", api_key).part("image", part);

    let response = client
        .post(config.upload.imgbb_upload_url.as_str())
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                AppError::Upload("Image hosting service timed out".to_string())
            } else {
                AppError::Upload(format!("Failed to reach image hosting service: {}", e))
            }
        })?;

    let body: ImgbbResponse = response
        .json()
        .await
        .map_err(|e| AppError::Upload(format!("Invalid response from image hosting service: {}", e)))?;

    if body.success {
        if let Some(data) = body.data {
            log_info!(
                "UPLOAD",
                "image uploaded",
                serde_json::json!({ "name": original_name, "bytes": size, "mime": mime })
            );
            return Ok(data.url);
        }
    }

    let reason = body
        .error
        .and_then(|e| e.message)
        .or(body.status_txt)
        .unwrap_or_else(|| "Unknown error".to_string());
    log_error!("UPLOAD", "image upload rejected", reason.clone());
    Err(AppError::Upload(format!("Image upload failed: {}", reason)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
    }

    #[test]
    fn test_detect_png() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        assert_eq!(detect_mime_type(&png), "image/png");
    }

    #[test]
    fn test_detect_gif_and_webp() {
        assert_eq!(detect_mime_type(b"GIF89a......"), "image/gif");
        let webp = b"RIFF\x00\x00\x00\x00WEBPVP8 ";
        assert_eq!(detect_mime_type(webp), "image/webp");
    }

    #[test]
    fn test_unknown_falls_back_to_jpeg() {
        assert_eq!(detect_mime_type(b"hello"), "image/jpeg");
        assert_eq!(detect_mime_type(&[]), "image/jpeg");
    }
}
