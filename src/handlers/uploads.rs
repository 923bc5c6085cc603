//! Multipart form handling shared by the product, category, and banner
//! endpoints. Files are read fully into memory and proxied to the image
//! host; only the resulting URLs are stored.

use std::collections::HashMap;

use axum::extract::Multipart;
use reqwest::Client;

use crate::errors::AppError;
use crate::rate_limiter::UPLOAD_LIMIT;
use crate::upload;

/// Maximum image files per request (product galleries).
pub const MAX_FILES: usize = 6;

pub struct UploadedFile {
    pub field: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct ParsedForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl ParsedForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn required_text(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Validation(format!("{} is required", name)))
    }
}

/// Drain a multipart request into text fields and file parts.
pub async fn read_form(mut multipart: Multipart) -> Result<ParsedForm, AppError> {
    let mut form = ParsedForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name() {
            Some(file_name) => {
                if form.files.len() >= MAX_FILES {
                    return Err(AppError::Validation(format!(
                        "Too many files (max {})",
                        MAX_FILES
                    )));
                }
                let file_name = file_name.to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?;
                form.files.push(UploadedFile {
                    field: name,
                    name: file_name,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {}", e)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Upload every file part and return the hosted URLs, in order. Rate
/// limited per caller so one admin session cannot exhaust the image-host
/// quota.
pub async fn upload_all(
    client: &Client,
    caller: &str,
    files: &[UploadedFile],
) -> Result<Vec<String>, AppError> {
    if !files.is_empty() {
        UPLOAD_LIMIT
            .check(caller, "upload")
            .map_err(AppError::RateLimited)?;
    }
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        let url = upload::upload_image(client, file.bytes.clone(), &file.name).await?;
        urls.push(url);
    }
    Ok(urls)
}

/// Array-valued form fields arrive either as a JSON array string or as a
/// comma-separated list, depending on the client.
pub fn parse_string_array(raw: Option<&str>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            if let Ok(parsed) = serde_json::from_str::<Vec<String>>(trimmed) {
                return parsed;
            }
            trimmed
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_array_json_and_csv() {
        assert_eq!(
            parse_string_array(Some(r#"["red","blue"]"#)),
            vec!["red", "blue"]
        );
        assert_eq!(parse_string_array(Some("red, blue")), vec!["red", "blue"]);
        assert!(parse_string_array(Some("  ")).is_empty());
        assert!(parse_string_array(None).is_empty());
    }
}
