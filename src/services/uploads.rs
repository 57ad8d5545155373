use actix_multipart::Multipart;
use futures_util::StreamExt as _;
use log::warn;
use std::path::Path;
use uuid::Uuid;

use crate::databases::books::BookFields;
use crate::errors::{ApiError, ApiResult};

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Whether a form creates a listing or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    /// A blank price on edit resets the price to 0.
    Edit,
}

#[derive(Debug, Default)]
pub struct BookForm {
    pub fields: BookFields,
    pub image: Option<UploadedFile>,
}

/// Reads a listing form: text fields plus an optional `image` file part.
pub async fn read_book_form(mut multipart: Multipart, mode: FormMode) -> ApiResult<BookForm> {
    let mut form = BookForm::default();

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|e| ApiError::Upload(format!("Error reading field: {}", e)))?;

        let disposition = field.content_disposition();
        let name = disposition.get_name().map(|n| n.to_string()).unwrap_or_default();
        let file_name = disposition.get_filename().map(|n| n.to_string());

        let limit = if name == "image" { MAX_IMAGE_BYTES } else { 64 * 1024 };
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::Upload(format!("Error reading chunk: {}", e)))?;
            if data.len() + chunk.len() > limit {
                return Err(ApiError::Upload(format!("Field '{}' is too large", name)));
            }
            data.extend_from_slice(&chunk);
        }

        if name == "image" {
            if !data.is_empty() {
                form.image = Some(UploadedFile {
                    original_name: file_name,
                    bytes: data,
                });
            }
            continue;
        }

        let value = String::from_utf8(data)
            .map_err(|_| ApiError::validation(format!("Field '{}' is not valid text", name)))?;
        apply_field(&mut form.fields, &name, value, mode)?;
    }

    Ok(form)
}

pub fn apply_field(fields: &mut BookFields, name: &str, value: String, mode: FormMode) -> ApiResult<()> {
    match name {
        "title" => fields.title = Some(value),
        "author" => fields.author = Some(value),
        "location" => fields.location = Some(value),
        "description" => fields.description = Some(value),
        "price" => {
            let value = value.trim();
            if value.is_empty() {
                if mode == FormMode::Edit {
                    fields.price = Some(0.0);
                }
            } else {
                let price = value
                    .parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite() && *p >= 0.0)
                    .ok_or_else(|| ApiError::validation("Invalid price"))?;
                fields.price = Some(price);
            }
        }
        "rating" => {
            let value = value.trim();
            if !value.is_empty() {
                let rating = value
                    .parse::<i16>()
                    .ok()
                    .filter(|r| (1..=5).contains(r))
                    .ok_or_else(|| ApiError::validation("Rating must be between 1 and 5"))?;
                fields.rating = Some(rating);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Name under which an upload is stored: a fresh uuid plus the client's extension.
pub fn stored_name(original_name: Option<&str>) -> String {
    let extension = original_name
        .map(sanitize_filename::sanitize)
        .and_then(|name| {
            Path::new(&name)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase())
        })
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

pub async fn save_image(dir: &Path, file: &UploadedFile) -> std::io::Result<String> {
    tokio::fs::create_dir_all(dir).await?;
    let name = stored_name(file.original_name.as_deref());
    tokio::fs::write(dir.join(&name), &file.bytes).await?;
    Ok(name)
}

/// Passes `result` through, removing the just-stored `image` on error.
pub async fn discard_image_on_error<T, E>(dir: &Path, image: Option<&str>, result: Result<T, E>) -> ApiResult<T>
where
    E: Into<ApiError>,
{
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Some(name) = image {
                remove_image(dir, name).await;
            }
            Err(e.into())
        }
    }
}

/// Removes a stored upload. A missing or undeletable file is only logged.
pub async fn remove_image(dir: &Path, name: &str) {
    let file_name = sanitize_filename::sanitize(name);
    if let Err(e) = tokio::fs::remove_file(dir.join(&file_name)).await {
        warn!("Could not remove upload {}: {}", file_name, e);
    }
}
