use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{storage::StorageClient, validation::Fields};

/// Multipart field carrying the profile picture.
pub const IMAGE_FIELD: &str = "image";

/// An uploaded image with its server-assigned filename.
pub struct UploadItem {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Splits a multipart body into its text fields and the uploaded image, if any.
pub async fn read_multipart(mut mp: Multipart) -> anyhow::Result<(Fields, Option<UploadItem>)> {
    let mut fields = Fields::new();
    let mut upload = None;
    while let Some(field) = mp.next_field().await.context("read multipart field")? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == IMAGE_FIELD && field.file_name().is_some() {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let filename = stored_filename(
                field.file_name().unwrap_or_default(),
                &content_type,
                OffsetDateTime::now_utc(),
            );
            let body = field.bytes().await.context("read upload body")?;
            upload = Some(UploadItem {
                filename,
                content_type,
                body,
            });
        } else {
            let text = field
                .text()
                .await
                .with_context(|| format!("read field {name}"))?;
            fields.insert(name, Value::String(text));
        }
    }
    Ok((fields, upload))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

/// `<unix-millis>-<original name without whitespace>`.
pub fn stored_filename(original_name: &str, content_type: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    let base = if matches!(base.as_str(), "" | "." | "..") {
        format!("upload.{}", ext_from_mime(content_type).unwrap_or("bin"))
    } else {
        base
    };
    format!("{millis}-{base}")
}

/// Stores the upload under its assigned filename and returns that filename.
pub async fn save_upload(storage: &dyn StorageClient, item: UploadItem) -> anyhow::Result<String> {
    anyhow::ensure!(
        ext_from_mime(&item.content_type).is_some(),
        "unsupported upload type {}",
        item.content_type
    );
    storage
        .put_object(&item.filename, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", item.filename))?;
    Ok(item.filename)
}

pub fn image_url(file_path: &str, filename: &str) -> String {
    format!("{file_path}{filename}")
}
