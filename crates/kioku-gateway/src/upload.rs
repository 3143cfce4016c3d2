// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File upload and audio transcription endpoints.
//!
//! Uploads are validated by extension allow-list and size cap, then
//! written under the configured upload directory with a fresh uuid name
//! so client-supplied filenames never touch the filesystem.

use axum::Json;
use axum::extract::{Multipart, State};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppContext;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "doc", "docx"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "webm", "flac"];

/// Classifies a filename by extension, lowercased.
fn file_kind(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit('.').next()?.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Some("image")
    } else if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
        Some("document")
    } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        Some("audio")
    } else {
        None
    }
}

/// Pulls the `file` part out of a multipart body.
async fn read_file_part(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .ok_or_else(|| ApiError::bad_request("file part is missing a filename"))?
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read file part: {e}")))?;
        return Ok((filename, data.to_vec()));
    }
    Err(ApiError::bad_request("multipart body has no file part"))
}

pub async fn post_upload(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (filename, data) = read_file_part(&mut multipart).await?;

    let kind = file_kind(&filename)
        .ok_or_else(|| ApiError::unsupported_media_type("unsupported file type"))?;
    if data.len() as u64 > ctx.config.upload.max_file_bytes {
        return Err(ApiError::payload_too_large(format!(
            "file exceeds {} byte limit",
            ctx.config.upload.max_file_bytes
        )));
    }

    let id = Uuid::new_v4().to_string();
    let extension = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let stored_name = format!("{id}.{extension}");
    let dir = std::path::Path::new(&ctx.config.upload.dir);

    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        tracing::error!(error = %e, "failed to create upload directory");
        ApiError::from(kioku_core::KiokuError::Internal(e.to_string()))
    })?;
    let size = data.len();
    tokio::fs::write(dir.join(&stored_name), data)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to write uploaded file");
            ApiError::from(kioku_core::KiokuError::Internal(e.to_string()))
        })?;

    info!(id = %id, kind, size, "file uploaded");
    Ok(Json(json!({
        "id": id,
        "filename": filename,
        "type": kind,
        "size": size,
    })))
}

pub async fn post_transcribe(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (filename, data) = read_file_part(&mut multipart).await?;

    if file_kind(&filename) != Some("audio") {
        return Err(ApiError::unsupported_media_type(
            "transcription requires an audio file",
        ));
    }
    if data.len() as u64 > ctx.config.upload.max_audio_bytes {
        return Err(ApiError::payload_too_large(format!(
            "audio exceeds {} byte limit",
            ctx.config.upload.max_audio_bytes
        )));
    }

    let text = ctx.llm.transcribe(data, &filename).await?;
    Ok(Json(json!({ "text": text, "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(file_kind("photo.JPG"), Some("image"));
        assert_eq!(file_kind("notes.md"), Some("document"));
        assert_eq!(file_kind("clip.m4a"), Some("audio"));
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert_eq!(file_kind("payload.exe"), None);
        assert_eq!(file_kind("noextension"), None);
    }
}
