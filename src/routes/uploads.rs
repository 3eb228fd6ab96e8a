use std::collections::BTreeSet;
use std::path::PathBuf;

use axum::extract::{Json, Multipart, State};
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::assets::{parse_data_field, AssetResolver, AssetTarget, ResolvedAsset, DEFAULT_THEME};
use crate::error::{AppError, AppResult};
use crate::models::{Catalog, DesignPatch};
use crate::slug::{derive_identity, Identity};
use crate::state::AppState;

/// One buffered upload part that carried a file.
struct IncomingFile {
    field: String,
    original_name: String,
    bytes: Bytes,
}

/// Everything one multipart request carried. The whole request is drained
/// up front so identity derivation and extension validation can run before
/// any filesystem work.
#[derive(Default)]
struct UploadForm {
    id: Option<String>,
    label: Option<String>,
    finish: Option<String>,
    faces: Option<String>,
    theme: Option<String>,
    data: Vec<(String, String)>,
    files: Vec<IncomingFile>,
}

fn some_nonempty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn collect_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        let msg = format!("invalid multipart data: {err}");
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(msg)
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(|n| n.to_string()) {
            let bytes = field.bytes().await.map_err(|err| {
                let msg = format!("failed to read file bytes: {err}");
                error!(error = %err, field = %name, "failed to read file bytes");
                AppError::bad_request(msg)
            })?;
            // Browsers submit empty file inputs as a part with no name and
            // no payload.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            form.files.push(IncomingFile {
                field: name,
                original_name: file_name,
                bytes,
            });
            continue;
        }

        let value = field.text().await.map_err(|err| {
            let msg = format!("invalid form field: {err}");
            error!(error = %err, field = %name, "invalid form field");
            AppError::bad_request(msg)
        })?;

        if let Some(key) = parse_data_field(&name) {
            form.data.push((key, value));
            continue;
        }

        match name.as_str() {
            "id" => form.id = some_nonempty(value),
            "label" => form.label = some_nonempty(value),
            "finish" => form.finish = some_nonempty(value),
            "faces" => form.faces = some_nonempty(value),
            "theme" => form.theme = some_nonempty(value),
            _ => debug!(field = %name, "ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Accepts one design upload: derives the identity, places every file at its
/// resolved destination, merges the resulting record into the catalogue and
/// responds with the full updated document.
pub async fn upload_design(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<Catalog>> {
    let form = collect_form(multipart).await?;

    let first_file_name = form.files.first().map(|file| file.original_name.as_str());
    let identity = derive_identity(form.id.as_deref(), form.label.as_deref(), first_file_name)
        .ok_or_else(|| {
            error!("upload rejected: no usable id from the id field or file names");
            AppError::bad_request("an id, or at least one file to derive it from, is required")
        })?;
    let theme = form
        .theme
        .clone()
        .unwrap_or_else(|| DEFAULT_THEME.to_string());
    let now_ms = Utc::now().timestamp_millis();

    // Resolve every destination first so a disallowed extension rejects the
    // request before anything is written.
    let mut resolver = AssetResolver::new(&state.assets, &identity.id, &theme, now_ms);
    let mut placements: Vec<(ResolvedAsset, Bytes)> = Vec::new();
    for file in &form.files {
        match resolver.resolve(&file.field, &file.original_name)? {
            Some(asset) => placements.push((asset, file.bytes.clone())),
            None => {
                debug!(
                    field = %file.field,
                    name = %file.original_name,
                    "skipping file with unsupported extension"
                );
            }
        }
    }

    let dirs: BTreeSet<PathBuf> = placements
        .iter()
        .map(|(asset, _)| asset.dir.clone())
        .collect();
    for dir in &dirs {
        tokio::fs::create_dir_all(dir).await.map_err(|err| {
            error!(error = %err, path = %dir.display(), "failed to create asset directory");
            AppError::internal(err)
        })?;
    }

    // Sequential, in upload order. A failed write surfaces as 500 and
    // earlier writes remain on disk.
    for (asset, bytes) in &placements {
        let path = asset.dir.join(&asset.file_name);
        tokio::fs::write(&path, bytes).await.map_err(|err| {
            error!(error = %err, path = %path.display(), "failed to write uploaded file");
            AppError::internal(err)
        })?;
    }

    let patch = build_patch(&identity, &theme, &form, &placements);

    let mut catalog = state.catalog.load().await;
    catalog.seed_branding();
    catalog.upsert(patch, now_ms);
    if let Err(err) = state.catalog.save(&catalog).await {
        error!(error = ?err, design_id = %identity.id, "failed to persist catalog after upload");
        return Err(AppError::internal(err));
    }

    info!(
        design_id = %identity.id,
        theme = %theme,
        files = placements.len(),
        "design upload persisted"
    );

    catalog.sort_designs();
    Ok(Json(catalog))
}

fn build_patch(
    identity: &Identity,
    theme: &str,
    form: &UploadForm,
    placements: &[(ResolvedAsset, Bytes)],
) -> DesignPatch {
    let mut patch = DesignPatch::new(
        identity.id.clone(),
        theme.to_string(),
        identity.label.clone(),
    );
    patch.finish = form.finish.clone();
    patch.faces = form.faces.as_deref().map(|raw| raw.parse().unwrap_or(0));

    let mut variants = Vec::new();
    for (asset, _) in placements {
        match &asset.target {
            AssetTarget::Main => patch.main = Some(asset.rel_path.clone()),
            AssetTarget::Variant => variants.push(asset.rel_path.clone()),
            AssetTarget::Video => patch.video = Some(asset.rel_path.clone()),
            AssetTarget::Preview => patch.preview = Some(asset.rel_path.clone()),
            // Written to a convention-addressable path; the record schema
            // has no slot for it.
            AssetTarget::Extra => {}
            AssetTarget::Theme { key, array } => {
                let path = Value::String(asset.rel_path.clone());
                if *array {
                    match patch.theme_data.get_mut(key) {
                        Some(Value::Array(items)) => items.push(path),
                        _ => {
                            patch.theme_data.insert(key.clone(), Value::Array(vec![path]));
                        }
                    }
                } else {
                    patch.theme_data.insert(key.clone(), path);
                }
            }
        }
    }
    if !variants.is_empty() {
        patch.variants = Some(variants);
    }

    // data[...] scalars travel in themeData alongside the themed files.
    if theme != DEFAULT_THEME {
        for (key, value) in &form.data {
            patch
                .theme_data
                .insert(key.clone(), Value::String(value.clone()));
        }
    }

    patch
}
