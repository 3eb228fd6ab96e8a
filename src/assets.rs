//! Asset directory layout and per-upload destination resolution.
//!
//! Uploaded files are laid out under the asset root (`<PUBLIC_DIR>/assets`)
//! in a fixed tree keyed by the normalized design id:
//!
//! ```text
//! tiles/<ID>/       face renders for the default theme (<ID>_R1, _R2, ...)
//! videos/           shared video pool, one <ID>.mp4 per design
//! previews/         shared preview pool, one <ID>.<ext> per design
//! designs/<ID>/     everything else: themed uploads and extra slots
//! ```
//!
//! Record paths are stored relative to the public directory (always with
//! forward slashes) so the frontend can request them under the `/assets`
//! mount verbatim.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

pub const DEFAULT_THEME: &str = "default";

/// Extensions accepted for `main`, `variants` and `preview` files.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
/// Extensions accepted for `video` files.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("the {field} file must be one of {expected}, got '.{ext}'")]
    UnsupportedExtension {
        field: &'static str,
        ext: String,
        expected: &'static str,
    },
}

/// A multipart file field name reduced to its themeData key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub key: String,
    /// Whether the field used the `[]` suffix convention, i.e. the client
    /// intends the value to collect into an array.
    pub array: bool,
}

/// Parses the `files[...]` field-name convention used by themed upload
/// forms. Input → output pairs:
///
/// - `files[hero]`      → key `hero`, scalar
/// - `files[gallery][]` → key `gallery`, array
/// - `swatches[]`       → key `swatches`, array
/// - `hero`             → key `hero`, scalar
/// - `files[]`          → key `files`, array (nothing inside the brackets)
///
/// Path separators in keys are replaced with `_` so keys stay usable as
/// file name stems; a key that ends up empty falls back to `file`.
pub fn parse_file_field(raw: &str) -> FileField {
    let (name, array) = match raw.strip_suffix("[]") {
        Some(inner) => (inner, true),
        None => (raw, false),
    };
    let name = name
        .strip_prefix("files[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(name);
    let key: String = name
        .trim()
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { '_' } else { ch })
        .collect();
    FileField {
        key: if key.is_empty() { "file".to_string() } else { key },
        array,
    }
}

/// Parses the `data[<key>]` convention for scalar themeData fields:
/// `data[accent]` → `accent`; anything else is not a data field.
pub fn parse_data_field(raw: &str) -> Option<String> {
    let key = raw.strip_prefix("data[")?.strip_suffix(']')?.trim();
    (!key.is_empty()).then(|| key.to_string())
}

/// Lowercased extension of an uploaded file name, without the dot.
pub fn file_extension(name: &str) -> String {
    name.rfind('.')
        .map(|dot| name[dot + 1..].to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_image(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

/// Which design-record field a placed file feeds, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetTarget {
    Main,
    Variant,
    Video,
    Preview,
    /// Default-theme file under an unknown tag: written to a deterministic
    /// path but not recorded (the record schema has no slot for it).
    Extra,
    /// Non-default theme file, keyed into the record's themeData map.
    Theme { key: String, array: bool },
}

/// One resolved destination: where the file goes on disk, its final name,
/// and the record field it feeds.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub dir: PathBuf,
    pub file_name: String,
    pub rel_path: String,
    pub target: AssetTarget,
}

/// The on-disk layout rooted at `<PUBLIC_DIR>/assets`.
#[derive(Clone, Debug)]
pub struct AssetLayout {
    root: PathBuf,
}

impl AssetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tiles_dir(&self, id: &str) -> PathBuf {
        self.root.join("tiles").join(id)
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.root.join("previews")
    }

    pub fn design_dir(&self, id: &str) -> PathBuf {
        self.root.join("designs").join(id)
    }
}

/// Per-request destination resolver. Holds the variant counter (starts at 2,
/// advances only for accepted variant files) and the themed-file stamp
/// (request timestamp, bumped per file so names never collide within one
/// request).
pub struct AssetResolver<'a> {
    layout: &'a AssetLayout,
    id: &'a str,
    theme: &'a str,
    next_variant: u32,
    next_stamp: i64,
}

impl<'a> AssetResolver<'a> {
    pub fn new(layout: &'a AssetLayout, id: &'a str, theme: &'a str, now_ms: i64) -> Self {
        Self {
            layout,
            id,
            theme,
            next_variant: 2,
            next_stamp: now_ms,
        }
    }

    /// Resolves one uploaded file. `Ok(None)` means the file is silently
    /// skipped (a variant with a disallowed extension); `Err` rejects the
    /// whole request before anything is written.
    pub fn resolve(
        &mut self,
        field: &str,
        original_name: &str,
    ) -> Result<Option<ResolvedAsset>, AssetError> {
        let ext = file_extension(original_name);

        if self.theme != DEFAULT_THEME {
            let FileField { key, array } = parse_file_field(field);
            let stamp = self.next_stamp;
            self.next_stamp += 1;
            let file_name = join_name(&format!("{key}_{stamp}"), &ext);
            return Ok(Some(ResolvedAsset {
                dir: self.layout.design_dir(self.id),
                rel_path: format!("assets/designs/{}/{}", self.id, file_name),
                file_name,
                target: AssetTarget::Theme { key, array },
            }));
        }

        if field == "main" {
            if !is_image(&ext) {
                return Err(AssetError::UnsupportedExtension {
                    field: "main",
                    ext,
                    expected: "jpg, jpeg, png, webp",
                });
            }
            let file_name = format!("{}_R1.{ext}", self.id);
            Ok(Some(self.tile_asset(file_name, AssetTarget::Main)))
        } else if field.starts_with("variants") {
            if !is_image(&ext) {
                return Ok(None);
            }
            let file_name = format!("{}_R{}.{ext}", self.id, self.next_variant);
            self.next_variant += 1;
            Ok(Some(self.tile_asset(file_name, AssetTarget::Variant)))
        } else if field == "video" {
            if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
                return Err(AssetError::UnsupportedExtension {
                    field: "video",
                    ext,
                    expected: "mp4",
                });
            }
            let file_name = format!("{}.mp4", self.id);
            Ok(Some(ResolvedAsset {
                dir: self.layout.videos_dir(),
                rel_path: format!("assets/videos/{file_name}"),
                file_name,
                target: AssetTarget::Video,
            }))
        } else if field == "preview" {
            if !is_image(&ext) {
                return Err(AssetError::UnsupportedExtension {
                    field: "preview",
                    ext,
                    expected: "jpg, jpeg, png, webp",
                });
            }
            let file_name = format!("{}.{ext}", self.id);
            Ok(Some(ResolvedAsset {
                dir: self.layout.previews_dir(),
                rel_path: format!("assets/previews/{file_name}"),
                file_name,
                target: AssetTarget::Preview,
            }))
        } else {
            let FileField { key, .. } = parse_file_field(field);
            let file_name = join_name(&key, &ext);
            Ok(Some(ResolvedAsset {
                dir: self.layout.design_dir(self.id),
                rel_path: format!("assets/designs/{}/{}", self.id, file_name),
                file_name,
                target: AssetTarget::Extra,
            }))
        }
    }

    fn tile_asset(&self, file_name: String, target: AssetTarget) -> ResolvedAsset {
        ResolvedAsset {
            dir: self.layout.tiles_dir(self.id),
            rel_path: format!("assets/tiles/{}/{}", self.id, file_name),
            file_name,
            target,
        }
    }
}

fn join_name(stem: &str, ext: &str) -> String {
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{ext}")
    }
}

/// Best-effort removal of everything a design left on disk: its tiles
/// directory, its generic asset directory, and any shared preview/video
/// files named `<ID>.*` (compared case-insensitively). Failures are logged
/// and swallowed; record removal is the authoritative outcome.
pub async fn remove_design_assets(layout: &AssetLayout, id: &str) {
    for dir in [layout.tiles_dir(id), layout.design_dir(id)] {
        if let Err(err) = tokio::fs::remove_dir_all(&dir).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(error = %err, path = %dir.display(), "failed to remove design asset directory");
            }
        }
    }

    let prefix = format!("{id}.");
    for dir in [layout.previews_dir(), layout.videos_dir()] {
        remove_prefixed_files(&dir, &prefix).await;
    }
}

async fn remove_prefixed_files(dir: &Path, prefix: &str) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != ErrorKind::NotFound {
                warn!(error = %err, path = %dir.display(), "failed to scan shared asset directory");
            }
            return;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let matches = name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                warn!(error = %err, path = %entry.path().display(), "failed to remove shared asset file");
            }
        }
    }
}
