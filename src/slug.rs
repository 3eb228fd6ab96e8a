//! Canonical design identifiers.
//!
//! Every design is keyed by an uppercase slug (`[A-Z0-9_]+`). The slug and
//! its display label are derived exactly once per upload request, either
//! from an explicit `id` field or from the first uploaded file's name, and
//! the result is passed down through the pipeline from there.

/// A derived `(id, label)` pair for one upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub label: String,
}

/// Normalizes a raw id into the canonical slug form: uppercase, every run
/// of characters outside `[A-Z0-9_]` collapsed into a single underscore,
/// leading and trailing underscores stripped. Idempotent.
pub fn normalize_id(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut gap = false;
    for ch in raw.to_uppercase().chars() {
        if ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_' {
            if gap {
                slug.push('_');
                gap = false;
            }
            slug.push(ch);
        } else {
            gap = true;
        }
    }
    slug.trim_matches('_').to_string()
}

/// The file name without its final extension: `Blue Marble.png` ->
/// `Blue Marble`. Names without a dot are returned whole.
pub fn file_stem(name: &str) -> &str {
    name.rfind('.').map_or(name, |dot| &name[..dot])
}

/// Display label for a file stem: runs of underscores and hyphens become
/// single spaces, whitespace is collapsed, and the result is uppercased.
pub fn label_from_stem(stem: &str) -> String {
    let spaced: String = stem
        .chars()
        .map(|ch| if ch == '_' || ch == '-' { ' ' } else { ch })
        .collect();
    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Derives the request identity. An explicit raw id wins when it survives
/// normalization; the label then defaults to the raw id as supplied.
/// Otherwise both come from the first uploaded file's stem. Returns `None`
/// when neither source yields a usable id, which callers must treat as a
/// client error before touching the filesystem or the store.
pub fn derive_identity(
    raw_id: Option<&str>,
    raw_label: Option<&str>,
    first_file_name: Option<&str>,
) -> Option<Identity> {
    if let Some(raw) = raw_id {
        let id = normalize_id(raw);
        if !id.is_empty() {
            let label = raw_label
                .map(str::to_string)
                .unwrap_or_else(|| raw.trim().to_string());
            return Some(Identity { id, label });
        }
    }

    let stem = file_stem(first_file_name?);
    let id = normalize_id(stem);
    if id.is_empty() {
        return None;
    }
    let label = raw_label
        .map(str::to_string)
        .unwrap_or_else(|| label_from_stem(stem));
    Some(Identity { id, label })
}
