//! The catalogue document and the operations that rewrite it.
//!
//! The whole store is one JSON document: a couple of branding defaults plus
//! an array of design records uniquely keyed by normalized id. All field
//! names are camelCase on the wire and on disk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Seeded into a document that has no branding yet; never overwritten once
/// present.
pub const DEFAULT_BRAND_LOGO: &str = "assets/branding/brand-logo.png";
pub const DEFAULT_SIZE_ICON: &str = "assets/branding/size-icon.png";

/// Sort key for records without an explicit position: they go last.
const POSITION_LAST: i64 = i64::MAX;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Design {
    pub id: String,
    pub theme: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
    #[serde(default)]
    pub faces: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub theme_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Design {
    fn sort_key(&self) -> (i64, i64) {
        (self.position.unwrap_or(POSITION_LAST), self.created_at)
    }
}

/// The fields one upload request carried. `None` means the request did not
/// mention the field, so an existing value is retained; `theme` and `label`
/// are always carried and always replace.
#[derive(Debug, Clone, Default)]
pub struct DesignPatch {
    pub id: String,
    pub theme: String,
    pub label: String,
    pub finish: Option<String>,
    pub faces: Option<u32>,
    pub main: Option<String>,
    pub variants: Option<Vec<String>>,
    pub video: Option<String>,
    pub preview: Option<String>,
    pub theme_data: Map<String, Value>,
}

impl DesignPatch {
    pub fn new(id: impl Into<String>, theme: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            theme: theme.into(),
            label: label.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_icon: Option<String>,
    #[serde(default)]
    pub designs: Vec<Design>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    #[error("order must list every design id exactly once (have {expected} designs, got {got} ids)")]
    WrongCount { expected: usize, got: usize },
    #[error("order contains duplicate id '{0}'")]
    DuplicateId(String),
    #[error("order contains unknown id '{0}'")]
    UnknownId(String),
}

/// Which records a reorder request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderScope {
    All,
    Theme(String),
}

impl ReorderScope {
    /// `theme` absent, empty, or the literal `"all"` means the whole
    /// catalogue; anything else scopes to that theme's subset.
    pub fn from_request(theme: Option<String>) -> Self {
        match theme.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Self::All,
            Some(name) => Self::Theme(name.to_string()),
        }
    }
}

impl Catalog {
    /// Fills in branding defaults when absent. Values already present are
    /// never overwritten.
    pub fn seed_branding(&mut self) {
        if self.brand_logo.is_none() {
            self.brand_logo = Some(DEFAULT_BRAND_LOGO.to_string());
        }
        if self.size_icon.is_none() {
            self.size_icon = Some(DEFAULT_SIZE_ICON.to_string());
        }
    }

    /// Display order: ascending position with missing positions last,
    /// ties broken by ascending creation time.
    pub fn sort_designs(&mut self) {
        self.designs.sort_by_key(Design::sort_key);
    }

    pub fn find(&self, id: &str) -> Option<&Design> {
        self.designs.iter().find(|design| design.id == id)
    }

    /// Merges one upload's fields into the record with the patch's id, or
    /// appends a new record. Fields the request did not carry keep their
    /// previous value; `themeData` merges key-by-key with incoming keys
    /// overwriting; `createdAt` is set only on insert.
    pub fn upsert(&mut self, patch: DesignPatch, now_ms: i64) {
        match self.designs.iter_mut().find(|design| design.id == patch.id) {
            Some(existing) => {
                existing.theme = patch.theme;
                existing.label = patch.label;
                if let Some(finish) = patch.finish {
                    existing.finish = Some(finish);
                }
                if let Some(faces) = patch.faces {
                    existing.faces = faces;
                }
                if let Some(main) = patch.main {
                    existing.main = Some(main);
                }
                if let Some(variants) = patch.variants {
                    existing.variants = variants;
                }
                if let Some(video) = patch.video {
                    existing.video = Some(video);
                }
                if let Some(preview) = patch.preview {
                    existing.preview = Some(preview);
                }
                for (key, value) in patch.theme_data {
                    existing.theme_data.insert(key, value);
                }
                existing.updated_at = now_ms;
            }
            None => self.designs.push(Design {
                id: patch.id,
                theme: patch.theme,
                label: patch.label,
                finish: patch.finish,
                faces: patch.faces.unwrap_or(0),
                main: patch.main,
                variants: patch.variants.unwrap_or_default(),
                video: patch.video,
                preview: patch.preview,
                theme_data: patch.theme_data,
                position: None,
                created_at: now_ms,
                updated_at: now_ms,
            }),
        }
    }

    /// Drops the record with this id. Returns whether one existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.designs.len();
        self.designs.retain(|design| design.id != id);
        self.designs.len() != before
    }

    /// Rewrites `position` so that sorting by it reproduces the requested
    /// order. All-scope requires `order` to be an exact permutation of the
    /// current id set. Theme scope treats `order` as a subsequence: walking
    /// the current display order, each design whose id is in the supplied
    /// set takes the next supplied id's slot while everything else stays
    /// put. Duplicate or unknown ids in a theme-scope order are dropped.
    pub fn reorder(&mut self, scope: &ReorderScope, order: &[String]) -> Result<(), ReorderError> {
        let mut current: Vec<(String, (i64, i64))> = self
            .designs
            .iter()
            .map(|design| (design.id.clone(), design.sort_key()))
            .collect();
        current.sort_by_key(|(_, key)| *key);
        let current: Vec<String> = current.into_iter().map(|(id, _)| id).collect();

        let final_ids: Vec<String> = match scope {
            ReorderScope::All => {
                if order.len() != current.len() {
                    return Err(ReorderError::WrongCount {
                        expected: current.len(),
                        got: order.len(),
                    });
                }
                let mut seen = std::collections::HashSet::new();
                for id in order {
                    if !seen.insert(id.as_str()) {
                        return Err(ReorderError::DuplicateId(id.clone()));
                    }
                    if !current.iter().any(|current_id| current_id == id) {
                        return Err(ReorderError::UnknownId(id.clone()));
                    }
                }
                order.to_vec()
            }
            ReorderScope::Theme(_) => {
                let mut supplied: Vec<&String> = Vec::new();
                for id in order {
                    if !supplied.contains(&id) && current.contains(id) {
                        supplied.push(id);
                    }
                }
                let members: std::collections::HashSet<&str> =
                    supplied.iter().map(|id| id.as_str()).collect();
                let mut queue = supplied.into_iter();
                current
                    .iter()
                    .map(|id| {
                        if members.contains(id.as_str()) {
                            queue.next().cloned().unwrap_or_else(|| id.clone())
                        } else {
                            id.clone()
                        }
                    })
                    .collect()
            }
        };

        for design in &mut self.designs {
            if let Some(index) = final_ids.iter().position(|id| *id == design.id) {
                design.position = Some(index as i64 + 1);
            }
        }
        Ok(())
    }
}
