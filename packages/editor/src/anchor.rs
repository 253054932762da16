//! # Anchors
//!
//! An anchor identifies the place in source code an element on the visual
//! surface was generated from. Anchors are looked up per action and per
//! cycle; the code writer never caches them.
//!
//! Requests are merged by [`AnchorId`], so two selectors resolving to the
//! same source location always land in the same diff request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Arena id of an anchor, used as the aggregation key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AnchorId(pub u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Resolved source location for a selector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anchor {
    pub id: AnchorId,
    /// File the anchored element lives in
    pub path: String,
    pub start: Position,
    pub end: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

/// Lookup from selector to anchor.
///
/// Implementations must be side-effect free and cheap to call repeatedly.
#[async_trait]
pub trait AnchorIndex: Send + Sync {
    async fn resolve(&self, selector: &str) -> Option<Anchor>;
}

/// Serialized form of an arena entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub path: String,
    #[serde(default)]
    pub start: Position,
    #[serde(default)]
    pub end: Position,
    #[serde(default)]
    pub component: Option<String>,
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorManifest {
    pub anchors: Vec<AnchorEntry>,
}

/// In-memory anchor index backed by an arena of anchors
#[derive(Debug, Clone, Default)]
pub struct AnchorArena {
    anchors: Vec<Anchor>,
    selectors: HashMap<String, AnchorId>,
}

impl AnchorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena from a manifest, allocating ids in manifest order
    pub fn from_manifest(manifest: AnchorManifest) -> Self {
        let mut arena = Self::new();
        for entry in manifest.anchors {
            let id = arena.allocate(entry.path, entry.start, entry.end, entry.component);
            for selector in entry.selectors {
                arena.alias(selector, id);
            }
        }
        arena
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let manifest: AnchorManifest = serde_json::from_str(json)?;
        Ok(Self::from_manifest(manifest))
    }

    /// Register a new anchor for `selector` spanning a whole file
    pub fn insert(&mut self, selector: impl Into<String>, path: impl Into<String>) -> AnchorId {
        let id = self.allocate(path.into(), Position::default(), Position::default(), None);
        self.alias(selector, id);
        id
    }

    pub fn allocate(
        &mut self,
        path: String,
        start: Position,
        end: Position,
        component: Option<String>,
    ) -> AnchorId {
        let id = AnchorId(self.anchors.len() as u64);
        self.anchors.push(Anchor {
            id,
            path,
            start,
            end,
            component,
        });
        id
    }

    /// Point an additional selector at an existing anchor
    pub fn alias(&mut self, selector: impl Into<String>, id: AnchorId) {
        self.selectors.insert(selector.into(), id);
    }

    pub fn get(&self, id: AnchorId) -> Option<&Anchor> {
        usize::try_from(id.0).ok().and_then(|idx| self.anchors.get(idx))
    }

    pub fn lookup(&self, selector: &str) -> Option<&Anchor> {
        self.selectors.get(selector).and_then(|id| self.get(*id))
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

#[async_trait]
impl AnchorIndex for AnchorArena {
    async fn resolve(&self, selector: &str) -> Option<Anchor> {
        self.lookup(selector).cloned()
    }
}
