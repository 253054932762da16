//! Per-anchor change descriptors and the diff request/response model.

use crate::actions::{
    ActionElement, ActionElementLocation, GroupActionTarget, MoveActionLocation,
};
use crate::anchor::{Anchor, AnchorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Style properties to set on one element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeStyle {
    pub selector: String,
    pub styles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeInsert {
    pub element: ActionElement,
    pub location: ActionElementLocation,
    /// Raw source to insert verbatim instead of generating from `element`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
    #[serde(default)]
    pub edit_text: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeRemove {
    pub selector: String,
    pub location: ActionElementLocation,
    /// Removed subtree, kept for reference
    pub element: ActionElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeMove {
    pub selector: String,
    pub uuid: String,
    pub location: MoveActionLocation,
    /// Anchor of the moved child, resolved separately from its new parent
    pub anchor: Anchor,
}

impl CodeMove {
    pub fn original_index(&self) -> usize {
        self.location.original_index
    }

    pub fn destination_index(&self) -> usize {
        self.location.location.index
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeEditText {
    pub selector: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeGroup {
    pub location: ActionElementLocation,
    pub surface_id: String,
    /// Members with their index inside the original parent
    pub targets: Vec<GroupActionTarget>,
}

/// All pending changes for one anchor, sent to the diff service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeDiffRequest {
    pub anchor: Anchor,
    /// Selector whose resolution created this request
    pub selector: String,
    #[serde(default)]
    pub style_changes: Vec<CodeStyle>,
    #[serde(default)]
    pub inserted_elements: Vec<CodeInsert>,
    #[serde(default)]
    pub removed_elements: Vec<CodeRemove>,
    #[serde(default)]
    pub moved_elements: Vec<CodeMove>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub group_elements: Vec<CodeGroup>,
}

impl CodeDiffRequest {
    pub fn new(anchor: Anchor, selector: impl Into<String>) -> Self {
        Self {
            anchor,
            selector: selector.into(),
            style_changes: Vec::new(),
            inserted_elements: Vec::new(),
            removed_elements: Vec::new(),
            moved_elements: Vec::new(),
            text_content: None,
            group_elements: Vec::new(),
        }
    }

    pub fn anchor_id(&self) -> AnchorId {
        self.anchor.id
    }

    pub fn is_empty(&self) -> bool {
        self.style_changes.is_empty()
            && self.inserted_elements.is_empty()
            && self.removed_elements.is_empty()
            && self.moved_elements.is_empty()
            && self.text_content.is_none()
            && self.group_elements.is_empty()
    }
}

/// Computed, file-scoped patch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeDiff {
    pub path: String,
    /// File content the diff was computed against
    pub original: String,
    /// New file content
    pub generated: String,
}
