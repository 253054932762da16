//! # Editor Actions
//!
//! User-intent edits produced by the visual surface.
//!
//! Every action carries the targets it was produced for plus a
//! variant-specific payload. Actions are serialized with a kebab-case
//! `type` tag so action logs can be recorded and replayed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Before/after pair for a single value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Change<T> {
    pub updated: T,
    pub original: T,
}

/// Element an action was performed on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionTarget {
    /// Surface (webview/canvas) that owns the element
    pub surface_id: String,
    pub selector: String,
    /// Stable element identity
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleActionTarget {
    #[serde(flatten)]
    pub target: ActionTarget,
    pub change: Change<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupActionTarget {
    #[serde(flatten)]
    pub target: ActionTarget,
    /// Index of the member inside its original parent
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsertPos {
    Before,
    After,
    Prepend,
    Append,
    Index,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionElementLocation {
    pub position: InsertPos,
    pub target_selector: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveActionLocation {
    #[serde(flatten)]
    pub location: ActionElementLocation,
    pub original_index: usize,
}

/// Element subtree as seen by the visual surface
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionElement {
    pub selector: String,
    pub tag_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ActionElement>,
    #[serde(default)]
    pub styles: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateStyleAction {
    pub targets: Vec<StyleActionTarget>,
    /// Style property being changed, e.g. `backgroundColor`
    pub style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InsertElementAction {
    pub targets: Vec<ActionTarget>,
    pub location: ActionElementLocation,
    pub element: ActionElement,
    #[serde(default)]
    pub edit_text: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoveElementAction {
    pub targets: Vec<ActionTarget>,
    pub location: ActionElementLocation,
    pub element: ActionElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveElementAction {
    pub targets: Vec<ActionTarget>,
    pub location: MoveActionLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditTextAction {
    pub targets: Vec<ActionTarget>,
    pub original_content: String,
    pub new_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupElementsAction {
    pub targets: Vec<GroupActionTarget>,
    pub location: ActionElementLocation,
    pub surface_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UngroupElementsAction {
    pub targets: Vec<GroupActionTarget>,
    pub location: ActionElementLocation,
    pub surface_id: String,
}

/// A single user edit waiting to be written to source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    UpdateStyle(UpdateStyleAction),
    InsertElement(InsertElementAction),
    RemoveElement(RemoveElementAction),
    MoveElement(MoveElementAction),
    EditText(EditTextAction),
    GroupElements(GroupElementsAction),
    /// Not supported by the code writer; cycles log and skip it
    UngroupElements(UngroupElementsAction),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    UpdateStyle,
    InsertElement,
    RemoveElement,
    MoveElement,
    EditText,
    GroupElements,
    UngroupElements,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::UpdateStyle => "update-style",
            ActionKind::InsertElement => "insert-element",
            ActionKind::RemoveElement => "remove-element",
            ActionKind::MoveElement => "move-element",
            ActionKind::EditText => "edit-text",
            ActionKind::GroupElements => "group-elements",
            ActionKind::UngroupElements => "ungroup-elements",
        };
        f.write_str(name)
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::UpdateStyle(_) => ActionKind::UpdateStyle,
            Action::InsertElement(_) => ActionKind::InsertElement,
            Action::RemoveElement(_) => ActionKind::RemoveElement,
            Action::MoveElement(_) => ActionKind::MoveElement,
            Action::EditText(_) => ActionKind::EditText,
            Action::GroupElements(_) => ActionKind::GroupElements,
            Action::UngroupElements(_) => ActionKind::UngroupElements,
        }
    }

    /// Whether a successful write leaves generation keys behind that the
    /// cleanup pass must compact
    pub fn marks_dirty(&self) -> bool {
        match self.kind() {
            ActionKind::InsertElement | ActionKind::MoveElement | ActionKind::GroupElements => {
                true
            }
            ActionKind::UpdateStyle
            | ActionKind::RemoveElement
            | ActionKind::EditText
            | ActionKind::UngroupElements => false,
        }
    }
}
