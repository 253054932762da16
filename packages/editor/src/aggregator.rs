//! # Request Aggregation
//!
//! Turns one action into diff requests, one per resolved anchor.
//!
//! ```text
//! Action ──► PendingChanges ──► resolve selectors ──► RequestMap ──► Vec<CodeDiffRequest>
//!            (per-kind lists)    (AnchorIndex)        (AnchorId keyed)
//! ```
//!
//! Entries whose selector does not resolve are dropped one by one; they
//! never abort the rest of the action.

use crate::actions::{Action, ActionKind, MoveActionLocation};
use crate::anchor::{Anchor, AnchorId, AnchorIndex};
use crate::code::{
    CodeDiffRequest, CodeEditText, CodeGroup, CodeInsert, CodeMove, CodeRemove, CodeStyle,
};
use crate::errors::{CodeWriteError, CodeWriteResult};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Moved element before its own anchor has been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub selector: String,
    pub uuid: String,
    pub location: MoveActionLocation,
}

/// Changes of one action, split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub style_changes: Vec<CodeStyle>,
    pub inserted_elements: Vec<CodeInsert>,
    pub moved_elements: Vec<PendingMove>,
    pub text_edits: Vec<CodeEditText>,
    pub removed_elements: Vec<CodeRemove>,
    pub group_elements: Vec<CodeGroup>,
}

impl PendingChanges {
    pub fn from_action(action: &Action) -> CodeWriteResult<Self> {
        let mut changes = Self::default();

        match action {
            Action::UpdateStyle(update) => {
                for target in &update.targets {
                    changes.style_changes.push(CodeStyle {
                        selector: target.target.selector.clone(),
                        styles: BTreeMap::from([(
                            update.style.clone(),
                            target.change.updated.clone(),
                        )]),
                    });
                }
            }
            Action::InsertElement(insert) => {
                changes.inserted_elements.push(CodeInsert {
                    element: insert.element.clone(),
                    location: insert.location.clone(),
                    code_block: insert.code_block.clone(),
                    edit_text: insert.edit_text,
                });
            }
            Action::RemoveElement(remove) => {
                changes.removed_elements.push(CodeRemove {
                    selector: remove.element.selector.clone(),
                    location: remove.location.clone(),
                    element: remove.element.clone(),
                    code_block: remove.code_block.clone(),
                });
            }
            Action::MoveElement(mv) => {
                for target in &mv.targets {
                    changes.moved_elements.push(PendingMove {
                        selector: target.selector.clone(),
                        uuid: target.uuid.clone(),
                        location: mv.location.clone(),
                    });
                }
            }
            Action::EditText(edit) => {
                for target in &edit.targets {
                    changes.text_edits.push(CodeEditText {
                        selector: target.selector.clone(),
                        content: edit.new_content.clone(),
                    });
                }
            }
            Action::GroupElements(group) => {
                changes.group_elements.push(CodeGroup {
                    location: group.location.clone(),
                    surface_id: group.surface_id.clone(),
                    targets: group.targets.clone(),
                });
            }
            Action::UngroupElements(_) => {
                return Err(CodeWriteError::Unsupported(ActionKind::UngroupElements));
            }
        }

        Ok(changes)
    }
}

/// Insertion-ordered map from anchor to its request
#[derive(Debug, Default)]
struct RequestMap {
    requests: Vec<CodeDiffRequest>,
    by_anchor: HashMap<AnchorId, usize>,
}

impl RequestMap {
    fn get_or_create(&mut self, anchor: Anchor, selector: &str) -> &mut CodeDiffRequest {
        let idx = match self.by_anchor.get(&anchor.id) {
            Some(idx) => *idx,
            None => {
                let idx = self.requests.len();
                self.by_anchor.insert(anchor.id, idx);
                self.requests.push(CodeDiffRequest::new(anchor, selector));
                idx
            }
        };
        &mut self.requests[idx]
    }

    fn into_requests(self) -> Vec<CodeDiffRequest> {
        self.requests
            .into_iter()
            .filter(|request| !request.is_empty())
            .collect()
    }
}

/// Builds diff requests against an anchor index
pub struct RequestAggregator<'a> {
    index: &'a dyn AnchorIndex,
}

impl<'a> RequestAggregator<'a> {
    pub fn new(index: &'a dyn AnchorIndex) -> Self {
        Self { index }
    }

    pub async fn aggregate(&self, action: &Action) -> CodeWriteResult<Vec<CodeDiffRequest>> {
        let changes = PendingChanges::from_action(action)?;
        Ok(self.build(changes).await)
    }

    /// Merge changes into one request per anchor.
    ///
    /// Kinds are processed in a fixed order; within a kind, list order is
    /// kept, so a later text edit on the same anchor wins.
    pub async fn build(&self, changes: PendingChanges) -> Vec<CodeDiffRequest> {
        let mut map = RequestMap::default();

        self.process_style_changes(changes.style_changes, &mut map).await;
        self.process_inserted_elements(changes.inserted_elements, &mut map).await;
        self.process_moved_elements(changes.moved_elements, &mut map).await;
        self.process_text_edits(changes.text_edits, &mut map).await;
        self.process_removed_elements(changes.removed_elements, &mut map).await;
        self.process_group_elements(changes.group_elements, &mut map).await;

        map.into_requests()
    }

    async fn resolve(&self, selector: &str) -> Option<Anchor> {
        let anchor = self.index.resolve(selector).await;
        match &anchor {
            Some(anchor) => debug!(selector, anchor = %anchor.id, path = %anchor.path, "resolved anchor"),
            None => warn!(selector, "no anchor found for selector, dropping change"),
        }
        anchor
    }

    async fn process_style_changes(&self, styles: Vec<CodeStyle>, map: &mut RequestMap) {
        for change in styles {
            let Some(anchor) = self.resolve(&change.selector).await else {
                continue;
            };
            let request = map.get_or_create(anchor, &change.selector);
            request.style_changes.push(change);
        }
    }

    async fn process_inserted_elements(&self, inserted: Vec<CodeInsert>, map: &mut RequestMap) {
        for insert in inserted {
            let selector = insert.location.target_selector.clone();
            let Some(anchor) = self.resolve(&selector).await else {
                continue;
            };
            map.get_or_create(anchor, &selector)
                .inserted_elements
                .push(insert);
        }
    }

    async fn process_moved_elements(&self, moved: Vec<PendingMove>, map: &mut RequestMap) {
        for pending in moved {
            let parent_selector = pending.location.location.target_selector.clone();
            let Some(parent) = self.resolve(&parent_selector).await else {
                continue;
            };
            // Resolve the child before touching the map so a missing child
            // cannot leave an empty parent request behind.
            let Some(child) = self.resolve(&pending.selector).await else {
                continue;
            };
            map.get_or_create(parent, &parent_selector)
                .moved_elements
                .push(CodeMove {
                    selector: pending.selector,
                    uuid: pending.uuid,
                    location: pending.location,
                    anchor: child,
                });
        }
    }

    async fn process_text_edits(&self, edits: Vec<CodeEditText>, map: &mut RequestMap) {
        for edit in edits {
            let Some(anchor) = self.resolve(&edit.selector).await else {
                continue;
            };
            map.get_or_create(anchor, &edit.selector).text_content = Some(edit.content);
        }
    }

    async fn process_removed_elements(&self, removed: Vec<CodeRemove>, map: &mut RequestMap) {
        for remove in removed {
            let selector = remove.location.target_selector.clone();
            let Some(anchor) = self.resolve(&selector).await else {
                continue;
            };
            map.get_or_create(anchor, &selector)
                .removed_elements
                .push(remove);
        }
    }

    async fn process_group_elements(&self, groups: Vec<CodeGroup>, map: &mut RequestMap) {
        for group in groups {
            let selector = group.location.target_selector.clone();
            let Some(anchor) = self.resolve(&selector).await else {
                continue;
            };
            map.get_or_create(anchor, &selector).group_elements.push(group);
        }
    }
}
