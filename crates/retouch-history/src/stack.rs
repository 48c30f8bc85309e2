// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edit history — a vector of immutable snapshots plus a cursor.
//
// Index 0 is always the root entry ("Original", no tool id). Its image is
// held by the stack itself rather than the entry. Appending after an undo
// truncates everything ahead of the cursor first, so the timeline is linear.
// Snapshots are shared via `Arc`, so undo/redo and producers reading the
// current image never copy pixels.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use retouch_core::Raster;
use retouch_core::error::{Result, RetouchError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Display name of the root entry.
pub const ROOT_TOOL_NAME: &str = "Original";

/// Unique identifier for a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One snapshot in the edit timeline.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: EntryId,
    /// Produced image; `None` only for the root entry.
    pub image: Option<Arc<Raster>>,
    /// Machine id of the tool that produced this entry; `None` only at the root.
    pub tool_id: Option<String>,
    pub tool_name: String,
    pub timestamp: DateTime<Utc>,
    /// Settings the tool ran with, as recorded by the caller.
    pub settings: Map<String, Value>,
}

impl HistoryEntry {
    fn root() -> Self {
        Self {
            id: EntryId::new(),
            image: None,
            tool_id: None,
            tool_name: ROOT_TOOL_NAME.to_string(),
            timestamp: Utc::now(),
            settings: Map::new(),
        }
    }

    /// Whether this is the "Original" entry.
    pub fn is_root(&self) -> bool {
        self.tool_id.is_none()
    }
}

/// Linear undo/redo history over immutable raster snapshots.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    original: Arc<Raster>,
    entries: Vec<HistoryEntry>,
    current: usize,
}

impl HistoryStack {
    // -- Construction -------------------------------------------------------

    /// Start a new history whose root holds `original`.
    pub fn new(original: Raster) -> Self {
        Self::from_shared(Arc::new(original))
    }

    /// Start a new history from an already shared snapshot.
    pub fn from_shared(original: Arc<Raster>) -> Self {
        debug!(
            width = original.width(),
            height = original.height(),
            "History started"
        );
        Self {
            original,
            entries: vec![HistoryEntry::root()],
            current: 0,
        }
    }

    // -- Mutation -----------------------------------------------------------

    /// Run `producer` on the current image and append its output.
    ///
    /// The producer sees the snapshot at the cursor. If it fails the stack is
    /// left exactly as it was and the error is returned.
    #[instrument(skip(self, settings, producer), fields(current = self.current))]
    pub fn apply<F>(
        &mut self,
        tool_id: &str,
        tool_name: &str,
        settings: Map<String, Value>,
        producer: F,
    ) -> Result<&HistoryEntry>
    where
        F: FnOnce(&Raster) -> Result<Raster>,
    {
        let current: &Raster = self.current_image();
        let produced = producer(current)?;
        Ok(self.commit(tool_id, tool_name, settings, produced))
    }

    /// Append an already produced raster after the cursor.
    ///
    /// Every entry ahead of the cursor is discarded first.
    pub fn commit(
        &mut self,
        tool_id: &str,
        tool_name: &str,
        settings: Map<String, Value>,
        image: impl Into<Arc<Raster>>,
    ) -> &HistoryEntry {
        let discarded = self.entries.len() - (self.current + 1);
        self.entries.truncate(self.current + 1);
        self.entries.push(HistoryEntry {
            id: EntryId::new(),
            image: Some(image.into()),
            tool_id: Some(tool_id.to_string()),
            tool_name: tool_name.to_string(),
            timestamp: Utc::now(),
            settings,
        });
        self.current = self.entries.len() - 1;
        info!(
            tool = tool_id,
            index = self.current,
            discarded,
            "History entry appended"
        );
        &self.entries[self.current]
    }

    // -- Navigation ---------------------------------------------------------

    /// Step back one entry. Returns `false` (and does nothing) at the root.
    pub fn undo(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        debug!(index = self.current, "Undo");
        true
    }

    /// Step forward one entry. Returns `false` (and does nothing) at the end.
    pub fn redo(&mut self) -> bool {
        if self.current + 1 >= self.entries.len() {
            return false;
        }
        self.current += 1;
        debug!(index = self.current, "Redo");
        true
    }

    /// Move the cursor directly to `index`.
    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(RetouchError::Range(format!(
                "history index {index} is outside 0..={}",
                self.entries.len() - 1
            )));
        }
        self.current = index;
        debug!(index, "Jumped to history entry");
        Ok(())
    }

    // -- Queries ------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: the root entry is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current_entry(&self) -> &HistoryEntry {
        &self.entries[self.current]
    }

    /// Snapshot at the cursor (the original when the cursor is at the root).
    pub fn current_image(&self) -> &Arc<Raster> {
        self.entries[self.current]
            .image
            .as_ref()
            .unwrap_or(&self.original)
    }

    pub fn original(&self) -> &Arc<Raster> {
        &self.original
    }

    /// Non-root entries up to and including the cursor, oldest first.
    pub fn edits(&self) -> &[HistoryEntry] {
        &self.entries[1..=self.current]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_raster::EditOp;

    fn sample() -> Raster {
        let samples: Vec<u8> = (0..6 * 4 * 4).map(|i| (i * 7 % 251) as u8).collect();
        Raster::from_samples(6, 4, samples).unwrap()
    }

    fn push(stack: &mut HistoryStack, op: EditOp) {
        let settings = op.settings().unwrap();
        stack
            .apply(op.tool_id(), op.tool_name(), settings, |img| op.apply(img))
            .unwrap();
    }

    fn chain() -> Vec<EditOp> {
        vec![
            EditOp::Rotate { degrees: 90.0 },
            EditOp::Sharpen,
            EditOp::Flip {
                horizontal: true,
                vertical: false,
            },
            EditOp::AutoEnhance,
        ]
    }

    #[test]
    fn new_stack_has_only_the_root() {
        let stack = HistoryStack::new(sample());
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.current_index(), 0);
        assert!(stack.current_entry().is_root());
        assert_eq!(stack.current_entry().tool_name, "Original");
        assert!(stack.current_entry().image.is_none());
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert!(stack.edits().is_empty());
    }

    #[test]
    fn undoing_every_edit_restores_the_original_bytes() {
        let original = sample();
        let mut stack = HistoryStack::new(original.clone());
        let ops = chain();
        for op in &ops {
            push(&mut stack, op.clone());
        }
        assert_eq!(stack.len(), ops.len() + 1);
        assert_ne!(stack.current_image().samples(), original.samples());

        for _ in &ops {
            assert!(stack.undo());
        }
        assert_eq!(stack.current_index(), 0);
        assert_eq!(stack.current_image().samples(), original.samples());
        assert_eq!(stack.current_image().dimensions(), original.dimensions());
        assert!(!stack.undo());
    }

    #[test]
    fn redo_after_undo_restores_the_same_snapshot() {
        let mut stack = HistoryStack::new(sample());
        push(&mut stack, EditOp::Blur);
        push(&mut stack, EditOp::Cartoon);
        let before = Arc::clone(stack.current_image());

        assert!(stack.undo());
        assert!(stack.can_redo());
        assert!(stack.redo());
        assert_eq!(stack.current_image().samples(), before.samples());
        assert!(!stack.redo());
    }

    #[test]
    fn apply_after_undo_discards_redo_entries() {
        let mut stack = HistoryStack::new(sample());
        push(&mut stack, EditOp::Blur);
        push(&mut stack, EditOp::Sharpen);
        push(&mut stack, EditOp::EdgeDetect);
        stack.undo();
        stack.undo();
        assert!(stack.can_redo());

        push(&mut stack, EditOp::OilPaint);
        assert!(!stack.can_redo());
        assert!(!stack.redo());
        assert_eq!(stack.len(), 3);
        let tools: Vec<_> = stack
            .edits()
            .iter()
            .filter_map(|e| e.tool_id.as_deref())
            .collect();
        assert_eq!(tools, ["blur", "oil_paint"]);
    }

    #[test]
    fn failed_producer_leaves_the_stack_untouched() {
        let mut stack = HistoryStack::new(sample());
        push(&mut stack, EditOp::Blur);
        stack.undo();
        let ids: Vec<EntryId> = stack.entries().iter().map(|e| e.id).collect();

        let oversize = EditOp::Crop {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
        };
        let err = stack
            .apply("crop", "Crop", Map::new(), |img| oversize.apply(img))
            .unwrap_err();
        assert!(matches!(err, RetouchError::Range(_)));

        // The redo entry ahead of the cursor survives a failed apply.
        assert_eq!(stack.current_index(), 0);
        assert!(stack.can_redo());
        let after: Vec<EntryId> = stack.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, after);
    }

    #[test]
    fn jump_to_is_bounded() {
        let mut stack = HistoryStack::new(sample());
        push(&mut stack, EditOp::Blur);
        push(&mut stack, EditOp::Sharpen);

        stack.jump_to(0).unwrap();
        assert_eq!(stack.current_index(), 0);
        stack.jump_to(2).unwrap();
        assert_eq!(stack.current_entry().tool_id.as_deref(), Some("sharpen"));
        assert!(matches!(stack.jump_to(3), Err(RetouchError::Range(_))));
        assert_eq!(stack.current_index(), 2);
    }

    #[test]
    fn only_the_root_lacks_a_tool_id() {
        let mut stack = HistoryStack::new(sample());
        for op in chain() {
            push(&mut stack, op);
        }
        let roots: Vec<usize> = stack
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_root())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(roots, [0]);
    }

    #[test]
    fn recorded_settings_describe_the_op() {
        let mut stack = HistoryStack::new(sample());
        let op = EditOp::Rotate { degrees: 180.0 };
        push(&mut stack, op.clone());
        let entry = stack.current_entry();
        assert_eq!(entry.tool_name, "Rotate");
        assert_eq!(EditOp::from_settings(&entry.settings).unwrap(), op);
    }

    #[test]
    fn undo_shares_snapshots_instead_of_copying() {
        let mut stack = HistoryStack::new(sample());
        push(&mut stack, EditOp::Blur);
        let blurred = Arc::clone(stack.current_image());
        stack.undo();
        assert!(Arc::ptr_eq(stack.current_image(), stack.original()));
        stack.redo();
        assert!(Arc::ptr_eq(stack.current_image(), &blurred));
    }
}
