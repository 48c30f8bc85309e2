// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// retouch-history — Linear undo/redo history of immutable image snapshots.

pub mod stack;

pub use stack::{EntryId, HistoryEntry, HistoryStack};
