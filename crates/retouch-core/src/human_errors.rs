// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Short, user-facing error messages.
//
// Every technical error is mapped to one sentence plus a suggestion. The UI
// shows both and offers a retry button when `retriable` is set.

use crate::error::RetouchError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary condition; trying again may work.
    Transient,
    /// The user must change something (pick another file, adjust a crop).
    ActionRequired,
    /// Retrying the same input will fail again.
    Permanent,
}

/// A human-readable error with a message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether a retry button makes sense.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `RetouchError` into a `HumanError`.
pub fn humanize_error(err: &RetouchError) -> HumanError {
    match err {
        RetouchError::Decode(_) => HumanError {
            message: "We couldn't open this image.".into(),
            suggestion: "The file may be damaged or in an unsupported format. Try a JPEG, PNG, GIF, WebP, BMP or TIFF file.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        RetouchError::Encode(_) => HumanError {
            message: "We couldn't save the image in that format.".into(),
            suggestion: "Try exporting as PNG instead.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RetouchError::ContextUnavailable(_) => HumanError {
            message: "The image is too large to edit.".into(),
            suggestion: "Try resizing it to something smaller first.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RetouchError::Range(detail) => HumanError {
            message: "Those dimensions don't fit the image.".into(),
            suggestion: format!("Adjust the selection so it stays inside the picture. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RetouchError::Remote(_) | RetouchError::RemoteUnavailable { .. } => HumanError {
            message: "The enhancement service is unavailable.".into(),
            suggestion: "Please try again in a few minutes.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RetouchError::Settings(_) => HumanError {
            message: "This edit has invalid settings.".into(),
            suggestion: "Reset the tool to its defaults and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RetouchError::Task(_) => HumanError {
            message: "Something went wrong while processing.".into(),
            suggestion: "Try the edit again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RetouchError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file could not be found.".into(),
                suggestion: "Check the file name and location.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "We don't have permission to use this file.".into(),
                suggestion: "Choose a different folder or check the file permissions.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "A file could not be read or written.".into(),
                suggestion: "Try again.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        RetouchError::Serialization(_) => HumanError {
            message: "A settings file is damaged.".into(),
            suggestion: "Delete the configuration file to restore the defaults.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}
