//! UI-side collaborators: routing back to a list view and showing notices.

use serde::{Deserialize, Serialize};

/// Which view of an object to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    List,
}

/// Navigation command issued to the routing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTarget {
    pub object_api_name: String,
    pub view: ViewKind,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

impl NavigationTarget {
    /// List view of `object_api_name`, replacing the current entry.
    pub fn list_view(object_api_name: impl Into<String>) -> Self {
        Self {
            object_api_name: object_api_name.into(),
            view: ViewKind::List,
            replace: true,
        }
    }
}

/// Routing collaborator.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: NavigationTarget);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Blocking alert (fatal path) rather than a dismissible toast.
    pub blocking: bool,
}

impl Notice {
    pub fn toast(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
            blocking: false,
        }
    }

    pub fn alert(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: title.into(),
            message: message.into(),
            blocking: true,
        }
    }
}

/// Alert/toast collaborator.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
