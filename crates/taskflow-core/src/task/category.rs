//! Task categories.
//!
//! A fixed set of built-in categories exists from the first run and can
//! never be deleted. User categories are created with `is_custom = true`.

use serde::{Deserialize, Serialize};

/// Built-in category that absorbs tasks of deleted categories by default.
pub const FALLBACK_CATEGORY_ID: &str = "personal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    /// CSS-style colour, e.g. `#5d5fef`
    pub color: String,
    /// Icon identifier, e.g. `lucide:briefcase`
    pub icon: String,
    #[serde(default)]
    pub is_custom: bool,
    /// Number of tasks in this category. Recomputed by the repository after
    /// every membership change; never set by hand.
    #[serde(default)]
    pub task_count: usize,
}

impl Category {
    fn builtin(id: &str, name: &str, color: &str, icon: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            icon: icon.into(),
            is_custom: false,
            task_count: 0,
        }
    }

    /// The categories every repository starts with.
    pub fn builtins() -> Vec<Category> {
        vec![
            Self::builtin("work", "Work", "#5d5fef", "lucide:briefcase"),
            Self::builtin("personal", "Personal", "#5df27e", "lucide:home"),
            Self::builtin("health", "Health", "#f87171", "lucide:heart"),
            Self::builtin("learning", "Learning", "#facc15", "lucide:book-open"),
        ]
    }
}

/// Partial update for [`Category`]. Identity, `is_custom` and `task_count`
/// are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl CategoryPatch {
    pub(crate) fn apply(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(color) = self.color {
            category.color = color;
        }
        if let Some(icon) = self.icon {
            category.icon = icon;
        }
    }
}
