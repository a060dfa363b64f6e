use chrono::{DateTime, Local, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Completion toggle: a completed task goes back to pending, anything else completes.
    pub fn toggled(self) -> TaskStatus {
        match self {
            TaskStatus::Completed => TaskStatus::Pending,
            _ => TaskStatus::Completed,
        }
    }

    pub fn color(self) -> Color {
        match self {
            TaskStatus::Completed => Color::Green,
            TaskStatus::InProgress => Color::Yellow,
            TaskStatus::Pending => Color::Blue,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown status '{other}' (expected pending, in_progress or completed)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Pink,
    Indigo,
    #[default]
    Gray,
}

impl TaskColor {
    /// Picker order, matching the palette shown in the forms.
    pub const PALETTE: [TaskColor; 8] = [
        TaskColor::Gray,
        TaskColor::Red,
        TaskColor::Blue,
        TaskColor::Green,
        TaskColor::Yellow,
        TaskColor::Purple,
        TaskColor::Pink,
        TaskColor::Indigo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskColor::Red => "red",
            TaskColor::Blue => "blue",
            TaskColor::Green => "green",
            TaskColor::Yellow => "yellow",
            TaskColor::Purple => "purple",
            TaskColor::Pink => "pink",
            TaskColor::Indigo => "indigo",
            TaskColor::Gray => "gray",
        }
    }

    pub fn next(self) -> TaskColor {
        let i = Self::PALETTE.iter().position(|c| *c == self).unwrap_or(0);
        Self::PALETTE[(i + 1) % Self::PALETTE.len()]
    }

    pub fn previous(self) -> TaskColor {
        let i = Self::PALETTE.iter().position(|c| *c == self).unwrap_or(0);
        Self::PALETTE[(i + Self::PALETTE.len() - 1) % Self::PALETTE.len()]
    }

    pub fn terminal_color(self) -> Color {
        match self {
            TaskColor::Red => Color::Red,
            TaskColor::Blue => Color::Blue,
            TaskColor::Green => Color::Green,
            TaskColor::Yellow => Color::Yellow,
            TaskColor::Purple => Color::Magenta,
            TaskColor::Pink => Color::LightMagenta,
            TaskColor::Indigo => Color::LightBlue,
            TaskColor::Gray => Color::Gray,
        }
    }
}

impl fmt::Display for TaskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::PALETTE
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown color '{}' (expected one of: {})", s.trim(), palette_names()))
    }
}

fn palette_names() -> String {
    TaskColor::PALETTE.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
}

/// A note/task as returned by the service. Timestamps are never computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub color: TaskColor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn created_label(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<TaskColor>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            description: None,
            color: None,
        }
    }
}

/// Body of a partial update; unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<TaskColor>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        TaskPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn favorite(is_favorite: bool) -> Self {
        TaskPatch {
            is_favorite: Some(is_favorite),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub is_favorite: Option<bool>,
    pub search: Option<String>,
    pub color: Option<TaskColor>,
}

impl TaskFilters {
    pub fn is_empty(&self) -> bool {
        *self == TaskFilters::default()
    }

    /// Query pairs for the list request. Only set fields are present; a blank
    /// search counts as unset. Color has no query parameter on the service.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(is_favorite) = self.is_favorite {
            pairs.push(("isFavorite", is_favorite.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }

    pub fn matches_color(&self, task: &Task) -> bool {
        self.color.map_or(true, |c| task.color == c)
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status: {}", status.label()));
        }
        match self.is_favorite {
            Some(true) => parts.push("favorites only".to_string()),
            Some(false) => parts.push("non-favorites".to_string()),
            None => {}
        }
        if let Some(color) = self.color {
            parts.push(format!("color: {color}"));
        }
        if let Some(search) = &self.search {
            parts.push(format!("search: \"{search}\""));
        }
        if parts.is_empty() {
            "all notes".to_string()
        } else {
            parts.join(" · ")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupMode {
    None,
    Form,
    TaskStatus,
    ConfirmDelete(String),
    Search,
    Help,
}
