use thiserror::Error;

use crate::models::{NewTask, Task, TaskColor, TaskPatch, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Title is too long (max 100 characters)")]
    TitleTooLong,
    #[error("Description is too long (max 500 characters)")]
    DescriptionTooLong,
    #[error("{0}")]
    UnknownColor(String),
}

impl ValidationError {
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::TitleRequired | ValidationError::TitleTooLong => Some(Field::Title),
            ValidationError::DescriptionTooLong => Some(Field::Description),
            ValidationError::UnknownColor(_) => None,
        }
    }
}

/// Check title and description limits. Lengths count characters, not bytes.
pub fn validate(title: &str, description: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let title = title.trim();
    if title.is_empty() {
        errors.push(ValidationError::TitleRequired);
    } else if title.chars().count() > TITLE_MAX_CHARS {
        errors.push(ValidationError::TitleTooLong);
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.push(ValidationError::DescriptionTooLong);
    }
    errors
}

pub fn parse_color(raw: Option<&str>) -> Result<Option<TaskColor>, ValidationError> {
    raw.map(|c| c.parse::<TaskColor>().map_err(ValidationError::UnknownColor))
        .transpose()
}

/// Build a create request from raw command-line style input.
pub fn new_task(title: &str, description: Option<&str>, color: Option<&str>) -> Result<NewTask, Vec<ValidationError>> {
    let mut errors = validate(title, description.unwrap_or(""));
    let color = match parse_color(color) {
        Ok(color) => color,
        Err(e) => {
            errors.push(e);
            None
        }
    };
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(NewTask {
        title: title.trim().to_string(),
        description: description.filter(|d| !d.is_empty()).map(str::to_string),
        color,
    })
}

/// Single text input with a character cursor.
#[derive(Debug, Clone, Default)]
pub struct TextField {
    pub value: String,
    pub cursor: usize,
    pub multiline: bool,
}

impl TextField {
    pub fn new(value: &str) -> Self {
        TextField {
            value: value.to_string(),
            cursor: value.chars().count(),
            multiline: false,
        }
    }

    pub fn multiline(value: &str) -> Self {
        TextField {
            multiline: true,
            ..TextField::new(value)
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map_or(self.value.len(), |(i, _)| i)
    }

    pub fn insert_char(&mut self, c: char) {
        if c == '\n' && !self.multiline {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_index(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Text before and after the cursor, for drawing.
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.value.split_at(self.byte_index(self.cursor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

/// What a valid form submission asks the controller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(NewTask),
    Update { id: String, patch: TaskPatch },
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    pub mode: FormMode,
    pub title: TextField,
    pub description: TextField,
    pub color: TaskColor,
    pub focus: Field,
    pub errors: Vec<ValidationError>,
    pub submitting: bool,
    /// Ticket of the update an edit form is waiting on.
    pub pending: Option<u64>,
    /// Service failure from the last submit attempt.
    pub failure: Option<String>,
}

impl TaskForm {
    pub fn create() -> Self {
        TaskForm {
            mode: FormMode::Create,
            title: TextField::new(""),
            description: TextField::multiline(""),
            color: TaskColor::default(),
            focus: Field::Title,
            errors: Vec::new(),
            submitting: false,
            pending: None,
            failure: None,
        }
    }

    pub fn edit(task: &Task) -> Self {
        TaskForm {
            mode: FormMode::Edit { id: task.id.clone() },
            title: TextField::new(&task.title),
            description: TextField::multiline(task.description.as_deref().unwrap_or("")),
            color: task.color,
            ..TaskForm::create()
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "New note",
            FormMode::Edit { .. } => "Edit note",
        }
    }

    pub fn focused_mut(&mut self) -> &mut TextField {
        match self.focus {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            Field::Title => Field::Description,
            Field::Description => Field::Title,
        };
    }

    pub fn next_color(&mut self) {
        self.color = self.color.next();
    }

    pub fn previous_color(&mut self) {
        self.color = self.color.previous();
    }

    pub fn errors_for(&self, field: Field) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.field() == Some(field))
    }

    /// Validate and, when valid, mark the form as submitting. Invalid input
    /// stays in the form with its messages and produces nothing.
    pub fn submit(&mut self) -> Option<Submission> {
        if self.submitting {
            return None;
        }
        self.errors = validate(&self.title.value, &self.description.value);
        self.failure = None;
        if !self.errors.is_empty() {
            return None;
        }

        let title = self.title.value.trim().to_string();
        let description = self.description.value.clone();
        let submission = match &self.mode {
            FormMode::Create => Submission::Create(NewTask {
                title,
                description: if description.is_empty() { None } else { Some(description) },
                color: Some(self.color),
            }),
            FormMode::Edit { id } => Submission::Update {
                id: id.clone(),
                patch: TaskPatch {
                    title: Some(title),
                    description: Some(description),
                    color: Some(self.color),
                    ..Default::default()
                },
            },
        };
        self.submitting = true;
        Some(submission)
    }

    pub fn submit_failed(&mut self, message: String) {
        self.submitting = false;
        self.pending = None;
        self.failure = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::fake::task;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_title_is_rejected() {
        let mut form = TaskForm::create();
        form.title = TextField::new("   ");
        assert_eq!(form.submit(), None);
        assert_eq!(form.errors, vec![ValidationError::TitleRequired]);
        assert!(!form.submitting);
        assert_eq!(form.errors_for(Field::Title).count(), 1);
    }

    #[test]
    fn length_limits_count_characters() {
        assert!(validate(&"é".repeat(100), "").is_empty());
        assert_eq!(validate(&"a".repeat(101), ""), vec![ValidationError::TitleTooLong]);
        assert_eq!(
            validate("ok", &"ü".repeat(501)),
            vec![ValidationError::DescriptionTooLong]
        );
    }

    #[test]
    fn create_submission_omits_empty_description() {
        let mut form = TaskForm::create();
        for c in "Buy milk".chars() {
            form.focused_mut().insert_char(c);
        }
        form.next_color();
        form.next_color();
        let submission = form.submit().unwrap();
        assert_eq!(
            submission,
            Submission::Create(NewTask {
                title: "Buy milk".into(),
                description: None,
                color: Some(TaskColor::Blue),
            })
        );
        assert!(form.submitting);
        assert_eq!(form.submit(), None);
    }

    #[test]
    fn edit_submission_sends_fields() {
        let mut original = task("9", "Old", 1, false);
        original.description = Some("note".into());
        let mut form = TaskForm::edit(&original);
        form.focus = Field::Description;
        form.focused_mut().clear();
        let Some(Submission::Update { id, patch }) = form.submit() else {
            panic!("expected update");
        };
        assert_eq!(id, "9");
        assert_eq!(patch.title.as_deref(), Some("Old"));
        assert_eq!(patch.description.as_deref(), Some(""));
        assert_eq!(patch.is_favorite, None);
    }

    #[test]
    fn failure_reopens_submission() {
        let mut form = TaskForm::create();
        form.title = TextField::new("x");
        assert!(form.submit().is_some());
        form.submit_failed("server error 500: boom".into());
        assert!(!form.submitting);
        assert!(form.submit().is_some());
        assert_eq!(form.failure, None);
    }

    #[test]
    fn text_field_edits_multibyte_text() {
        let mut field = TextField::new("ação");
        field.move_cursor_left();
        field.delete_char();
        assert_eq!(field.value, "aço");
        field.move_to_start();
        field.insert_char('x');
        assert_eq!(field.split_at_cursor(), ("x", "aço"));
        field.insert_char('\n');
        assert_eq!(field.value, "xaço");
    }

    #[test]
    fn new_task_collects_every_error() {
        let errors = new_task("", None, Some("orange")).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], ValidationError::TitleRequired);

        let ok = new_task("Buy milk", Some(""), Some("blue")).unwrap();
        assert_eq!(ok.description, None);
        assert_eq!(ok.color, Some(TaskColor::Blue));
    }
}
