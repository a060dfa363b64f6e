use anyhow::{anyhow, Context, Result};

use crate::api::TaskService;
use crate::controller::TaskState;
use crate::form;
use crate::models::{Task, TaskFilters, TaskPatch, TaskStatus};

pub fn format_task_line(task: &Task) -> String {
    let star = if task.is_favorite { "★" } else { " " };
    let mut line = format!(
        "{star} {id:<8} {status:<12} {color:<7} {title}",
        id = task.id,
        status = task.status.as_str(),
        color = task.color.as_str(),
        title = task.title,
    );
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(" - {}", description.lines().next().unwrap_or("")));
    }
    line
}

pub fn format_task_detail(task: &Task) -> String {
    format!(
        "Id: {}\nTitle: {}\nStatus: {}\nFavorite: {}\nColor: {}\nCreated: {}\nUpdated: {}\n\n{}",
        task.id,
        task.title,
        task.status.label(),
        if task.is_favorite { "yes" } else { "no" },
        task.color,
        task.created_label(),
        crate::models::format_timestamp(&task.updated_at),
        task.description.as_deref().unwrap_or(""),
    )
}

fn validation_failure(errors: Vec<form::ValidationError>) -> anyhow::Error {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    anyhow!(messages.join("; "))
}

pub struct ListArgs {
    pub status: Option<String>,
    pub favorite: Option<bool>,
    pub search: Option<String>,
    pub color: Option<String>,
}

pub fn list_filters(args: ListArgs) -> Result<TaskFilters> {
    let status = args
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let color = form::parse_color(args.color.as_deref())?;
    Ok(TaskFilters {
        status,
        is_favorite: args.favorite,
        search: args.search.filter(|s| !s.is_empty()),
        color,
    })
}

/// Favorites first, newest first within each group.
pub fn render_list(tasks: Vec<Task>, filters: TaskFilters) -> String {
    let state = TaskState {
        tasks,
        filters,
        ..Default::default()
    };
    let parts = state.partitions();
    if parts.is_empty() {
        return "No notes found".to_string();
    }
    parts.iter().map(format_task_line).collect::<Vec<_>>().join("\n")
}

pub async fn list<S: TaskService>(service: &S, args: ListArgs) -> Result<()> {
    let filters = list_filters(args)?;
    let tasks = service.list(&filters).await.context("Failed to load tasks")?;
    println!("{}", render_list(tasks, filters));
    Ok(())
}

pub async fn get<S: TaskService>(service: &S, id: &str) -> Result<()> {
    let task = service.get(id).await.with_context(|| format!("Failed to fetch note {id}"))?;
    println!("{}", format_task_detail(&task));
    Ok(())
}

pub async fn add<S: TaskService>(service: &S, title: &str, description: Option<&str>, color: Option<&str>) -> Result<()> {
    let input = form::new_task(title, description, color).map_err(validation_failure)?;
    let task = service.create(&input).await.context("Failed to create note")?;
    println!("Note '{}' created with id {}", task.title, task.id);
    Ok(())
}

pub struct UpdateArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub color: Option<String>,
    pub favorite: Option<bool>,
}

pub fn update_patch(args: UpdateArgs) -> Result<TaskPatch> {
    let mut errors = Vec::new();
    if let Some(title) = &args.title {
        errors.extend(form::validate(title, "").into_iter().filter(|e| e.field() == Some(form::Field::Title)));
    }
    if let Some(description) = &args.description {
        errors.extend(form::validate("x", description));
    }
    let color = match form::parse_color(args.color.as_deref()) {
        Ok(color) => color,
        Err(e) => {
            errors.push(e);
            None
        }
    };
    if !errors.is_empty() {
        return Err(validation_failure(errors));
    }
    let status = args
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(|e| anyhow!(e))?;

    let patch = TaskPatch {
        title: args.title.map(|t| t.trim().to_string()),
        description: args.description,
        status,
        is_favorite: args.favorite,
        color,
    };
    if patch.is_empty() {
        return Err(anyhow!("Nothing to update: pass at least one field"));
    }
    Ok(patch)
}

pub async fn update<S: TaskService>(service: &S, id: &str, args: UpdateArgs) -> Result<()> {
    let patch = update_patch(args)?;
    let task = service
        .update(id, &patch)
        .await
        .with_context(|| format!("Failed to update note {id}"))?;
    println!("{}", format_task_line(&task));
    Ok(())
}

pub async fn toggle_done<S: TaskService>(service: &S, id: &str) -> Result<()> {
    let task = service.get(id).await.with_context(|| format!("Failed to fetch note {id}"))?;
    let task = service
        .toggle_completion(id, task.status)
        .await
        .with_context(|| format!("Failed to update note {id}"))?;
    println!("{}", format_task_line(&task));
    Ok(())
}

pub async fn toggle_favorite<S: TaskService>(service: &S, id: &str) -> Result<()> {
    let task = service.get(id).await.with_context(|| format!("Failed to fetch note {id}"))?;
    let task = service
        .set_favorite(id, !task.is_favorite)
        .await
        .with_context(|| format!("Failed to update note {id}"))?;
    println!("{}", format_task_line(&task));
    Ok(())
}

pub async fn delete<S: TaskService>(service: &S, id: &str) -> Result<()> {
    service.delete(id).await.with_context(|| format!("Failed to delete note {id}"))?;
    println!("Note {id} deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::fake::{task, FakeService};
    use crate::models::TaskColor;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_output_puts_favorites_first() {
        let out = render_list(
            vec![task("1", "Buy milk", 1, false), task("2", "Call mom", 0, true)],
            TaskFilters::default(),
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("★ 2"));
        assert!(lines[1].contains("Buy milk"));
    }

    #[test]
    fn list_filters_reject_bad_values() {
        let args = ListArgs {
            status: Some("someday".into()),
            favorite: None,
            search: None,
            color: None,
        };
        assert!(list_filters(args).is_err());

        let filters = list_filters(ListArgs {
            status: Some("completed".into()),
            favorite: Some(true),
            search: Some(String::new()),
            color: Some("pink".into()),
        })
        .unwrap();
        assert_eq!(filters.search, None);
        assert_eq!(filters.color, Some(TaskColor::Pink));
    }

    #[test]
    fn update_patch_needs_a_field() {
        let empty = UpdateArgs {
            title: None,
            description: None,
            status: None,
            color: None,
            favorite: None,
        };
        assert!(update_patch(empty).is_err());

        let too_long = UpdateArgs {
            title: Some("t".repeat(101)),
            description: None,
            status: None,
            color: None,
            favorite: None,
        };
        let err = update_patch(too_long).unwrap_err();
        assert!(err.to_string().contains("Title is too long"));
    }

    #[tokio::test(start_paused = true)]
    async fn add_rejects_empty_title_before_calling_service() {
        let service = FakeService::default();
        assert!(add(&service, "  ", None, None).await.is_err());
        assert_eq!(*service.create_calls.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn done_toggles_status() {
        let service = FakeService::with_tasks(vec![task("1", "Buy milk", 1, false)]);
        toggle_done(&service, "1").await.unwrap();
        assert_eq!(service.get("1").await.unwrap().status, TaskStatus::Completed);
        toggle_favorite(&service, "1").await.unwrap();
        assert!(service.get("1").await.unwrap().is_favorite);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_missing_note_fails() {
        let service = FakeService::default();
        let err = delete(&service, "nope").await.unwrap_err();
        assert!(err.to_string().contains("Failed to delete note nope"));
    }
}
