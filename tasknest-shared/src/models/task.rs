/// Task model and database operations
///
/// This module provides the Task model. Every task belongs to exactly one
/// owner, fixed at creation from the authenticated requester and never
/// reassignable; all reads and writes are scoped to that owner.
///
/// Status moves freely among {pending, in-progress, completed}; there is
/// no enforced ordering and no terminal state.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in-progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(100) NOT NULL,
///     description VARCHAR(500),
///     status task_status NOT NULL DEFAULT 'pending',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task completion status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started yet (default)
    #[default]
    Pending,

    /// Currently being worked on
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Parses a wire value ("pending", "in-progress", "completed")
    ///
    /// Returns None for anything else; filter parsing relies on that to
    /// silently ignore unrecognized values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in-progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority
    Low,

    /// Medium priority (default)
    #[default]
    Medium,

    /// High priority
    High,
}

impl TaskPriority {
    /// Parses a wire value ("low", "medium", "high")
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user, fixed at creation
    #[serde(rename = "owner")]
    pub owner_id: Uuid,

    /// Title (at most 100 characters)
    pub title: String,

    /// Optional description (at most 500 characters)
    pub description: Option<String>,

    /// Completion status
    pub status: TaskStatus,

    /// Priority
    pub priority: TaskPriority,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
///
/// Status and priority fall back to their server defaults (pending, medium)
/// when the client omits them.
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Owning user (always the authenticated requester)
    pub owner_id: Uuid,

    /// Title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Status (defaults to pending)
    pub status: Option<TaskStatus>,

    /// Priority (defaults to medium)
    pub priority: Option<TaskPriority>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,
}

/// Input for updating a task
///
/// Outer None means "leave the field untouched". For the two clearable
/// fields, Some(None) writes NULL: an explicit null in the request body
/// clears the value, while an omitted field never does.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description (Some(None) clears it)
    pub description: Option<Option<String>>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New priority
    pub priority: Option<TaskPriority>,

    /// New due date (Some(None) clears it)
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Filters for listing tasks
///
/// Unrecognized status/priority values never reach this struct; the query
/// layer drops them before building the filter, so an invalid filter value
/// behaves exactly like no filter at all.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Only tasks with this status
    pub status: Option<TaskStatus>,

    /// Only tasks with this priority
    pub priority: Option<TaskPriority>,

    /// Case-insensitive substring match against title OR description
    pub search: Option<String>,
}

/// Sortable task columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Creation time
    CreatedAt,

    /// Last update time
    UpdatedAt,

    /// Due date
    DueDate,

    /// Title
    Title,

    /// Status
    Status,

    /// Priority
    Priority,
}

impl SortField {
    /// SQL column backing this sort field
    fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::DueDate => "due_date",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            "dueDate" => Some(SortField::DueDate),
            "title" => Some(SortField::Title),
            "status" => Some(SortField::Status),
            "priority" => Some(SortField::Priority),
            _ => None,
        }
    }
}

/// Sort order for task listings
///
/// Wire format is a field name with an optional leading `-` for descending,
/// e.g. `-createdAt` (the default) or `dueDate`. Unrecognized fields fall
/// back to the default rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    /// Column to order by
    pub field: SortField,

    /// Descending when true
    pub descending: bool,
}

impl Default for TaskSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl TaskSort {
    /// Parses a sort parameter such as `-createdAt` or `title`
    pub fn parse(raw: &str) -> Self {
        let (name, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };

        match SortField::parse(name) {
            Some(field) => Self { field, descending },
            None => Self::default(),
        }
    }

    /// ORDER BY fragment for this sort
    fn order_clause(&self) -> String {
        format!(
            "{} {}",
            self.field.column(),
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

impl Task {
    /// Creates a new task owned by `data.owner_id`
    ///
    /// Omitted status/priority take the server defaults.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (owner_id, title, description, status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, title, description, status, priority, due_date,
                      created_at, updated_at
            "#,
        )
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status.unwrap_or_default())
        .bind(data.priority.unwrap_or_default())
        .bind(data.due_date)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    ///
    /// Deliberately NOT owner-scoped: handlers need to distinguish a
    /// missing task (404) from someone else's task (403), so the ownership
    /// check happens after the fetch.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, status, priority, due_date,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks for one owner, with optional filters and sorting
    ///
    /// The owner predicate is unconditional; filters only ever narrow the
    /// owner's own set.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &TaskFilter,
        sort: TaskSort,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = String::from(
            "SELECT id, owner_id, title, description, status, priority, due_date, \
             created_at, updated_at FROM tasks WHERE owner_id = $1",
        );
        let mut bind_count = 1;

        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if filter.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND priority = ${}", bind_count));
        }
        if filter.search.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${0} OR description ILIKE ${0})",
                bind_count
            ));
        }

        query.push_str(&format!(" ORDER BY {}", sort.order_clause()));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(owner_id);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(ref search) = filter.search {
            q = q.bind(format!("%{}%", search));
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Updates a task
    ///
    /// Only fields carried by `data` are written; `updated_at` is always
    /// refreshed, even for an empty update. Owner and id are not updatable.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, owner_id, title, description, status, priority, \
             due_date, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task permanently
    ///
    /// Returns true if a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(TaskStatus::parse("pending"), Some(TaskStatus::Pending));
        assert_eq!(TaskStatus::parse("in-progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("completed"), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::parse("done"), None);
        assert_eq!(TaskStatus::parse(""), None);
        // Matching is exact: no case folding
        assert_eq!(TaskStatus::parse("Pending"), None);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(TaskPriority::parse("low"), Some(TaskPriority::Low));
        assert_eq!(TaskPriority::parse("medium"), Some(TaskPriority::Medium));
        assert_eq!(TaskPriority::parse("high"), Some(TaskPriority::High));
        assert_eq!(TaskPriority::parse("urgent"), None);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_status_wire_format_is_kebab_case() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "in-progress"
        );
        let parsed: TaskStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(parsed, TaskStatus::InProgress);
    }

    #[test]
    fn test_sort_parse_descending_prefix() {
        let sort = TaskSort::parse("-createdAt");
        assert_eq!(sort.field, SortField::CreatedAt);
        assert!(sort.descending);

        let sort = TaskSort::parse("title");
        assert_eq!(sort.field, SortField::Title);
        assert!(!sort.descending);
    }

    #[test]
    fn test_sort_parse_maps_wire_names_to_columns() {
        assert_eq!(TaskSort::parse("dueDate").field.column(), "due_date");
        assert_eq!(TaskSort::parse("updatedAt").field.column(), "updated_at");
        assert_eq!(TaskSort::parse("-priority").field.column(), "priority");
    }

    #[test]
    fn test_sort_parse_unknown_field_falls_back_to_default() {
        assert_eq!(TaskSort::parse("owner_id"), TaskSort::default());
        assert_eq!(TaskSort::parse("; DROP TABLE tasks"), TaskSort::default());
        assert_eq!(TaskSort::parse(""), TaskSort::default());
        assert_eq!(TaskSort::parse("-"), TaskSort::default());
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let sort = TaskSort::default();
        assert_eq!(sort.order_clause(), "created_at DESC");
    }

    #[test]
    fn test_task_serialization_uses_camel_case_and_owner() {
        let task = Task {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Buy milk".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&task).expect("serialize");
        assert!(json.get("owner").is_some());
        assert!(json.get("owner_id").is_none());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("dueDate").is_some());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["priority"], "medium");
    }
}
