/// Task endpoints
///
/// # Endpoints
///
/// - `POST /tasks` - Create a task (owner is always the caller)
/// - `GET /tasks` - List the caller's tasks with filters and sorting
/// - `GET /tasks/:id` - Fetch one task
/// - `PUT /tasks/:id` - Partial update
/// - `DELETE /tasks/:id` - Permanent delete
///
/// Ownership policy: a task that exists but belongs to someone else is a
/// 403, never a 404; the two failure reasons stay distinguishable.
/// The owner is forced from the authenticated identity on create and is
/// not accepted as input anywhere.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
    routes::StatusResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tasknest_shared::{
    auth::{authorization, middleware::CurrentUser},
    models::task::{
        CreateTask, Task, TaskFilter, TaskPriority, TaskSort, TaskStatus, UpdateTask,
    },
};
use uuid::Uuid;

/// Create task request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title (required)
    pub title: Option<String>,

    /// Optional description
    pub description: Option<String>,

    /// Status (defaults to pending)
    pub status: Option<String>,

    /// Priority (defaults to medium)
    pub priority: Option<String>,

    /// Optional due date (RFC 3339 timestamp or YYYY-MM-DD)
    pub due_date: Option<String>,
}

impl CreateTaskRequest {
    fn validate(self) -> Result<ValidatedCreate, ApiError> {
        let title = self
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Title is required".to_string()))?;

        if title.chars().count() > 100 {
            return Err(ApiError::BadRequest(
                "Title cannot exceed 100 characters".to_string(),
            ));
        }

        let description = self
            .description
            .map(|description| description.trim().to_string());
        if let Some(ref description) = description {
            if description.chars().count() > 500 {
                return Err(ApiError::BadRequest(
                    "Description cannot exceed 500 characters".to_string(),
                ));
            }
        }

        let status = parse_enum(self.status, TaskStatus::parse, "Invalid status")?;
        let priority = parse_enum(self.priority, TaskPriority::parse, "Invalid priority")?;

        let due_date = match self.due_date {
            Some(raw) => Some(
                parse_due_date(&raw)
                    .ok_or_else(|| ApiError::BadRequest("Invalid date format".to_string()))?,
            ),
            None => None,
        };

        Ok(ValidatedCreate {
            title,
            description,
            status,
            priority,
            due_date,
        })
    }
}

/// Validated create input (owner attached by the handler)
#[derive(Debug)]
struct ValidatedCreate {
    title: String,
    description: Option<String>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    due_date: Option<DateTime<Utc>>,
}

/// Update task request
///
/// Title/status/priority distinguish only "present" from "absent";
/// description and dueDate additionally distinguish an explicit `null`
/// (clear the field) from an omitted field (leave untouched).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTaskRequest {
    /// New title
    pub title: Option<String>,

    /// New description; `null` clears it
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    /// New status
    pub status: Option<String>,

    /// New priority
    pub priority: Option<String>,

    /// New due date; `null` clears it
    #[serde(deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

/// Deserializes a field that was PRESENT in the body, keeping `null` as
/// `Some(None)`; combined with `#[serde(default)]`, an absent field stays
/// `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl UpdateTaskRequest {
    fn validate(self) -> Result<UpdateTask, ApiError> {
        let title = match self.title {
            Some(title) => {
                let title = title.trim().to_string();
                if title.chars().count() > 100 {
                    return Err(ApiError::BadRequest(
                        "Title cannot exceed 100 characters".to_string(),
                    ));
                }
                Some(title)
            }
            None => None,
        };

        let description = match self.description {
            Some(Some(description)) => {
                let description = description.trim().to_string();
                if description.chars().count() > 500 {
                    return Err(ApiError::BadRequest(
                        "Description cannot exceed 500 characters".to_string(),
                    ));
                }
                Some(Some(description))
            }
            Some(None) => Some(None),
            None => None,
        };

        let status = parse_enum(self.status, TaskStatus::parse, "Invalid status")?;
        let priority = parse_enum(self.priority, TaskPriority::parse, "Invalid priority")?;

        let due_date = match self.due_date {
            Some(Some(raw)) => Some(Some(
                parse_due_date(&raw)
                    .ok_or_else(|| ApiError::BadRequest("Invalid date format".to_string()))?,
            )),
            Some(None) => Some(None),
            None => None,
        };

        Ok(UpdateTask {
            title,
            description,
            status,
            priority,
            due_date,
        })
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Status filter; unrecognized values are silently ignored
    pub status: Option<String>,

    /// Priority filter; unrecognized values are silently ignored
    pub priority: Option<String>,

    /// Case-insensitive substring match against title or description
    pub search: Option<String>,

    /// Sort parameter, e.g. `-createdAt` (default) or `dueDate`
    pub sort: Option<String>,
}

impl ListTasksQuery {
    /// Compiles the raw query string into a filter + sort
    ///
    /// Invalid enum values drop out here, so a bad filter behaves exactly
    /// like no filter at all.
    fn into_filter(self) -> (TaskFilter, TaskSort) {
        let filter = TaskFilter {
            status: self.status.as_deref().and_then(TaskStatus::parse),
            priority: self.priority.as_deref().and_then(TaskPriority::parse),
            search: self.search.filter(|search| !search.is_empty()),
        };

        let sort = self
            .sort
            .as_deref()
            .map(TaskSort::parse)
            .unwrap_or_default();

        (filter, sort)
    }
}

/// Response for operations returning a single task
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    /// Envelope flag
    pub success: bool,

    /// Envelope message
    pub message: String,

    /// The task
    pub task: Task,
}

/// Response for the list endpoint
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    /// Envelope flag
    pub success: bool,

    /// Envelope message
    pub message: String,

    /// Number of tasks returned
    pub count: usize,

    /// The caller's tasks
    pub tasks: Vec<Task>,
}

/// Parses an optional enum-valued field with the given message on failure
fn parse_enum<T>(
    raw: Option<String>,
    parse: fn(&str) -> Option<T>,
    message: &str,
) -> Result<Option<T>, ApiError> {
    match raw {
        Some(value) => parse(&value)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(message.to_string())),
        None => Ok(None),
    }
}

/// Parses a due date from an RFC 3339 timestamp or a bare `YYYY-MM-DD`
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parses the `:id` path segment
fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid task ID".to_string()))
}

/// Fetches a task and enforces the ownership policy
///
/// Missing id → 404; existing but foreign id → 403 with an action-specific
/// message. The order matters: existence is checked first so the two
/// failures are never conflated.
async fn fetch_owned_task(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    action: &str,
) -> Result<Task, ApiError> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if authorization::require_owner(user, task.owner_id).is_err() {
        return Err(ApiError::Forbidden(format!(
            "Not authorized to {} this task",
            action
        )));
    }

    Ok(task)
}

/// Create a new task
///
/// # Endpoint
///
/// ```text
/// POST /tasks
/// Authorization: Bearer <token>
///
/// {"title": "Buy milk", "priority": "high", "dueDate": "2026-09-01"}
/// ```
///
/// # Errors
///
/// - `400`: Validation failed
/// - `401`: Not authenticated
/// - `500`: Server error
pub async fn create_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let data = req.validate()?;

    let task = Task::create(
        &state.db,
        CreateTask {
            // Owner comes from the gate, never from the body
            owner_id: current.id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            success: true,
            message: "Task created successfully".to_string(),
            task,
        }),
    ))
}

/// List the caller's tasks
///
/// Always scoped to `owner = caller`; filters only narrow that set.
///
/// # Endpoint
///
/// ```text
/// GET /tasks?status=pending&priority=high&search=milk&sort=-createdAt
/// Authorization: Bearer <token>
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let (filter, sort) = query.into_filter();

    let tasks = Task::list_by_owner(&state.db, current.id, &filter, sort).await?;

    Ok(Json(TaskListResponse {
        success: true,
        message: "Tasks retrieved successfully".to_string(),
        count: tasks.len(),
        tasks,
    }))
}

/// Fetch a single task
///
/// # Errors
///
/// - `400`: Malformed id
/// - `403`: Task belongs to another user
/// - `404`: No task with this id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_task_id(&id)?;
    let task = fetch_owned_task(&state, &current, id, "access").await?;

    Ok(Json(TaskResponse {
        success: true,
        message: "Task retrieved successfully".to_string(),
        task,
    }))
}

/// Update a task
///
/// Only explicitly provided fields are overwritten; an omitted field is
/// left unchanged while an explicit `null` clears description/dueDate.
///
/// # Errors
///
/// - `400`: Malformed id or validation failure
/// - `403`: Task belongs to another user
/// - `404`: No task with this id
pub async fn update_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_task_id(&id)?;
    let update = req.validate()?;

    fetch_owned_task(&state, &current, id, "update").await?;

    let task = Task::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskResponse {
        success: true,
        message: "Task updated successfully".to_string(),
        task,
    }))
}

/// Delete a task permanently
///
/// # Errors
///
/// - `400`: Malformed id
/// - `403`: Task belongs to another user
/// - `404`: No task with this id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let id = parse_task_id(&id)?;

    fetch_owned_task(&state, &current, id, "delete").await?;

    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    Ok(Json(StatusResponse {
        success: true,
        message: "Task deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(title: Option<&str>) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.map(String::from),
            description: None,
            status: None,
            priority: None,
            due_date: None,
        }
    }

    #[test]
    fn test_create_requires_title() {
        match create_request(None).validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Title is required"),
            other => panic!("expected BadRequest, got {:?}", other),
        }

        match create_request(Some("   ")).validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Title is required"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_create_title_length() {
        let long = "x".repeat(101);
        match create_request(Some(&long)).validate() {
            Err(ApiError::BadRequest(msg)) => {
                assert_eq!(msg, "Title cannot exceed 100 characters")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_create_rejects_invalid_status_and_priority() {
        let req = CreateTaskRequest {
            status: Some("done".to_string()),
            ..create_request(Some("Buy milk"))
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Invalid status"),
            other => panic!("expected BadRequest, got {:?}", other),
        }

        let req = CreateTaskRequest {
            priority: Some("urgent".to_string()),
            ..create_request(Some("Buy milk"))
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Invalid priority"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_create_defaults_left_to_server() {
        let data = create_request(Some("Buy milk")).validate().expect("valid");
        assert!(data.status.is_none());
        assert!(data.priority.is_none());
        assert!(data.due_date.is_none());
    }

    #[test]
    fn test_create_rejects_bad_due_date() {
        let req = CreateTaskRequest {
            due_date: Some("next tuesday".to_string()),
            ..create_request(Some("Buy milk"))
        };
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Invalid date format"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_due_date_formats() {
        assert!(parse_due_date("2026-09-01T12:00:00Z").is_some());
        assert!(parse_due_date("2026-09-01T12:00:00+02:00").is_some());
        assert!(parse_due_date("2026-09-01").is_some());
        assert!(parse_due_date("09/01/2026").is_none());
        assert!(parse_due_date("").is_none());
    }

    #[test]
    fn test_parse_task_id() {
        assert!(parse_task_id("e4b4c1de-8c26-4b47-9b3e-54f92d6a8a01").is_ok());

        match parse_task_id("not-a-uuid") {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Invalid task ID"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_update_distinguishes_omitted_from_null() {
        // Omitted fields stay untouched
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("New"));
        assert!(req.description.is_none());
        assert!(req.due_date.is_none());

        // Explicit null clears
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"description": null, "dueDate": null}"#).unwrap();
        assert_eq!(req.description, Some(None));
        assert_eq!(req.due_date, Some(None));

        let update = req.validate().expect("valid");
        assert_eq!(update.description, Some(None));
        assert_eq!(update.due_date, Some(None));
        assert!(update.title.is_none());
    }

    #[test]
    fn test_update_empty_body_is_a_no_op_update() {
        let req: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        let update = req.validate().expect("valid");

        assert!(update.title.is_none());
        assert!(update.description.is_none());
        assert!(update.status.is_none());
        assert!(update.priority.is_none());
        assert!(update.due_date.is_none());
    }

    #[test]
    fn test_update_parses_enums_and_dates() {
        let req: UpdateTaskRequest = serde_json::from_str(
            r#"{"status": "in-progress", "priority": "high", "dueDate": "2026-09-01"}"#,
        )
        .unwrap();

        let update = req.validate().expect("valid");
        assert_eq!(update.status, Some(TaskStatus::InProgress));
        assert_eq!(update.priority, Some(TaskPriority::High));
        assert!(matches!(update.due_date, Some(Some(_))));
    }

    #[test]
    fn test_update_rejects_invalid_status() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"status": "blocked"}"#).unwrap();
        match req.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Invalid status"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_list_query_ignores_unknown_filter_values() {
        let query = ListTasksQuery {
            status: Some("archived".to_string()),
            priority: Some("asap".to_string()),
            search: None,
            sort: None,
        };

        let (filter, sort) = query.into_filter();
        assert!(filter.status.is_none());
        assert!(filter.priority.is_none());
        assert_eq!(sort, TaskSort::default());
    }

    #[test]
    fn test_list_query_accepts_valid_filters() {
        let query = ListTasksQuery {
            status: Some("in-progress".to_string()),
            priority: Some("high".to_string()),
            search: Some("milk".to_string()),
            sort: Some("dueDate".to_string()),
        };

        let (filter, sort) = query.into_filter();
        assert_eq!(filter.status, Some(TaskStatus::InProgress));
        assert_eq!(filter.priority, Some(TaskPriority::High));
        assert_eq!(filter.search.as_deref(), Some("milk"));
        assert!(!sort.descending);
    }

    #[test]
    fn test_list_query_drops_empty_search() {
        let query = ListTasksQuery {
            search: Some(String::new()),
            ..Default::default()
        };

        let (filter, _) = query.into_filter();
        assert!(filter.search.is_none());
    }
}
