//! Task entity, validated field types and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{ValidationError, ValidationErrors};

/// Maximum length for task titles
pub const MAX_TITLE_LEN: usize = 255;

/// Maximum length for task descriptions
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Task record as stored in the `tasks` table
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated task title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTitle(String);

impl TaskTitle {
    /// Create a new task title.
    ///
    /// The title is stored exactly as given.
    ///
    /// # Rules
    /// - At least 1 character (whitespace counts)
    /// - Max 255 characters
    ///
    /// # Example
    /// ```
    /// use todo_server::models::TaskTitle;
    ///
    /// assert!(TaskTitle::new("Buy milk").is_ok());
    /// assert!(TaskTitle::new("").is_err());
    /// assert_eq!(TaskTitle::new("  padded ").unwrap().as_str(), "  padded ");
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }

        if s.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN,
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Validated task description (may be empty, never longer than 5000 chars)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescription(String);

impl TaskDescription {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::TooLong {
                field: "description",
                max: MAX_DESCRIPTION_LEN,
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Deserialize a field so that "absent" and "null" stay distinguishable.
///
/// Used with `#[serde(default)]`: absent -> `None`, `null` -> `Some(None)`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// POST /api/tasks body
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// 1-255 characters
    #[serde(default)]
    #[schema(required = true, example = "Buy milk")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// PUT /api/tasks/{id} body; every field optional
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<bool>)]
    pub is_completed: Option<Option<bool>>,
}

/// Validated input for inserting a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: TaskTitle,
    pub description: Option<TaskDescription>,
}

impl NewTask {
    /// Validate a create payload, reporting every invalid field.
    pub fn parse(req: CreateTaskRequest) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = match req.title.as_deref() {
            Some(title) => errors.check(TaskTitle::new(title)),
            None => {
                errors.push(ValidationError::Required { field: "title" });
                None
            }
        };
        let description = match req.description.as_deref() {
            Some(d) => errors.check(TaskDescription::new(d)).map(Some),
            None => Some(None),
        };

        match (title, description) {
            (Some(title), Some(description)) if errors.is_empty() => {
                Ok(Self { title, description })
            }
            _ => Err(errors),
        }
    }
}

/// Fields to change on an existing task; `None` means "leave as is".
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<TaskTitle>,
    pub description: Option<Option<TaskDescription>>,
    pub is_completed: Option<bool>,
}

impl TaskPatch {
    /// Validate an update payload, reporting every invalid field.
    pub fn parse(req: UpdateTaskRequest) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut patch = Self::default();

        match req.title {
            Some(Some(title)) => patch.title = errors.check(TaskTitle::new(&title)),
            Some(None) => errors.push(ValidationError::InvalidFormat {
                field: "title",
                reason: "expected a string, got null".to_owned(),
            }),
            None => {}
        }

        match req.description {
            Some(Some(d)) => {
                patch.description = errors.check(TaskDescription::new(&d)).map(Some);
            }
            Some(None) => patch.description = Some(None),
            None => {}
        }

        match req.is_completed {
            Some(Some(done)) => patch.is_completed = Some(done),
            Some(None) => errors.push(ValidationError::InvalidFormat {
                field: "isCompleted",
                reason: "expected a boolean, got null".to_owned(),
            }),
            None => {}
        }

        errors.finish(|| patch)
    }

    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_completed.is_none()
    }
}

/// GET /api/tasks query string
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    /// Case-insensitive title substring
    pub q: Option<String>,
}

/// Filter applied when listing tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring the title must contain
    pub title_contains: Option<String>,
}

impl From<ListTasksQuery> for TaskFilter {
    fn from(query: ListTasksQuery) -> Self {
        let title_contains = query
            .q
            .map(|q| q.trim().to_owned())
            .filter(|q| !q.is_empty());
        Self { title_contains }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: &str) -> UpdateTaskRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn title_rules() {
        assert_eq!(TaskTitle::new("  Buy milk ").unwrap().as_str(), "  Buy milk ");
        assert_eq!(TaskTitle::new("   ").unwrap().as_str(), "   ");
        assert!(matches!(
            TaskTitle::new("").unwrap_err(),
            ValidationError::Empty { field: "title" }
        ));

        let title_255 = "a".repeat(255);
        assert!(TaskTitle::new(&title_255).is_ok());

        let title_256 = "a".repeat(256);
        let err = TaskTitle::new(&title_256).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 255, .. }));
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        // 255 two-byte characters
        let title = "é".repeat(255);
        assert!(TaskTitle::new(&title).is_ok());
    }

    #[test]
    fn description_max_length() {
        assert!(TaskDescription::new("").is_ok());
        assert!(TaskDescription::new(&"d".repeat(5000)).is_ok());
        let err = TaskDescription::new(&"d".repeat(5001)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 5000, .. }));
    }

    #[test]
    fn new_task_requires_title() {
        let err = NewTask::parse(CreateTaskRequest::default()).unwrap_err();
        assert_eq!(
            err.issues(),
            &[ValidationError::Required { field: "title" }]
        );
    }

    #[test]
    fn new_task_reports_all_fields() {
        let req = CreateTaskRequest {
            title: Some(String::new()),
            description: Some("x".repeat(5001)),
        };
        let err = NewTask::parse(req).unwrap_err();
        let fields: Vec<_> = err.issues().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["title", "description"]);
    }

    #[test]
    fn new_task_accepts_missing_description() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title":"Write docs"}"#).unwrap();
        let task = NewTask::parse(req).unwrap();
        assert_eq!(task.title.as_str(), "Write docs");
        assert!(task.description.is_none());
    }

    #[test]
    fn update_distinguishes_absent_and_null() {
        let absent = TaskPatch::parse(update(r#"{}"#)).unwrap();
        assert!(absent.is_empty());

        let cleared = TaskPatch::parse(update(r#"{"description":null}"#)).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert!(!cleared.is_empty());
    }

    #[test]
    fn update_parses_camel_case_fields() {
        let patch =
            TaskPatch::parse(update(r#"{"isCompleted":true,"title":"Renamed"}"#)).unwrap();
        assert_eq!(patch.is_completed, Some(true));
        assert_eq!(patch.title.unwrap().as_str(), "Renamed");
        assert!(patch.description.is_none());
    }

    #[test]
    fn update_rejects_null_title_and_flag() {
        let err = TaskPatch::parse(update(r#"{"title":null,"isCompleted":null}"#)).unwrap_err();
        let fields: Vec<_> = err.issues().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["title", "isCompleted"]);
    }

    #[test]
    fn filter_trims_query() {
        let filter = TaskFilter::from(ListTasksQuery {
            q: Some("  foo ".into()),
        });
        assert_eq!(filter.title_contains.as_deref(), Some("foo"));

        let blank = TaskFilter::from(ListTasksQuery {
            q: Some("   ".into()),
        });
        assert!(blank.title_contains.is_none());
    }
}
