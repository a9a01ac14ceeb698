//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationErrors, not panic.

pub mod task;
pub mod validation;

pub use task::{
    CreateTaskRequest, ListTasksQuery, NewTask, Task, TaskDescription, TaskFilter, TaskPatch,
    TaskTitle, UpdateTaskRequest, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};
pub use validation::{ValidationError, ValidationErrors};
