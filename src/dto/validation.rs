//! Validation helpers for DTOs.

use uuid::Uuid;
use validator::ValidationError;

/// Validates the task queue supplied at session creation: it must contain
/// at least one task and no duplicates (a task cannot be estimated twice in
/// one session).
pub fn validate_task_queue(task_ids: &[Uuid]) -> Result<(), ValidationError> {
    if task_ids.is_empty() {
        let mut err = ValidationError::new("task_queue_empty");
        err.message = Some("session requires at least one task to estimate".into());
        return Err(err);
    }

    let mut seen = std::collections::HashSet::new();
    for task_id in task_ids {
        if !seen.insert(task_id) {
            let mut err = ValidationError::new("task_queue_duplicate");
            err.message = Some(format!("task `{task_id}` appears more than once").into());
            return Err(err);
        }
    }

    Ok(())
}
