//! Homework record → notification text.

use crate::models::{HomeworkStatus, StatusError};
use serde_json::Value;

/// Format the verdict message for one submission record.
///
/// A missing `homework_name` or `status` key is
/// [`StatusError::MissingField`]; a `status` that is null, not a string,
/// or outside [`HomeworkStatus`] is [`StatusError::UndocumentedStatus`].
pub fn parse_status(homework: &Value) -> Result<String, StatusError> {
    let homework_name = homework
        .get("homework_name")
        .ok_or(StatusError::MissingField("homework_name"))?;
    let homework_name = match homework_name {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    };

    let status = homework
        .get("status")
        .ok_or(StatusError::MissingField("status"))?;
    let status: HomeworkStatus = match status {
        Value::String(raw) => raw
            .parse()
            .map_err(|_| StatusError::UndocumentedStatus(Some(raw.clone())))?,
        Value::Null => return Err(StatusError::UndocumentedStatus(None)),
        other => return Err(StatusError::UndocumentedStatus(Some(other.to_string()))),
    };

    Ok(format!(
        "Изменился статус проверки работы \"{homework_name}\". {}",
        status.verdict()
    ))
}
