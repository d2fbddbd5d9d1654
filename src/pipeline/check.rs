//! Response shape validation.

use crate::models::{CheckedResponse, ResponseError};
use serde_json::Value;

/// Check that `response` matches the documented contract.
///
/// Checks run in a fixed order and stop at the first violation:
/// object, `homeworks` present, `current_date` present, `homeworks` is
/// a list, `current_date` is an integer, list is non-empty. An empty
/// list yields [`ResponseError::EmptyHomeworks`] carrying the server
/// date, which callers treat as "no updates" rather than a failure.
pub fn check_response(response: &Value) -> Result<CheckedResponse, ResponseError> {
    let map = response.as_object().ok_or(ResponseError::NotAMapping)?;
    let homeworks = map.get("homeworks").ok_or(ResponseError::MissingHomeworks)?;
    let current_date = map
        .get("current_date")
        .ok_or(ResponseError::MissingCurrentDate)?;

    let homeworks = homeworks
        .as_array()
        .ok_or(ResponseError::HomeworksNotAList)?;
    let current_date = current_date
        .as_i64()
        .ok_or(ResponseError::CurrentDateNotInteger)?;

    if homeworks.is_empty() {
        return Err(ResponseError::EmptyHomeworks { current_date });
    }

    Ok(CheckedResponse {
        homeworks: homeworks.clone(),
        current_date,
    })
}
