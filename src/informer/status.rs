//! Status extraction from a claim's `status.conditions`.

use crate::error::InformerError;
use serde_json::Value;

pub const NO_CONDITIONS: &str = "no status conditions available";
pub const NO_READY_CONDITION: &str = "no Ready condition found";

/// Claim reference reported to the collector: `<namespace>/<name>`
pub fn claim_ref(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// Derive the human-readable status of a claim object.
///
/// - no conditions: [`NO_CONDITIONS`]
/// - conditions but none of type `Ready`: [`NO_READY_CONDITION`]
/// - `Ready` with a message: the message verbatim
/// - `Ready` without a message: `Ready=<status>`
///
/// Conditions that are not objects are skipped. A `conditions` value that is present but
/// not a list is an error.
pub fn extract_claim_status(claim: &Value) -> Result<String, InformerError> {
    let conditions = match claim.get("status").and_then(|status| status.get("conditions")) {
        None | Some(Value::Null) => return Ok(NO_CONDITIONS.to_string()),
        Some(Value::Array(conditions)) => conditions,
        Some(other) => {
            return Err(InformerError::MalformedConditions(format!(
                "expected a list, found {}",
                json_kind(other)
            )))
        }
    };

    if conditions.is_empty() {
        return Ok(NO_CONDITIONS.to_string());
    }

    let ready = conditions
        .iter()
        .filter_map(Value::as_object)
        .find(|condition| condition.get("type").and_then(Value::as_str) == Some("Ready"));

    let Some(ready) = ready else {
        return Ok(NO_READY_CONDITION.to_string());
    };

    let field = |name: &str| ready.get(name).and_then(Value::as_str).unwrap_or_default();
    let message = field("message");
    if !message.is_empty() {
        return Ok(message.to_string());
    }
    Ok(format!("Ready={}", field("status")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
