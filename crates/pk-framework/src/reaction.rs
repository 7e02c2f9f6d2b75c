//! Raw reaction extraction.
//!
//! The typed reaction event is only delivered for messages already held in
//! the local message cache, so reactions on older messages would be lost.
//! Instead, every raw gateway frame is inspected for a `MESSAGE_REACTION_ADD`
//! dispatch and the interesting fields are pulled out directly.
//!
//! Each parsing step yields an explicit outcome:
//!
//! | Frame                                      | Result                         |
//! |--------------------------------------------|--------------------------------|
//! | binary frame                               | `Ok(None)`                     |
//! | text that is not JSON                      | `Ok(None)`                     |
//! | `t` is not `MESSAGE_REACTION_ADD`          | `Ok(None)`                     |
//! | `d` absent, or empty (`null`, `{}`, ...)   | `Ok(None)`                     |
//! | `d` is a non-empty value but not an object | `Err(ReactionError)`           |
//! | `d` present but a field is missing         | `Err(ReactionError)`           |
//! | complete reaction                          | `Ok(Some(ReactionAdd))`        |

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::trace;

use pk_core::RawFrame;

/// Dispatch name of the reaction-added event.
pub const REACTION_ADD: &str = "MESSAGE_REACTION_ADD";

/// Fields of a reaction-added event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionAdd {
    /// The user who reacted.
    pub user_id: String,
    /// The message reacted to.
    pub message_id: String,
    /// The emoji name (unicode emoji or custom emoji name).
    pub emoji_name: String,
}

/// A reaction-added payload that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactionError {
    /// A required field is absent or has the wrong type.
    #[error("reaction payload is missing `{0}`")]
    MissingField(&'static str),
    /// The event data is present but is not a record.
    #[error("reaction payload data is not an object")]
    NotAnObject,
}

/// Extracts a reaction-added event from a raw frame.
///
/// Anything that is not a reaction-added dispatch is `Ok(None)`: binary
/// frames, undecodable text and other dispatches are expected transport
/// noise.
pub fn extract_reaction(frame: &RawFrame) -> Result<Option<ReactionAdd>, ReactionError> {
    let Some(text) = frame.as_text() else {
        return Ok(None);
    };

    let payload: Value = match serde_json::from_str(text) {
        Ok(payload) => payload,
        Err(e) => {
            trace!(error = %e, "Ignoring undecodable raw frame");
            return Ok(None);
        }
    };

    if payload.get("t").and_then(Value::as_str) != Some(REACTION_ADD) {
        return Ok(None);
    }

    let data = match payload.get("d") {
        None => return Ok(None),
        Some(d) if is_empty(d) => return Ok(None),
        Some(Value::Object(data)) => data,
        Some(_) => return Err(ReactionError::NotAnObject),
    };

    let user_id = identifier(data, "user_id")?;
    let message_id = identifier(data, "message_id")?;
    let emoji_name = data
        .get("emoji")
        .and_then(Value::as_object)
        .ok_or(ReactionError::MissingField("emoji"))?
        .get("name")
        .and_then(Value::as_str)
        .ok_or(ReactionError::MissingField("emoji.name"))?;

    Ok(Some(ReactionAdd {
        user_id,
        message_id,
        emoji_name: emoji_name.to_owned(),
    }))
}

/// Whether the event data counts as absent.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Reads a snowflake field, accepting both string and integer encodings.
fn identifier(data: &Map<String, Value>, field: &'static str) -> Result<String, ReactionError> {
    match data.get(field) {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(ReactionError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: Value) -> RawFrame {
        RawFrame::Text(value.to_string())
    }

    #[test]
    fn test_non_json_frame_is_ignored() {
        assert_eq!(extract_reaction(&RawFrame::from("pong")), Ok(None));
        assert_eq!(extract_reaction(&RawFrame::from("")), Ok(None));
    }

    #[test]
    fn test_binary_frame_is_ignored() {
        let frame = RawFrame::Binary(br#"{"t":"MESSAGE_REACTION_ADD"}"#.to_vec());
        assert_eq!(extract_reaction(&frame), Ok(None));
    }

    #[test]
    fn test_other_dispatches_are_ignored() {
        let f = frame(json!({ "op": 0, "t": "MESSAGE_CREATE", "d": { "id": "1" } }));
        assert_eq!(extract_reaction(&f), Ok(None));

        let heartbeat_ack = frame(json!({ "op": 11, "t": null, "d": null }));
        assert_eq!(extract_reaction(&heartbeat_ack), Ok(None));

        assert_eq!(extract_reaction(&frame(json!([1, 2, 3]))), Ok(None));
    }

    #[test]
    fn test_complete_reaction_is_extracted() {
        let f = frame(json!({
            "t": "MESSAGE_REACTION_ADD",
            "d": { "user_id": "1", "message_id": "2", "emoji": { "name": "👍" } }
        }));

        assert_eq!(
            extract_reaction(&f),
            Ok(Some(ReactionAdd {
                user_id: "1".into(),
                message_id: "2".into(),
                emoji_name: "👍".into(),
            }))
        );
    }

    #[test]
    fn test_integer_identifiers_are_rendered() {
        let f = frame(json!({
            "t": "MESSAGE_REACTION_ADD",
            "d": { "user_id": 10, "message_id": 20, "emoji": { "id": "5", "name": "blobcat" } }
        }));

        let reaction = extract_reaction(&f).unwrap().unwrap();
        assert_eq!(reaction.user_id, "10");
        assert_eq!(reaction.message_id, "20");
        assert_eq!(reaction.emoji_name, "blobcat");
    }

    #[test]
    fn test_absent_or_empty_data_is_ignored() {
        for d in [json!(null), json!({}), json!([]), json!(""), json!(false)] {
            let f = frame(json!({ "t": "MESSAGE_REACTION_ADD", "d": d }));
            assert_eq!(extract_reaction(&f), Ok(None));
        }
        let f = frame(json!({ "t": "MESSAGE_REACTION_ADD" }));
        assert_eq!(extract_reaction(&f), Ok(None));
    }

    #[test]
    fn test_non_object_data_is_a_structural_fault() {
        for d in [json!("user_id"), json!([1, 2]), json!(7), json!(true)] {
            let f = frame(json!({ "t": "MESSAGE_REACTION_ADD", "d": d }));
            assert_eq!(extract_reaction(&f), Err(ReactionError::NotAnObject));
        }
    }

    #[test]
    fn test_missing_fields_are_structural_faults() {
        let cases = [
            (json!({ "message_id": "2", "emoji": { "name": "x" } }), "user_id"),
            (json!({ "user_id": "1", "emoji": { "name": "x" } }), "message_id"),
            (json!({ "user_id": "1", "message_id": "2" }), "emoji"),
            (json!({ "user_id": "1", "message_id": "2", "emoji": { "name": null } }), "emoji.name"),
        ];

        for (d, field) in cases {
            let f = frame(json!({ "t": "MESSAGE_REACTION_ADD", "d": d }));
            assert_eq!(extract_reaction(&f), Err(ReactionError::MissingField(field)));
        }
    }
}
