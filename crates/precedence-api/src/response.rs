//! Response classification for `POST /records`.

use precedence_core::RegistrationOutcome;
use serde::Deserialize;
use serde_json::Value;

pub const STATUS_CREATED: u16 = 201;
pub const STATUS_CONFLICT: u16 = 409;
/// Service error code meaning "a record with this id already exists".
pub const DUPLICATE_RECORD_CODE: i64 = 3;

#[derive(Debug, Deserialize)]
struct CreatedBody {
    data: CreatedData,
}

#[derive(Debug, Deserialize)]
struct CreatedData {
    provable: Provable,
}

#[derive(Debug, Deserialize)]
struct Provable {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<i64>,
    #[serde(default)]
    data: Option<ErrorData>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    id: Option<Value>,
}

/// Maps an HTTP status and body onto a registration outcome.
pub fn classify_response(status: u16, body: &[u8]) -> RegistrationOutcome {
    match status {
        STATUS_CREATED => match serde_json::from_slice::<CreatedBody>(body) {
            Ok(created) => RegistrationOutcome::Created {
                provable_id: id_text(created.data.provable.id),
            },
            Err(e) => RegistrationOutcome::transient(format!(
                "201 response without data.provable.id: {e}"
            )),
        },
        STATUS_CONFLICT => match serde_json::from_slice::<ErrorBody>(body) {
            Ok(err) if err.error.code == Some(DUPLICATE_RECORD_CODE) => {
                RegistrationOutcome::Conflict {
                    existing_id: err.error.data.and_then(|d| d.id).map(id_text),
                }
            }
            Ok(err) => RegistrationOutcome::transient(format!(
                "409 with unexpected error code {:?}",
                err.error.code
            )),
            Err(e) => RegistrationOutcome::transient(format!("409 with unreadable body: {e}")),
        },
        other => RegistrationOutcome::transient(format!(
            "unexpected status {other}: {}",
            body_excerpt(body)
        )),
    }
}

fn id_text(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn body_excerpt(body: &[u8]) -> String {
    const MAX: usize = 200;
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MAX {
        text.into_owned()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use precedence_core::RegistrationOutcome;

    use super::classify_response;

    #[test]
    fn created_extracts_provable_id() {
        let out = classify_response(201, br#"{"data":{"provable":{"id":"p-77","other":1}}}"#);
        assert_eq!(
            out,
            RegistrationOutcome::Created {
                provable_id: "p-77".to_string()
            }
        );
    }

    #[test]
    fn created_without_id_is_transient() {
        let out = classify_response(201, br#"{"data":{}}"#);
        assert!(matches!(out, RegistrationOutcome::TransientFailure { .. }));
    }

    #[test]
    fn duplicate_conflict_is_terminal() {
        let out = classify_response(409, br#"{"error":{"code":3,"data":{"id":"p-1"}}}"#);
        assert_eq!(
            out,
            RegistrationOutcome::Conflict {
                existing_id: Some("p-1".to_string())
            }
        );
    }

    #[test]
    fn duplicate_conflict_without_data_id_is_still_terminal() {
        let out = classify_response(409, br#"{"error":{"code":3}}"#);
        assert_eq!(out, RegistrationOutcome::Conflict { existing_id: None });
    }

    #[test]
    fn other_conflict_codes_are_transient() {
        let out = classify_response(409, br#"{"error":{"code":4,"data":{"id":"p-1"}}}"#);
        assert!(!out.is_terminal());
        let out = classify_response(409, b"<html>");
        assert!(!out.is_terminal());
    }

    #[test]
    fn server_errors_are_transient() {
        let out = classify_response(503, b"upstream down");
        match out {
            RegistrationOutcome::TransientFailure { reason } => {
                assert!(reason.contains("503"));
                assert!(reason.contains("upstream down"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!classify_response(200, br#"{"data":{"provable":{"id":"x"}}}"#).is_terminal());
    }

    #[test]
    fn numeric_ids_are_rendered_as_text() {
        let out = classify_response(201, br#"{"data":{"provable":{"id":42}}}"#);
        assert_eq!(
            out,
            RegistrationOutcome::Created {
                provable_id: "42".to_string()
            }
        );
    }
}
