use serde::{Deserialize, Serialize};

/// One message from a worker to its supervisor.
///
/// A worker sends any number of `Log` messages followed by at most one
/// terminal message (`Success` or `Error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// A fragment of diagnostic output. Not necessarily a whole line.
    Log { text: String },
    /// Transcript text and the heavy call's wall-clock duration in seconds.
    Success { text: String, duration: f64 },
    Error { message: String },
}

impl WorkerMessage {
    pub fn log(text: impl Into<String>) -> Self {
        WorkerMessage::Log { text: text.into() }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerMessage::Log { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_log_is_non_terminal() {
        assert!(!WorkerMessage::log("x").is_terminal());
        assert!(WorkerMessage::Success {
            text: "hi".into(),
            duration: 1.0
        }
        .is_terminal());
        assert!(WorkerMessage::Error {
            message: "boom".into()
        }
        .is_terminal());
    }

    #[test]
    fn test_wire_format_is_tagged_json() {
        let json = serde_json::to_string(&WorkerMessage::log("Loading model\n")).unwrap();
        assert_eq!(json, r#"{"type":"log","text":"Loading model\n"}"#);

        let decoded: WorkerMessage =
            serde_json::from_str(r#"{"type":"error","message":"network unreachable"}"#).unwrap();
        assert_eq!(
            decoded,
            WorkerMessage::Error {
                message: "network unreachable".into()
            }
        );
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!(serde_json::from_str::<WorkerMessage>(r#"{"type":"progress"}"#).is_err());
    }
}
