use serde::{Deserialize, Serialize};
use serde_json::Value;

use rzt_backup::ImportResult;
use rzt_types::KindCounts;

/// Requests understood by the worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    /// Export the whole catalog.
    Build,
    /// Verify (when stamped) and import a full export.
    Import { json: String },
}

impl WorkerRequest {
    /// Read a loosely typed message.
    ///
    /// `None` for an unrecognized `type` or a missing required field; such
    /// messages get no response at all.
    pub fn from_message(message: &Value) -> Option<Self> {
        match message.get("type")?.as_str()? {
            "build" => Some(Self::Build),
            "import" => Some(Self::Import {
                json: message.get("json")?.as_str()?.to_string(),
            }),
            _ => None,
        }
    }

    pub fn to_message(&self) -> Value {
        match self {
            Self::Build => serde_json::json!({ "type": "build" }),
            Self::Import { json } => serde_json::json!({ "type": "import", "json": json }),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Import { .. } => "import",
        }
    }
}

/// Messages posted back by the worker. There is exactly one per handled request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerResponse {
    Result(ResultMessage),
}

/// Terminal result of one operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted: Option<KindCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<KindCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
    /// Wall time of the operation in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    pub fn built(json: String, ms: f64) -> Self {
        Self::Result(ResultMessage {
            ok: true,
            json: Some(json),
            ms: Some(ms),
            ..Default::default()
        })
    }

    pub fn imported(result: &ImportResult, ms: f64) -> Self {
        Self::Result(ResultMessage {
            ok: true,
            inserted: Some(result.inserted),
            updated: Some(result.updated),
            issues: Some(result.issue_messages()),
            ms: Some(ms),
            ..Default::default()
        })
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Result(ResultMessage {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        })
    }

    pub fn result(&self) -> &ResultMessage {
        match self {
            Self::Result(result) => result,
        }
    }

    pub fn into_result(self) -> ResultMessage {
        match self {
            Self::Result(result) => result,
        }
    }

    pub fn to_message(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "type": "result", "ok": false, "error": e.to_string() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_from_loose_messages() {
        assert_eq!(
            WorkerRequest::from_message(&json!({ "type": "build" })),
            Some(WorkerRequest::Build)
        );
        assert_eq!(
            WorkerRequest::from_message(&json!({ "type": "import", "json": "{}" })),
            Some(WorkerRequest::Import { json: "{}".into() })
        );
    }

    #[test]
    fn unrecognized_or_incomplete_messages_are_none() {
        for message in [
            json!({ "type": "export" }),
            json!({ "type": "import" }),
            json!({ "type": "import", "json": 42 }),
            json!({ "kind": "build" }),
            json!("build"),
            Value::Null,
        ] {
            assert_eq!(WorkerRequest::from_message(&message), None, "{message}");
        }
    }

    #[test]
    fn request_message_shape() {
        let request = WorkerRequest::Import { json: "{}".into() };
        assert_eq!(request.to_message(), json!({ "type": "import", "json": "{}" }));
        assert_eq!(WorkerRequest::from_message(&request.to_message()), Some(request));
        assert_eq!(serde_json::to_value(WorkerRequest::Build).unwrap(), json!({ "type": "build" }));
    }

    #[test]
    fn result_message_shapes() {
        assert_eq!(
            WorkerResponse::built("{}".into(), 12.5).to_message(),
            json!({ "type": "result", "ok": true, "json": "{}", "ms": 12.5 })
        );
        assert_eq!(
            WorkerResponse::failed("boom").to_message(),
            json!({ "type": "result", "ok": false, "error": "boom" })
        );

        let imported = WorkerResponse::imported(&ImportResult::default(), 3.0).to_message();
        assert_eq!(imported["inserted"]["patternLinks"], 0);
        assert_eq!(imported["issues"], json!([]));
    }

    #[test]
    fn response_parses_back() {
        let parsed: WorkerResponse =
            serde_json::from_value(json!({ "type": "result", "ok": false, "error": "x" })).unwrap();
        assert_eq!(parsed.result().error.as_deref(), Some("x"));
    }
}
