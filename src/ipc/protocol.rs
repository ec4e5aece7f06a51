//! Wire protocol shared with callers.
//!
//! Requests are a tagged enum (`"type"` field); responses are a flat
//! `{ok, message?, payload?}` record. The payload travels as base64 text
//! so the envelope stays line-oriented JSON.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::permissions::Capability;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    Notify {
        title: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sound: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    EnsurePermissions {
        caps: BTreeSet<Capability>,
        #[serde(default)]
        interactive: bool,
    },

    Status,

    #[serde(rename_all = "camelCase")]
    Screenshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_id: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_id: Option<u32>,
    },

    #[serde(rename_all = "camelCase")]
    RunShell {
        command: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env: Option<HashMap<String, String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_seconds: Option<f64>,
        #[serde(default)]
        needs_screen_recording: bool,
    },
}

impl Request {
    pub fn decode(raw: &[u8]) -> Result<Request, ActionError> {
        serde_json::from_slice(raw).map_err(|e| ActionError::Decode(e.to_string()))
    }

    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Notify { .. } => "notify",
            Request::EnsurePermissions { .. } => "ensurePermissions",
            Request::Status => "status",
            Request::Screenshot { .. } => "screenshot",
            Request::RunShell { .. } => "runShell",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "payload_base64"
    )]
    pub payload: Option<Vec<u8>>,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            ok: true,
            message: None,
            payload: None,
        }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Response {
            ok: true,
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn with_payload(payload: Vec<u8>) -> Self {
        Response {
            ok: true,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn failure(err: &ActionError) -> Self {
        Response {
            ok: false,
            message: Some(err.to_string()),
            payload: None,
        }
    }

    /// Encode for the reply path. A serialization failure degrades to a
    /// best-effort error response; the caller always gets one reply.
    pub fn encode(&self) -> Vec<u8> {
        match serde_json::to_vec(self) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("response encoding failed: {e}");
                let fallback = Response {
                    ok: false,
                    message: Some(format!("encode error: {e}")),
                    payload: None,
                };
                serde_json::to_vec(&fallback)
                    .unwrap_or_else(|_| br#"{"ok":false,"message":"encode error"}"#.to_vec())
            }
        }
    }
}

mod payload_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => ser.serialize_str(&STANDARD.encode(bytes)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let text = Option::<String>::deserialize(de)?;
        match text {
            Some(text) => STANDARD
                .decode(text.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip_request(req: &Request) {
        let encoded = serde_json::to_vec(req).unwrap();
        let decoded = Request::decode(&encoded).unwrap();
        assert_eq!(*req, decoded);
    }

    #[test]
    fn requests_round_trip() {
        round_trip_request(&Request::Notify {
            title: "Build done".into(),
            body: "valetd finished".into(),
            sound: Some("Glass".into()),
        });
        round_trip_request(&Request::EnsurePermissions {
            caps: [Capability::ScreenRecording, Capability::Accessibility]
                .into_iter()
                .collect(),
            interactive: true,
        });
        round_trip_request(&Request::Status);
        round_trip_request(&Request::Screenshot {
            display_id: Some(1),
            window_id: None,
        });
        round_trip_request(&Request::RunShell {
            command: vec!["sh".into(), "-c".into(), "true".into()],
            cwd: Some("/tmp".into()),
            env: Some([("LANG".to_string(), "C".to_string())].into_iter().collect()),
            timeout_seconds: Some(2.5),
            needs_screen_recording: false,
        });
    }

    #[test]
    fn responses_round_trip() {
        for resp in [
            Response::ok(),
            Response::ok_message("ready"),
            Response::with_payload(vec![0x89, b'P', b'N', b'G', 0, 255]),
            Response::failure(&ActionError::Timeout),
        ] {
            let encoded = resp.encode();
            let decoded: Response = serde_json::from_slice(&encoded).unwrap();
            assert_eq!(resp, decoded);
        }
    }

    #[test]
    fn wire_shape_is_stable() {
        let req = Request::RunShell {
            command: vec!["sleep".into(), "5".into()],
            cwd: None,
            env: None,
            timeout_seconds: Some(0.1),
            needs_screen_recording: false,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "runShell",
                "command": ["sleep", "5"],
                "timeoutSeconds": 0.1,
                "needsScreenRecording": false,
            })
        );

        let caps = serde_json::to_value([Capability::ScreenRecording]).unwrap();
        assert_eq!(caps, json!(["screen-recording"]));
    }

    #[test]
    fn unknown_tag_is_a_decode_error() {
        let err = Request::decode(br#"{"type":"reboot"}"#).unwrap_err();
        assert!(err.to_string().starts_with("decode error:"));
    }

    #[test]
    fn payload_is_base64_text_on_the_wire() {
        let resp = Response::with_payload(b"\x89PNG".to_vec());
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["payload"], json!("iVBORw=="));
    }
}
