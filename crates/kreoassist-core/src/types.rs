// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the KreoAssist method channel.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::KreoError;

/// A sensitive action gated by an OS runtime permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Transmit a text message.
    SendSms,
    /// Start a phone call without going through the dialer.
    CallPhone,
}

impl Capability {
    /// Every capability the bridge knows about, in request order.
    pub const ALL: [Capability; 2] = [Capability::SendSms, Capability::CallPhone];

    /// Fully qualified Android manifest permission.
    pub fn android_permission(self) -> &'static str {
        match self {
            Capability::SendSms => "android.permission.SEND_SMS",
            Capability::CallPhone => "android.permission.CALL_PHONE",
        }
    }

    /// Reverse of [`Capability::android_permission`].
    pub fn from_android_permission(permission: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.android_permission() == permission)
    }

    /// Short name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Capability::SendSms => "SMS",
            Capability::CallPhone => "Call",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::SendSms => f.write_str("send_sms"),
            Capability::CallPhone => f.write_str("call_phone"),
        }
    }
}

/// The requests the shell can make across the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `sendSMS { phone, message }`
    SendSms,
    /// `directCall { phone }`
    DirectCall,
    /// `checkPermission` — SMS authorization state.
    CheckSmsPermission,
    /// `checkCallPermission`
    CheckCallPermission,
    /// `requestPermission` — prompt for every capability.
    RequestPermissions,
}

impl Method {
    /// Resolve a wire method name. Unknown names yield `None`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "sendSMS" => Some(Method::SendSms),
            "directCall" => Some(Method::DirectCall),
            "checkPermission" => Some(Method::CheckSmsPermission),
            "checkCallPermission" => Some(Method::CheckCallPermission),
            "requestPermission" => Some(Method::RequestPermissions),
            _ => None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Method::SendSms => "sendSMS",
            Method::DirectCall => "directCall",
            Method::CheckSmsPermission => "checkPermission",
            Method::CheckCallPermission => "checkCallPermission",
            Method::RequestPermissions => "requestPermission",
        }
    }
}

/// One request received from the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: None,
        }
    }

    /// Builder-style argument insertion, mostly for tests and the replay tool.
    pub fn with_argument(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments
            .get_or_insert_with(Map::new)
            .insert(key.to_owned(), value.into());
        self
    }

    /// Typed argument lookup.
    ///
    /// Absent keys, explicit `null` and values of the wrong JSON type all
    /// read as `None`.
    pub fn argument<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.arguments.as_ref()?.get(key)?;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// The single result returned for each [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodReply {
    Success {
        result: Value,
    },
    Error {
        code: String,
        message: String,
        #[serde(default)]
        details: Option<Value>,
    },
    NotImplemented,
}

impl MethodReply {
    pub fn success(result: impl Into<Value>) -> Self {
        MethodReply::Success {
            result: result.into(),
        }
    }

    /// Convert an error into its reply form, attaching optional details.
    pub fn error(err: &KreoError, details: Option<Value>) -> Self {
        match err {
            KreoError::NotImplemented(_) => MethodReply::NotImplemented,
            other => MethodReply::Error {
                code: other.code().to_owned(),
                message: other.to_string(),
                details,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodReply::Success { .. })
    }

    /// Error code, if this is an error reply.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            MethodReply::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Identifies one authorization request from dispatch to OS callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Out-of-band result of an authorization prompt, one per capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOutcome {
    pub correlation_id: CorrelationId,
    pub request_code: i32,
    pub capability: Capability,
    pub granted: bool,
}

/// Mask a phone number for logging, keeping only the last two digits.
pub fn redact_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let keep = chars.len().min(2);
    let masked = chars.len() - keep;
    let mut out = "*".repeat(masked);
    out.extend(&chars[masked..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_argument_reads_as_missing() {
        let call: MethodCall =
            serde_json::from_value(json!({"method": "directCall", "arguments": {"phone": null}}))
                .unwrap();
        assert_eq!(call.argument::<String>("phone"), None);
    }

    #[test]
    fn wrong_type_reads_as_missing() {
        let call = MethodCall::new("directCall").with_argument("phone", 5551234);
        assert_eq!(call.argument::<String>("phone"), None);
    }

    #[test]
    fn arguments_are_optional_on_the_wire() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"checkPermission"}"#).unwrap();
        assert_eq!(call.arguments, None);
        assert_eq!(call.argument::<String>("phone"), None);
    }

    #[test]
    fn method_names_resolve_both_ways() {
        for method in [
            Method::SendSms,
            Method::DirectCall,
            Method::CheckSmsPermission,
            Method::CheckCallPermission,
            Method::RequestPermissions,
        ] {
            assert_eq!(Method::from_wire(method.wire_name()), Some(method));
        }
        assert_eq!(Method::from_wire("sendMms"), None);
    }

    #[test]
    fn reply_wire_shape() {
        let ok = serde_json::to_value(MethodReply::success(true)).unwrap();
        assert_eq!(ok, json!({"status": "success", "result": true}));

        let denied = MethodReply::error(&KreoError::PermissionDenied(Capability::SendSms), None);
        assert_eq!(
            serde_json::to_value(denied).unwrap(),
            json!({
                "status": "error",
                "code": "PERMISSION_DENIED",
                "message": "SMS permission not granted",
                "details": null
            })
        );

        let missing = MethodReply::error(&KreoError::NotImplemented("x".into()), None);
        assert_eq!(
            serde_json::to_value(missing).unwrap(),
            json!({"status": "not_implemented"})
        );
    }

    #[test]
    fn android_permission_lookup() {
        assert_eq!(
            Capability::from_android_permission("android.permission.CALL_PHONE"),
            Some(Capability::CallPhone)
        );
        assert_eq!(Capability::from_android_permission("android.permission.CAMERA"), None);
    }

    #[test]
    fn phone_redaction() {
        assert_eq!(redact_phone("+15551234567"), "**********67");
        assert_eq!(redact_phone("7"), "7");
        assert_eq!(redact_phone(""), "");
    }
}
