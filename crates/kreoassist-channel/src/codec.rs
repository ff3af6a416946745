// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON envelopes exchanged with the host.
//
//   request: {"method": "sendSMS", "arguments": {"phone": "...", "message": "..."}}
//   reply:   {"status": "success", "result": true}
//            {"status": "error", "code": "...", "message": "...", "details": ...}
//            {"status": "not_implemented"}

use kreoassist_core::error::{KreoError, Result};
use kreoassist_core::types::{MethodCall, MethodReply};

use crate::dispatch::CapabilityBridge;

/// Last-resort reply when a reply cannot be serialized.
const ENCODE_FAILURE_REPLY: &str =
    r#"{"status":"error","code":"INTERNAL","message":"failed to encode reply","details":null}"#;

pub fn decode_call(json: &str) -> Result<MethodCall> {
    serde_json::from_str(json).map_err(|e| KreoError::InvalidRequest(e.to_string()))
}

pub fn encode_reply(reply: &MethodReply) -> Result<String> {
    Ok(serde_json::to_string(reply)?)
}

impl CapabilityBridge {
    /// Decode one request envelope, dispatch it, and encode the reply.
    ///
    /// Always returns a reply envelope; an undecodable request is answered
    /// with an `INVALID_REQUEST` error.
    pub fn handle_json(&self, request: &str) -> String {
        let reply = match decode_call(request) {
            Ok(call) => self.handle(&call),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed request envelope");
                MethodReply::error(&e, None)
            }
        };

        encode_reply(&reply).unwrap_or_else(|e| {
            tracing::error!(error = %e, "reply encoding failed");
            ENCODE_FAILURE_REPLY.to_owned()
        })
    }
}
