// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request dispatch for the capability bridge.
//
// Every request is handled synchronously and answered exactly once:
//
//   sendSMS             phone, message -> true | INVALID_ARGS | PERMISSION_DENIED
//   directCall          phone          -> true | INVALID_ARGS | PERMISSION_DENIED
//   checkPermission                    -> bool (SMS)
//   checkCallPermission                -> bool (call)
//   requestPermission                  -> true (prompt dispatched)
//   anything else                      -> not implemented
//
// Arguments are validated before permissions are read, and both before any
// native action. A denied send/call dispatches a prompt for that capability
// and returns at once; the prompt's answer is published by the
// `PermissionTracker`, never folded into the reply.

use kreoassist_bridge::traits::PlatformBridge;
use kreoassist_core::config::{BridgeConfig, NativeFailurePolicy};
use kreoassist_core::error::KreoError;
use kreoassist_core::types::{
    redact_phone, Capability, Method, MethodCall, MethodReply, PermissionOutcome,
};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::permissions::{PermissionTicket, PermissionTracker};

/// Translates method-channel requests into native telephony actions.
pub struct CapabilityBridge {
    platform: Box<dyn PlatformBridge>,
    permissions: PermissionTracker,
    config: BridgeConfig,
}

impl CapabilityBridge {
    pub fn new(platform: Box<dyn PlatformBridge>, config: BridgeConfig) -> Self {
        info!(
            platform = platform.platform_name(),
            channel = %config.channel_name,
            "capability bridge ready"
        );
        Self {
            permissions: PermissionTracker::new(config.first_request_code),
            platform,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn permissions(&self) -> &PermissionTracker {
        &self.permissions
    }

    /// Subscribe to permission prompt outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<PermissionOutcome> {
        self.permissions.subscribe()
    }

    /// Feed the OS answer for `request_code` back in. See
    /// [`PermissionTracker::resolve`].
    pub fn on_permission_result(
        &self,
        request_code: i32,
        results: &[(Capability, bool)],
    ) -> Vec<PermissionOutcome> {
        self.permissions.resolve(request_code, results)
    }

    /// Handle one request and produce its single reply.
    pub fn handle(&self, call: &MethodCall) -> MethodReply {
        let Some(method) = Method::from_wire(&call.method) else {
            debug!(method = %call.method, "unrecognised method");
            return MethodReply::error(&KreoError::NotImplemented(call.method.clone()), None);
        };
        debug!(method = method.wire_name(), "dispatching");

        match method {
            Method::SendSms => self.send_sms(call),
            Method::DirectCall => self.direct_call(call),
            Method::CheckSmsPermission => MethodReply::success(self.is_granted(Capability::SendSms)),
            Method::CheckCallPermission => {
                MethodReply::success(self.is_granted(Capability::CallPhone))
            }
            Method::RequestPermissions => {
                self.request(&Capability::ALL);
                MethodReply::success(true)
            }
        }
    }

    fn send_sms(&self, call: &MethodCall) -> MethodReply {
        let (Some(phone), Some(message)) = (
            call.argument::<String>("phone"),
            call.argument::<String>("message"),
        ) else {
            return invalid_args("Phone or message is null");
        };
        if let Err(denied) = self.authorize(Capability::SendSms) {
            return denied;
        }

        debug!(phone = %redact_phone(&phone), "sending SMS");
        let outcome = self.platform.send_text(&phone, &message);
        self.finish("sms", outcome)
    }

    fn direct_call(&self, call: &MethodCall) -> MethodReply {
        let Some(phone) = call.argument::<String>("phone") else {
            return invalid_args("Phone is null");
        };
        if let Err(denied) = self.authorize(Capability::CallPhone) {
            return denied;
        }

        debug!(phone = %redact_phone(&phone), "placing call");
        let outcome = self.platform.place_call(&phone);
        self.finish("call", outcome)
    }

    /// Current OS answer for `capability`. A failed query reads as "not
    /// granted" so the query methods never fail.
    fn is_granted(&self, capability: Capability) -> bool {
        match self.platform.is_granted(capability) {
            Ok(granted) => granted,
            Err(e) => {
                warn!(%capability, error = %e, "permission query failed, treating as denied");
                false
            }
        }
    }

    /// Pass if granted; otherwise dispatch a prompt and return the
    /// `PERMISSION_DENIED` reply carrying its correlation data.
    fn authorize(&self, capability: Capability) -> Result<(), MethodReply> {
        if self.is_granted(capability) {
            return Ok(());
        }

        warn!(%capability, "permission missing, requesting it");
        let details = self.request(&[capability]).map(|ticket| {
            json!({
                "capability": capability,
                "correlation_id": ticket.correlation_id,
                "request_code": ticket.request_code,
            })
        });
        Err(MethodReply::error(
            &KreoError::PermissionDenied(capability),
            details,
        ))
    }

    /// Dispatch an OS prompt for `capabilities`. Returns `None` when the
    /// prompt could not be shown; the caller's reply is unaffected.
    fn request(&self, capabilities: &[Capability]) -> Option<PermissionTicket> {
        let ticket = self.permissions.register(capabilities);
        match self
            .platform
            .request_permissions(capabilities, ticket.request_code)
        {
            Ok(()) => Some(ticket),
            Err(e) => {
                warn!(
                    ?capabilities,
                    request_code = ticket.request_code,
                    error = %e,
                    "permission prompt could not be dispatched"
                );
                self.permissions.withdraw(ticket.request_code);
                None
            }
        }
    }

    fn finish(&self, action: &'static str, outcome: kreoassist_core::error::Result<()>) -> MethodReply {
        let err = match outcome {
            Ok(()) => return MethodReply::success(true),
            Err(KreoError::NativeFailure { detail, .. }) => KreoError::NativeFailure { action, detail },
            Err(other) => KreoError::NativeFailure {
                action,
                detail: other.to_string(),
            },
        };

        match self.config.native_failure_policy {
            NativeFailurePolicy::Report => {
                warn!(error = %err, "native action failed");
                MethodReply::error(&err, None)
            }
            NativeFailurePolicy::Swallow => {
                warn!(error = %err, "native action failed, reporting success per configuration");
                MethodReply::success(true)
            }
        }
    }
}

fn invalid_args(message: &str) -> MethodReply {
    MethodReply::error(&KreoError::InvalidArgs(message.into()), None)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use kreoassist_bridge::traits::{NativeDialer, NativePermissions, NativeSms};
    use kreoassist_core::error::Result;

    use super::*;

    /// Everything the bridge asked the platform to do.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum NativeCall {
        Sms(String, String),
        Call(String),
        Prompt(Vec<Capability>, i32),
    }

    /// Scriptable platform double that records native calls.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingBridge {
        pub sms_granted: bool,
        pub call_granted: bool,
        pub fail_native: bool,
        pub fail_prompt: bool,
        pub fail_query: bool,
        pub calls: Arc<Mutex<Vec<NativeCall>>>,
    }

    impl RecordingBridge {
        pub fn granted() -> Self {
            Self {
                sms_granted: true,
                call_granted: true,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<NativeCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: NativeCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl PlatformBridge for RecordingBridge {
        fn platform_name(&self) -> &str {
            "Recording"
        }
    }

    impl NativePermissions for RecordingBridge {
        fn is_granted(&self, capability: Capability) -> Result<bool> {
            if self.fail_query {
                return Err(KreoError::Bridge("host activity not registered".into()));
            }
            Ok(match capability {
                Capability::SendSms => self.sms_granted,
                Capability::CallPhone => self.call_granted,
            })
        }

        fn request_permissions(&self, capabilities: &[Capability], request_code: i32) -> Result<()> {
            if self.fail_prompt {
                return Err(KreoError::Bridge("no activity".into()));
            }
            self.record(NativeCall::Prompt(capabilities.to_vec(), request_code));
            Ok(())
        }
    }

    impl NativeSms for RecordingBridge {
        fn send_text(&self, phone: &str, message: &str) -> Result<()> {
            self.record(NativeCall::Sms(phone.into(), message.into()));
            if self.fail_native {
                return Err(KreoError::NativeFailure {
                    action: "sms",
                    detail: "java.lang.IllegalArgumentException: Invalid destinationAddress".into(),
                });
            }
            Ok(())
        }
    }

    impl NativeDialer for RecordingBridge {
        fn place_call(&self, phone: &str) -> Result<()> {
            self.record(NativeCall::Call(phone.into()));
            if self.fail_native {
                return Err(KreoError::NativeFailure {
                    action: "call",
                    detail: "android.content.ActivityNotFoundException".into(),
                });
            }
            Ok(())
        }
    }

    pub(crate) fn bridge_with(platform: &RecordingBridge) -> CapabilityBridge {
        CapabilityBridge::new(Box::new(platform.clone()), BridgeConfig::default())
    }

    fn sms(phone: &str, message: &str) -> MethodCall {
        MethodCall::new("sendSMS")
            .with_argument("phone", phone)
            .with_argument("message", message)
    }

    #[test]
    fn granted_sms_is_sent_once_with_exact_arguments() {
        let platform = RecordingBridge::granted();
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&sms("+15551234567", "hello"));
        assert_eq!(reply, MethodReply::success(true));
        assert_eq!(
            platform.calls(),
            vec![NativeCall::Sms("+15551234567".into(), "hello".into())]
        );
    }

    #[test]
    fn long_sms_is_passed_through_whole() {
        let platform = RecordingBridge::granted();
        let bridge = bridge_with(&platform);
        let body = "x".repeat(400);

        assert!(bridge.handle(&sms("+15551234567", &body)).is_success());
        assert_eq!(
            platform.calls(),
            vec![NativeCall::Sms("+15551234567".into(), body)]
        );
    }

    #[test]
    fn granted_call_is_placed() {
        let platform = RecordingBridge::granted();
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&MethodCall::new("directCall").with_argument("phone", "+15550001111"));
        assert_eq!(reply, MethodReply::success(true));
        assert_eq!(platform.calls(), vec![NativeCall::Call("+15550001111".into())]);
    }

    #[test]
    fn missing_fields_are_invalid_args_without_native_action() {
        let platform = RecordingBridge::granted();
        let bridge = bridge_with(&platform);

        let requests = [
            MethodCall::new("sendSMS"),
            MethodCall::new("sendSMS").with_argument("phone", "+15551234567"),
            MethodCall::new("sendSMS").with_argument("message", "hi"),
            MethodCall::new("sendSMS")
                .with_argument("phone", serde_json::Value::Null)
                .with_argument("message", "hi"),
            MethodCall::new("directCall"),
            MethodCall::new("directCall").with_argument("phone", serde_json::Value::Null),
        ];
        for request in &requests {
            let reply = bridge.handle(request);
            assert_eq!(reply.error_code(), Some("INVALID_ARGS"), "{request:?}");
        }
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn invalid_args_wins_over_missing_permission() {
        let platform = RecordingBridge::default();
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&MethodCall::new("directCall"));
        assert_eq!(reply.error_code(), Some("INVALID_ARGS"));
        // No prompt either: validation happens first.
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn denied_sms_prompts_and_reports_permission_denied() {
        let platform = RecordingBridge {
            call_granted: true,
            ..Default::default()
        };
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&sms("+15551234567", "hi"));
        let MethodReply::Error { code, message, details } = reply else {
            panic!("expected an error reply");
        };
        assert_eq!(code, "PERMISSION_DENIED");
        assert_eq!(message, "SMS permission not granted");

        let details = details.expect("correlation details");
        assert_eq!(details["capability"], "send_sms");
        assert_eq!(details["request_code"], 100);

        assert_eq!(
            platform.calls(),
            vec![NativeCall::Prompt(vec![Capability::SendSms], 100)]
        );
        assert_eq!(bridge.permissions().pending_count(), 1);
    }

    #[test]
    fn denied_call_prompts_only_for_call() {
        let platform = RecordingBridge {
            sms_granted: true,
            ..Default::default()
        };
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&MethodCall::new("directCall").with_argument("phone", "+15550001111"));
        assert_eq!(reply.error_code(), Some("PERMISSION_DENIED"));
        assert_eq!(
            platform.calls(),
            vec![NativeCall::Prompt(vec![Capability::CallPhone], 100)]
        );
    }

    #[test]
    fn denied_reply_survives_undeliverable_prompt() {
        let platform = RecordingBridge {
            fail_prompt: true,
            ..Default::default()
        };
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&sms("+15551234567", "hi"));
        assert_eq!(
            reply,
            MethodReply::Error {
                code: "PERMISSION_DENIED".into(),
                message: "SMS permission not granted".into(),
                details: None,
            }
        );
        assert_eq!(bridge.permissions().pending_count(), 0);
    }

    #[test]
    fn permission_queries_reflect_platform_state() {
        for (sms_granted, call_granted) in [(false, false), (true, false), (false, true), (true, true)] {
            let platform = RecordingBridge {
                sms_granted,
                call_granted,
                ..Default::default()
            };
            let bridge = bridge_with(&platform);
            assert_eq!(
                bridge.handle(&MethodCall::new("checkPermission")),
                MethodReply::success(sms_granted)
            );
            assert_eq!(
                bridge.handle(&MethodCall::new("checkCallPermission")),
                MethodReply::success(call_granted)
            );
            assert!(platform.calls().is_empty());
        }
    }

    #[test]
    fn request_permission_prompts_for_everything() {
        let platform = RecordingBridge::default();
        let bridge = bridge_with(&platform);

        assert_eq!(
            bridge.handle(&MethodCall::new("requestPermission")),
            MethodReply::success(true)
        );
        assert_eq!(
            platform.calls(),
            vec![NativeCall::Prompt(Capability::ALL.to_vec(), 100)]
        );
    }

    #[test]
    fn request_permission_never_fails_synchronously() {
        let platform = RecordingBridge {
            fail_prompt: true,
            ..Default::default()
        };
        let bridge = bridge_with(&platform);
        assert_eq!(
            bridge.handle(&MethodCall::new("requestPermission")),
            MethodReply::success(true)
        );
    }

    #[test]
    fn unknown_method_is_not_implemented_without_side_effects() {
        let platform = RecordingBridge::granted();
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(
            &MethodCall::new("sendMMS")
                .with_argument("phone", "+15551234567")
                .with_argument("message", "hi"),
        );
        assert_eq!(reply, MethodReply::NotImplemented);
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn native_failure_is_reported_by_default() {
        let platform = RecordingBridge {
            fail_native: true,
            ..RecordingBridge::granted()
        };
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&sms("+15551234567", "hi"));
        assert_eq!(reply.error_code(), Some("NATIVE_FAILURE"));
        assert_eq!(platform.calls().len(), 1);
    }

    #[test]
    fn native_failure_can_be_swallowed() {
        let platform = RecordingBridge {
            fail_native: true,
            ..RecordingBridge::granted()
        };
        let config = BridgeConfig {
            native_failure_policy: NativeFailurePolicy::Swallow,
            ..Default::default()
        };
        let bridge = CapabilityBridge::new(Box::new(platform.clone()), config);

        let reply = bridge.handle(&MethodCall::new("directCall").with_argument("phone", "+15550001111"));
        assert_eq!(reply, MethodReply::success(true));
        assert_eq!(platform.calls(), vec![NativeCall::Call("+15550001111".into())]);
    }

    #[test]
    fn prompt_outcome_is_published_out_of_band() {
        let platform = RecordingBridge::default();
        let bridge = bridge_with(&platform);
        let mut rx = bridge.subscribe();

        let reply = bridge.handle(&sms("+15551234567", "hi"));
        let MethodReply::Error { details: Some(details), .. } = reply else {
            panic!("expected denial with details");
        };
        let code = details["request_code"].as_i64().unwrap() as i32;

        let outcomes = bridge.on_permission_result(code, &[(Capability::SendSms, true)]);
        assert_eq!(outcomes.len(), 1);

        let event = rx.try_recv().unwrap();
        assert!(event.granted);
        assert_eq!(event.capability, Capability::SendSms);
        assert_eq!(
            details["correlation_id"],
            serde_json::to_value(event.correlation_id).unwrap()
        );
    }

    #[test]
    fn each_denial_gets_its_own_request_code() {
        let platform = RecordingBridge::default();
        let bridge = bridge_with(&platform);

        bridge.handle(&sms("+15551234567", "one"));
        bridge.handle(&MethodCall::new("directCall").with_argument("phone", "+15550001111"));
        assert_eq!(
            platform.calls(),
            vec![
                NativeCall::Prompt(vec![Capability::SendSms], 100),
                NativeCall::Prompt(vec![Capability::CallPhone], 101),
            ]
        );
    }

    #[test]
    fn failed_permission_query_reads_as_not_granted() {
        let platform = RecordingBridge {
            fail_query: true,
            ..RecordingBridge::granted()
        };
        let bridge = bridge_with(&platform);

        assert_eq!(
            bridge.handle(&MethodCall::new("checkPermission")),
            MethodReply::success(false)
        );
        assert_eq!(
            bridge.handle(&MethodCall::new("checkCallPermission")),
            MethodReply::success(false)
        );
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn failed_permission_query_blocks_native_actions() {
        let platform = RecordingBridge {
            fail_query: true,
            ..RecordingBridge::granted()
        };
        let bridge = bridge_with(&platform);

        let reply = bridge.handle(&sms("+15551234567", "hi"));
        assert_eq!(reply.error_code(), Some("PERMISSION_DENIED"));
        let reply = bridge.handle(&MethodCall::new("directCall").with_argument("phone", "+15550001111"));
        assert_eq!(reply.error_code(), Some("PERMISSION_DENIED"));

        // Only prompts were dispatched, never a send or a call.
        assert_eq!(
            platform.calls(),
            vec![
                NativeCall::Prompt(vec![Capability::SendSms], 100),
                NativeCall::Prompt(vec![Capability::CallPhone], 101),
            ]
        );
    }

    #[test]
    fn empty_strings_pass_validation() {
        let denied = bridge_with(&RecordingBridge::default());
        let reply = denied.handle(&sms("", ""));
        assert_eq!(reply.error_code(), Some("PERMISSION_DENIED"));
        let reply = denied.handle(&MethodCall::new("directCall").with_argument("phone", ""));
        assert_eq!(reply.error_code(), Some("PERMISSION_DENIED"));

        let platform = RecordingBridge::granted();
        let granted = bridge_with(&platform);
        assert_eq!(granted.handle(&sms("", "")), MethodReply::success(true));
        assert_eq!(platform.calls(), vec![NativeCall::Sms(String::new(), String::new())]);
    }
}
