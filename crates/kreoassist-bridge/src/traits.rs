// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.
//
// The OS owns permission state, SMS delivery and call placement. These traits
// are the only way the dispatcher touches any of them, which keeps the
// dispatcher testable against a recording double.

use kreoassist_core::error::Result;
use kreoassist_core::types::Capability;

/// Unified bridge that groups all native capabilities.
///
/// Implementations must be shareable across threads: the JNI entry points may
/// be invoked from whichever Java thread the host uses.
pub trait PlatformBridge: NativePermissions + NativeSms + NativeDialer + Send + Sync {
    /// Human-readable platform name (e.g. "Android").
    fn platform_name(&self) -> &str;
}

/// Runtime permission queries and prompts.
pub trait NativePermissions {
    /// Whether the OS currently grants `capability`. Read fresh on every call.
    fn is_granted(&self, capability: Capability) -> Result<bool>;

    /// Ask the OS to prompt for `capabilities`.
    ///
    /// Returns once the prompt has been dispatched. The user's decision
    /// arrives later, tagged with `request_code`, through the host's
    /// permission-result callback.
    fn request_permissions(&self, capabilities: &[Capability], request_code: i32) -> Result<()>;
}

/// Outgoing text messages.
pub trait NativeSms {
    /// Hand `message` to the OS for delivery to `phone`.
    ///
    /// Splitting into multiple SMS segments is the OS's job. There is no
    /// delivery confirmation.
    fn send_text(&self, phone: &str, message: &str) -> Result<()>;
}

/// Outgoing phone calls.
pub trait NativeDialer {
    /// Launch the OS call UI dialing `phone` directly.
    fn place_call(&self, phone: &str) -> Result<()>;
}
