// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// KreoAssist — method-channel capability bridge.
//
// Turns named requests from the shell into permission checks and native
// telephony actions, one synchronous reply per request. Permission prompts
// are tracked separately and their outcomes published out of band.

pub mod codec;
pub mod dispatch;
pub mod permissions;

#[cfg(target_os = "android")]
mod android;

pub use dispatch::CapabilityBridge;
pub use permissions::{PermissionTicket, PermissionTracker};
