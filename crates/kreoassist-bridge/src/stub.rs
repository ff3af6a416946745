// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// No capability is ever granted and every native action returns
// `PlatformUnavailable`. The real implementation lives in the `android` module.

use kreoassist_core::error::{KreoError, Result};
use kreoassist_core::types::Capability;

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativePermissions for StubBridge {
    fn is_granted(&self, _capability: Capability) -> Result<bool> {
        Ok(false)
    }

    fn request_permissions(&self, capabilities: &[Capability], request_code: i32) -> Result<()> {
        tracing::warn!(
            ?capabilities,
            request_code,
            "NativePermissions::request_permissions called on stub bridge"
        );
        Err(KreoError::PlatformUnavailable)
    }
}

impl NativeSms for StubBridge {
    fn send_text(&self, _phone: &str, _message: &str) -> Result<()> {
        tracing::warn!("NativeSms::send_text called on stub bridge");
        Err(KreoError::PlatformUnavailable)
    }
}

impl NativeDialer for StubBridge {
    fn place_call(&self, _phone: &str) -> Result<()> {
        tracing::warn!("NativeDialer::place_call called on stub bridge");
        Err(KreoError::PlatformUnavailable)
    }
}
