// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! KreoAssist — Native platform bridge abstractions.
//!
//! This crate defines the traits through which the method-channel dispatcher
//! reaches the OS telephony and permission services, plus the platform
//! implementations of those traits. Android goes through JNI; every other
//! target gets a stub so the dispatcher can be built and tested on desktop/CI.

pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

/// Retrieves the bridge implementation for the target operating system.
pub fn platform_bridge() -> Box<dyn traits::PlatformBridge> {
    #[cfg(target_os = "android")]
    {
        // Android: Uses `jni-rs` to invoke methods on the JVM/ART.
        Box::new(android::AndroidBridge::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        // DESKTOP/CI: Uses a mock implementation to allow non-native builds.
        Box::new(stub::StubBridge)
    }
}
