// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What to report when the OS throws while sending or dialing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeFailurePolicy {
    /// Return a `NATIVE_FAILURE` error to the shell.
    #[default]
    Report,
    /// Log the failure and still answer `true` (legacy behaviour).
    Swallow,
}

/// Settings for the capability bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Method channel name the shell binds to.
    pub channel_name: String,
    /// Lowest request code handed to `requestPermissions`.
    pub first_request_code: u16,
    /// Handling of exceptions raised by the native send / call step.
    pub native_failure_policy: NativeFailurePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: "com.kreoassist/sms".into(),
            first_request_code: 100,
            native_failure_policy: NativeFailurePolicy::Report,
        }
    }
}

impl BridgeConfig {
    /// Load settings from a JSON file, falling back to defaults when the file
    /// does not exist. Omitted fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parse settings handed over as a JSON string by the host activity.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
