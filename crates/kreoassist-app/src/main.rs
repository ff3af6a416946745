// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// KreoAssist — method-channel replay harness.
//
// Reads one request envelope per line from stdin, dispatches it against the
// platform bridge (the stub bridge off-device) and writes one reply envelope
// per line to stdout. Logs go to stderr.
//
//   kreoassist [bridge-config.json] < requests.jsonl

use std::io::{self, BufRead, Write};

use kreoassist_bridge::platform_bridge;
use kreoassist_channel::CapabilityBridge;
use kreoassist_core::error::Result;
use kreoassist_core::BridgeConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "replay aborted");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    let bridge = CapabilityBridge::new(platform_bridge(), config);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(out, "{}", bridge.handle_json(&line))?;
    }
    out.flush()?;
    Ok(())
}
