// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Permission request correlation.
//
// Every prompt gets its own request code and correlation id instead of a
// fixed per-capability constant. When the host forwards the OS answer, the
// request code is looked up here and one `PermissionOutcome` per requested
// capability is published to subscribers.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use kreoassist_core::types::{Capability, CorrelationId, PermissionOutcome};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Highest request code Android accepts (`requestPermissions` only keeps the
/// lower 16 bits).
pub const MAX_REQUEST_CODE: i32 = 0xFFFF;

/// Buffered outcomes per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 32;

/// An authorization request that has been handed to the OS and not yet
/// answered.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionTicket {
    pub correlation_id: CorrelationId,
    pub request_code: i32,
    pub capabilities: Vec<Capability>,
    pub issued_at: DateTime<Utc>,
}

struct TrackerState {
    next_code: i32,
    pending: HashMap<i32, PermissionTicket>,
}

/// Allocates request codes and matches OS answers back to their requests.
pub struct PermissionTracker {
    first_code: i32,
    state: Mutex<TrackerState>,
    events: broadcast::Sender<PermissionOutcome>,
}

impl PermissionTracker {
    /// Create a tracker handing out codes in `first_code..=MAX_REQUEST_CODE`.
    pub fn new(first_code: u16) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let first_code = i32::from(first_code);
        Self {
            first_code,
            state: Mutex::new(TrackerState {
                next_code: first_code,
                pending: HashMap::new(),
            }),
            events,
        }
    }

    /// Receive every outcome published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PermissionOutcome> {
        self.events.subscribe()
    }

    /// Open a ticket for `capabilities` under a fresh request code.
    ///
    /// Codes still pending are skipped. If the whole range is pending the
    /// next code in turn is reused and its old ticket dropped.
    pub fn register(&self, capabilities: &[Capability]) -> PermissionTicket {
        let mut state = self.lock();
        let span = MAX_REQUEST_CODE - self.first_code + 1;

        let mut code = state.next_code;
        for _ in 0..span {
            if !state.pending.contains_key(&code) {
                break;
            }
            code = self.advance(code);
        }
        state.next_code = self.advance(code);

        let ticket = PermissionTicket {
            correlation_id: CorrelationId::new(),
            request_code: code,
            capabilities: capabilities.to_vec(),
            issued_at: Utc::now(),
        };
        if let Some(stale) = state.pending.insert(code, ticket.clone()) {
            warn!(
                request_code = code,
                correlation_id = %stale.correlation_id,
                "request code range exhausted, dropping oldest pending permission request"
            );
        }

        debug!(
            request_code = code,
            correlation_id = %ticket.correlation_id,
            ?capabilities,
            "permission request registered"
        );
        ticket
    }

    /// Forget a ticket whose prompt never reached the OS.
    pub fn withdraw(&self, request_code: i32) -> Option<PermissionTicket> {
        self.lock().pending.remove(&request_code)
    }

    /// Match an OS answer to its ticket and publish the outcomes.
    ///
    /// Capabilities the OS did not report on (an interrupted prompt delivers
    /// empty arrays) count as denied. Results for capabilities that were not
    /// part of the request are ignored. Unknown codes yield nothing.
    pub fn resolve(&self, request_code: i32, results: &[(Capability, bool)]) -> Vec<PermissionOutcome> {
        let Some(ticket) = self.lock().pending.remove(&request_code) else {
            warn!(request_code, "permission result for unknown request code ignored");
            return Vec::new();
        };

        let outcomes: Vec<PermissionOutcome> = ticket
            .capabilities
            .iter()
            .map(|&capability| PermissionOutcome {
                correlation_id: ticket.correlation_id,
                request_code,
                capability,
                granted: results
                    .iter()
                    .find(|(cap, _)| *cap == capability)
                    .is_some_and(|&(_, granted)| granted),
            })
            .collect();

        let waited_ms = (Utc::now() - ticket.issued_at).num_milliseconds();
        for outcome in &outcomes {
            info!(
                request_code,
                waited_ms,
                correlation_id = %outcome.correlation_id,
                capability = %outcome.capability,
                granted = outcome.granted,
                "permission prompt answered"
            );
            // No subscribers is fine; the host also gets the outcomes back
            // from this call.
            let _ = self.events.send(outcome.clone());
        }
        outcomes
    }

    /// Number of prompts still awaiting an answer.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn advance(&self, code: i32) -> i32 {
        if code >= MAX_REQUEST_CODE {
            self.first_code
        } else {
            code + 1
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
