//! Console bridge
//!
//! The preview posts `BridgeMessage`s over a channel; the host drains them
//! into a `ConsoleLog`. Every message carries the render cycle it came from,
//! and anything not from the current cycle is dropped, so a superseded
//! document can never leak entries into the next render.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::debug;

/// Channel tag every bridge message must carry.
pub const BRIDGE_CHANNEL: &str = "codeplay-console";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    Log,
    Error,
    Warn,
    Info,
}

impl ConsoleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleKind::Log => "log",
            ConsoleKind::Error => "error",
            ConsoleKind::Warn => "warn",
            ConsoleKind::Info => "info",
        }
    }
}

impl fmt::Display for ConsoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render cycle identifier. Strictly increasing; `CycleId::NONE` precedes
/// the first render.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CycleId(pub u64);

impl CycleId {
    pub const NONE: CycleId = CycleId(0);

    pub fn next(self) -> CycleId {
        CycleId(self.0 + 1)
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One report posted from the preview to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub channel: String,
    pub cycle: CycleId,
    pub kind: ConsoleKind,
    pub message: String,
}

impl BridgeMessage {
    pub fn new(cycle: CycleId, kind: ConsoleKind, message: impl Into<String>) -> Self {
        Self {
            channel: BRIDGE_CHANNEL.to_string(),
            cycle,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub kind: ConsoleKind,
    pub text: String,
}

impl fmt::Display for ConsoleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str().to_ascii_uppercase(), self.text)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ConsoleCounts {
    pub errors: u32,
    pub warnings: u32,
}

impl ConsoleCounts {
    /// Badge text; empty means the badge is hidden.
    pub fn error_label(&self) -> String {
        match self.errors {
            0 => String::new(),
            n => format!("{n} errors"),
        }
    }

    pub fn warning_label(&self) -> String {
        match self.warnings {
            0 => String::new(),
            n => format!("{n} warnings"),
        }
    }
}

/// Entries and counts of the current render cycle.
#[derive(Debug, Default)]
pub struct ConsoleLog {
    entries: Vec<ConsoleEntry>,
    counts: ConsoleCounts,
    scroll_pending: bool,
}

impl ConsoleLog {
    pub fn clear(&mut self) {
        self.entries.clear();
        self.counts = ConsoleCounts::default();
        self.scroll_pending = false;
    }

    pub fn push(&mut self, kind: ConsoleKind, text: impl Into<String>) {
        match kind {
            ConsoleKind::Error => self.counts.errors += 1,
            ConsoleKind::Warn => self.counts.warnings += 1,
            ConsoleKind::Log | ConsoleKind::Info => {}
        }
        self.entries.push(ConsoleEntry {
            kind,
            text: text.into(),
        });
        self.scroll_pending = true;
    }

    pub fn entries(&self) -> &[ConsoleEntry] {
        &self.entries
    }

    pub fn counts(&self) -> ConsoleCounts {
        self.counts
    }

    pub fn latest(&self) -> Option<&ConsoleEntry> {
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` once after new entries arrived; the view should scroll
    /// to `latest()`.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }
}

/// Sending half handed to a preview surface.
#[derive(Debug, Clone)]
pub struct BridgeSender {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl BridgeSender {
    pub fn post(&self, message: BridgeMessage) {
        // The receiver lives as long as the bridge; a closed channel only
        // happens during teardown.
        if self.tx.send(message).is_err() {
            debug!("console bridge closed, report dropped");
        }
    }

    /// Posts a raw JSON report as produced by the preview's bootstrap script.
    /// Anything that does not parse as a bridge message is ignored.
    pub fn post_json(&self, raw: &str) -> bool {
        match serde_json::from_str::<BridgeMessage>(raw) {
            Ok(message) => {
                self.post(message);
                true
            }
            Err(err) => {
                debug!(%err, "ignoring malformed bridge message");
                false
            }
        }
    }
}

/// Host side of the bridge: owns the channel, the current cycle and the log.
#[derive(Debug)]
pub struct ConsoleBridge {
    cycle: CycleId,
    log: ConsoleLog,
    tx: mpsc::UnboundedSender<BridgeMessage>,
    rx: mpsc::UnboundedReceiver<BridgeMessage>,
    discarded: u64,
}

impl ConsoleBridge {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cycle: CycleId::NONE,
            log: ConsoleLog::default(),
            tx,
            rx,
            discarded: 0,
        }
    }

    /// The single intake the preview posts to.
    pub fn intake(&self) -> BridgeSender {
        BridgeSender {
            tx: self.tx.clone(),
        }
    }

    /// Starts a new cycle: clears entries and counts, and from now on only
    /// accepts reports tagged `cycle`.
    pub fn begin_cycle(&mut self, cycle: CycleId) {
        self.cycle = cycle;
        self.log.clear();
    }

    pub fn current_cycle(&self) -> CycleId {
        self.cycle
    }

    /// Applies one report. Returns `false` if it was discarded.
    pub fn report(&mut self, message: BridgeMessage) -> bool {
        if message.channel != BRIDGE_CHANNEL {
            debug!(channel = %message.channel, "ignoring report on foreign channel");
            self.discarded += 1;
            return false;
        }
        if message.cycle != self.cycle {
            debug!(
                stale = %message.cycle,
                current = %self.cycle,
                kind = %message.kind,
                "discarding report from superseded render"
            );
            self.discarded += 1;
            return false;
        }
        self.log.push(message.kind, message.message);
        true
    }

    /// Parses and applies a raw JSON report.
    pub fn intake_json(&mut self, raw: &str) -> bool {
        match serde_json::from_str::<BridgeMessage>(raw) {
            Ok(message) => self.report(message),
            Err(err) => {
                debug!(%err, "ignoring malformed bridge message");
                false
            }
        }
    }

    /// Moves everything posted so far into the log. Returns how many were
    /// accepted.
    pub fn drain(&mut self) -> usize {
        let mut accepted = 0;
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if self.report(message) {
                        accepted += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        accepted
    }

    pub fn log(&self) -> &ConsoleLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ConsoleLog {
        &mut self.log
    }

    pub fn entries(&self) -> &[ConsoleEntry] {
        self.log.entries()
    }

    pub fn counts(&self) -> ConsoleCounts {
        self.log.counts()
    }

    /// Reports dropped as stale or foreign since creation.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl Default for ConsoleBridge {
    fn default() -> Self {
        Self::new()
    }
}
