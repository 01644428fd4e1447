//! Render pipeline
//!
//! `render` turns the current sources into a composite document, starts a new
//! console cycle and hands the document to the preview surface. Surface
//! failures are reported to the console of the same cycle and never abort the
//! pipeline.

use codeplay_metrics::RenderTimer;
use tracing::{debug, info, warn};

use crate::console::{BridgeMessage, ConsoleBridge, ConsoleKind, CycleId};
use crate::document::{self, BLANK_DOCUMENT};
use crate::sources::SourceTriple;
use crate::status::{self, StatusReporter};
use crate::surface::PreviewSurface;
use crate::time::Timestamp;

/// Prefix that marks render failures in the console.
pub const RENDER_FAILURE_PREFIX: &str = "Failed to render: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { cycle: CycleId },
    Failed { cycle: CycleId, reason: String },
}

impl RenderOutcome {
    pub fn cycle(&self) -> CycleId {
        match self {
            RenderOutcome::Rendered { cycle } | RenderOutcome::Failed { cycle, .. } => *cycle,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Rendered { .. })
    }
}

pub struct RenderPipeline<S: PreviewSurface> {
    surface: S,
    bridge: ConsoleBridge,
    cycle: CycleId,
    last_document: Option<String>,
    timer: RenderTimer,
}

impl<S: PreviewSurface> RenderPipeline<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            bridge: ConsoleBridge::new(),
            cycle: CycleId::NONE,
            last_document: None,
            timer: RenderTimer::default(),
        }
    }

    /// Renders `sources` as a new cycle.
    ///
    /// Counts and entries from the previous cycle are gone before the surface
    /// sees the new document; reports still in flight from the old document
    /// are discarded by cycle id.
    pub fn render(
        &mut self,
        sources: &SourceTriple,
        status: &mut StatusReporter,
        now: Timestamp,
    ) -> RenderOutcome {
        let cycle = self.begin_cycle();
        let composite = document::build_composite(sources, cycle);
        debug!(%cycle, bytes = composite.len(), surface = self.surface.name(), "rendering");

        let outcome = self.load(&composite, cycle);
        self.last_document = Some(composite);

        match &outcome {
            RenderOutcome::Rendered { .. } => {
                status.show(now, status::RENDERED);
                info!(%cycle, entries = self.bridge.entries().len(), "render complete");
            }
            RenderOutcome::Failed { reason, .. } => {
                warn!(%cycle, %reason, "render failed");
            }
        }
        outcome
    }

    /// Clears the preview to a blank page as a new cycle.
    pub fn hard_refresh(&mut self, status: &mut StatusReporter, now: Timestamp) -> RenderOutcome {
        let cycle = self.begin_cycle();
        let outcome = self.load(BLANK_DOCUMENT, cycle);
        self.last_document = Some(BLANK_DOCUMENT.to_string());
        if outcome.is_success() {
            status.show(now, status::REFRESHED);
        }
        outcome
    }

    /// Moves late reports from the surface into the console. Reports from a
    /// superseded cycle are dropped.
    pub fn pump(&mut self) -> usize {
        self.bridge.drain()
    }

    fn begin_cycle(&mut self) -> CycleId {
        // Anything queued now belongs to an older cycle.
        self.bridge.drain();
        self.cycle = self.cycle.next();
        self.bridge.begin_cycle(self.cycle);
        self.cycle
    }

    fn load(&mut self, composite: &str, cycle: CycleId) -> RenderOutcome {
        let sender = self.bridge.intake();

        self.timer.begin();
        let result = self.surface.load(composite, cycle, &sender);
        self.timer.end();

        let outcome = match result {
            Ok(()) => RenderOutcome::Rendered { cycle },
            Err(err) => {
                let reason = err.to_string();
                // Whatever the document posted before failing comes first.
                self.bridge.drain();
                self.bridge.report(BridgeMessage::new(
                    cycle,
                    ConsoleKind::Error,
                    format!("{RENDER_FAILURE_PREFIX}{reason}"),
                ));
                RenderOutcome::Failed { cycle, reason }
            }
        };
        self.bridge.drain();
        outcome
    }

    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    pub fn console(&self) -> &ConsoleBridge {
        &self.bridge
    }

    pub fn console_mut(&mut self) -> &mut ConsoleBridge {
        &mut self.bridge
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The document most recently written to the surface.
    pub fn last_document(&self) -> Option<&str> {
        self.last_document.as_deref()
    }

    pub fn timings(&self) -> &RenderTimer {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{BridgeSender, ConsoleCounts};
    use crate::error::SurfaceError;
    use crate::surface::MemorySurface;

    fn pipeline() -> (RenderPipeline<MemorySurface>, StatusReporter) {
        (RenderPipeline::new(MemorySurface::new()), StatusReporter::default())
    }

    #[test]
    fn test_render_writes_whole_document() {
        let (mut pipeline, mut status) = pipeline();
        let sources = SourceTriple::new("<p>one</p>", "", "");

        let outcome = pipeline.render(&sources, &mut status, Timestamp::ZERO);
        assert_eq!(outcome, RenderOutcome::Rendered { cycle: CycleId(1) });
        assert_eq!(status.text(), status::RENDERED);

        let shown = pipeline.surface().current().unwrap();
        assert!(shown.contains("<p>one</p>"));
        assert_eq!(Some(shown), pipeline.last_document());

        pipeline.render(&SourceTriple::new("<p>two</p>", "", ""), &mut status, Timestamp::ZERO);
        let shown = pipeline.surface().current().unwrap();
        assert!(shown.contains("<p>two</p>"));
        assert!(!shown.contains("<p>one</p>"));
        assert_eq!(pipeline.surface().loads(), 2);
    }

    #[test]
    fn test_render_resets_counts_and_entries() {
        let (mut pipeline, mut status) = pipeline();
        let sources = SourceTriple::new("", "", "");
        pipeline.render(&sources, &mut status, Timestamp::ZERO);

        let sender = pipeline.console().intake();
        sender.post(BridgeMessage::new(CycleId(1), ConsoleKind::Error, "e"));
        sender.post(BridgeMessage::new(CycleId(1), ConsoleKind::Warn, "w"));
        pipeline.pump();
        assert_eq!(pipeline.console().counts(), ConsoleCounts { errors: 1, warnings: 1 });

        pipeline.render(&sources, &mut status, Timestamp::ZERO);
        assert_eq!(pipeline.console().counts(), ConsoleCounts::default());
        assert!(pipeline.console().entries().is_empty());
    }

    #[test]
    fn test_late_report_from_old_cycle_is_ignored() {
        let (mut pipeline, mut status) = pipeline();
        let sources = SourceTriple::new("", "", "");
        pipeline.render(&sources, &mut status, Timestamp::ZERO);
        let old_sender = pipeline.console().intake();

        pipeline.render(&sources, &mut status, Timestamp::ZERO);
        old_sender.post(BridgeMessage::new(CycleId(1), ConsoleKind::Error, "late"));

        assert_eq!(pipeline.pump(), 0);
        assert_eq!(pipeline.console().counts().errors, 0);
        assert_eq!(pipeline.console().discarded(), 1);
    }

    #[test]
    fn test_surface_failure_becomes_console_error() {
        let (mut pipeline, mut status) = pipeline();
        pipeline.surface_mut().fail_next("frame detached");

        let outcome = pipeline.render(&SourceTriple::default(), &mut status, Timestamp::ZERO);
        assert!(!outcome.is_success());
        assert_eq!(status.text(), status::READY);

        let entries = pipeline.console().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ConsoleKind::Error);
        assert!(entries[0].text.starts_with(RENDER_FAILURE_PREFIX));
        assert!(entries[0].text.contains("frame detached"));

        // The next render works again.
        assert!(pipeline.render(&SourceTriple::default(), &mut status, Timestamp::ZERO).is_success());
    }

    /// Posts one log line, then fails the load.
    struct LogThenFail;

    impl PreviewSurface for LogThenFail {
        fn load(
            &mut self,
            _document: &str,
            cycle: CycleId,
            bridge: &BridgeSender,
        ) -> Result<(), SurfaceError> {
            bridge.post(BridgeMessage::new(cycle, ConsoleKind::Log, "before"));
            Err(SurfaceError::Sandbox("time budget exceeded".to_string()))
        }
    }

    #[test]
    fn test_failure_entry_follows_earlier_reports() {
        let mut pipeline = RenderPipeline::new(LogThenFail);
        let mut status = StatusReporter::default();
        let outcome = pipeline.render(&SourceTriple::default(), &mut status, Timestamp::ZERO);
        assert!(!outcome.is_success());

        let entries = pipeline.console().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].kind, entries[0].text.as_str()), (ConsoleKind::Log, "before"));
        assert_eq!(entries[1].kind, ConsoleKind::Error);
        assert!(entries[1].text.starts_with(RENDER_FAILURE_PREFIX));
    }

    #[test]
    fn test_hard_refresh_loads_blank_page() {
        let (mut pipeline, mut status) = pipeline();
        pipeline.render(&SourceTriple::default(), &mut status, Timestamp::ZERO);
        let outcome = pipeline.hard_refresh(&mut status, Timestamp::ZERO);

        assert_eq!(outcome.cycle(), CycleId(2));
        assert_eq!(pipeline.surface().current(), Some(BLANK_DOCUMENT));
        assert_eq!(status.text(), status::REFRESHED);
    }
}
