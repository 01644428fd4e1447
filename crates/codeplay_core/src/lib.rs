//! CodePlay Core
//!
//! The live-preview model, independent of any UI or script engine:
//! - Source triple, languages and the default templates
//! - Composite document assembly and the render pipeline
//! - Console bridge (cycle-tagged message channel from the preview)
//! - Clock, debounce timers and transient status text
//! - Session state

pub mod console;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod sources;
pub mod status;
pub mod surface;
pub mod templates;
pub mod time;
pub mod timer;

pub use console::{
    BridgeMessage, BridgeSender, ConsoleBridge, ConsoleCounts, ConsoleEntry, ConsoleKind,
    ConsoleLog, CycleId,
};
pub use error::{CoreError, SurfaceError};
pub use pipeline::{RenderOutcome, RenderPipeline};
pub use session::{CursorPosition, SessionState};
pub use sources::{Language, SourceTriple};
pub use status::{SaveStatus, StatusReporter};
pub use surface::{MemorySurface, PreviewSurface};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use timer::Debouncer;

/// Crate version, shown in the CLI banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
