//! Preview surfaces
//!
//! A surface is wherever the composite document ends up: a browser frame, an
//! embedded script sandbox, or a recorder in tests. Loading always replaces
//! the entire prior content.

use crate::console::{BridgeSender, CycleId};
use crate::error::SurfaceError;

pub trait PreviewSurface {
    /// Replaces the surface content with `document`. Reports raised while the
    /// document runs go to `bridge`, tagged with `cycle` by the document's own
    /// bootstrap script.
    fn load(
        &mut self,
        document: &str,
        cycle: CycleId,
        bridge: &BridgeSender,
    ) -> Result<(), SurfaceError>;

    fn name(&self) -> &str {
        "preview"
    }
}

impl<S: PreviewSurface + ?Sized> PreviewSurface for Box<S> {
    fn load(
        &mut self,
        document: &str,
        cycle: CycleId,
        bridge: &BridgeSender,
    ) -> Result<(), SurfaceError> {
        (**self).load(document, cycle, bridge)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Keeps the loaded document without executing it.
#[derive(Debug, Default)]
pub struct MemorySurface {
    current: Option<String>,
    loads: usize,
    fail_next: Option<String>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document currently shown.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Makes the next `load` fail with `reason`.
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }
}

impl PreviewSurface for MemorySurface {
    fn load(
        &mut self,
        document: &str,
        _cycle: CycleId,
        _bridge: &BridgeSender,
    ) -> Result<(), SurfaceError> {
        if let Some(reason) = self.fail_next.take() {
            return Err(SurfaceError::Rejected(reason));
        }
        self.current = Some(document.to_string());
        self.loads += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
