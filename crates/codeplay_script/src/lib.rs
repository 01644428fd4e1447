//! CodePlay Script Sandbox
//!
//! Headless preview surface backed by QuickJS.
//!
//! ## Architecture
//!
//! - **Runtime:** one fresh QuickJS runtime per loaded document, with a
//!   memory limit and a wall-clock budget enforced by an interrupt handler
//! - **Shim:** a minimal `window`/`document`/`console`/timer environment so
//!   preview scripts run outside a browser (there is no DOM tree)
//! - **Bridge:** `window.parent.postMessage` is wired to the host's console
//!   bridge as JSON, exactly what a browser frame would post

pub mod extract;
pub mod runtime;
pub mod surface;

pub use runtime::{SandboxLimits, ScriptError, ScriptRuntime};
pub use surface::QuickJsSurface;

pub use rquickjs;
