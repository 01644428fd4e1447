//! QuickJS-backed preview surface
//!
//! Runs a composite document the way a browser frame would, minus layout:
//! inline scripts execute in order, uncaught errors become `error` events,
//! `DOMContentLoaded`/`load` fire after the last script, timers run in
//! virtual time, and unhandled promise rejections become
//! `unhandledrejection` events. The document's own bootstrap forwards all of
//! that to the host through `window.parent.postMessage`.

use codeplay_core::{BridgeSender, CycleId, PreviewSurface, SurfaceError};
use rquickjs::{Ctx, Function, Value};
use tracing::{debug, trace};

use crate::extract::extract_scripts;
use crate::runtime::{SandboxLimits, ScriptError, ScriptRuntime};

const SHIM: &str = include_str!("shim.js");

const POST_HOOK: &str = "__codeplayPost";
const TRACE_HOOK: &str = "__codeplayTrace";
const DOM_READY: &str = "__codeplayDomReady";
const RUN_NEXT_TIMER: &str = "__codeplayRunNextTimer";
const DISPATCH_ERROR: &str = "__codeplayDispatchError";
const TRACK_REJECTION: &str = "__codeplayTrackRejection";
const FLUSH_REJECTIONS: &str = "__codeplayFlushRejections";

/// Timer callbacks run per load before the rest are dropped.
const MAX_TIMER_RUNS: usize = 1_000;

pub struct QuickJsSurface {
    limits: SandboxLimits,
    current: Option<ScriptRuntime>,
    loads: usize,
    last_cycle: CycleId,
}

impl QuickJsSurface {
    pub fn new(limits: SandboxLimits) -> Self {
        Self {
            limits,
            current: None,
            loads: 0,
            last_cycle: CycleId::NONE,
        }
    }

    pub fn limits(&self) -> SandboxLimits {
        self.limits
    }

    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Runtime of the document currently loaded, kept alive so the page
    /// stays inspectable until the next load.
    pub fn runtime(&self) -> Option<&ScriptRuntime> {
        self.current.as_ref()
    }

    /// Cycle of the document currently loaded.
    pub fn last_cycle(&self) -> CycleId {
        self.last_cycle
    }

    fn run_document(&self, runtime: &ScriptRuntime, document: &str) -> Result<(), ScriptError> {
        let extraction = extract_scripts(document);
        for skipped in &extraction.skipped {
            debug!(?skipped, "script not executed in sandbox");
        }

        for script in &extraction.scripts {
            if let Err(err) = runtime.execute(&script.source) {
                runtime.check_budget()?;
                page_error(runtime, err, script.offset)?;
            }
            settle(runtime)?;
        }

        runtime.call_function(DOM_READY)?;
        settle(runtime)?;

        let mut runs = 0;
        while runs < MAX_TIMER_RUNS && runtime.call_predicate(RUN_NEXT_TIMER)? {
            runs += 1;
            settle(runtime)?;
        }
        runtime.check_budget()?;
        if runs == MAX_TIMER_RUNS {
            debug!(runs, "timer limit reached, remaining timers dropped");
        }
        Ok(())
    }
}

impl Default for QuickJsSurface {
    fn default() -> Self {
        Self::new(SandboxLimits::default())
    }
}

impl PreviewSurface for QuickJsSurface {
    fn load(
        &mut self,
        document: &str,
        cycle: CycleId,
        bridge: &BridgeSender,
    ) -> Result<(), SurfaceError> {
        // The previous document is gone before the new one starts.
        self.current = None;

        let runtime = ScriptRuntime::new(self.limits).map_err(sandbox_error)?;
        install_host(&runtime, bridge.clone()).map_err(sandbox_error)?;
        runtime.execute(SHIM).map_err(sandbox_error)?;

        self.run_document(&runtime, document).map_err(sandbox_error)?;

        self.current = Some(runtime);
        self.loads += 1;
        self.last_cycle = cycle;
        Ok(())
    }

    fn name(&self) -> &str {
        "quickjs"
    }
}

fn install_host(runtime: &ScriptRuntime, bridge: BridgeSender) -> Result<(), ScriptError> {
    runtime.runtime().set_host_promise_rejection_tracker(Some(Box::new(track_rejection)));

    runtime.context.with(|ctx| {
        let post = Function::new(ctx.clone(), move |raw: String| {
            bridge.post_json(&raw);
        })?;
        ctx.globals().set(POST_HOOK, post)?;

        let host_trace = Function::new(ctx.clone(), |kind: String, text: String| {
            trace!(target: "codeplay::preview", %kind, "{text}");
        })?;
        ctx.globals().set(TRACE_HOOK, host_trace)?;
        Ok::<_, rquickjs::Error>(())
    })?;
    Ok(())
}

fn track_rejection<'js>(ctx: Ctx<'js>, promise: Value<'js>, reason: Value<'js>, is_handled: bool) {
    let tracked = ctx
        .globals()
        .get::<_, Function>(TRACK_REJECTION)
        .and_then(|track| track.call::<_, ()>((promise, reason, is_handled)));
    if tracked.is_err() {
        // Only possible before the shim is installed.
        let _ = ctx.catch();
    }
}

/// Drains promise jobs, then reports rejections nobody handled.
fn settle(runtime: &ScriptRuntime) -> Result<(), ScriptError> {
    runtime.check_budget()?;
    for failure in runtime.run_pending_jobs() {
        runtime.call_function_with(DISPATCH_ERROR, &failure)?;
    }
    runtime.call_function(FLUSH_REJECTIONS)?;
    // Rejection listeners may queue more work.
    for failure in runtime.run_pending_jobs() {
        runtime.call_function_with(DISPATCH_ERROR, &failure)?;
    }
    Ok(())
}

/// An uncaught exception at the top level of a script fires the page's
/// `error` event, as a browser does. Engine failures abort the load.
fn page_error(runtime: &ScriptRuntime, err: ScriptError, offset: usize) -> Result<(), ScriptError> {
    match err {
        ScriptError::Exception(message) => {
            debug!(offset, %message, "uncaught exception in preview script");
            runtime.call_function_with(DISPATCH_ERROR, &message)
        }
        engine => Err(engine),
    }
}

fn sandbox_error(err: ScriptError) -> SurfaceError {
    SurfaceError::Sandbox(err.to_string())
}
