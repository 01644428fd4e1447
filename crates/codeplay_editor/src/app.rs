//! Session controller
//!
//! `App` owns one editing session: the sources, the render pipeline, both
//! debouncers and the two status lines. It is plain data driven by its
//! caller; nothing happens between calls. A front end forwards edits to
//! `edit` and calls `tick` whenever `next_deadline` passes.

use std::io::{Seek, Write};

use tracing::{debug, info, warn};
use url::Url;

use codeplay_core::status::{self, SaveStatus, StatusReporter};
use codeplay_core::{
    Clock, ConsoleBridge, CursorPosition, Debouncer, Language, PreviewSurface, RenderOutcome,
    RenderPipeline, SessionState, SourceTriple, Timestamp,
};
use codeplay_metrics::Counter;
use codeplay_services::settings::Settings;
use codeplay_services::share::{self, ShareLoad};
use codeplay_services::storage::{self, KeyValueStore};
use codeplay_services::{export, ServiceError, ShareError};

/// Where the session's first sources came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupSource {
    SharedUrl,
    Snapshot,
    Defaults,
}

/// What one `tick` did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub rendered: Option<RenderOutcome>,
    pub autosaved: bool,
    /// Console entries that arrived since the last tick.
    pub new_entries: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.rendered.is_none() && !self.autosaved && self.new_entries == 0
    }
}

pub struct App<S, K, C>
where
    S: PreviewSurface,
    K: KeyValueStore,
    C: Clock,
{
    clock: C,
    settings: Settings,
    session: SessionState,
    pipeline: RenderPipeline<S>,
    store: K,
    render_debounce: Debouncer,
    autosave_debounce: Debouncer,
    status: StatusReporter,
    save_status: SaveStatus,
    page_url: Option<Url>,
    counters: Counter,
}

impl<S, K, C> App<S, K, C>
where
    S: PreviewSurface,
    K: KeyValueStore,
    C: Clock,
{
    pub fn new(surface: S, store: K, clock: C, settings: Settings) -> Self {
        let timing = &settings.timing;
        let mut session = SessionState::default();
        session.theme = settings.editor.theme.clone();
        session.font_size = settings.editor.font_size;

        Self {
            render_debounce: Debouncer::new(timing.render_debounce()),
            autosave_debounce: Debouncer::new(timing.autosave_debounce()),
            status: StatusReporter::new(timing.status_revert()),
            save_status: SaveStatus::new(timing.save_status_revert()),
            clock,
            session,
            pipeline: RenderPipeline::new(surface),
            store,
            page_url: None,
            counters: Counter::new(),
            settings,
        }
    }

    /// Loads the first sources and schedules the initial render.
    ///
    /// A project in `page_url` wins over the saved snapshot, which wins over
    /// the defaults. An unreadable shared project shows `Invalid shared code`
    /// and falls through to the snapshot.
    pub fn start(&mut self, page_url: Option<Url>) -> StartupSource {
        let now = self.clock.now();
        let mut source = StartupSource::Defaults;
        let mut sources = None;

        if let Some(url) = &page_url {
            match share::load_from_url(url) {
                ShareLoad::Loaded(shared) => {
                    sources = Some(shared);
                    source = StartupSource::SharedUrl;
                    self.status.show(now, status::LOADED_FROM_URL);
                }
                ShareLoad::Invalid(_) => self.status.show(now, status::INVALID_SHARE),
                ShareLoad::Absent => {}
            }
        }

        if sources.is_none() {
            sources = storage::load_autosave_under(&self.store, &self.settings.storage.autosave_key);
            if sources.is_some() {
                source = StartupSource::Snapshot;
            }
        }

        self.session.replace_sources(sources.unwrap_or_default());
        self.session.mark_saved();
        self.page_url = page_url;

        let delay = self.settings.timing.initial_render_delay();
        self.render_debounce.schedule_at(now + delay);
        info!(?source, "session started");
        source
    }

    /// Applies an editor change. Unchanged text is not an edit.
    pub fn edit(&mut self, language: Language, text: impl Into<String>) -> bool {
        if !self.session.apply_edit(language, text) {
            return false;
        }
        let now = self.clock.now();
        self.render_debounce.trigger(now);
        self.autosave_debounce.trigger(now);
        debug!(%language, "edit");
        true
    }

    /// Fires every timer that is due and collects late console reports.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();

        self.status.tick(now);
        self.save_status.tick(now);

        if self.render_debounce.fire_if_due(now) {
            debug!("render debounce fired");
            report.rendered = Some(self.render_at(now));
        }

        if self.autosave_debounce.fire_if_due(now) {
            report.autosaved = self.autosave_at(now).is_ok();
        }

        report.new_entries = self.pipeline.pump();
        report
    }

    /// Renders right away. A pending debounced render is dropped.
    pub fn run(&mut self) -> RenderOutcome {
        let now = self.clock.now();
        self.render_debounce.cancel();
        self.render_at(now)
    }

    /// Moves late console reports into the log.
    pub fn pump_console(&mut self) -> usize {
        self.pipeline.pump()
    }

    /// Restores the default sources and renders them.
    pub fn reset(&mut self) -> RenderOutcome {
        let now = self.clock.now();
        let defaults = SourceTriple::default();
        let mut changed = false;
        for (language, text) in defaults.iter() {
            changed |= self.session.apply_edit(language, text);
        }
        if changed {
            self.autosave_debounce.trigger(now);
        }
        info!("sources reset to defaults");
        self.run()
    }

    /// Loads a blank page and clears the console.
    pub fn hard_refresh(&mut self) -> RenderOutcome {
        let now = self.clock.now();
        self.render_debounce.cancel();
        self.pipeline.hard_refresh(&mut self.status, now)
    }

    /// A link that reopens the current project.
    pub fn share_url(&mut self) -> Result<Url, ShareError> {
        let now = self.clock.now();
        let result = self
            .share_base()
            .and_then(|base| share::build_share_url(&base, &self.session.sources));
        match &result {
            Ok(url) => {
                self.status.show(now, status::SHARE_READY);
                debug!(len = url.as_str().len(), "share link ready");
            }
            Err(err) => {
                self.status.show(now, status::SHARE_FAILED);
                warn!(%err, "share link failed");
            }
        }
        result
    }

    /// Replaces the sources with the project in `url` and renders it. An
    /// unreadable project leaves the current sources alone.
    pub fn load_shared(&mut self, url: &Url) -> ShareLoad {
        let now = self.clock.now();
        let loaded = share::load_from_url(url);
        match &loaded {
            ShareLoad::Loaded(sources) => {
                self.session.replace_sources(sources.clone());
                self.run();
                self.status.show(now, status::LOADED_FROM_URL);
            }
            ShareLoad::Invalid(_) => self.status.show(now, status::INVALID_SHARE),
            ShareLoad::Absent => {}
        }
        loaded
    }

    /// Writes the project archive. Success clears the unsaved flag.
    pub fn export_to<W: Write + Seek>(&mut self, writer: W) -> Result<W, ServiceError> {
        let now = self.clock.now();
        match export::export_zip(&self.session.sources, writer) {
            Ok(writer) => {
                self.session.mark_saved();
                self.status.show(now, status::EXPORTED);
                self.counters.increment("exports", 1);
                Ok(writer)
            }
            Err(err) => {
                self.status.show(now, status::EXPORT_FAILED);
                warn!(%err, "export failed");
                Err(err)
            }
        }
    }

    /// Saves the snapshot right away.
    pub fn autosave(&mut self) -> Result<(), ServiceError> {
        let now = self.clock.now();
        self.autosave_debounce.cancel();
        self.autosave_at(now)
    }

    /// Earliest moment `tick` has something to do.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        [
            self.render_debounce.deadline(),
            self.autosave_debounce.deadline(),
            self.status.next_deadline(),
            self.save_status.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn render_at(&mut self, now: Timestamp) -> RenderOutcome {
        let outcome = self.pipeline.render(&self.session.sources, &mut self.status, now);
        self.counters.increment("renders", 1);
        if !outcome.is_success() {
            self.counters.increment("render_failures", 1);
        }
        outcome
    }

    fn autosave_at(&mut self, now: Timestamp) -> Result<(), ServiceError> {
        let key = &self.settings.storage.autosave_key;
        match storage::autosave_under(&mut self.store, key, &self.session.sources) {
            Ok(()) => {
                self.save_status.show(now, status::AUTO_SAVED);
                self.counters.increment("autosaves", 1);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "autosave failed");
                Err(err)
            }
        }
    }

    fn share_base(&self) -> Result<Url, ShareError> {
        match &self.page_url {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(&self.settings.share.base_url)?),
        }
    }

    pub fn sources(&self) -> &SourceTriple {
        &self.session.sources
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn console(&self) -> &ConsoleBridge {
        self.pipeline.console()
    }

    pub fn pipeline(&self) -> &RenderPipeline<S> {
        &self.pipeline
    }

    pub fn surface(&self) -> &S {
        self.pipeline.surface()
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn status_text(&self) -> &str {
        self.status.text()
    }

    pub fn save_status_text(&self) -> &str {
        self.save_status.text(self.session.has_unsaved_changes())
    }

    /// Whether closing now would lose work.
    pub fn has_unsaved_changes(&self) -> bool {
        self.session.has_unsaved_changes()
    }

    pub fn is_render_pending(&self) -> bool {
        self.render_debounce.is_pending()
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.session.theme = theme.into();
    }

    pub fn set_font_size(&mut self, size: u16) {
        self.session.font_size = size;
    }

    pub fn show_editor(&mut self, language: Language) {
        self.session.show_editor(language);
    }

    pub fn move_cursor(&mut self, cursor: CursorPosition) {
        self.session.cursor = cursor;
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeplay_core::{ManualClock, MemorySurface};
    use codeplay_services::storage::MemoryStore;
    use std::rc::Rc;

    type TestApp = App<MemorySurface, MemoryStore, Rc<ManualClock>>;

    fn app() -> (TestApp, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new());
        let app = App::new(
            MemorySurface::new(),
            MemoryStore::new(),
            clock.clone(),
            Settings::default(),
        );
        (app, clock)
    }

    #[test]
    fn test_initial_render_is_deferred() {
        let (mut app, clock) = app();
        assert_eq!(app.start(None), StartupSource::Defaults);
        assert_eq!(app.next_deadline(), Some(Timestamp::from_millis(100)));

        clock.advance_ms(99);
        assert!(app.tick().rendered.is_none());
        clock.advance_ms(1);
        assert!(app.tick().rendered.unwrap().is_success());
        assert_eq!(app.status_text(), status::RENDERED);
    }

    #[test]
    fn test_unchanged_text_is_not_an_edit() {
        let (mut app, _clock) = app();
        app.start(None);
        let html = app.sources().html.clone();
        assert!(!app.edit(Language::Html, html));
        assert!(!app.has_unsaved_changes());
        assert_eq!(app.save_status_text(), status::ALL_SAVED);
    }

    #[test]
    fn test_cursor_and_view_options() {
        let (mut app, _clock) = app();
        app.set_theme("dracula");
        app.set_font_size(18);
        app.show_editor(Language::Css);
        app.move_cursor(CursorPosition::new(4, 0));
        assert_eq!(app.session().theme, "dracula");
        assert_eq!(app.session().font_size, 18);
        assert_eq!(app.session().active, Language::Css);
        assert_eq!(app.session().cursor.label(), "Line 5, Column 1");
    }

    #[test]
    fn test_share_without_page_url_uses_base() {
        let (mut app, _clock) = app();
        app.start(None);
        let url = app.share_url().unwrap();
        assert!(url.as_str().starts_with("http://localhost/?code="));
        assert_eq!(app.status_text(), status::SHARE_READY);
    }
}
