//! Per-session editor state

use crate::sources::{Language, SourceTriple};

pub const DEFAULT_THEME: &str = "monokai";
pub const DEFAULT_FONT_SIZE: u16 = 14;

/// Zero-based cursor location in the active editor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

impl CursorPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// One-based label for the status bar.
    pub fn label(&self) -> String {
        format!("Line {}, Column {}", self.line + 1, self.column + 1)
    }
}

/// Everything that was global state in a page: sources, view options and
/// the unsaved flag.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub sources: SourceTriple,
    pub theme: String,
    pub font_size: u16,
    pub active: Language,
    pub cursor: CursorPosition,
    unsaved: bool,
}

impl SessionState {
    pub fn new(sources: SourceTriple) -> Self {
        Self {
            sources,
            theme: DEFAULT_THEME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            active: Language::Html,
            cursor: CursorPosition::default(),
            unsaved: false,
        }
    }

    /// Applies an editor change. Returns `true` if the text changed.
    pub fn apply_edit(&mut self, language: Language, text: impl Into<String>) -> bool {
        let changed = self.sources.set(language, text);
        if changed {
            self.unsaved = true;
        }
        changed
    }

    /// Replaces all three sources, as a load or reset does.
    pub fn replace_sources(&mut self, sources: SourceTriple) {
        self.sources = sources;
    }

    pub fn mark_unsaved(&mut self) {
        self.unsaved = true;
    }

    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    /// Whether leaving now would lose work.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Switches the visible editor; the cursor belongs to the new editor.
    pub fn show_editor(&mut self, language: Language) {
        self.active = language;
        self.cursor = CursorPosition::default();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(SourceTriple::default())
    }
}
