//! The three editor sources and the languages they belong to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::templates;

/// One of the three editors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Html,
    Css,
    Js,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Html, Language::Css, Language::Js];

    /// Short tag used in share payloads, storage and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Html => "html",
            Language::Css => "css",
            Language::Js => "js",
        }
    }

    /// File name inside an exported project.
    pub fn file_name(self) -> &'static str {
        match self {
            Language::Html => "index.html",
            Language::Css => "style.css",
            Language::Js => "script.js",
        }
    }

    /// Highlighting mode for the external editor widget.
    pub fn editor_mode(self) -> &'static str {
        match self {
            Language::Html => "xml",
            Language::Css => "css",
            Language::Js => "javascript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Language::Html),
            "css" => Ok(Language::Css),
            "js" | "javascript" => Ok(Language::Js),
            other => Err(CoreError::UnknownLanguage {
                name: other.to_string(),
            }),
        }
    }
}

/// Markup, styles and script. All three are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTriple {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl SourceTriple {
    pub fn new(html: impl Into<String>, css: impl Into<String>, js: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
            js: js.into(),
        }
    }

    /// Builds a triple from optional parts, taking the default template for
    /// every part that is absent. Present-but-empty parts stay empty.
    pub fn from_parts(html: Option<String>, css: Option<String>, js: Option<String>) -> Self {
        Self {
            html: html.unwrap_or_else(|| templates::DEFAULT_HTML.to_string()),
            css: css.unwrap_or_else(|| templates::DEFAULT_CSS.to_string()),
            js: js.unwrap_or_else(|| templates::DEFAULT_JS.to_string()),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Html => &self.html,
            Language::Css => &self.css,
            Language::Js => &self.js,
        }
    }

    /// Replaces one part. Returns `true` if the text actually changed.
    pub fn set(&mut self, language: Language, text: impl Into<String>) -> bool {
        let text = text.into();
        let slot = match language {
            Language::Html => &mut self.html,
            Language::Css => &mut self.css,
            Language::Js => &mut self.js,
        };
        if *slot == text {
            return false;
        }
        *slot = text;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &str)> {
        Language::ALL.into_iter().map(move |lang| (lang, self.get(lang)))
    }
}

impl Default for SourceTriple {
    fn default() -> Self {
        templates::DEFAULT_SOURCES.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_only_fills_missing() {
        let triple = SourceTriple::from_parts(Some("<p>x</p>".into()), Some(String::new()), None);
        assert_eq!(triple.html, "<p>x</p>");
        assert_eq!(triple.css, "");
        assert_eq!(triple.js, templates::DEFAULT_JS);
    }

    #[test]
    fn test_set_reports_change() {
        let mut triple = SourceTriple::new("a", "b", "c");
        assert!(!triple.set(Language::Css, "b"));
        assert!(triple.set(Language::Css, "body {}"));
        assert_eq!(triple.get(Language::Css), "body {}");
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("HTML".parse::<Language>().unwrap(), Language::Html);
        assert_eq!("javascript".parse::<Language>().unwrap(), Language::Js);
        assert!("python".parse::<Language>().is_err());
        assert_eq!(Language::Js.file_name(), "script.js");
    }
}
