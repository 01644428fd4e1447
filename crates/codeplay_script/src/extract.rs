//! Inline script extraction
//!
//! Pulls `<script>` element bodies out of a document in document order, the
//! order a browser would execute them in.

/// One inline script found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScript {
    pub source: String,
    /// Byte offset of the opening tag, for diagnostics.
    pub offset: usize,
}

/// Scripts that are skipped rather than executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedScript {
    External { src: String },
    NonJavaScript { kind: String },
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub scripts: Vec<InlineScript>,
    pub skipped: Vec<SkippedScript>,
}

const JS_TYPES: &[&str] = &[
    "",
    "text/javascript",
    "application/javascript",
    "module",
    "text/ecmascript",
    "application/ecmascript",
];

pub fn extract_scripts(document: &str) -> Extraction {
    let lower = document.to_ascii_lowercase();
    let mut extraction = Extraction::default();
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find("<script") {
        let open = cursor + found;
        let after_name = open + "<script".len();

        // `<scripts>` or `<script-foo>` are not script elements.
        match lower.as_bytes().get(after_name) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/') => {}
            _ => {
                cursor = after_name;
                continue;
            }
        }

        let Some(tag_end) = lower[after_name..].find('>').map(|i| after_name + i) else {
            break;
        };
        let attributes = &document[after_name..tag_end];
        let body_start = tag_end + 1;
        let body_end = lower[body_start..]
            .find("</script")
            .map(|i| body_start + i)
            .unwrap_or(document.len());

        if let Some(src) = attribute(attributes, "src") {
            extraction.skipped.push(SkippedScript::External { src });
        } else {
            let kind = attribute(attributes, "type").unwrap_or_default();
            if JS_TYPES.contains(&kind.to_ascii_lowercase().as_str()) {
                extraction.scripts.push(InlineScript {
                    source: document[body_start..body_end].to_string(),
                    offset: open,
                });
            } else {
                extraction.skipped.push(SkippedScript::NonJavaScript { kind });
            }
        }

        cursor = lower[body_end..]
            .find('>')
            .map(|i| body_end + i + 1)
            .unwrap_or(document.len());
    }

    extraction
}

/// Reads a single attribute value from the text between `<script` and `>`.
fn attribute(attributes: &str, name: &str) -> Option<String> {
    let lower = attributes.to_ascii_lowercase();
    let mut search = 0;
    while let Some(found) = lower[search..].find(name) {
        let start = search + found;
        let before_ok = start == 0 || lower.as_bytes()[start - 1].is_ascii_whitespace();
        let rest = lower[start + name.len()..].trim_start();
        if before_ok && rest.starts_with('=') {
            let value_start = attributes.len() - rest.len() + 1;
            let value = attributes[value_start..].trim_start();
            return Some(match value.chars().next() {
                Some(quote @ ('"' | '\'')) => value[1..]
                    .split(quote)
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                _ => value.split_whitespace().next().unwrap_or_default().to_string(),
            });
        }
        if before_ok && (rest.is_empty() || rest.starts_with(char::is_whitespace)) {
            return Some(String::new());
        }
        search = start + name.len();
    }
    None
}
