//! Composite document assembly
//!
//! Styles, markup, the console bootstrap and the guarded user script are
//! stitched into one HTML document that replaces the preview wholesale on
//! every render. Markup is passed through untouched.

use std::borrow::Cow;

use crate::console::{CycleId, BRIDGE_CHANNEL};
use crate::sources::SourceTriple;

/// Loaded by a hard refresh.
pub const BLANK_DOCUMENT: &str = "<html><body></body></html>";

/// Global the bootstrap installs for the failure boundary to report through.
pub const REPORT_HOOK: &str = "__codeplayReport";

const BOOTSTRAP_TEMPLATE: &str = r#"(function () {
    var CHANNEL = "{{channel}}";
    var CYCLE = {{cycle}};
    function post(kind, message) {
        try {
            window.parent.postMessage({ channel: CHANNEL, cycle: CYCLE, kind: kind, message: message }, "*");
        } catch (_) {}
    }
    function format(arg) {
        if (typeof arg === "string") return arg;
        if (arg instanceof Error) return String(arg);
        try {
            var json = JSON.stringify(arg);
            if (json !== undefined) return json;
        } catch (_) {}
        return String(arg);
    }
    ["log", "error", "warn", "info"].forEach(function (method) {
        var original = console[method];
        console[method] = function () {
            var args = Array.prototype.slice.call(arguments);
            if (typeof original === "function") original.apply(console, args);
            post(method, args.map(format).join(" "));
        };
    });
    window.addEventListener("error", function (event) {
        post("error", String(event && event.message));
    });
    window.addEventListener("unhandledrejection", function (event) {
        post("error", "Promise Rejection: " + (event && event.reason));
    });
    window.{{hook}} = post;
})();"#;

/// The script that forwards console calls and page errors for `cycle`.
pub fn bootstrap_script(cycle: CycleId) -> String {
    BOOTSTRAP_TEMPLATE
        .replace("{{channel}}", BRIDGE_CHANNEL)
        .replace("{{cycle}}", &cycle.0.to_string())
        .replace("{{hook}}", REPORT_HOOK)
}

/// Wraps user script in a boundary that reports a thrown error as exactly one
/// console error entry. An empty script yields an empty boundary.
pub fn guard_script(js: &str) -> String {
    format!(
        "try {{\n{body}\n}} catch (error) {{\n    window.{hook}(\"error\", \"Runtime Error: \" + String(error));\n}}",
        body = escape_closing_tag(js, "</script"),
        hook = REPORT_HOOK,
    )
}

/// Builds the full preview document for one render cycle.
pub fn build_composite(sources: &SourceTriple, cycle: CycleId) -> String {
    let css = escape_closing_tag(&sources.css, "</style");
    let bootstrap = bootstrap_script(cycle);
    let guarded = guard_script(&sources.js);

    let mut doc = String::with_capacity(
        sources.html.len() + css.len() + bootstrap.len() + guarded.len() + 256,
    );
    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    doc.push_str("    <meta charset=\"UTF-8\">\n");
    doc.push_str("    <title>Preview</title>\n");
    doc.push_str("    <style>");
    doc.push_str(&css);
    doc.push_str("</style>\n</head>\n<body>\n");
    doc.push_str(&sources.html);
    doc.push_str("\n<script>\n");
    doc.push_str(&bootstrap);
    doc.push_str("\n</script>\n<script>\n");
    doc.push_str(&guarded);
    doc.push_str("\n</script>\n</body>\n</html>");
    doc
}

/// Breaks every case-insensitive occurrence of `tag` (e.g. `</script`) with a
/// backslash so embedded text cannot close its enclosing element early.
/// `<\/script` means the same thing inside JS strings and CSS.
fn escape_closing_tag<'a>(text: &'a str, tag: &str) -> Cow<'a, str> {
    let lower = text.to_ascii_lowercase();
    if !lower.contains(tag) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for (index, _) in lower.match_indices(tag) {
        out.push_str(&text[last..index + 1]);
        out.push('\\');
        last = index + 1;
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_composite_layout() {
        let sources = SourceTriple::new("<p>hi</p>", "p { color: red; }", "console.log(1);");
        let doc = build_composite(&sources, CycleId(4));

        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<style>p { color: red; }</style>"));
        assert!(doc.contains("<body>\n<p>hi</p>\n<script>"));
        assert!(doc.contains("var CYCLE = 4;"));
        assert!(doc.contains("var CHANNEL = \"codeplay-console\";"));
        assert!(doc.contains("try {\nconsole.log(1);\n} catch (error)"));

        let style = doc.find("<style>").unwrap();
        let bootstrap = doc.find("var CYCLE").unwrap();
        let user = doc.find("console.log(1)").unwrap();
        assert!(style < bootstrap && bootstrap < user);
    }

    #[test]
    fn test_empty_script_keeps_boundary() {
        assert_eq!(
            guard_script(""),
            "try {\n\n} catch (error) {\n    window.__codeplayReport(\"error\", \"Runtime Error: \" + String(error));\n}"
        );
    }

    #[test]
    fn test_markup_is_not_sanitized() {
        let sources = SourceTriple::new("<div><span>unclosed", "", "");
        let doc = build_composite(&sources, CycleId(1));
        assert!(doc.contains("<div><span>unclosed"));
    }

    #[test]
    fn test_closing_tags_are_escaped() {
        let sources = SourceTriple::new(
            "",
            "a::after { content: '</STYLE>'; }",
            "var s = '</script><b>';",
        );
        let doc = build_composite(&sources, CycleId(1));
        assert!(doc.contains("content: '<\\/STYLE>';"));
        assert!(doc.contains("var s = '<\\/script><b>';"));
        assert_eq!(doc.matches("</script>").count(), 2);
    }

    #[test]
    fn test_escape_keeps_unicode_intact() {
        assert_eq!(escape_closing_tag("ü</script>ß", "</script"), "ü<\\/script>ß");
        assert!(matches!(escape_closing_tag("plain", "</script"), Cow::Borrowed(_)));
    }
}
