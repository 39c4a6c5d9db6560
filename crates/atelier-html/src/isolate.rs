//! Cut raw generator output down to the markup it contains.

use std::sync::LazyLock;

use regex::Regex;

/// Compile one of the patterns below. They are all string literals covered
/// by the module tests, so compilation cannot fail at runtime.
fn literal(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid pattern {pattern:?}: {err}"))
}

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?is)```[ \t]*(html?|xhtml)?[ \t]*\r?\n(.*?)```"));
static FENCE_MARKER: LazyLock<Regex> = LazyLock::new(|| literal(r"```[A-Za-z]*"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| literal(r"(?s)<!--.*?-->"));
static DOCUMENT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)<!doctype[^>]*>|<html[\s>]"));
static DOCUMENT_CLOSE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)</html\s*>"));
static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| literal(r"(?i)<!doctype[^>]*>"));

/// Isolate the markup of a raw response.
///
/// Takes the first fenced html block when there is one, drops leftover fence
/// markers, keeps only what lies between a full-document delimiter pair, and
/// removes comments. The result is trimmed and may be empty.
pub fn isolate_markup(raw: &str) -> String {
    let mut content = match FENCED_BLOCK.captures(raw) {
        Some(caps) if caps.get(2).map(|m| m.as_str().contains('<')).unwrap_or(false) => {
            caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default()
        }
        _ => raw.to_string(),
    };

    content = FENCE_MARKER.replace_all(&content, "").into_owned();

    let open = DOCUMENT_OPEN.find(&content).map(|m| m.start());
    let close = DOCUMENT_CLOSE.find_iter(&content).last().map(|m| m.end());
    if let (Some(start), Some(end)) = (open, close)
        && start < end
    {
        content = content[start..end].to_string();
    }

    content = COMMENT.replace_all(&content, "").into_owned();
    content.trim().to_string()
}

/// Replace any declared doctype with the standard one so the parser never
/// enters quirks mode. Reparsing canonical output must build the same tree.
pub fn standardize_doctype(markup: &str) -> String {
    let stripped = DOCTYPE.replace_all(markup, "");
    format!("<!DOCTYPE html>\n{}", stripped.trim_start())
}
