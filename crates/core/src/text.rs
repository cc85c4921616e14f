//! Text transforms applied to replies before they are shown or spoken.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Shown instead of an upstream error page.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "The tutoring service is temporarily unavailable. Please try again in a moment.";

/// Segments averaging at least this many characters are prose, not a list.
pub const BULLET_SEGMENT_THRESHOLD: usize = 200;

const BULLET_GLYPHS: [char; 6] = ['•', '●', '▪', '◦', '‣', '∙'];

const HTML_MARKERS: [&str; 3] = ["<html", "<!doctype", "<head>"];

const UPSTREAM_EXCEPTION_MARKERS: [&str; 7] = [
    "traceback (most recent call last)",
    "internal server error",
    "502 bad gateway",
    "503 service unavailable",
    "504 gateway time-out",
    "upstream connect error",
    "modelunavailableexception",
];

/// Replaces error pages and upstream exception dumps with a friendly message.
///
/// Exception markers only count at the start of the first line; prose that
/// mentions one is kept.
pub fn sanitize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let is_error_page =
        HTML_MARKERS.iter().any(|m| lowered.contains(m)) || opens_with_exception(&lowered);
    if is_error_page {
        tracing::warn!("Reply looks like an upstream error page; replacing it");
        SERVICE_UNAVAILABLE_MESSAGE.to_string()
    } else {
        text.to_string()
    }
}

// `lowered` must already be lowercase. A leading status code such as
// "500 " or "500: " is skipped before matching.
fn opens_with_exception(lowered: &str) -> bool {
    let first_line = lowered.trim_start().lines().next().unwrap_or_default();
    let after_status = first_line
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches([':', '-', ' ']);
    UPSTREAM_EXCEPTION_MARKERS
        .iter()
        .any(|m| first_line.starts_with(m) || after_status.starts_with(m))
}

/// Turns `• a • b • c` style runs into one `- item` per line.
///
/// Text before the first glyph is kept as a plain leading line. Anything that
/// splits into a single segment, or whose segments are long enough to read as
/// prose, comes back unchanged.
pub fn reflow_bullets(text: &str) -> String {
    if !text.contains(BULLET_GLYPHS) {
        return text.to_string();
    }

    let mut parts = text.split(BULLET_GLYPHS);
    let lead = parts.next().map(str::trim).unwrap_or_default();
    let items: Vec<&str> = parts.map(str::trim).filter(|s| !s.is_empty()).collect();

    let segment_count = items.len() + usize::from(!lead.is_empty());
    if segment_count <= 1 {
        return text.to_string();
    }
    let total_chars: usize = items.iter().map(|s| s.chars().count()).sum::<usize>()
        + lead.chars().count();
    if total_chars / segment_count >= BULLET_SEGMENT_THRESHOLD {
        return text.to_string();
    }

    let mut lines = Vec::with_capacity(segment_count);
    if !lead.is_empty() {
        lines.push(lead.to_string());
    }
    lines.extend(items.into_iter().map(|item| format!("- {item}")));
    lines.join("\n")
}

fn html_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid html tag regex"))
}

fn image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"))
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link regex"))
}

fn line_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:#{1,6}[ \t]+|>[ \t]*|[-*+][ \t]+|\d+[.)][ \t]+)")
            .expect("valid line marker regex")
    })
}

fn emphasis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*|__|~~|[*`]").expect("valid emphasis regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Flattens markup into continuous prose for the speech engine.
pub fn strip_for_speech(text: &str) -> String {
    let text = html_tag_regex().replace_all(text, " ");
    let text = image_regex().replace_all(&text, " ");
    let text = link_regex().replace_all(&text, "$1");
    let text = line_marker_regex().replace_all(&text, "");
    let text = emphasis_regex().replace_all(&text, "");
    let text = text.replace(BULLET_GLYPHS, " ");
    whitespace_regex().replace_all(&text, " ").trim().to_string()
}
