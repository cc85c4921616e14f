//! Parser for the loose `SECTION_ID` / `SECTION_CONTENT` reply format.
//!
//! The answering service is asked to reply with
//!
//! ```text
//! SECTION_ID: <identifier>
//! SECTION_CONTENT: <rest of payload>
//! ```
//!
//! but nothing guarantees it does. Markers are matched case-insensitively,
//! either one may be missing, and a reply without a content marker is shown
//! as-is rather than dropped.

use regex_lite::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub declared_section_id: Option<String>,
    pub content: String,
}

/// What to do with a reply once the active section is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyVerdict {
    Accepted(TurnReply),
    /// The reply names a section other than the one on screen.
    Mismatch {
        declared: String,
        active: Option<String>,
    },
    /// Nothing displayable survived parsing.
    Empty,
}

fn section_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // One token on the marker's line, so a content marker on the same line
    // is not swallowed into the id.
    RE.get_or_init(|| {
        Regex::new(r#"(?i)SECTION_ID[ \t]*:[ \t*`"']*([^\s*`"']+)"#)
            .expect("valid section id regex")
    })
}

fn section_content_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)SECTION_CONTENT\s*:(.*)").expect("valid section content regex")
    })
}

const DECORATION: &[char] = &['*', '`', '"', '\''];

fn clean_id(raw: &str) -> Option<String> {
    let id = raw.trim().trim_matches(|c: char| c.is_whitespace() || DECORATION.contains(&c));
    if id.is_empty() || id.to_ascii_uppercase().starts_with("SECTION_CONTENT") {
        None
    } else {
        Some(id.to_string())
    }
}

pub fn parse_reply(payload: &str) -> TurnReply {
    let declared_section_id = section_id_regex()
        .captures(payload)
        .and_then(|caps| caps.get(1))
        .and_then(|m| clean_id(m.as_str()));

    let extracted = section_content_regex()
        .captures(payload)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .trim_start_matches(|c: char| c.is_whitespace() || c == '*')
                .trim_end()
                .to_string()
        })
        .filter(|content| !content.is_empty());

    let content = extracted.unwrap_or_else(|| payload.trim().to_string());

    TurnReply {
        declared_section_id,
        content,
    }
}

/// Checks a parsed reply against the section that is active right now.
pub fn verify_reply(reply: TurnReply, active_section_id: Option<&str>) -> ReplyVerdict {
    if let Some(declared) = &reply.declared_section_id {
        if active_section_id != Some(declared.as_str()) {
            return ReplyVerdict::Mismatch {
                declared: declared.clone(),
                active: active_section_id.map(str::to_string),
            };
        }
    }
    if reply.content.is_empty() {
        return ReplyVerdict::Empty;
    }
    ReplyVerdict::Accepted(reply)
}

/// [`parse_reply`] followed by [`verify_reply`].
pub fn interpret_reply(payload: &str, active_section_id: Option<&str>) -> ReplyVerdict {
    verify_reply(parse_reply(payload), active_section_id)
}
