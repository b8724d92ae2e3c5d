//! Message classifier
//!
//! Maps a clean line to a [`Message`] by its first whitespace-delimited
//! token. Identifier and payload extraction skip the keyword and one
//! separator character, matching the gateway's `keyword<space>fields...`
//! output.

use crate::types::Message;

/// Keyword of periodic node status lines
pub const STATUS_KEYWORD: &str = "status";
/// Keyword of test result lines
pub const RESULT_KEYWORD: &str = "result";
/// Keyword of test-start acknowledgements
pub const ACKING_KEYWORD: &str = "acking";
/// Keyword of node discovery lines
pub const NODEOK_KEYWORD: &str = "nodeok";
/// Keyword of stored log entries
pub const LOGGED_KEYWORD: &str = "logged";

/// Byte offset of the separator after `acking`
pub const ACKING_SKIP: usize = ACKING_KEYWORD.len();
/// Byte offset of the separator after `nodeok`
pub const NODEOK_SKIP: usize = NODEOK_KEYWORD.len();
/// Byte offset of the separator after `logged`
pub const LOGGED_SKIP: usize = LOGGED_KEYWORD.len();

/// Classify a clean line. Returns `None` for blank lines.
pub fn classify(line: &str) -> Option<Message> {
    let line = line.trim();
    let token = line.split_whitespace().next()?;

    let message = match token {
        STATUS_KEYWORD => Message::Status(line.to_string()),
        RESULT_KEYWORD => Message::Result(line.to_string()),
        ACKING_KEYWORD => Message::Acking {
            node: first_token(after(line, ACKING_SKIP)).to_string(),
            payload: line.to_string(),
        },
        NODEOK_KEYWORD => Message::NodeOk {
            node: first_token(after(line, NODEOK_SKIP)).to_string(),
            payload: line.to_string(),
        },
        LOGGED_KEYWORD => Message::Logged(after(line, LOGGED_SKIP).to_string()),
        _ => Message::Unclassified(line.to_string()),
    };

    Some(message)
}

/// Split a `keyword node value` payload into `(node, value)`.
///
/// Status and result lines carry exactly three tokens; anything else
/// (including the two-token `status <node>` heartbeat) yields `None`.
pub fn node_update(payload: &str) -> Option<(&str, &str)> {
    let mut tokens = payload.split_whitespace();
    let _keyword = tokens.next()?;
    let node = tokens.next()?;
    let value = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((node, value))
}

/// Text after the separator character at byte offset `at`
fn after(line: &str, at: usize) -> &str {
    let Some(rest) = line.get(at..) else {
        return "";
    };
    let mut chars = rest.chars();
    chars.next();
    chars.as_str()
}

fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("")
}
