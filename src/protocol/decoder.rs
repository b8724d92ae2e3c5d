//! Line decoder for the gateway shell
//!
//! The gateway runs an interactive shell on its UART, so every line the
//! host reads may carry prompt text, colour escapes, and framing bytes
//! around the actual payload. [`LineDecoder`] turns one raw line into a
//! clean text line ready for classification.

/// Prompt printed by the gateway shell
pub const SHELL_PROMPT: &str = "uart:~$";

/// Framing characters that can lead a line after a prompt redraw
pub const FRAMING_CHARS: [char; 2] = ['I', 'J'];

const ESC: char = '\u{1b}';

/// Outcome of decoding one raw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    /// Artifact-stripped, trimmed text (may be empty)
    Clean(String),
    /// The bytes were not valid UTF-8
    Undecodable,
}

impl DecodedLine {
    /// The clean text, if any and non-empty
    pub fn text(&self) -> Option<&str> {
        match self {
            DecodedLine::Clean(line) if !line.is_empty() => Some(line),
            _ => None,
        }
    }
}

/// Strips shell artifacts from raw device lines
#[derive(Debug, Clone)]
pub struct LineDecoder {
    prompt: String,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Create a decoder for the stock gateway prompt
    pub fn new() -> Self {
        Self::with_prompt(SHELL_PROMPT)
    }

    /// Create a decoder for a custom shell prompt
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Decode one raw line (with or without its trailing newline)
    pub fn decode(&self, raw: &[u8]) -> DecodedLine {
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(_) => return DecodedLine::Undecodable,
        };

        let mut line = text.trim().to_string();
        if !self.prompt.is_empty() {
            line = line.replace(&self.prompt, "");
        }
        let line = line.trim_start_matches(&FRAMING_CHARS[..]);
        let line = strip_escapes(line);
        let line = strip_controls(&line);

        DecodedLine::Clean(line.trim().to_string())
    }
}

/// Remove ANSI escape sequences.
///
/// Accepted forms:
/// - CSI: `ESC [` parameter bytes (0x30-0x3F), intermediate bytes
///   (0x20-0x2F), optional final byte (0x40-0x7E)
/// - Other: `ESC` intermediate bytes (0x20-0x2F), final byte (0x40-0x7E)
///
/// A sequence cut short by the end of the line or by an unexpected byte
/// is dropped up to that point; the unexpected byte is kept as text.
pub fn strip_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            out.push(c);
            continue;
        }

        if chars.peek() == Some(&'[') {
            chars.next();
            while chars.next_if(|c| is_parameter(*c)).is_some() {}
            while chars.next_if(|c| is_intermediate(*c)).is_some() {}
            chars.next_if(|c| is_final(*c));
        } else {
            while chars.next_if(|c| is_intermediate(*c)).is_some() {}
            chars.next_if(|c| is_final(*c));
        }
    }

    out
}

/// Remove stray C0 control characters (except tab) and DEL
fn strip_controls(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c == '\t' || !(c.is_ascii_control()))
        .collect()
}

fn is_parameter(c: char) -> bool {
    ('\u{30}'..='\u{3f}').contains(&c)
}

fn is_intermediate(c: char) -> bool {
    ('\u{20}'..='\u{2f}').contains(&c)
}

fn is_final(c: char) -> bool {
    ('\u{40}'..='\u{7e}').contains(&c)
}
