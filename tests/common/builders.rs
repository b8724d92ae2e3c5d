//! Test data builders for gateway traffic

use lightmon::backend::MockFeed;

/// Builder for a scripted stream of gateway lines, framed the way the
/// gateway shell prints them
pub struct LineScriptBuilder {
    lines: Vec<Vec<u8>>,
    prompt: bool,
    colored: bool,
}

impl LineScriptBuilder {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            prompt: false,
            colored: false,
        }
    }

    /// Prefix every line with the shell prompt
    pub fn with_prompt(mut self) -> Self {
        self.prompt = true;
        self
    }

    /// Wrap every line in color escape codes
    pub fn colored(mut self) -> Self {
        self.colored = true;
        self
    }

    pub fn line(mut self, text: &str) -> Self {
        let mut framed = String::new();
        if self.prompt {
            framed.push_str("uart:~$ ");
        }
        if self.colored {
            framed.push_str("\u{1b}[1;32m");
        }
        framed.push_str(text);
        if self.colored {
            framed.push_str("\u{1b}[0m");
        }
        framed.push('\r');
        self.lines.push(framed.into_bytes());
        self
    }

    pub fn status(self, node: &str, value: &str) -> Self {
        self.line(&format!("status {} {}", node, value))
    }

    pub fn result(self, node: &str, value: &str) -> Self {
        self.line(&format!("result {} {}", node, value))
    }

    pub fn acking(self, node: &str, value: &str) -> Self {
        self.line(&format!("acking {} {}", node, value))
    }

    pub fn nodeok(self, node: &str) -> Self {
        self.line(&format!("nodeok {} ok", node))
    }

    pub fn logged(self, result: &str, epoch_secs: i64, node: &str) -> Self {
        self.line(&format!("logged {} {} {}", result, epoch_secs, node))
    }

    /// Raw bytes, sent unframed
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.lines.push(bytes.to_vec());
        self
    }

    pub fn build(self) -> Vec<Vec<u8>> {
        self.lines
    }

    /// Deliver every line to `feed`
    pub fn play(self, feed: &MockFeed) {
        for line in self.lines {
            feed.bytes(line);
        }
    }
}

impl Default for LineScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_script_builder() {
        let lines = LineScriptBuilder::new()
            .with_prompt()
            .colored()
            .status("1", "120")
            .raw(&[0xff])
            .build();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], b"uart:~$ \x1b[1;32mstatus 1 120\x1b[0m\r".to_vec());
        assert_eq!(lines[1], vec![0xff]);
    }
}
