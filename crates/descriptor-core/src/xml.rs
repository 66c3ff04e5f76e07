//! Minimal XML text writer

/// Indented line writer, two spaces per level
#[derive(Debug, Clone, Default)]
pub struct XmlWriter {
    output: String,
    indent: usize,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(indent: usize) -> Self {
        Self {
            output: String::new(),
            indent,
        }
    }

    pub fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    /// Write an opening tag and indent
    pub fn open(&mut self, tag: &str) {
        self.write_line(tag);
        self.indent += 1;
    }

    /// Dedent and write a closing tag
    pub fn close(&mut self, tag: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.write_line(tag);
    }

    /// Shift the indent level without writing
    pub fn indent_by(&mut self, delta: isize) {
        self.indent = self.indent.saturating_add_signed(delta);
    }

    pub fn blank(&mut self) {
        self.output.push('\n');
    }

    pub fn finish(self) -> String {
        self.output
    }
}

/// Escape special XML characters
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Shortest round-trip decimal, integral values keep `.0`, no negative zero
pub fn fmt_f64(value: f64) -> String {
    if value == 0.0 {
        "0.0".to_string()
    } else {
        format!("{value:?}")
    }
}

/// Space-separated triple
pub fn fmt_vec3(v: [f64; 3]) -> String {
    format!("{} {} {}", fmt_f64(v[0]), fmt_f64(v[1]), fmt_f64(v[2]))
}
