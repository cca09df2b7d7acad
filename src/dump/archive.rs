use crate::dump::shell;
use crate::error::{DumpError, Result};

/// Default archive command: parallel bzip2 at best compression.
pub const DEFAULT_ARCHIVE_TEMPLATE: &str = "pbzip2 --compress --best -c %1$s > %2$s";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Source,
    Destination,
}

// This is a compression command with two fill-in slots.
//
// `%1$s` is the source slot, `%2$s` the destination slot, a bare `%s` takes
// the next slot in order and `%%` is a literal percent sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTemplate {
    /// The template as written by the user.
    raw: String,
    segments: Vec<Segment>,
}

impl ArchiveTemplate {
    /// Parses a template, rejecting placeholders other than the two slots.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut bare_slots = 0;
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '%' {
                text.push(ch);
                continue;
            }
            let slot = match chars.next() {
                Some('%') => {
                    text.push('%');
                    continue;
                }
                Some('s') => {
                    bare_slots += 1;
                    match bare_slots {
                        1 => Segment::Source,
                        2 => Segment::Destination,
                        _ => {
                            return Err(DumpError::Validation(format!(
                                "Archive pattern \"{template}\" has more than two placeholders."
                            )));
                        }
                    }
                }
                Some(position @ ('1' | '2')) => {
                    if chars.next() != Some('$') || chars.next() != Some('s') {
                        return Err(unsupported_placeholder(template));
                    }
                    if position == '1' {
                        Segment::Source
                    } else {
                        Segment::Destination
                    }
                }
                _ => return Err(unsupported_placeholder(template)),
            };
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(slot);
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(ArchiveTemplate {
            raw: template.to_string(),
            segments,
        })
    }

    /// True when the template produces no command at all.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Renders the command, shell-escaping both values.
    pub fn fill(&self, source: &str, destination: &str) -> String {
        let source = shell::escape(source);
        let destination = shell::escape(destination);
        let mut command = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => command.push_str(text),
                Segment::Source => command.push_str(&source),
                Segment::Destination => command.push_str(&destination),
            }
        }
        command
    }
}

impl Default for ArchiveTemplate {
    fn default() -> Self {
        ArchiveTemplate {
            raw: DEFAULT_ARCHIVE_TEMPLATE.to_string(),
            segments: vec![
                Segment::Text("pbzip2 --compress --best -c ".to_string()),
                Segment::Source,
                Segment::Text(" > ".to_string()),
                Segment::Destination,
            ],
        }
    }
}

fn unsupported_placeholder(template: &str) -> DumpError {
    DumpError::Validation(format!(
        "Archive pattern \"{template}\" contains an unsupported placeholder; use %1$s for the source and %2$s for the destination."
    ))
}
