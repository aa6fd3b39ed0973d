/// Anchored predicate over one response line.
///
/// Only the handful of shapes the module's responses actually need are
/// supported. Every variant is anchored at the start of the line; `Exact` and
/// `Digits` are anchored at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern<'a> {
    /// The whole line equals the literal. Captures the whole line.
    Exact(&'a str),
    /// The line starts with the literal. Captures the whole line.
    Prefix(&'a str),
    /// The line starts with the literal. Captures what follows it.
    Capture(&'a str),
    /// The line is one or more ASCII digits. Captures the whole line.
    Digits,
    /// First alternative that matches wins, with its capture.
    Any(&'a [Pattern<'a>]),
}

impl<'a> Pattern<'a> {
    /// Returns the capture if `line` matches.
    pub fn matches<'l>(&self, line: &'l str) -> Option<&'l str> {
        match self {
            Self::Exact(lit) => (line == *lit).then_some(line),
            Self::Prefix(lit) => line.starts_with(lit).then_some(line),
            Self::Capture(lit) => line.strip_prefix(lit),
            Self::Digits => {
                (!line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())).then_some(line)
            }
            Self::Any(alternatives) => alternatives.iter().find_map(|p| p.matches(line)),
        }
    }
}

pub const OK: Pattern<'static> = Pattern::Exact("OK");
pub const CONNECT: Pattern<'static> = Pattern::Exact("CONNECT");
pub const OK_OR_ERROR: Pattern<'static> = Pattern::Any(&[OK, Pattern::Exact("ERROR")]);
pub const PROMPT: Pattern<'static> = Pattern::Prefix(">");
