//! Marker scanner for `${ref}` and `#{expr}`.
//!
//! A small two-state machine walks the input once. Outside a token it looks for
//! `$` or `#` directly followed by `{`; inside a token the first `}` ends it.
//! Markers do not nest: in `${a${b}}` the marker is `${a${b}` and the trailing
//! `}` is plain text. Empty (`${}`) and unterminated markers are plain text.

/// Which kind of marker was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `${ref}`: resolved by name
    Plain,
    /// `#{expr}`: handed to the expression evaluator
    Expression,
}

/// One marker span in the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    pub kind: MarkerKind,
    /// Byte offset of the sigil
    pub start: usize,
    /// Byte offset just past the closing `}`
    pub end: usize,
    /// Text between the braces
    pub content: &'a str,
}

#[derive(Clone, Copy)]
enum State {
    Outside,
    Inside { kind: MarkerKind, start: usize },
}

/// Lazy iterator over the markers of a string, left to right.
pub struct MarkerScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> MarkerScanner<'a> {
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
        }
    }
}

impl<'a> Iterator for MarkerScanner<'a> {
    type Item = Marker<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.input.as_bytes();
        let mut state = State::Outside;
        let mut i = self.pos;

        while i < bytes.len() {
            match state {
                State::Outside => {
                    let kind = match bytes[i] {
                        b'$' => Some(MarkerKind::Plain),
                        b'#' => Some(MarkerKind::Expression),
                        _ => None,
                    };
                    match kind {
                        Some(kind) if bytes.get(i + 1) == Some(&b'{') => {
                            state = State::Inside {
                                kind,
                                start: i,
                            };
                            i += 2;
                        }
                        _ => i += 1,
                    }
                }
                State::Inside {
                    kind,
                    start,
                } => {
                    if bytes[i] == b'}' {
                        let content = &self.input[start + 2..i];
                        if content.is_empty() {
                            // `${}` is text; resume after it
                            state = State::Outside;
                            i += 1;
                            continue;
                        }
                        self.pos = i + 1;
                        return Some(Marker {
                            kind,
                            start,
                            end: i + 1,
                            content,
                        });
                    }
                    i += 1;
                }
            }
        }

        self.pos = bytes.len();
        None
    }
}

/// Whether `value` contains at least one marker.
#[must_use]
pub fn contains_markers(value: &str) -> bool {
    MarkerScanner::new(value).next().is_some()
}

/// Whether `value` contains at least one `#{...}` marker.
#[must_use]
pub fn contains_expression_markers(value: &str) -> bool {
    MarkerScanner::new(value).any(|m| m.kind == MarkerKind::Expression)
}
