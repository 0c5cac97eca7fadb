//! Multi-line to single-line log coalescing.
//!
//! Java services wrap stack traces over several physical lines. The only
//! reliable record boundary is the next line that starts with a severity, so
//! every line up to that point is folded into the current logical line,
//! joined with `"; "`.

use std::str::Lines;

use lazy_static::lazy_static;
use regex::Regex;

/// Separator placed between the physical lines of one logical line.
pub const CONTINUATION_SEPARATOR: &str = "; ";

lazy_static! {
    /// A physical line that starts a new record.
    static ref HEADER_PATTERN: Regex = Regex::new(r"^(?:INFO|WARN|ERROR)").unwrap();
}

/// True when `line` starts a new log record.
pub fn is_header(line: &str) -> bool {
    HEADER_PATTERN.is_match(line)
}

/// Lazily coalesce `raw` into logical lines.
pub fn coalesce(raw: &str) -> Coalescer<'_> {
    Coalescer {
        lines: raw.lines(),
        pending: Vec::new(),
    }
}

/// Iterator over the logical lines of one input text.
///
/// Blank physical lines are dropped. Lines ahead of the first header form
/// their own logical line.
#[derive(Debug)]
pub struct Coalescer<'a> {
    lines: Lines<'a>,
    pending: Vec<&'a str>,
}

impl<'a> Coalescer<'a> {
    fn flush(&mut self) -> String {
        let logical = self.pending.join(CONTINUATION_SEPARATOR);
        self.pending.clear();
        logical
    }
}

impl<'a> Iterator for Coalescer<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for raw in self.lines.by_ref() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if is_header(line) && !self.pending.is_empty() {
                let logical = self.flush();
                self.pending.push(line);
                return Some(logical);
            }
            self.pending.push(line);
        }

        if self.pending.is_empty() {
            None
        } else {
            Some(self.flush())
        }
    }
}

impl std::iter::FusedIterator for Coalescer<'_> {}
