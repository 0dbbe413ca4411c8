//! Recursive character splitting with overlap
//!
//! Text is cut into atoms no longer than `chunk_size` characters by trying
//! each separator in priority order, then atoms are merged greedily into
//! chunks. Consecutive chunks share at most `chunk_overlap` characters.
//! Separators stay attached to the piece before them and nothing is trimmed,
//! so chunk spans tile the input with no gaps.

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::ChunkingConfig;

/// A chunk borrowed from the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan<'a> {
    /// Position in the chunk sequence
    pub index: usize,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    pub text: &'a str,
}

/// Recursive splitter, reusable across documents
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a new chunker. Overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(
            config.chunk_size,
            config.chunk_overlap,
            config.separators.clone(),
        )
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily split `text`. Each call starts over from the beginning.
    ///
    /// Always yields at least one chunk; empty input yields a single empty one.
    pub fn split<'a>(&'a self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            atoms: Atoms {
                text,
                separators: &self.separators,
                chunk_size: self.chunk_size,
                stack: vec![(0..text.len(), 0)],
            },
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            window: VecDeque::new(),
            window_chars: 0,
            next_index: 0,
            finished: false,
        }
    }
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

/// Split `range` after every occurrence of `separator`.
fn split_keeping_separator(text: &str, range: Range<usize>, separator: &str) -> Vec<Range<usize>> {
    let slice = &text[range.clone()];
    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, matched) in slice.match_indices(separator) {
        let end = idx + matched.len();
        if end > last {
            pieces.push(range.start + last..range.start + end);
            last = end;
        }
    }
    if last < slice.len() {
        pieces.push(range.start + last..range.end);
    }
    pieces
}

/// Depth-first producer of spans that fit in `chunk_size`
#[derive(Debug, Clone)]
struct Atoms<'a> {
    text: &'a str,
    separators: &'a [String],
    chunk_size: usize,
    /// Pending ranges with the separator level to resume at
    stack: Vec<(Range<usize>, usize)>,
}

impl<'a> Iterator for Atoms<'a> {
    type Item = (Range<usize>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((range, level)) = self.stack.pop() {
            if range.is_empty() {
                continue;
            }
            let len = char_len(self.text, &range);
            if len <= self.chunk_size {
                return Some((range, len));
            }

            let mut level = level;
            loop {
                match self.separators.get(level) {
                    Some(sep) if !sep.is_empty() => {
                        let pieces = split_keeping_separator(self.text, range.clone(), sep);
                        if pieces.len() > 1 {
                            self.stack
                                .extend(pieces.into_iter().rev().map(|p| (p, level + 1)));
                            break;
                        }
                        level += 1;
                    }
                    // Empty separator or none left: one character per piece
                    _ => {
                        let base = range.start;
                        let chars: Vec<Range<usize>> = self.text[range.clone()]
                            .char_indices()
                            .map(|(i, c)| base + i..base + i + c.len_utf8())
                            .collect();
                        self.stack
                            .extend(chars.into_iter().rev().map(|r| (r, usize::MAX)));
                        break;
                    }
                }
            }
        }
        None
    }
}

/// Lazy chunk sequence returned by [`TextChunker::split`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    atoms: Atoms<'a>,
    chunk_size: usize,
    chunk_overlap: usize,
    window: VecDeque<(Range<usize>, usize)>,
    window_chars: usize,
    next_index: usize,
    finished: bool,
}

impl<'a> Chunks<'a> {
    fn emit(&mut self, start: usize, end: usize) -> TextSpan<'a> {
        let span = TextSpan {
            index: self.next_index,
            start,
            end,
            text: &self.text[start..end],
        };
        self.next_index += 1;
        span
    }

    fn window_bounds(&self) -> Option<(usize, usize)> {
        match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) => Some((first.0.start, last.0.end)),
            _ => None,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = TextSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some((range, len)) = self.atoms.next() {
            if self.window_chars + len > self.chunk_size {
                if let Some((start, end)) = self.window_bounds() {
                    // Keep a suffix no longer than the overlap that still fits with the new atom
                    while self.window_chars > self.chunk_overlap
                        || self.window_chars + len > self.chunk_size
                    {
                        match self.window.pop_front() {
                            Some((_, dropped)) => self.window_chars -= dropped,
                            None => break,
                        }
                    }
                    self.window.push_back((range, len));
                    self.window_chars += len;
                    return Some(self.emit(start, end));
                }
            }
            self.window.push_back((range, len));
            self.window_chars += len;
        }

        self.finished = true;
        match self.window_bounds() {
            Some((start, end)) => {
                self.window.clear();
                self.window_chars = 0;
                Some(self.emit(start, end))
            }
            None if self.next_index == 0 => Some(self.emit(0, self.text.len())),
            None => None,
        }
    }
}
