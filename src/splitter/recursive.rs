// SPDX-License-Identifier: MIT OR Apache-2.0

//! Length-bounded recursive splitter.
//!
//! Text is cut on the coarsest separator present (paragraph, line, sentence,
//! word, character). Adjacent pieces are merged up to `chunk_size` characters,
//! and the tail of each chunk is repeated at the start of the next up to
//! `chunk_overlap` characters. Pieces still above the bound are split again
//! with the next finer separator.

use std::collections::VecDeque;
use std::ops::Range;

/// Separators from coarsest to finest. The empty separator splits per character.
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A trimmed chunk borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    /// Character offset of `text` inside the splitter input.
    pub start: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// Expects `chunk_overlap < chunk_size`; see `ChunkConfig::new`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    /// Splits `text` into trimmed, non-empty chunks of at most `chunk_size` characters.
    pub fn split<'a>(&self, text: &'a str) -> Vec<Span<'a>> {
        let mut ranges = Vec::new();
        self.split_range(text, 0..text.len(), &SEPARATORS, &mut ranges);
        trimmed_spans(text, ranges)
    }

    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[&str],
        out: &mut Vec<Range<usize>>,
    ) {
        let slice = &text[range.clone()];
        let Some(position) = separators
            .iter()
            .position(|sep| sep.is_empty() || slice.contains(sep))
        else {
            out.push(range);
            return;
        };
        let finer = &separators[position + 1..];

        let mut fitting: Vec<Range<usize>> = Vec::new();
        for piece in pieces(slice, separators[position], range.start) {
            if char_len(&text[piece.clone()]) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            self.merge(text, &fitting, out);
            fitting.clear();
            if finer.is_empty() {
                out.push(piece);
            } else {
                self.split_range(text, piece, finer, out);
            }
        }
        self.merge(text, &fitting, out);
    }

    /// Merges contiguous pieces into windows of at most `chunk_size` characters.
    fn merge(&self, text: &str, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(&text[piece.clone()]);
            if total + len > self.chunk_size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    out.push(first.0.start..last.0.end);
                }
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece.clone(), len));
            total += len;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            out.push(first.0.start..last.0.end);
        }
    }
}

/// Cuts `slice` after every occurrence of `separator`, so separators stay
/// attached to the piece they end. Returned ranges are absolute (offset by `base`).
fn pieces(slice: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(i, c)| base + i..base + i + c.len_utf8())
            .collect();
    }

    let mut result = Vec::new();
    let mut start = 0;
    for (idx, matched) in slice.match_indices(separator) {
        let end = idx + matched.len();
        result.push(base + start..base + end);
        start = end;
    }
    if start < slice.len() {
        result.push(base + start..base + slice.len());
    }
    result
}

/// Trims each range and converts byte offsets to character offsets.
/// Ranges arrive with non-decreasing start, so the conversion is incremental.
fn trimmed_spans(text: &str, ranges: Vec<Range<usize>>) -> Vec<Span<'_>> {
    let mut spans = Vec::with_capacity(ranges.len());
    let mut byte_cursor = 0;
    let mut char_cursor = 0;

    for range in ranges {
        let raw = &text[range.clone()];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let start = range.start + (raw.len() - raw.trim_start().len());

        if start >= byte_cursor {
            char_cursor += char_len(&text[byte_cursor..start]);
        } else {
            char_cursor -= char_len(&text[start..byte_cursor]);
        }
        byte_cursor = start;

        spans.push(Span {
            start: char_cursor,
            text: trimmed,
        });
    }
    spans
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
