// SPDX-License-Identifier: MIT OR Apache-2.0

//! Markdown section splitting on `#`, `##` and `###` headers.

/// Deepest header level that opens a new section.
pub const MAX_HEADER_LEVEL: usize = 3;

/// Text between two headers, with the header trail that applies to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    /// Character offset of `text` inside the document.
    pub start: usize,
    pub text: &'a str,
    /// `(level, title)` pairs, outermost first.
    pub headers: Vec<(usize, String)>,
}

impl Section<'_> {
    /// Titles joined as `"A > B > C"`; empty before the first header.
    pub fn header_path(&self) -> String {
        self.headers
            .iter()
            .map(|(_, title)| title.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// Splits a markdown document into sections. Header lines are dropped from the
/// section text; headers inside fenced code blocks are ignored. Sections that
/// are only whitespace are omitted.
pub fn sections(text: &str) -> Vec<Section<'_>> {
    let mut result = Vec::new();
    let mut trail: [Option<String>; MAX_HEADER_LEVEL] = Default::default();
    let mut in_fence = false;

    let mut byte_offset = 0;
    let mut char_offset = 0;
    let mut section_bytes = 0;
    let mut section_chars = 0;

    for line in text.split_inclusive('\n') {
        let line_start = byte_offset;
        byte_offset += line.len();
        char_offset += line.chars().count();

        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some((level, title)) = parse_header(line) {
            push_section(&mut result, text, section_bytes..line_start, section_chars, &trail);
            trail[level - 1] = Some(title.to_string());
            for deeper in trail.iter_mut().skip(level) {
                *deeper = None;
            }
            section_bytes = byte_offset;
            section_chars = char_offset;
        }
    }

    push_section(&mut result, text, section_bytes..text.len(), section_chars, &trail);
    result
}

fn push_section<'a>(
    out: &mut Vec<Section<'a>>,
    text: &'a str,
    range: std::ops::Range<usize>,
    start: usize,
    trail: &[Option<String>],
) {
    let body = &text[range];
    if body.trim().is_empty() {
        return;
    }
    let headers = trail
        .iter()
        .enumerate()
        .filter_map(|(i, title)| title.clone().map(|t| (i + 1, t)))
        .collect();
    out.push(Section {
        start,
        text: body,
        headers,
    });
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Recognises `#`..`###` ATX headers, including closing `#` runs.
fn parse_header(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > MAX_HEADER_LEVEL {
        return None;
    }

    let rest = &line[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim_end();
    if title.is_empty() {
        None
    } else {
        Some((level, title))
    }
}
