use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// A run of text, marked when it equals the highlighted query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    pub highlighted: bool,
}

/// Split `text` into spans, marking every case-insensitive occurrence of `query`.
///
/// The query is matched literally; regex metacharacters have no meaning here.
pub fn highlight(text: &str, query: &str) -> Vec<Span> {
    if query.is_empty() {
        return vec![Span {
            text: text.to_string(),
            highlighted: false,
        }];
    }

    let Ok(pattern) = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    else {
        return vec![Span {
            text: text.to_string(),
            highlighted: false,
        }];
    };

    let mut spans = Vec::new();
    let mut last_end = 0;
    for (start, end) in merged_matches(&pattern, text) {
        if start > last_end {
            spans.push(Span {
                text: text[last_end..start].to_string(),
                highlighted: false,
            });
        }
        spans.push(Span {
            text: text[start..end].to_string(),
            highlighted: true,
        });
        last_end = end;
    }

    if last_end < text.len() {
        spans.push(Span {
            text: text[last_end..].to_string(),
            highlighted: false,
        });
    }

    spans
}

/// Byte ranges of every match, overlapping ones included, with overlaps merged.
fn merged_matches(pattern: &Regex, text: &str) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut from = 0;
    while from <= text.len() {
        let Some(found) = pattern.find_at(text, from) else {
            break;
        };
        match ranges.last_mut() {
            Some(last) if found.start() < last.1 => last.1 = last.1.max(found.end()),
            _ => ranges.push((found.start(), found.end())),
        }
        // Retry one character past this start so overlapping matches are seen.
        from = found.start()
            + text[found.start()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
    }
    ranges
}

/// Render spans with `open`/`close` wrapped around the highlighted runs.
pub fn render(spans: &[Span], open: &str, close: &str) -> String {
    let mut output = String::new();
    for span in spans {
        if span.highlighted {
            output.push_str(open);
            output.push_str(&span.text);
            output.push_str(close);
        } else {
            output.push_str(&span.text);
        }
    }
    output
}
