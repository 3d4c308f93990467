//! Segment grammar shared by `a`/`d`/`e`/`x` char commands: the
//! `<index> <length> <content>` triples described in spec §3 and §9.
//!
//! Content may itself contain spaces (`"10 5 hello world 20 ..."`), which
//! rules out a naive split-on-space tokenizer. We resolve this the way
//! §9 prescribes: a cheap *fast path* for the common case where content
//! has no embedded space, a *join-the-rest-and-slice* fallback that trusts
//! the declared length to find the exact end of content even when it
//! contains spaces or digits that could be mistaken for the next header,
//! and an *overrun* fallback for a payload that runs out of characters
//! before the declared length is satisfied (kept instead of panicking, so
//! malformed input degrades to a parse error the caller can treat as a
//! format error per §7).

use core::fmt;

/// One `<index> <length> <content>` (or `<index> <length>` for unsafe
/// commands) span within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Character offset within the referenced line.
    pub index: usize,
    /// Declared length of `content` (chars in text mode, Base64 chars in
    /// binary mode; for unsafe segments, the original span length).
    pub length: usize,
    /// `None` only for `x`/`x*` segments, which omit content to save
    /// bytes and are therefore not invertible (spec §4.3 "Inversion").
    pub content: Option<String>,
}

/// Error produced while tokenizing a segment payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentParseError {
    /// Expected a decimal integer at this point in the payload.
    ExpectedInteger { payload: String, at: usize },
    /// Expected a single space separator.
    ExpectedSeparator { payload: String, at: usize },
    /// The payload ran out of characters before `length` content chars
    /// could be read (the "overrun" fallback case from §9).
    ContentOverrun {
        payload: String,
        declared_length: usize,
        available: usize,
    },
}

impl fmt::Display for SegmentParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentParseError::ExpectedInteger { payload, at } => {
                write!(f, "expected integer at offset {at} in segment payload {payload:?}")
            }
            SegmentParseError::ExpectedSeparator { payload, at } => {
                write!(f, "expected separator at offset {at} in segment payload {payload:?}")
            }
            SegmentParseError::ContentOverrun {
                payload,
                declared_length,
                available,
            } => write!(
                f,
                "segment declared length {declared_length} but only {available} characters remained in {payload:?}"
            ),
        }
    }
}

impl std::error::Error for SegmentParseError {}

/// Serializes segments as space-joined `<index> <length> <content>` (or
/// `<index> <length>` when `with_content` is false).
pub fn serialize_segments(segments: &[Segment], with_content: bool) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&seg.index.to_string());
        out.push(' ');
        out.push_str(&seg.length.to_string());
        if with_content {
            out.push(' ');
            out.push_str(seg.content.as_deref().unwrap_or(""));
        }
    }
    out
}

/// Parses a payload of one or more segments.
///
/// `with_content` is `false` for `x`/`x*` payloads, whose segments are
/// `<index> <length>` only.
pub fn parse_segments(payload: &str, with_content: bool) -> Result<Vec<Segment>, SegmentParseError> {
    let chars: Vec<char> = payload.chars().collect();
    let mut pos = 0usize;
    let mut segments = Vec::new();

    while pos < chars.len() {
        let index = read_uint(&chars, payload, &mut pos)?;
        expect_space(&chars, payload, &mut pos)?;
        let length = read_uint(&chars, payload, &mut pos)?;

        if !with_content {
            segments.push(Segment { index, length, content: None });
            if pos < chars.len() {
                expect_space(&chars, payload, &mut pos)?;
            }
            continue;
        }

        expect_space(&chars, payload, &mut pos)?;

        // The common case (fast path) is content with no embedded space,
        // ending right before the next segment's header or end of
        // payload. But since `length` is authoritative, we always resolve
        // content by slicing exactly `length` chars from the cursor (the
        // join-the-rest-and-slice rule) rather than guessing a word
        // boundary — that's what makes embedded spaces/digits safe.
        let remaining = chars.len() - pos;
        if remaining < length {
            return Err(SegmentParseError::ContentOverrun {
                payload: payload.to_string(),
                declared_length: length,
                available: remaining,
            });
        }
        let content: String = chars[pos..pos + length].iter().collect();
        pos += content.chars().count();
        segments.push(Segment { index, length, content: Some(content) });

        if pos < chars.len() {
            expect_space(&chars, payload, &mut pos)?;
        }
    }

    Ok(segments)
}

fn read_uint(chars: &[char], payload: &str, pos: &mut usize) -> Result<usize, SegmentParseError> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return Err(SegmentParseError::ExpectedInteger {
            payload: payload.to_string(),
            at: start,
        });
    }
    let s: String = chars[start..*pos].iter().collect();
    Ok(s.parse().expect("ascii digits parse as usize"))
}

fn expect_space(chars: &[char], payload: &str, pos: &mut usize) -> Result<(), SegmentParseError> {
    if chars.get(*pos) != Some(&' ') {
        return Err(SegmentParseError::ExpectedSeparator {
            payload: payload.to_string(),
            at: *pos,
        });
    }
    *pos += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_segment() {
        let segs = vec![Segment { index: 6, length: 1, content: Some("x".into()) }];
        let payload = serialize_segments(&segs, true);
        assert_eq!(payload, "6 1 x");
        assert_eq!(parse_segments(&payload, true).unwrap(), segs);
    }

    #[test]
    fn round_trips_multiple_segments() {
        let segs = vec![
            Segment { index: 0, length: 2, content: Some("  ".into()) },
        ];
        let payload = serialize_segments(&segs, true);
        assert_eq!(payload, "0 2   ");
        assert_eq!(parse_segments(&payload, true).unwrap(), segs);
    }

    #[test]
    fn handles_content_containing_spaces() {
        let segs = vec![Segment { index: 10, length: 11, content: Some("hello world".into()) }];
        let payload = serialize_segments(&segs, true);
        assert_eq!(parse_segments(&payload, true).unwrap(), segs);
    }

    #[test]
    fn multiple_segments_one_with_embedded_space() {
        let segs = vec![
            Segment { index: 10, length: 11, content: Some("hello world".into()) },
            Segment { index: 30, length: 3, content: Some("abc".into()) },
        ];
        let payload = serialize_segments(&segs, true);
        assert_eq!(parse_segments(&payload, true).unwrap(), segs);
    }

    #[test]
    fn unsafe_segments_omit_content() {
        let segs = vec![Segment { index: 4, length: 3, content: None }];
        let payload = serialize_segments(&segs, false);
        assert_eq!(payload, "4 3");
        assert_eq!(parse_segments(&payload, false).unwrap(), segs);
    }

    #[test]
    fn overrun_is_reported() {
        let err = parse_segments("0 99 short", true).unwrap_err();
        assert!(matches!(err, SegmentParseError::ContentOverrun { .. }));
    }
}
