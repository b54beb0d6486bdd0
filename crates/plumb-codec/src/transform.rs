//! Decoding and re-encoding of `translate(...)` and `matrix(...)` strings.
//!
//! Decoding locates the first well-formed call of the requested grammar
//! anywhere in the attribute value. Encoding splices a new x value into the
//! original text, so every byte outside the x field survives unchanged.

use std::fmt;
use std::ops::Range;

use nom::{multi::count, sequence::tuple, IResult, Offset};
use plumb_core::EncodingKind;

use crate::lexer::*;

/// A decoded 2D positional encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Translate { x: f64, y: f64 },
    Matrix { a: f64, b: f64, c: f64, d: f64, x: f64, y: f64 },
}

impl Transform {
    pub fn kind(&self) -> EncodingKind {
        match self {
            Transform::Translate { .. } => EncodingKind::Translate,
            Transform::Matrix { .. } => EncodingKind::Matrix,
        }
    }

    /// Horizontal offset.
    pub fn x(&self) -> f64 {
        match *self {
            Transform::Translate { x, .. } | Transform::Matrix { x, .. } => x,
        }
    }

    /// Vertical offset.
    pub fn y(&self) -> f64 {
        match *self {
            Transform::Translate { y, .. } | Transform::Matrix { y, .. } => y,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Transform::Translate { x, y } => {
                write!(f, "translate({} {})", format_number(x), format_number(y))
            }
            Transform::Matrix { a, b, c, d, x, y } => write!(
                f,
                "matrix({}, {}, {}, {}, {}, {})",
                format_number(a),
                format_number(b),
                format_number(c),
                format_number(d),
                format_number(x),
                format_number(y),
            ),
        }
    }
}

/// A transform decoded from, and still tied to, its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<'a> {
    transform: Transform,
    source: &'a str,
    x_field: Range<usize>,
}

impl<'a> Decoded<'a> {
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn kind(&self) -> EncodingKind {
        self.transform.kind()
    }

    pub fn x(&self) -> f64 {
        self.transform.x()
    }

    pub fn y(&self) -> f64 {
        self.transform.y()
    }

    /// The full attribute value this was decoded from.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Source text of the x field.
    pub fn x_text(&self) -> &'a str {
        &self.source[self.x_field.clone()]
    }
}

/// Decode a positional encoding, probing translate first, then matrix.
///
/// Returns `None` for empty input or when neither grammar matches.
pub fn decode(source: &str) -> Option<Decoded<'_>> {
    decode_as(source, EncodingKind::Translate).or_else(|| decode_as(source, EncodingKind::Matrix))
}

/// Decode against one grammar only.
pub fn decode_as(source: &str, kind: EncodingKind) -> Option<Decoded<'_>> {
    if source.trim().is_empty() {
        return None;
    }

    let keyword = kind.as_str().as_bytes();

    // The keyword is ASCII, so every match position is a char boundary.
    source
        .as_bytes()
        .windows(keyword.len())
        .enumerate()
        .filter(|(_, window)| window.eq_ignore_ascii_case(keyword))
        .find_map(|(i, _)| {
            let input = &source[i..];
            let parsed = match kind {
                EncodingKind::Translate => parse_translate(input),
                EncodingKind::Matrix => parse_matrix(input),
            };
            parsed.ok().map(|(_, (transform, x_text))| {
                let start = source.offset(x_text);
                Decoded {
                    transform,
                    source,
                    x_field: start..start + x_text.len(),
                }
            })
        })
}

/// Re-encode with a new x offset, in the same grammar as `decoded`.
///
/// Only the x field is rewritten. An unchanged or non-finite `new_x` returns
/// the source text as is.
pub fn encode(decoded: &Decoded<'_>, new_x: f64) -> String {
    if new_x == decoded.x() || !new_x.is_finite() {
        return decoded.source.to_string();
    }

    let number = format_number(new_x);
    let head = &decoded.source[..decoded.x_field.start];
    let mut out = String::with_capacity(decoded.source.len() + number.len() + 1);
    out.push_str(head);
    // `1-5` loses its boundary once the sign goes away.
    let glued = head.ends_with(|c: char| c.is_ascii_digit() || c == '.');
    if glued && !number.starts_with('-') {
        out.push(' ');
    }
    out.push_str(&number);
    out.push_str(&decoded.source[decoded.x_field.end..]);
    out
}

/// Shortest round-trip decimal form; negative zero prints as `0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

/// `translate(x y)`; yields the transform and the x field's text.
fn parse_translate(input: &str) -> IResult<&str, (Transform, &str)> {
    let (rest, (_, x, y, _)) = tuple((
        call_open("translate"),
        number,
        separated_number(strict_separator),
        call_close,
    ))(input)?;

    Ok((rest, (Transform::Translate { x: x.value, y: y.value }, x.text)))
}

/// `matrix(a b c d x y)` with optional commas between arguments.
///
/// Arguments need whitespace or a comma between them unless the next one
/// starts with a sign, so `matrix(1 0 0 1 5-3)` is x = 5, y = -3 while
/// `matrix(1 0 0 1 5.5.5)` does not decode.
fn parse_matrix(input: &str) -> IResult<&str, (Transform, &str)> {
    let (rest, (_, a, tail, _)) = tuple((
        call_open("matrix"),
        number,
        count(separated_number(loose_separator), 5),
        call_close,
    ))(input)?;

    let transform = Transform::Matrix {
        a: a.value,
        b: tail[0].value,
        c: tail[1].value,
        d: tail[2].value,
        x: tail[3].value,
        y: tail[4].value,
    };
    Ok((rest, (transform, tail[3].text)))
}
