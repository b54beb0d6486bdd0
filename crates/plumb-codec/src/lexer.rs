//! Token-level combinators shared by the transform grammars.

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit0, digit1, multispace0, multispace1, one_of},
    combinator::{map_res, opt, peek, recognize},
    sequence::{pair, preceded, tuple},
    IResult,
};

/// A recognized number: its source text and parsed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number<'a> {
    pub text: &'a str,
    pub value: f64,
}

/// Parse a number (optional sign, integer and/or fractional part).
///
/// Exponents are not part of the grammar; `1e5` stops after `1`.
pub fn number(input: &str) -> IResult<&str, Number<'_>> {
    map_res(
        recognize(pair(
            opt(one_of("+-")),
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
        )),
        |text: &str| text.parse::<f64>().map(|value| Number { text, value }),
    )(input)
}

/// Parse `name(` with optional whitespace before the parenthesis.
pub fn call_open<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    recognize(tuple((tag_no_case(name), multispace0, char('('), multispace0)))
}

/// Parse optional whitespace followed by `)`.
pub fn call_close(input: &str) -> IResult<&str, &str> {
    recognize(pair(multispace0, char(')')))(input)
}

/// A mandatory separator: whitespace, a comma, or both.
pub fn strict_separator(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((multispace0, char(','), multispace0))),
        multispace1,
    ))(input)
}

/// A [`strict_separator`], or nothing when the next number starts with a sign.
///
/// `1-2` splits into `1` and `-2` as SVG number lists allow, but two
/// digit-led or dot-led numbers must be separated: `5.5.5` is rejected.
pub fn loose_separator(input: &str) -> IResult<&str, &str> {
    alt((strict_separator, recognize(peek(one_of("+-")))))(input)
}

/// A number preceded by a separator.
pub fn separated_number<'a, S>(separator: S) -> impl FnMut(&'a str) -> IResult<&'a str, Number<'a>>
where
    S: FnMut(&'a str) -> IResult<&'a str, &'a str>,
{
    preceded(separator, number)
}
