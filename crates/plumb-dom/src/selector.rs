//! A small CSS selector engine.
//!
//! Supported: type selectors, `*`, `.class`, `#id`, `[attr]`, `[attr=value]`,
//! descendant (whitespace) and child (`>`) combinators, and comma-separated
//! lists. Matching runs right to left against the element tree.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt, value, verify},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use plumb_core::{NodeId, SelectorError};
use smallvec::SmallVec;

use crate::tree::Document;

/// A parsed selector list (`a, b`): matches if any member matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators, e.g. `svg > g .label`.
#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    /// `combinators[i]` links `compounds[i]` to `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    /// `None` for `*` or an omitted type
    tag: Option<String>,
    parts: SmallVec<[Simple; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
enum Simple {
    Class(String),
    Id(String),
    Attribute { name: String, value: Option<String> },
}

impl SelectorList {
    /// Parse a selector list.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        match all_consuming(selector_list)(trimmed) {
            Ok((_, selectors)) => Ok(Self { selectors }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SelectorError::Syntax {
                selector: input.to_string(),
                offset: trimmed.len() - e.input.len(),
                reason: "unexpected input".to_string(),
            }),
            Err(nom::Err::Incomplete(_)) => Err(SelectorError::Syntax {
                selector: input.to_string(),
                offset: trimmed.len(),
                reason: "incomplete selector".to_string(),
            }),
        }
    }

    /// Check whether `node` matches any selector in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }
}

impl ComplexSelector {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.compounds.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent(node)
                .map_or(false, |parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.parts.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(element) = doc.element(node) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        self.parts.iter().all(|part| match part {
            Simple::Class(class) => element.has_class(class),
            Simple::Id(id) => element.attribute("id") == Some(id.as_str()),
            Simple::Attribute { name, value: None } => element.attribute(name).is_some(),
            Simple::Attribute { name, value: Some(expected) } => {
                element.attribute(name) == Some(expected.as_str())
            }
        })
    }
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, Simple> {
    map(
        delimited(
            pair(char('['), multispace0),
            pair(
                ident,
                opt(preceded(
                    tuple((multispace0, char('='), multispace0)),
                    alt((quoted, ident)),
                )),
            ),
            pair(multispace0, char(']')),
        ),
        |(name, value)| Simple::Attribute {
            name: name.to_string(),
            value: value.map(str::to_string),
        },
    )(input)
}

fn simple(input: &str) -> IResult<&str, Simple> {
    alt((
        map(preceded(char('.'), ident), |s| Simple::Class(s.to_string())),
        map(preceded(char('#'), ident), |s| Simple::Id(s.to_string())),
        attribute,
    ))(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
    verify(
        map(
            pair(
                opt(alt((map(tag("*"), |_| None), map(ident, |s: &str| Some(s.to_string()))))),
                many0(simple),
            ),
            |(tag, parts)| Compound {
                tag: tag.flatten(),
                parts: parts.into_iter().collect(),
            },
        ),
        |c: &Compound| !c.is_empty() || input.starts_with('*'),
    )(input)
}

fn combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        value(Combinator::Child, tuple((multispace0, char('>'), multispace0))),
        value(Combinator::Descendant, multispace1),
    ))(input)
}

fn complex_selector(input: &str) -> IResult<&str, ComplexSelector> {
    map(
        pair(compound, many0(pair(combinator, compound))),
        |(first, rest)| {
            let mut compounds = vec![first];
            let mut combinators = Vec::with_capacity(rest.len());
            for (combinator, compound) in rest {
                combinators.push(combinator);
                compounds.push(compound);
            }
            ComplexSelector { compounds, combinators }
        },
    )(input)
}

fn selector_list(input: &str) -> IResult<&str, Vec<ComplexSelector>> {
    separated_list1(tuple((multispace0, char(','), multispace0)), complex_selector)(input)
}
