//! Compound CSS selector matching for the in-memory document.
//!
//! Supports selector lists of compounds built from a tag (or `*`), `#id`,
//! `.class` and attribute tests (`[a]`, `[a=v]`, `[a*=v]`, `[a^=v]`, `[a$=v]`).
//! Combinators are rejected.

use std::iter::Peekable;
use std::str::Chars;

pub(crate) trait Matchable {
    fn tag(&self) -> String;
    fn attr(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectorList(Vec<Compound>);

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrTest {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
}

impl SelectorList {
    pub(crate) fn parse(input: &str) -> Result<Self, String> {
        let compounds = split_top_level(input)
            .into_iter()
            .map(|part| parse_compound(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        if compounds.is_empty() {
            return Err(format!("empty selector '{}'", input));
        }
        Ok(Self(compounds))
    }

    pub(crate) fn matches(&self, element: &impl Matchable) -> bool {
        self.0.iter().any(|compound| compound.matches(element))
    }
}

impl Compound {
    fn matches(&self, element: &impl Matchable) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag() != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attr("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = element.attr("class").unwrap_or_default();
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs.iter().all(|test| {
            let Some(actual) = element.attr(&test.name) else {
                return false;
            };
            match &test.op {
                AttrOp::Exists => true,
                AttrOp::Equals(v) => actual == *v,
                AttrOp::Contains(v) => !v.is_empty() && actual.contains(v.as_str()),
                AttrOp::Prefix(v) => !v.is_empty() && actual.starts_with(v.as_str()),
                AttrOp::Suffix(v) => !v.is_empty() && actual.ends_with(v.as_str()),
            }
        })
    }
}

fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

fn read_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&ch) = chars.peek() {
        if !is_ident_char(ch) {
            break;
        }
        ident.push(ch);
        chars.next();
    }
    ident
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn parse_compound(input: &str) -> Result<Compound, String> {
    if input.is_empty() {
        return Err("empty compound selector".to_string());
    }

    let mut compound = Compound::default();
    let mut chars = input.chars().peekable();

    if chars.peek() == Some(&'*') {
        chars.next();
    } else if chars.peek().is_some_and(|c| c.is_alphabetic()) {
        compound.tag = Some(read_ident(&mut chars).to_lowercase());
    }

    while let Some(ch) = chars.next() {
        match ch {
            '#' => {
                let id = read_ident(&mut chars);
                if id.is_empty() {
                    return Err(format!("missing id in '{}'", input));
                }
                compound.id = Some(id);
            }
            '.' => {
                let class = read_ident(&mut chars);
                if class.is_empty() {
                    return Err(format!("missing class in '{}'", input));
                }
                compound.classes.push(class);
            }
            '[' => compound.attrs.push(parse_attr(&mut chars, input)?),
            other => {
                return Err(format!(
                    "unsupported character '{}' in selector '{}'",
                    other, input
                ))
            }
        }
    }

    Ok(compound)
}

fn parse_attr(chars: &mut Peekable<Chars<'_>>, input: &str) -> Result<AttrTest, String> {
    skip_whitespace(chars);
    let name = read_ident(chars).to_lowercase();
    if name.is_empty() {
        return Err(format!("missing attribute name in '{}'", input));
    }
    skip_whitespace(chars);

    let op_char = match chars.next() {
        Some(']') => {
            return Ok(AttrTest {
                name,
                op: AttrOp::Exists,
            })
        }
        Some('=') => '=',
        Some(c @ ('*' | '^' | '$')) => {
            if chars.next() != Some('=') {
                return Err(format!("malformed attribute test in '{}'", input));
            }
            c
        }
        _ => return Err(format!("malformed attribute test in '{}'", input)),
    };

    skip_whitespace(chars);
    let value = match chars.peek().copied() {
        Some(q @ ('"' | '\'')) => {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == q => break,
                    Some(c) => value.push(c),
                    None => return Err(format!("unterminated string in '{}'", input)),
                }
            }
            value
        }
        _ => read_ident(chars),
    };
    skip_whitespace(chars);
    if chars.next() != Some(']') {
        return Err(format!("missing ']' in '{}'", input));
    }

    let op = match op_char {
        '=' => AttrOp::Equals(value),
        '*' => AttrOp::Contains(value),
        '^' => AttrOp::Prefix(value),
        _ => AttrOp::Suffix(value),
    };
    Ok(AttrTest { name, op })
}
