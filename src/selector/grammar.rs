use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use super::Segment;

// -- Keys -------------------------------------------------------------------

fn key<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| {
        !matches!(c, '.' | '[' | ']' | '\'' | '"' | '*') && !c.is_whitespace()
    })
    .parse_next(input)
}

fn quoted_key(input: &mut &str) -> ModalResult<String> {
    let quote = alt(('\'', '"')).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                s.push(esc);
            }
            c => s.push(c),
        }
    }
}

fn index(input: &mut &str) -> ModalResult<usize> {
    digit1.try_map(str::parse::<usize>).parse_next(input)
}

// -- Segments ---------------------------------------------------------------

fn dot_segment(input: &mut &str) -> ModalResult<Segment> {
    preceded(
        '.',
        cut_err(alt((
            '*'.value(Segment::Wildcard),
            key.map(|k: &str| Segment::Key(k.to_owned())),
        )))
        .context(StrContext::Expected(StrContextValue::Description(
            "key or '*' after '.'",
        ))),
    )
    .parse_next(input)
}

fn bracket_segment(input: &mut &str) -> ModalResult<Segment> {
    delimited(
        '[',
        cut_err(alt((
            '*'.value(Segment::Wildcard),
            index.map(Segment::Index),
            quoted_key.map(Segment::Key),
        )))
        .context(StrContext::Expected(StrContextValue::Description(
            "index, quoted key or '*' inside brackets",
        ))),
        cut_err(']').context(StrContext::Expected(StrContextValue::CharLiteral(']'))),
    )
    .parse_next(input)
}

fn segment(input: &mut &str) -> ModalResult<Segment> {
    alt((dot_segment, bracket_segment)).parse_next(input)
}

// -- Top-level parser -------------------------------------------------------

/// `$` is optional; without it the selector may start with a bare key
/// (`user.name`), which reads the same as `$.user.name`.
pub fn parse_selector(input: &mut &str) -> ModalResult<Vec<Segment>> {
    let mut segments = Vec::new();
    if opt('$').parse_next(input)?.is_none() {
        if let Some(first) = opt(key).parse_next(input)? {
            segments.push(Segment::Key(first.to_owned()));
        }
    }
    let rest: Vec<Segment> = repeat(0.., segment).parse_next(input)?;
    segments.extend(rest);
    Ok(segments)
}
