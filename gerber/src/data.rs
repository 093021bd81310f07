//! Low level token parsers shared by the command grammar: integers,
//! decimals, names, and aperture identifiers.
//!
//! Kept and generalized from the project's earlier nom-based grammar
//! sketch: the numeric/name parsers below are unchanged in spirit, with
//! the aperture identifier lower bound (`>= 10`) now enforced as the spec
//! requires rather than accepting any positive integer.

use nom::{
    branch::alt,
    character::complete::{anychar, char, digit0, digit1, one_of},
    combinator::{map, not, opt, peek, recognize, verify},
    multi::{many0, many_m_n},
    sequence::{pair, preceded, terminated},
    IResult,
};

use crate::aperture::ApertureId;

/// Parse a string of ASCII digits into an i32.
fn into_i32(x: &str) -> i32 {
    x.parse().expect("caller verified all-digit input")
}

/// Parse a positive integer, tolerating leading zeros.
pub(crate) fn positive_integer(input: &str) -> IResult<&str, i32> {
    map(preceded(many0(char('0')), digit1), into_i32)(input)
}

fn into_f64(x: &str) -> f64 {
    x.parse().expect("caller verified numeric input")
}

/// Parse a non-negative decimal (`12`, `12.`, `.5`, `12.34`).
pub(crate) fn unsigned_decimal(input: &str) -> IResult<&str, f64> {
    map(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        into_f64,
    )(input)
}

/// Parse a signed decimal.
pub(crate) fn decimal(input: &str) -> IResult<&str, f64> {
    map(pair(opt(one_of("+-")), unsigned_decimal), |(sign, val)| {
        if sign == Some('-') {
            -val
        } else {
            val
        }
    })(input)
}

/// Parse a `Dnn` aperture identifier with `nn >= 10`.
pub(crate) fn aperture_identifier(input: &str) -> IResult<&str, ApertureId> {
    verify(
        map(preceded(char('D'), positive_integer), ApertureId),
        |id| id.0 >= 10,
    )(input)
}

fn name_fragment_first(input: &str) -> IResult<&str, char> {
    verify(anychar, |&c| c.is_alphabetic() || c == '_' || c == '$')(input)
}

fn name_fragment_rest(input: &str) -> IResult<&str, char> {
    verify(anychar, |&c| {
        c.is_alphanumeric() || c == '.' || c == '_' || c == '$'
    })(input)
}

fn user_name_shorter_than(max: usize) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| {
        if max == 0 {
            Ok((input, ""))
        } else {
            recognize(pair(
                name_fragment_first,
                terminated(
                    many_m_n(0, max - 1, name_fragment_rest),
                    peek(not(name_fragment_rest)),
                ),
            ))(input)
        }
    }
}

/// Parse a user defined name (up to 127 characters).
pub(crate) fn user_name(input: &str) -> IResult<&str, &str> {
    user_name_shorter_than(127)(input)
}

/// Parse a system defined name (leading `.`, up to 127 characters total).
pub(crate) fn system_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('.'), user_name_shorter_than(126)))(input)
}

/// Parse a system or user defined name.
pub(crate) fn name(input: &str) -> IResult<&str, &str> {
    alt((system_name, user_name))(input)
}
