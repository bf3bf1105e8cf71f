//! The `parser` module contains functions for parsing the house number and its repetition
//! marker out of unstructured address text.
use crate::normalize;
use nom::IResult;
use nom::Parser as _;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, digit1, space0};
use nom::combinator::{map_res, opt};

/// The `Parser` struct holds methods for parsing addresses.
#[derive(Debug, Copy, Clone)]
pub struct Parser;

impl Parser {
    /// The `number` method expects one or more numeric digits at the head of the input,
    /// returned as a u32 value. Finding none is not an error; the input is handed back
    /// untouched with `None`.
    pub fn number(input: &str) -> IResult<&str, Option<u32>> {
        // Strip preceding whitespace.
        let (remaining, _) = space0(input)?;
        // Digit1 takes one or more digits, map_res converts them through str::parse.
        match map_res(digit1::<&str, nom::error::Error<&str>>, str::parse::<u32>).parse(remaining)
        {
            Ok((rem, num)) => Ok((rem, Some(num))),
            Err(_) => Ok((remaining, None)),
        }
    }

    /// The `repetition` method attempts to read the marker following a house number: "bis",
    /// "ter" or a lone letter, optionally separated from the number by a comma. A word that is
    /// not a marker is left in place and `None` is returned, so "630, la Chèvre" keeps "la".
    pub fn repetition(input: &str) -> IResult<&str, Option<String>> {
        // Strip preceding whitespace and an optional comma.
        let (remaining, _) = space0(input)?;
        let (remaining, _) = opt(tag(",")).parse(remaining)?;
        let (candidate, _) = space0(remaining)?;
        if let Ok((rem, word)) = alpha1::<&str, nom::error::Error<&str>>(candidate) {
            if let Some(marker) = normalize::repetition_letter(&word.to_ascii_uppercase()) {
                return Ok((rem, Some(marker)));
            }
        }
        Ok((remaining, None))
    }

    /// The `house_number` method extracts `(number, suffix)` from a free-form address line,
    /// where the suffix is the normalized repetition marker or empty. Returns `None` when the
    /// address does not start with a number.
    pub fn house_number(input: &str) -> Option<(u32, String)> {
        let (remaining, number) = Self::number(input).ok()?;
        let number = number?;
        let (_, suffix) = Self::repetition(remaining).ok()?;
        Some((number, suffix.unwrap_or_default()))
    }
}
