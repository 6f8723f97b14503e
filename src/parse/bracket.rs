//! Bracket atoms: `[isotope? symbol chirality? hcount? charge? class?]`.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt, recognize},
    error::{convert_error, ErrorKind, ParseError, VerboseError},
    multi::many1_count,
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::{Atom, Element};

pub type Error<'a> = VerboseError<&'a str>;

pub type Res<'a, T> = IResult<&'a str, T, Error<'a>>;

fn isotope(input: &str) -> Res<u16> {
    map_res(digit1, |digits: &str| digits.parse::<u16>())(input)
}

/// Element symbol, longest match first. Returns the element and whether it was
/// written in aromatic form.
fn element_symbol(input: &str) -> Res<(Element, bool)> {
    for len in [2, 1] {
        let candidate = match input.get(..len) {
            Some(candidate) => candidate,
            None => continue,
        };
        if len == 2 && !candidate.chars().skip(1).all(|c| c.is_ascii_lowercase()) {
            continue;
        }
        if let Ok(parsed) = Element::from_smiles(candidate) {
            return Ok((&input[len..], parsed));
        }
    }
    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::Alpha,
    )))
}

/// Tetrahedral and extended chirality marks. Stereo is not kept.
fn chirality(input: &str) -> Res<&str> {
    recognize(pair(
        many1_count(char('@')),
        opt(pair(
            alt((tag("TH"), tag("AL"), tag("SP"), tag("TB"), tag("OH"))),
            digit1,
        )),
    ))(input)
}

fn hydrogen_count(input: &str) -> Res<u8> {
    map_res(preceded(char('H'), opt(digit1)), |digits: Option<&str>| {
        digits.map_or(Ok(1), |digits| digits.parse::<u8>())
    })(input)
}

fn charge(input: &str) -> Res<i8> {
    alt((
        map_res(preceded(char('+'), digit1), |digits: &str| {
            digits.parse::<i8>()
        }),
        map_res(preceded(char('-'), digit1), |digits: &str| {
            digits.parse::<i8>().map(|charge| -charge)
        }),
        map(many1_count(char('+')), |count| count as i8),
        map(many1_count(char('-')), |count| -(count as i8)),
    ))(input)
}

fn atom_class(input: &str) -> Res<u32> {
    map_res(preceded(char(':'), digit1), |digits: &str| {
        digits.parse::<u32>()
    })(input)
}

fn bracket_atom(input: &str) -> Res<Atom> {
    let (input, (isotope, (element, aromatic), _, hydrogens, charge, atom_map)) = tuple((
        opt(isotope),
        element_symbol,
        opt(chirality),
        opt(hydrogen_count),
        opt(charge),
        opt(atom_class),
    ))(input)?;

    Ok((
        input,
        Atom {
            element,
            aromatic,
            charge: charge.unwrap_or(0),
            isotope: isotope.unwrap_or(0),
            hydrogens: Some(hydrogens.unwrap_or(0)),
            atom_map: atom_map.unwrap_or(0),
        },
    ))
}

/// Parse the content between `[` and `]` into an atom.
///
/// Bracket atoms always carry an explicit hydrogen count, `0` when none is
/// written.
pub fn parse_bracket_atom(content: &str) -> Result<Atom, String> {
    match all_consuming(bracket_atom)(content) {
        Ok((_, atom)) => Ok(atom),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(convert_error(content, e)),
        Err(nom::Err::Incomplete(_)) => Err("incomplete".to_string()),
    }
}
