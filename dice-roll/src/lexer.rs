/*
Copyright 2021 Robin Marchart

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

use crate::{
    dice_types::{Comparator, Condition, DiceType, Modifier, SortOrder},
    error::SyntaxError,
};

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, satisfy},
    combinator::{map, opt, recognize, success},
    sequence::{pair, tuple},
    IResult,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Number(i64),
    Dice {
        count: Option<u32>,
        dice: Option<DiceType>,
    },
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Modifier(Modifier),
    Ident,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub position: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Keyword {
    KeepHighest,
    KeepLowest,
    DropHighest,
    DropLowest,
    Reroll,
    RerollOnce,
    Explode,
    Min,
    Max,
    CountSuccess,
    SortAscending,
    SortDescending,
}

/// Argument of a modifier before conversion: an optional comparator and the digits after it.
type Argument<'a> = (Option<Comparator>, &'a str);

/// Raw pieces recognized by the combinators, converted into tokens by [`tokenize`].
#[derive(Debug, PartialEq, Eq)]
enum Lexeme<'a> {
    Number(&'a str),
    Dice(Option<&'a str>, Option<&'a str>),
    Symbol(TokenKind),
    Modifier(Keyword, Option<Argument<'a>>),
    Ident,
}

fn parse_comparator(input: &str) -> IResult<&str, Comparator> {
    alt((
        map(tag(">="), |_| Comparator::BiggerEq),
        map(tag(">"), |_| Comparator::Bigger),
        map(tag("<="), |_| Comparator::SmallerEq),
        map(tag("<"), |_| Comparator::Smaller),
        map(tag("="), |_| Comparator::Equal),
    ))(input)
}

fn parse_signed(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(char('-')), digit1))(input)
}

/// A negative target is only accepted after an explicit comparator, otherwise
/// `1d6!-2` would read the subtraction as part of the condition.
fn parse_condition(input: &str) -> IResult<&str, Argument<'_>> {
    alt((
        map(pair(parse_comparator, parse_signed), |(c, t)| (Some(c), t)),
        map(digit1, |t| (None, t)),
    ))(input)
}

fn parse_keyword(input: &str) -> IResult<&str, Keyword> {
    alt((
        map(tag_no_case("kh"), |_| Keyword::KeepHighest),
        map(tag_no_case("kl"), |_| Keyword::KeepLowest),
        map(tag_no_case("k"), |_| Keyword::KeepHighest),
        map(tag_no_case("dh"), |_| Keyword::DropHighest),
        map(tag_no_case("dl"), |_| Keyword::DropLowest),
        map(tag_no_case("ro"), |_| Keyword::RerollOnce),
        map(tag_no_case("r"), |_| Keyword::Reroll),
        map(tag("!"), |_| Keyword::Explode),
        map(tag_no_case("min"), |_| Keyword::Min),
        map(tag_no_case("max"), |_| Keyword::Max),
        map(tag_no_case("cs"), |_| Keyword::CountSuccess),
        map(tag_no_case("sa"), |_| Keyword::SortAscending),
        map(tag_no_case("sd"), |_| Keyword::SortDescending),
        map(tag_no_case("s"), |_| Keyword::SortAscending),
    ))(input)
}

fn parse_modifier(input: &str) -> IResult<&str, Lexeme<'_>> {
    let (rest, keyword) = parse_keyword(input)?;
    let (rest, argument) = match keyword {
        Keyword::Min | Keyword::Max => opt(map(parse_signed, |t| (None, t)))(rest)?,
        Keyword::SortAscending | Keyword::SortDescending => success(None)(rest)?,
        _ => opt(parse_condition)(rest)?,
    };
    Ok((rest, Lexeme::Modifier(keyword, argument)))
}

fn parse_dice(input: &str) -> IResult<&str, Lexeme<'_>> {
    map(
        tuple((
            opt(digit1),
            tag_no_case("d"),
            opt(alt((digit1, tag("%"), tag_no_case("f")))),
        )),
        |(count, _, faces)| Lexeme::Dice(count, faces),
    )(input)
}

fn parse_symbol(input: &str) -> IResult<&str, Lexeme<'_>> {
    map(
        alt((
            map(char('+'), |_| TokenKind::Plus),
            map(char('-'), |_| TokenKind::Minus),
            map(char('*'), |_| TokenKind::Star),
            map(char('/'), |_| TokenKind::Slash),
            map(char('('), |_| TokenKind::LeftParen),
            map(char(')'), |_| TokenKind::RightParen),
        )),
        Lexeme::Symbol,
    )(input)
}

fn parse_ident(input: &str) -> IResult<&str, Lexeme<'_>> {
    map(
        recognize(pair(
            satisfy(|c| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |_| Lexeme::Ident,
    )(input)
}

/// Modifiers are tried before dice so that `dl1` and `dh1` are not read as a
/// count-less dice marker.
fn parse_lexeme(input: &str) -> IResult<&str, Lexeme<'_>> {
    alt((
        parse_modifier,
        parse_dice,
        map(digit1, Lexeme::Number),
        parse_symbol,
        parse_ident,
    ))(input)
}

fn convert_number<T: std::str::FromStr>(text: &str, position: usize) -> Result<T, SyntaxError> {
    text.parse::<T>()
        .map_err(|_| SyntaxError::InvalidNumber {
            text: text.to_owned(),
            position,
        })
}

fn convert_modifier(
    keyword: Keyword,
    argument: Option<Argument<'_>>,
    text: &str,
    position: usize,
) -> Result<Modifier, SyntaxError> {
    let invalid = |reason: &'static str| SyntaxError::InvalidModifier {
        text: text.to_owned(),
        position,
        reason,
    };
    let condition = |argument: Option<Argument<'_>>| -> Result<Option<Condition>, SyntaxError> {
        match argument {
            Some((comparator, target)) => Ok(Some(Condition::new(
                comparator.unwrap_or(Comparator::Equal),
                convert_number(target, position)?,
            ))),
            None => Ok(None),
        }
    };
    let count = |argument: Option<Argument<'_>>| -> Result<u32, SyntaxError> {
        match argument {
            Some((None, digits)) => convert_number(digits, position),
            Some((Some(_), _)) => Err(invalid("takes a plain count, not a comparison")),
            None => Ok(1),
        }
    };

    Ok(match keyword {
        Keyword::KeepHighest => Modifier::KeepHighest(count(argument)?),
        Keyword::KeepLowest => Modifier::KeepLowest(count(argument)?),
        Keyword::DropHighest => Modifier::DropHighest(count(argument)?),
        Keyword::DropLowest => Modifier::DropLowest(count(argument)?),
        Keyword::Reroll => Modifier::Reroll {
            condition: condition(argument)?,
            once: false,
        },
        Keyword::RerollOnce => Modifier::Reroll {
            condition: condition(argument)?,
            once: true,
        },
        Keyword::Explode => Modifier::Explode(condition(argument)?),
        Keyword::Min => match argument {
            Some((_, value)) => Modifier::Min(convert_number(value, position)?),
            None => return Err(invalid("needs a value")),
        },
        Keyword::Max => match argument {
            Some((_, value)) => Modifier::Max(convert_number(value, position)?),
            None => return Err(invalid("needs a value")),
        },
        Keyword::CountSuccess => match condition(argument)? {
            Some(condition) => Modifier::SuccessCount(condition),
            None => return Err(invalid("needs a condition")),
        },
        Keyword::SortAscending => Modifier::Sort(SortOrder::Ascending),
        Keyword::SortDescending => Modifier::Sort(SortOrder::Descending),
    })
}

fn convert(lexeme: Lexeme<'_>, text: &str, position: usize) -> Result<TokenKind, SyntaxError> {
    Ok(match lexeme {
        Lexeme::Number(digits) => TokenKind::Number(convert_number(digits, position)?),
        Lexeme::Dice(count, faces) => {
            let count = count
                .map(|digits| convert_number(digits, position))
                .transpose()?;
            let dice = match faces {
                Some("%") => Some(DiceType::Number(100)),
                Some("f") | Some("F") => Some(DiceType::Fudge),
                Some(digits) => match convert_number(digits, position)? {
                    0 => return Err(SyntaxError::NoFaces { position }),
                    faces => Some(DiceType::Number(faces)),
                },
                None => None,
            };
            TokenKind::Dice { count, dice }
        }
        Lexeme::Symbol(kind) => kind,
        Lexeme::Modifier(keyword, argument) => {
            TokenKind::Modifier(convert_modifier(keyword, argument, text, position)?)
        }
        Lexeme::Ident => TokenKind::Ident,
    })
}

/// Splits dice notation into tokens. Whitespace between tokens is ignored.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let position = input.len() - rest.len();
        match parse_lexeme(rest) {
            Ok((remaining, lexeme)) => {
                let text = &rest[..rest.len() - remaining.len()];
                tokens.push(Token {
                    kind: convert(lexeme, text, position)?,
                    text,
                    position,
                });
                rest = remaining.trim_start();
            }
            Err(_) => {
                return Err(SyntaxError::UnrecognizedCharacter {
                    character: rest.chars().next().unwrap_or_default(),
                    position,
                })
            }
        }
    }
    Ok(tokens)
}
