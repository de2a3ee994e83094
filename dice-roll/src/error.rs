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

use thiserror::Error;

/// Malformed notation. Positions are byte offsets into the rolled input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("input is empty")]
    Empty,

    #[error("unrecognized character `{character}` at position {position}")]
    UnrecognizedCharacter { character: char, position: usize },

    #[error("invalid number `{text}` at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("dice at position {position} need at least one face")]
    NoFaces { position: usize },

    #[error("modifier `{text}` at position {position} {reason}")]
    InvalidModifier {
        text: String,
        position: usize,
        reason: &'static str,
    },

    #[error("modifier `{text}` at position {position} does not follow a dice term")]
    DanglingModifier { text: String, position: usize },

    #[error("unknown identifier `{text}` at position {position}")]
    UnknownIdentifier { text: String, position: usize },

    #[error("unexpected `{text}` at position {position}")]
    UnexpectedToken { text: String, position: usize },

    #[error("expected an operand at position {position}")]
    MissingOperand { position: usize },

    #[error("parenthesis opened at position {position} is never closed")]
    UnclosedParenthesis { position: usize },

    #[error("division by zero at position {position}")]
    DivideByZero { position: usize },
}

impl SyntaxError {
    pub fn position(&self) -> Option<usize> {
        match self {
            SyntaxError::Empty => None,
            SyntaxError::UnrecognizedCharacter { position, .. }
            | SyntaxError::InvalidNumber { position, .. }
            | SyntaxError::NoFaces { position }
            | SyntaxError::InvalidModifier { position, .. }
            | SyntaxError::DanglingModifier { position, .. }
            | SyntaxError::UnknownIdentifier { position, .. }
            | SyntaxError::UnexpectedToken { position, .. }
            | SyntaxError::MissingOperand { position }
            | SyntaxError::UnclosedParenthesis { position }
            | SyntaxError::DivideByZero { position } => Some(*position),
        }
    }
}

/// A modifier combination that has no defined meaning for its dice term.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModifierError {
    #[error("`{first}` conflicts with `{second}` on {term}")]
    Conflict {
        term: String,
        first: String,
        second: String,
    },

    #[error("`{modifier}` matches every face of {term} and would never stop")]
    Unbounded { term: String, modifier: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("division by zero")]
    DivideByZero,

    #[error("reroll did not settle within {0} iterations")]
    InfiniteReroll(u32),

    #[error("dice kept exploding for {0} iterations")]
    InfiniteExplode(u32),

    #[error("{requested} dice exceed the limit of {limit}")]
    TooManyDice { requested: u32, limit: u32 },

    #[error("result is out of range")]
    Overflow,

    #[error("unknown formula alias `{0}`")]
    UnknownAlias(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Modifier,
    Evaluation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("invalid modifiers: {0}")]
    Modifier(#[from] ModifierError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Modifier(_) => ErrorKind::Modifier,
            Error::Evaluation(_) => ErrorKind::Evaluation,
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Error::Syntax(err) => err.position(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_position() {
        let err: Error = SyntaxError::MissingOperand { position: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.position(), Some(3));
        assert_eq!(
            err.to_string(),
            "syntax error: expected an operand at position 3"
        );

        let err: Error = EvaluationError::UnknownAlias("fireball".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
        assert_eq!(err.position(), None);
    }
}
