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
    dice_types::{DiceTerm, Modifier, Operation, Term},
    error::SyntaxError,
    lexer::{tokenize, Token, TokenKind},
};

fn binary_operation(kind: &TokenKind) -> Option<Operation> {
    match kind {
        TokenKind::Plus => Some(Operation::Add),
        TokenKind::Minus => Some(Operation::Sub),
        TokenKind::Star => Some(Operation::Mul),
        TokenKind::Slash => Some(Operation::Div),
        _ => None,
    }
}

fn precedence(operation: Operation) -> u8 {
    match operation {
        Operation::Add | Operation::Sub => 1,
        Operation::Mul | Operation::Div => 2,
    }
}

fn constant_value<D>(term: &Term<D>) -> Option<i64> {
    match term {
        Term::Constant(value) => Some(*value),
        Term::SubTerm(inner) => constant_value(inner),
        Term::Negated(inner) => constant_value(inner).and_then(i64::checked_neg),
        _ => None,
    }
}

/// Error for a token found where it cannot appear.
fn unexpected(token: &Token<'_>) -> SyntaxError {
    let text = token.text.to_owned();
    let position = token.position;
    match token.kind {
        TokenKind::Modifier(_) => SyntaxError::DanglingModifier { text, position },
        TokenKind::Ident => SyntaxError::UnknownIdentifier { text, position },
        _ => SyntaxError::UnexpectedToken { text, position },
    }
}

struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    index: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.index);
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn end_position(&self) -> usize {
        self.tokens
            .last()
            .map_or(0, |token| token.position + token.text.len())
    }

    /// Precedence climbing over the binary operators, left associative.
    fn expression(&mut self, min_precedence: u8) -> Result<Term, SyntaxError> {
        let mut left = self.unary()?;
        while let Some(token) = self.peek() {
            let operation = match binary_operation(&token.kind) {
                Some(operation) => operation,
                None => break,
            };
            let op_precedence = precedence(operation);
            if op_precedence < min_precedence {
                break;
            }
            self.index += 1;
            let right = self.expression(op_precedence + 1)?;
            if operation == Operation::Div
                && constant_value(&left).is_some()
                && constant_value(&right) == Some(0)
            {
                return Err(SyntaxError::DivideByZero {
                    position: token.position,
                });
            }
            left = Term::Calculation(Box::new(left), operation, Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Term, SyntaxError> {
        match self.peek().map(|token| token.kind) {
            Some(TokenKind::Minus) => {
                self.index += 1;
                Ok(Term::Negated(Box::new(self.unary()?)))
            }
            Some(TokenKind::Plus) => {
                self.index += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Term, SyntaxError> {
        let token = match self.advance() {
            Some(token) => token,
            None => {
                return Err(SyntaxError::MissingOperand {
                    position: self.end_position(),
                })
            }
        };
        match token.kind {
            TokenKind::Number(value) => Ok(Term::Constant(value)),
            TokenKind::Dice { count, dice } => Ok(Term::DiceThrow(DiceTerm {
                count,
                dice,
                modifiers: self.modifiers(),
                position: token.position,
            })),
            TokenKind::LeftParen => {
                let inner = self.expression(0)?;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => Ok(Term::SubTerm(Box::new(inner))),
                    Some(other) => Err(unexpected(other)),
                    None => Err(SyntaxError::UnclosedParenthesis {
                        position: token.position,
                    }),
                }
            }
            _ => Err(unexpected(token)),
        }
    }

    /// Consumes every modifier directly following a dice term, in source order.
    fn modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        while let Some(Token {
            kind: TokenKind::Modifier(modifier),
            ..
        }) = self.peek()
        {
            modifiers.push(*modifier);
            self.index += 1;
        }
        modifiers
    }
}

/// Builds the expression tree for a token sequence.
pub fn parse(tokens: &[Token<'_>]) -> Result<Term, SyntaxError> {
    if tokens.is_empty() {
        return Err(SyntaxError::Empty);
    }
    let mut parser = Parser { tokens, index: 0 };
    let term = parser.expression(0)?;
    match parser.peek() {
        Some(token) => Err(unexpected(token)),
        None => Ok(term),
    }
}

/// Tokenizes and parses `input`.
pub fn parse_str(input: &str) -> Result<Term, SyntaxError> {
    parse(&tokenize(input)?)
}
