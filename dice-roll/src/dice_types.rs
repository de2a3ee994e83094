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

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiceType {
    Number(u32),
    Fudge,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Comparator {
    Equal,
    Bigger,
    BiggerEq,
    Smaller,
    SmallerEq,
}

/// A comparison against a fixed target, used by reroll, explode and success modifiers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    pub comparator: Comparator,
    pub target: i64,
}

impl Condition {
    pub fn new(comparator: Comparator, target: i64) -> Condition {
        Condition { comparator, target }
    }

    pub fn equal(target: i64) -> Condition {
        Condition::new(Comparator::Equal, target)
    }

    pub fn matches(&self, value: i64) -> bool {
        match self.comparator {
            Comparator::Equal => value == self.target,
            Comparator::Bigger => value > self.target,
            Comparator::BiggerEq => value >= self.target,
            Comparator::Smaller => value < self.target,
            Comparator::SmallerEq => value <= self.target,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Selector {
    Higher,
    Lower,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A modifier as written after a dice term.
///
/// Reroll and explode conditions are optional in the notation; the resolver
/// replaces a missing condition with the default for the die it applies to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Modifier {
    KeepHighest(u32),
    KeepLowest(u32),
    DropHighest(u32),
    DropLowest(u32),
    Reroll {
        condition: Option<Condition>,
        once: bool,
    },
    Explode(Option<Condition>),
    Min(i64),
    Max(i64),
    SuccessCount(Condition),
    Sort(SortOrder),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operation {
    Mul,
    Div,
    Add,
    Sub,
}

/// A dice term as it appears in the source. Count and faces stay `None`
/// when the notation omits them.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiceTerm {
    pub count: Option<u32>,
    pub dice: Option<DiceType>,
    pub modifiers: Vec<Modifier>,
    pub position: usize,
}

/// Expression tree, generic over the payload of its dice leaves.
///
/// The parser produces `Term<DiceTerm>`; the modifier resolver turns it into
/// `Term<PlannedDice>` which is what the evaluator walks.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term<D = DiceTerm> {
    Constant(i64),
    DiceThrow(D),
    Calculation(Box<Term<D>>, Operation, Box<Term<D>>),
    SubTerm(Box<Term<D>>),
    Negated(Box<Term<D>>),
}

impl fmt::Display for DiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceType::Number(faces) => write!(f, "d{}", faces),
            DiceType::Fudge => write!(f, "dF"),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparator::Equal => "=",
            Comparator::Bigger => ">",
            Comparator::BiggerEq => ">=",
            Comparator::Smaller => "<",
            Comparator::SmallerEq => "<=",
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparator == Comparator::Equal && self.target >= 0 {
            write!(f, "{}", self.target)
        } else {
            write!(f, "{}{}", self.comparator, self.target)
        }
    }
}

fn write_condition(f: &mut fmt::Formatter<'_>, condition: &Option<Condition>) -> fmt::Result {
    match condition {
        Some(condition) => write!(f, "{}", condition),
        None => Ok(()),
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::KeepHighest(n) => write!(f, "kh{}", n),
            Modifier::KeepLowest(n) => write!(f, "kl{}", n),
            Modifier::DropHighest(n) => write!(f, "dh{}", n),
            Modifier::DropLowest(n) => write!(f, "dl{}", n),
            Modifier::Reroll { condition, once } => {
                f.write_str(if *once { "ro" } else { "r" })?;
                write_condition(f, condition)
            }
            Modifier::Explode(condition) => {
                f.write_str("!")?;
                write_condition(f, condition)
            }
            Modifier::Min(n) => write!(f, "min{}", n),
            Modifier::Max(n) => write!(f, "max{}", n),
            Modifier::SuccessCount(condition) => write!(f, "cs{}", condition),
            Modifier::Sort(SortOrder::Ascending) => write!(f, "sa"),
            Modifier::Sort(SortOrder::Descending) => write!(f, "sd"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Mul => "*",
            Operation::Div => "/",
            Operation::Add => "+",
            Operation::Sub => "-",
        })
    }
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(count) = self.count {
            write!(f, "{}", count)?;
        }
        match self.dice {
            Some(dice) => write!(f, "{}", dice)?,
            None => f.write_str("d")?,
        }
        for modifier in &self.modifiers {
            write!(f, "{}", modifier)?;
        }
        Ok(())
    }
}

impl<D: fmt::Display> fmt::Display for Term<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(value) => write!(f, "{}", value),
            Term::DiceThrow(dice) => write!(f, "{}", dice),
            Term::Calculation(left, op, right) => write!(f, "{} {} {}", left, op, right),
            Term::SubTerm(term) => write!(f, "({})", term),
            Term::Negated(term) => write!(f, "-{}", term),
        }
    }
}
