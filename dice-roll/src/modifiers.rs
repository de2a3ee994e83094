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
    config::RollConfig,
    dice_types::*,
    error::ModifierError,
    limits::DiceLimits,
};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reroll {
    pub condition: Condition,
    pub once: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectAction {
    Keep,
    Drop,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Selection {
    pub action: SelectAction,
    pub selector: Selector,
    pub count: u32,
}

/// Modifiers of one dice term grouped by the phase they apply in.
///
/// Phases always run in this order, whatever the order in the notation:
/// reroll, explode, min/max, keep/drop, sort, success count.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RollPlan {
    pub rerolls: Vec<Reroll>,
    pub explode: Option<Condition>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub selections: Vec<Selection>,
    pub sort: Option<SortOrder>,
    pub success: Option<Condition>,
}

/// A dice term with concrete count, faces and conditions.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlannedDice {
    pub count: u32,
    pub dice: DiceType,
    /// Source order, with default conditions filled in.
    pub modifiers: Vec<Modifier>,
    pub plan: RollPlan,
    pub position: usize,
}

impl fmt::Display for PlannedDice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.dice)?;
        for modifier in &self.modifiers {
            write!(f, "{}", modifier)?;
        }
        Ok(())
    }
}

pub trait Resolve {
    type Output;
    fn resolve(&self, config: &RollConfig) -> Result<Self::Output, ModifierError>;
}

/// Remembers the first modifier of a kind that may appear only once per term.
fn claim(
    slot: &mut Option<Modifier>,
    modifier: Modifier,
    term: &str,
) -> Result<(), ModifierError> {
    match slot {
        Some(first) => Err(ModifierError::Conflict {
            term: term.to_owned(),
            first: first.to_string(),
            second: modifier.to_string(),
        }),
        None => {
            *slot = Some(modifier);
            Ok(())
        }
    }
}

impl Resolve for DiceTerm {
    type Output = PlannedDice;

    fn resolve(&self, config: &RollConfig) -> Result<PlannedDice, ModifierError> {
        let count = self.count.unwrap_or(config.default_roll);
        let dice = self
            .dice
            .unwrap_or_else(|| DiceType::Number(config.default_face.max(1)));
        let term = format!("{}{}", count, dice);

        let mut plan = RollPlan::default();
        let mut modifiers = Vec::with_capacity(self.modifiers.len());
        let (mut explode, mut min, mut max, mut success, mut sort) = (None, None, None, None, None);

        for modifier in &self.modifiers {
            let modifier = match *modifier {
                Modifier::KeepHighest(n) => {
                    plan.selections
                        .push(Selection { action: SelectAction::Keep, selector: Selector::Higher, count: n });
                    *modifier
                }
                Modifier::KeepLowest(n) => {
                    plan.selections
                        .push(Selection { action: SelectAction::Keep, selector: Selector::Lower, count: n });
                    *modifier
                }
                Modifier::DropHighest(n) => {
                    plan.selections
                        .push(Selection { action: SelectAction::Drop, selector: Selector::Higher, count: n });
                    *modifier
                }
                Modifier::DropLowest(n) => {
                    plan.selections
                        .push(Selection { action: SelectAction::Drop, selector: Selector::Lower, count: n });
                    *modifier
                }
                Modifier::Reroll { condition, once } => {
                    let condition = condition.unwrap_or_else(|| Condition::equal(dice.min()));
                    let resolved = Modifier::Reroll {
                        condition: Some(condition),
                        once,
                    };
                    if !once && condition.covers(&dice) {
                        return Err(ModifierError::Unbounded {
                            term,
                            modifier: resolved.to_string(),
                        });
                    }
                    plan.rerolls.push(Reroll { condition, once });
                    resolved
                }
                Modifier::Explode(condition) => {
                    let condition = condition.unwrap_or_else(|| Condition::equal(dice.max()));
                    let resolved = Modifier::Explode(Some(condition));
                    if condition.covers(&dice) {
                        return Err(ModifierError::Unbounded {
                            term,
                            modifier: resolved.to_string(),
                        });
                    }
                    claim(&mut explode, resolved, &term)?;
                    plan.explode = Some(condition);
                    resolved
                }
                Modifier::Min(n) => {
                    claim(&mut min, *modifier, &term)?;
                    plan.min = Some(n);
                    *modifier
                }
                Modifier::Max(n) => {
                    claim(&mut max, *modifier, &term)?;
                    plan.max = Some(n);
                    *modifier
                }
                Modifier::SuccessCount(condition) => {
                    claim(&mut success, *modifier, &term)?;
                    plan.success = Some(condition);
                    *modifier
                }
                Modifier::Sort(order) => {
                    claim(&mut sort, *modifier, &term)?;
                    plan.sort = Some(order);
                    *modifier
                }
            };
            modifiers.push(modifier);
        }

        if let (Some(low), Some(high)) = (plan.min, plan.max) {
            if low > high {
                return Err(ModifierError::Conflict {
                    term,
                    first: Modifier::Min(low).to_string(),
                    second: Modifier::Max(high).to_string(),
                });
            }
        }

        Ok(PlannedDice {
            count,
            dice,
            modifiers,
            plan,
            position: self.position,
        })
    }
}

impl Resolve for Term {
    type Output = Term<PlannedDice>;

    fn resolve(&self, config: &RollConfig) -> Result<Term<PlannedDice>, ModifierError> {
        Ok(match self {
            Term::Constant(value) => Term::Constant(*value),
            Term::DiceThrow(dice) => Term::DiceThrow(dice.resolve(config)?),
            Term::Calculation(left, op, right) => Term::Calculation(
                Box::new(left.resolve(config)?),
                *op,
                Box::new(right.resolve(config)?),
            ),
            Term::SubTerm(term) => Term::SubTerm(Box::new(term.resolve(config)?)),
            Term::Negated(term) => Term::Negated(Box::new(term.resolve(config)?)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn planned(input: &str) -> Result<PlannedDice, ModifierError> {
        match parse_str(input).expect("input should parse") {
            Term::DiceThrow(dice) => dice.resolve(&RollConfig::default()),
            other => panic!("expected a dice term, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let dice = planned("d").unwrap();
        assert_eq!(dice.count, 1);
        assert_eq!(dice.dice, DiceType::Number(100));

        let config = RollConfig {
            default_roll: 3,
            default_face: 8,
            ..RollConfig::default()
        };
        let term = parse_str("d + 2d").unwrap().resolve(&config).unwrap();
        assert_eq!(term.to_string(), "3d8 + 2d8");
    }

    #[test]
    fn test_resolve_default_conditions() {
        let dice = planned("4d6r!").unwrap();
        assert_eq!(
            dice.plan.rerolls,
            vec![Reroll {
                condition: Condition::equal(1),
                once: false
            }]
        );
        assert_eq!(dice.plan.explode, Some(Condition::equal(6)));
        assert_eq!(dice.to_string(), "4d6r1!6");

        let fudge = planned("4dF!").unwrap();
        assert_eq!(fudge.plan.explode, Some(Condition::equal(1)));
    }

    #[test]
    fn test_resolve_plan_keeps_source_order() {
        let dice = planned("5d10dl1kh3").unwrap();
        assert_eq!(
            dice.plan.selections,
            vec![
                Selection {
                    action: SelectAction::Drop,
                    selector: Selector::Lower,
                    count: 1
                },
                Selection {
                    action: SelectAction::Keep,
                    selector: Selector::Higher,
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn test_resolve_over_keeping_is_allowed() {
        assert!(planned("2d6kh5").is_ok());
        assert!(planned("2d6dl9").is_ok());
    }

    #[test]
    fn test_resolve_conflicts() {
        assert_eq!(
            planned("4d6!!>5"),
            Err(ModifierError::Conflict {
                term: "4d6".to_string(),
                first: "!6".to_string(),
                second: "!>5".to_string()
            })
        );
        assert_eq!(
            planned("4d6min5max3"),
            Err(ModifierError::Conflict {
                term: "4d6".to_string(),
                first: "min5".to_string(),
                second: "max3".to_string()
            })
        );
        assert!(planned("4d6cs>3cs>4").is_err());
        assert!(planned("4d6sasd").is_err());
    }

    #[test]
    fn test_resolve_success_with_clamp() {
        let dice = planned("8d6min3cs>4").unwrap();
        assert_eq!(dice.plan.min, Some(3));
        assert_eq!(
            dice.plan.success,
            Some(Condition::new(Comparator::Bigger, 4))
        );
    }

    #[test]
    fn test_resolve_unbounded() {
        assert_eq!(
            planned("1d1!"),
            Err(ModifierError::Unbounded {
                term: "1d1".to_string(),
                modifier: "!1".to_string()
            })
        );
        assert_eq!(
            planned("2d6r<7"),
            Err(ModifierError::Unbounded {
                term: "2d6".to_string(),
                modifier: "r<7".to_string()
            })
        );
        assert!(planned("2d6ro<7").is_ok());
        assert!(planned("2d6r<6").is_ok());
    }
}
