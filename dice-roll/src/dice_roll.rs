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
    config::{Division, RollConfig},
    dice_types::*,
    error::EvaluationError,
    limits::DiceLimits,
    modifiers::{PlannedDice, Reroll, SelectAction, Selection},
    rng::RollSource,
};
use std::{convert::TryFrom, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use log::debug;

/// One physical die roll. `face` is what was rolled, `value` what counts
/// after min/max clamping.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DieResult {
    pub face: i64,
    pub value: i64,
    pub kept: bool,
    pub rerolled: bool,
    pub exploded: bool,
}

impl DieResult {
    fn rolled(face: i64) -> DieResult {
        DieResult {
            face,
            value: face,
            kept: true,
            rerolled: false,
            exploded: false,
        }
    }
}

/// Per dice term detail of an evaluation.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RollBreakdown {
    pub fragment: String,
    pub position: usize,
    pub dice: Vec<DieResult>,
    pub value: i64,
}

#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvaluationResult {
    pub total: Total,
    pub breakdown: Vec<RollBreakdown>,
}

pub trait DiceEvaluate {
    fn evaluate<R: RollSource + ?Sized>(
        &self,
        config: &RollConfig,
        rng: &mut R,
    ) -> Result<(i64, Vec<DieResult>), EvaluationError>;
}

/// Rerolls every die matching a reroll condition. The replaced roll stays in
/// the pool, marked as rerolled and not kept, directly before its replacement.
fn reroll<R: RollSource + ?Sized>(
    pool: Vec<DieResult>,
    rerolls: &[Reroll],
    dice: &DiceType,
    cap: u32,
    rng: &mut R,
) -> Result<Vec<DieResult>, EvaluationError> {
    let mut result = Vec::with_capacity(pool.len());
    for die in pool {
        let mut current = die;
        let mut used = vec![false; rerolls.len()];
        let mut iterations: u32 = 0;
        loop {
            let face = current.face;
            let unbounded = rerolls
                .iter()
                .any(|r| !r.once && r.condition.matches(face));
            if !unbounded {
                match rerolls
                    .iter()
                    .zip(used.iter_mut())
                    .find(|(r, used)| r.once && !**used && r.condition.matches(face))
                {
                    Some((_, used)) => *used = true,
                    None => break,
                }
            }
            iterations += 1;
            if iterations > cap {
                return Err(EvaluationError::InfiniteReroll(cap));
            }
            current.rerolled = true;
            current.kept = false;
            result.push(current);
            current = DieResult::rolled(rng.roll_face(dice.min(), dice.max()));
        }
        result.push(current);
    }
    Ok(result)
}

/// Adds a die after every die matching the condition; added dice may explode again.
fn explode<R: RollSource + ?Sized>(
    pool: Vec<DieResult>,
    condition: &Condition,
    dice: &DiceType,
    cap: u32,
    rng: &mut R,
) -> Result<Vec<DieResult>, EvaluationError> {
    let mut result = Vec::with_capacity(pool.len());
    for die in pool {
        if die.rerolled {
            result.push(die);
            continue;
        }
        let mut current = die;
        let mut iterations: u32 = 0;
        while condition.matches(current.face) {
            iterations += 1;
            if iterations > cap {
                return Err(EvaluationError::InfiniteExplode(cap));
            }
            result.push(current);
            current = DieResult::rolled(rng.roll_face(dice.min(), dice.max()));
            current.exploded = true;
        }
        result.push(current);
    }
    Ok(result)
}

fn clamp(pool: &mut [DieResult], min: Option<i64>, max: Option<i64>) {
    for die in pool.iter_mut() {
        let mut value = die.face;
        if let Some(min) = min {
            value = value.max(min);
        }
        if let Some(max) = max {
            value = value.min(max);
        }
        die.value = value;
    }
}

/// Marks dice as not kept. Only dice still kept take part; the count is
/// clamped to them. Ties are ranked by roll order.
fn select(pool: &mut [DieResult], selection: &Selection) {
    let mut ranked: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, die)| die.kept)
        .map(|(index, _)| index)
        .collect();
    ranked.sort_by_key(|&index| pool[index].value);
    let n = usize::try_from(selection.count)
        .unwrap_or(usize::MAX)
        .min(ranked.len());
    let dropped = match (selection.action, selection.selector) {
        (SelectAction::Keep, Selector::Higher) => &ranked[..ranked.len() - n],
        (SelectAction::Keep, Selector::Lower) => &ranked[n..],
        (SelectAction::Drop, Selector::Higher) => &ranked[ranked.len() - n..],
        (SelectAction::Drop, Selector::Lower) => &ranked[..n],
    };
    for &index in dropped {
        pool[index].kept = false;
    }
}

impl DiceEvaluate for PlannedDice {
    fn evaluate<R: RollSource + ?Sized>(
        &self,
        config: &RollConfig,
        rng: &mut R,
    ) -> Result<(i64, Vec<DieResult>), EvaluationError> {
        if self.count > config.max_dice {
            return Err(EvaluationError::TooManyDice {
                requested: self.count,
                limit: config.max_dice,
            });
        }
        let (low, high) = (self.dice.min(), self.dice.max());
        let mut pool: Vec<DieResult> = (0..self.count)
            .map(|_| DieResult::rolled(rng.roll_face(low, high)))
            .collect();

        if !self.plan.rerolls.is_empty() {
            pool = reroll(
                pool,
                &self.plan.rerolls,
                &self.dice,
                config.iteration_cap,
                rng,
            )?;
        }
        if let Some(condition) = &self.plan.explode {
            pool = explode(pool, condition, &self.dice, config.iteration_cap, rng)?;
        }
        clamp(&mut pool, self.plan.min, self.plan.max);
        for selection in &self.plan.selections {
            select(&mut pool, selection);
        }
        match self.plan.sort {
            Some(SortOrder::Ascending) => pool.sort_by_key(|die| die.face),
            Some(SortOrder::Descending) => pool.sort_by(|a, b| b.face.cmp(&a.face)),
            None => {}
        }

        let value = match &self.plan.success {
            Some(condition) => i64::try_from(
                pool.iter()
                    .filter(|die| die.kept && condition.matches(die.value))
                    .count(),
            )
            .map_err(|_| EvaluationError::Overflow)?,
            None => pool
                .iter()
                .filter(|die| die.kept)
                .try_fold(0i64, |sum, die| sum.checked_add(die.value))
                .ok_or(EvaluationError::Overflow)?,
        };

        #[cfg(feature = "logging")]
        {
            debug!("Dice roll result for {} is {} from {:?}", &self, value, &pool);
        }

        Ok((value, pool))
    }
}

/// Value of an evaluated expression. Integral unless a real division took part.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Total {
    Integer(i64),
    Real(f64),
}

impl Total {
    pub fn as_f64(&self) -> f64 {
        match self {
            Total::Integer(value) => *value as f64,
            Total::Real(value) => *value,
        }
    }

    fn negate(self) -> Result<Total, EvaluationError> {
        match self {
            Total::Integer(value) => value
                .checked_neg()
                .map(Total::Integer)
                .ok_or(EvaluationError::Overflow),
            Total::Real(value) => Ok(Total::Real(-value)),
        }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Total::Integer(value) => write!(f, "{}", value),
            Total::Real(value) => write!(f, "{}", value),
        }
    }
}

fn real(value: f64) -> Result<Total, EvaluationError> {
    if value.is_finite() {
        Ok(Total::Real(value))
    } else {
        Err(EvaluationError::Overflow)
    }
}

fn combine(
    left: Total,
    op: Operation,
    right: Total,
    division: Division,
) -> Result<Total, EvaluationError> {
    if op == Operation::Div && right.as_f64() == 0.0 {
        return Err(EvaluationError::DivideByZero);
    }
    match (left, right) {
        (Total::Integer(l), Total::Integer(r)) => {
            if op == Operation::Div && division == Division::Real {
                return real(l as f64 / r as f64);
            }
            // checked_div truncates toward zero
            match op {
                Operation::Add => l.checked_add(r),
                Operation::Sub => l.checked_sub(r),
                Operation::Mul => l.checked_mul(r),
                Operation::Div => l.checked_div(r),
            }
            .map(Total::Integer)
            .ok_or(EvaluationError::Overflow)
        }
        (left, right) => {
            let (l, r) = (left.as_f64(), right.as_f64());
            real(match op {
                Operation::Add => l + r,
                Operation::Sub => l - r,
                Operation::Mul => l * r,
                Operation::Div => match division {
                    Division::Integer => (l / r).trunc(),
                    Division::Real => l / r,
                },
            })
        }
    }
}

pub trait TermEvaluate {
    fn evaluate<R: RollSource + ?Sized>(
        &self,
        config: &RollConfig,
        rng: &mut R,
        breakdown: &mut Vec<RollBreakdown>,
    ) -> Result<Total, EvaluationError>;
}

impl TermEvaluate for Term<PlannedDice> {
    fn evaluate<R: RollSource + ?Sized>(
        &self,
        config: &RollConfig,
        rng: &mut R,
        breakdown: &mut Vec<RollBreakdown>,
    ) -> Result<Total, EvaluationError> {
        let result = match self {
            Term::Constant(value) => Ok(Total::Integer(*value)),
            Term::DiceThrow(dice) => {
                let (value, rolls) = dice.evaluate(config, rng)?;
                if dice.count > 0 {
                    breakdown.push(RollBreakdown {
                        fragment: dice.to_string(),
                        position: dice.position,
                        dice: rolls,
                        value,
                    });
                }
                Ok(Total::Integer(value))
            }
            Term::SubTerm(term) => term.evaluate(config, rng, breakdown),
            Term::Negated(term) => term.evaluate(config, rng, breakdown)?.negate(),
            Term::Calculation(left, op, right) => {
                let left_r = left.evaluate(config, rng, breakdown)?;
                let right_r = right.evaluate(config, rng, breakdown)?;
                combine(left_r, *op, right_r, config.division)
            }
        };
        #[cfg(feature = "logging")]
        {
            debug!("got {:?} for term {}", &result, &self)
        }
        result
    }
}

/// Evaluates a resolved expression tree. Nothing of a failed evaluation is returned.
pub fn evaluate<R: RollSource + ?Sized>(
    term: &Term<PlannedDice>,
    config: &RollConfig,
    rng: &mut R,
) -> Result<EvaluationResult, EvaluationError> {
    let mut breakdown = Vec::new();
    let total = term.evaluate(config, rng, &mut breakdown)?;
    Ok(EvaluationResult { total, breakdown })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{modifiers::Resolve, parser::parse_str, rng::ScriptedRolls};
    use proptest::prelude::*;

    fn compile(input: &str) -> Term<PlannedDice> {
        parse_str(input)
            .expect("input should parse")
            .resolve(&RollConfig::default())
            .expect("modifiers should resolve")
    }

    fn roll(input: &str, faces: Vec<i64>) -> Result<EvaluationResult, EvaluationError> {
        evaluate(
            &compile(input),
            &RollConfig::default(),
            &mut ScriptedRolls::new(faces),
        )
    }

    fn kept_faces(result: &EvaluationResult) -> Vec<i64> {
        result.breakdown[0]
            .dice
            .iter()
            .filter(|die| die.kept)
            .map(|die| die.face)
            .collect()
    }

    #[test]
    fn test_literal_has_no_breakdown() {
        let result = roll("17", vec![]).unwrap();
        assert_eq!(result.total, Total::Integer(17));
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_zero_dice() {
        let result = roll("0d6", vec![4]).unwrap();
        assert_eq!(result.total, Total::Integer(0));
        assert!(result.breakdown.is_empty());

        let result = roll("0d6 + 1d4", vec![3]).unwrap();
        assert_eq!(result.total, Total::Integer(3));
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].fragment, "1d4");
    }

    #[test]
    fn test_large_integers_stay_exact() {
        assert_eq!(
            roll("9007199254740993", vec![]).unwrap().total,
            Total::Integer(9_007_199_254_740_993)
        );
        assert_eq!(
            roll("9007199254740993 + 1d1", vec![]).unwrap().total,
            Total::Integer(9_007_199_254_740_994)
        );
    }

    #[test]
    fn test_integer_overflow() {
        assert_eq!(
            roll("9223372036854775807 + 9223372036854775807", vec![]),
            Err(EvaluationError::Overflow)
        );
        assert_eq!(
            roll("9223372036854775807 * 2", vec![]),
            Err(EvaluationError::Overflow)
        );
        assert_eq!(
            roll("-9223372036854775807 - 2", vec![]),
            Err(EvaluationError::Overflow)
        );
        let config = RollConfig {
            division: Division::Real,
            ..RollConfig::default()
        };
        assert_eq!(
            evaluate(
                &compile("9223372036854775807 + 1d6"),
                &config,
                &mut ScriptedRolls::new(vec![1])
            ),
            Err(EvaluationError::Overflow)
        );
    }

    #[test]
    fn test_drop_lowest() {
        let result = roll("4d6dl1", vec![3, 1, 5, 2]).unwrap();
        assert_eq!(result.total, Total::Integer(10));
        assert_eq!(kept_faces(&result), vec![3, 5, 2]);
        assert_eq!(
            result.breakdown[0].dice[1],
            DieResult {
                face: 1,
                value: 1,
                kept: false,
                rerolled: false,
                exploded: false
            }
        );
        assert_eq!(result.breakdown[0].fragment, "4d6dl1");
    }

    #[test]
    fn test_keep_highest_matches_drop_lowest() {
        let faces = vec![4, 6, 2, 6, 1];
        let keep = roll("5d6kh3", faces.clone()).unwrap();
        let drop = roll("5d6dl2", faces).unwrap();
        assert_eq!(keep.total, drop.total);
        assert_eq!(keep.breakdown[0].dice, drop.breakdown[0].dice);
        assert_eq!(kept_faces(&keep), vec![4, 6, 6]);
    }

    #[test]
    fn test_over_dropping_keeps_nothing() {
        let result = roll("2d6dl5", vec![3, 4]).unwrap();
        assert_eq!(result.total, Total::Integer(0));
        assert!(result.breakdown[0].dice.iter().all(|die| !die.kept));

        let result = roll("2d6kh5", vec![3, 4]).unwrap();
        assert_eq!(result.total, Total::Integer(7));
    }

    #[test]
    fn test_keep_then_drop_in_source_order() {
        // kh3 keeps 6, 5, 4; dl1 then drops the 4
        let result = roll("5d6kh3dl1", vec![1, 5, 4, 6, 2]).unwrap();
        assert_eq!(kept_faces(&result), vec![5, 6]);
        assert_eq!(result.total, Total::Integer(11));
    }

    #[test]
    fn test_explode() {
        let result = roll("1d20!", vec![20, 5]).unwrap();
        assert_eq!(result.total, Total::Integer(25));
        let dice = &result.breakdown[0].dice;
        assert_eq!(dice.len(), 2);
        assert!(!dice[0].exploded);
        assert!(dice[1].exploded);
        assert_eq!(dice[1].face, 5);
    }

    #[test]
    fn test_explode_chains_until_cap() {
        let result = roll("1d6!", vec![6, 6, 3]).unwrap();
        assert_eq!(result.total, Total::Integer(15));
        assert_eq!(result.breakdown[0].dice.len(), 3);

        let config = RollConfig {
            iteration_cap: 10,
            ..RollConfig::default()
        };
        assert_eq!(
            evaluate(
                &compile("1d6!"),
                &config,
                &mut ScriptedRolls::new(vec![6])
            ),
            Err(EvaluationError::InfiniteExplode(10))
        );
    }

    #[test]
    fn test_reroll() {
        let result = roll("2d6r<3", vec![1, 4, 2, 5]).unwrap();
        let dice = &result.breakdown[0].dice;
        assert_eq!(dice.iter().map(|d| d.face).collect::<Vec<_>>(), vec![1, 2, 5, 4]);
        assert_eq!(
            dice.iter().map(|d| d.rerolled).collect::<Vec<_>>(),
            vec![true, true, false, false]
        );
        assert_eq!(result.total, Total::Integer(9));
    }

    #[test]
    fn test_reroll_once() {
        let result = roll("1d6ro<3", vec![1, 2]).unwrap();
        assert_eq!(result.total, Total::Integer(2));
        assert_eq!(result.breakdown[0].dice.len(), 2);
    }

    #[test]
    fn test_reroll_once_per_condition() {
        let result = roll("1d6ro1ro2", vec![1, 2, 1]).unwrap();
        assert_eq!(result.total, Total::Integer(1));
        assert_eq!(result.breakdown[0].dice.len(), 3);
    }

    #[test]
    fn test_reroll_cap() {
        let config = RollConfig {
            iteration_cap: 5,
            ..RollConfig::default()
        };
        assert_eq!(
            evaluate(&compile("1d6r1"), &config, &mut ScriptedRolls::new(vec![1])),
            Err(EvaluationError::InfiniteReroll(5))
        );
    }

    #[test]
    fn test_rerolled_die_does_not_explode() {
        let result = roll("1d6r6!", vec![6, 2]).unwrap();
        assert_eq!(result.total, Total::Integer(2));
        assert!(result.breakdown[0].dice.iter().all(|die| !die.exploded));
    }

    #[test]
    fn test_min_max_clamp() {
        let result = roll("3d6min2max5", vec![1, 6, 3]).unwrap();
        let dice = &result.breakdown[0].dice;
        assert_eq!(dice.iter().map(|d| d.face).collect::<Vec<_>>(), vec![1, 6, 3]);
        assert_eq!(dice.iter().map(|d| d.value).collect::<Vec<_>>(), vec![2, 5, 3]);
        assert_eq!(result.total, Total::Integer(10));
    }

    #[test]
    fn test_success_count() {
        let result = roll("8d6cs>4", vec![1, 5, 6, 4, 2, 6, 3, 5]).unwrap();
        assert_eq!(result.total, Total::Integer(4));
        assert_eq!(result.breakdown[0].value, 4);
    }

    #[test]
    fn test_success_count_uses_clamped_values() {
        let result = roll("3d6min5cs>=5", vec![1, 2, 6]).unwrap();
        assert_eq!(result.total, Total::Integer(3));
    }

    #[test]
    fn test_success_count_ignores_dropped_dice() {
        let result = roll("4d6dl1cs>=3", vec![3, 1, 5, 2]).unwrap();
        assert_eq!(result.total, Total::Integer(2));
    }

    #[test]
    fn test_sort_does_not_change_total() {
        let sorted = roll("4d6sd", vec![2, 6, 1, 4]).unwrap();
        let plain = roll("4d6", vec![2, 6, 1, 4]).unwrap();
        assert_eq!(sorted.total, plain.total);
        assert_eq!(
            sorted.breakdown[0]
                .dice
                .iter()
                .map(|d| d.face)
                .collect::<Vec<_>>(),
            vec![6, 4, 2, 1]
        );
    }

    #[test]
    fn test_fudge_dice() {
        let result = roll("4dF", vec![-1, 0, 1, 1]).unwrap();
        assert_eq!(result.total, Total::Integer(1));
    }

    #[test]
    fn test_calculation_and_breakdown_order() {
        let result = roll("(1d4 + 2) * 1d6 - 3", vec![3, 5]).unwrap();
        assert_eq!(result.total, Total::Integer(22));
        assert_eq!(
            result
                .breakdown
                .iter()
                .map(|b| (b.fragment.as_str(), b.position, b.value))
                .collect::<Vec<_>>(),
            vec![("1d4", 1, 3), ("1d6", 12, 5)]
        );
    }

    #[test]
    fn test_negation() {
        assert_eq!(roll("-1d6 + 10", vec![4]).unwrap().total, Total::Integer(6));
    }

    #[test]
    fn test_division_modes() {
        assert_eq!(roll("1d6 / 2", vec![5]).unwrap().total, Total::Integer(2));
        assert_eq!(roll("-7 / 2", vec![]).unwrap().total, Total::Integer(-3));
        let config = RollConfig {
            division: Division::Real,
            ..RollConfig::default()
        };
        let result = evaluate(&compile("1d6 / 2"), &config, &mut ScriptedRolls::new(vec![5]));
        assert_eq!(result.unwrap().total, Total::Real(2.5));
    }

    #[test]
    fn test_runtime_division_by_zero() {
        assert_eq!(
            roll("1d6/(1-1)", vec![3]),
            Err(EvaluationError::DivideByZero)
        );
        assert_eq!(roll("1d6/0", vec![3]), Err(EvaluationError::DivideByZero));
    }

    #[test]
    fn test_too_many_dice() {
        let config = RollConfig {
            max_dice: 10,
            ..RollConfig::default()
        };
        assert_eq!(
            evaluate(&compile("11d6"), &config, &mut ScriptedRolls::new(vec![1])),
            Err(EvaluationError::TooManyDice {
                requested: 11,
                limit: 10
            })
        );
    }

    #[test]
    fn test_same_replay_same_result() {
        use rand::SeedableRng;
        use rand_xoshiro::Xoshiro256PlusPlus;

        let term = compile("6d10!kh4r1 + 2d20kl1 * 3");
        let config = RollConfig::default();
        let first = evaluate(&term, &config, &mut Xoshiro256PlusPlus::seed_from_u64(42));
        let second = evaluate(&term, &config, &mut Xoshiro256PlusPlus::seed_from_u64(42));
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn test_dice_in_range(count in 0u32..50, faces in 1u32..=100, seed in any::<u64>()) {
            use rand::SeedableRng;

            let term = compile(&format!("{}d{}", count, faces));
            let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed);
            let result = evaluate(&term, &RollConfig::default(), &mut rng).unwrap();
            let dice = &result.breakdown[0].dice;

            prop_assert_eq!(dice.len(), count as usize);
            prop_assert!(dice.iter().all(|d| 1 <= d.face && d.face <= i64::from(faces)));
            prop_assert_eq!(result.total, Total::Integer(dice.iter().map(|d| d.face).sum::<i64>()));
        }

        #[test]
        fn test_literal_evaluates_to_itself(n in 0i64..=i64::MAX) {
            let result = roll(&n.to_string(), vec![]).unwrap();
            prop_assert_eq!(result.total, Total::Integer(n));
            prop_assert!(result.breakdown.is_empty());
        }
    }
}
