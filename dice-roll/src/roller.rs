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
    dice_roll::{evaluate, EvaluationResult},
    dice_types::Term,
    error::{Error, EvaluationError},
    modifiers::{PlannedDice, Resolve},
    parser::parse_str,
    registry::FormulaRegistry,
    rng::RollSource,
};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use log::debug;

#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RollOutcome {
    /// Set when the input named a registered formula.
    pub alias: Option<String>,
    /// The notation actually rolled.
    pub formula: String,
    pub result: EvaluationResult,
}

/// A lone word that is not notation reads as an alias.
fn is_name(input: &str) -> bool {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Entry point tying alias lookup, compilation and evaluation together.
#[derive(Debug, Clone, Default)]
pub struct DiceRoller {
    config: RollConfig,
    formulas: Arc<FormulaRegistry>,
}

impl DiceRoller {
    pub fn new(config: RollConfig, formulas: Arc<FormulaRegistry>) -> DiceRoller {
        DiceRoller { config, formulas }
    }

    pub fn config(&self) -> &RollConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RollConfig) {
        self.config = config;
    }

    pub fn formulas(&self) -> &Arc<FormulaRegistry> {
        &self.formulas
    }

    /// Lexes, parses and resolves notation without rolling.
    pub fn compile(&self, input: &str) -> Result<Term<PlannedDice>, Error> {
        Ok(parse_str(input)?.resolve(&self.config)?)
    }

    /// Splits the input into the alias it names, if any, and the formula to roll.
    fn lookup(&self, input: &str) -> (Option<String>, String) {
        match self.formulas.resolve(input) {
            Ok(formula) => (Some(input.to_owned()), formula),
            Err(_) => (None, input.to_owned()),
        }
    }

    pub fn roll<R: RollSource + ?Sized>(
        &self,
        input: &str,
        rng: &mut R,
    ) -> Result<RollOutcome, Error> {
        let input = input.trim();
        let (alias, formula) = self.lookup(input);
        let term = match self.compile(&formula) {
            Ok(term) => term,
            Err(Error::Syntax(_)) if alias.is_none() && is_name(input) => {
                return Err(EvaluationError::UnknownAlias(input.to_owned()).into())
            }
            Err(err) => return Err(err),
        };
        let result = evaluate(&term, &self.config, rng)?;

        #[cfg(feature = "logging")]
        {
            debug!("rolled {} ({:?}): {}", &formula, &alias, result.total);
        }

        Ok(RollOutcome {
            alias,
            formula,
            result,
        })
    }
}
