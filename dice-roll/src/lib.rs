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

pub mod config;
pub mod dice_roll;
pub mod dice_types;
pub mod error;
pub mod lexer;
pub mod limits;
pub mod modifiers;
pub mod parser;
pub mod registry;
pub mod rng;
pub mod roller;

pub use config::{Division, RollConfig};
pub use dice_roll::{evaluate, DieResult, EvaluationResult, RollBreakdown, Total};
pub use error::{Error, ErrorKind, EvaluationError, ModifierError, SyntaxError};
pub use registry::{FormulaEntry, FormulaRegistry, FormulaSnapshot};
pub use rng::{RollSource, ScriptedRolls};
pub use roller::{DiceRoller, RollOutcome};
