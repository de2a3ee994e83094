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

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Division {
    /// Truncates toward zero.
    Integer,
    Real,
}

/// Engine settings read by the resolver and the evaluator.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RollConfig {
    /// Dice count used when a dice term omits it.
    pub default_roll: u32,
    /// Face count used when a dice term omits it.
    pub default_face: u32,
    /// Upper bound for rerolls of one die and for one chain of explosions.
    pub iteration_cap: u32,
    /// Upper bound for the dice rolled by a single term before modifiers.
    pub max_dice: u32,
    pub division: Division,
}

impl Default for RollConfig {
    fn default() -> RollConfig {
        RollConfig {
            default_roll: 1,
            default_face: 100,
            iteration_cap: 1000,
            max_dice: 10_000,
            division: Division::Integer,
        }
    }
}
