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

use crate::dice_types::*;

pub trait DiceLimits {
    fn min(&self) -> i64;
    fn max(&self) -> i64;
}

impl DiceLimits for DiceType {
    fn min(&self) -> i64 {
        match self {
            DiceType::Number(_) => 1,
            DiceType::Fudge => -1,
        }
    }

    fn max(&self) -> i64 {
        match self {
            DiceType::Number(n) => (*n).into(),
            DiceType::Fudge => 1,
        }
    }
}

impl Condition {
    /// Whether every face of `dice` satisfies the condition.
    pub fn covers<D: DiceLimits>(&self, dice: &D) -> bool {
        let (low, high) = (dice.min(), dice.max());
        match self.comparator {
            Comparator::Equal => low == self.target && high == self.target,
            Comparator::Bigger => low > self.target,
            Comparator::BiggerEq => low >= self.target,
            Comparator::Smaller => high < self.target,
            Comparator::SmallerEq => high <= self.target,
        }
    }
}
