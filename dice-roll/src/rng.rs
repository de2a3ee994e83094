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

#[cfg(feature = "roll")]
use rand::{distributions::Uniform, Rng};

/// Source of die faces, uniform over an inclusive range.
pub trait RollSource {
    fn roll_face(&mut self, low: i64, high: i64) -> i64;
}

#[cfg(feature = "roll")]
impl<R: Rng> RollSource for R {
    fn roll_face(&mut self, low: i64, high: i64) -> i64 {
        self.sample(Uniform::new_inclusive(low, high))
    }
}

/// Replays a fixed sequence of faces, starting over when it runs out.
///
/// Faces outside the requested range are clamped into it, an empty script
/// always yields the lowest face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedRolls {
    faces: Vec<i64>,
    next: usize,
}

impl ScriptedRolls {
    pub fn new<I: IntoIterator<Item = i64>>(faces: I) -> ScriptedRolls {
        ScriptedRolls {
            faces: faces.into_iter().collect(),
            next: 0,
        }
    }

    /// Number of faces handed out so far.
    pub fn consumed(&self) -> usize {
        self.next
    }
}

impl RollSource for ScriptedRolls {
    fn roll_face(&mut self, low: i64, high: i64) -> i64 {
        if self.faces.is_empty() {
            return low;
        }
        let face = self.faces[self.next % self.faces.len()];
        self.next += 1;
        face.max(low).min(high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_rolls_replay() {
        let mut rolls = ScriptedRolls::new(vec![3, 9, -4]);
        assert_eq!(rolls.roll_face(1, 6), 3);
        assert_eq!(rolls.roll_face(1, 6), 6);
        assert_eq!(rolls.roll_face(-1, 1), -1);
        assert_eq!(rolls.roll_face(1, 6), 3);
        assert_eq!(rolls.consumed(), 4);
        assert_eq!(ScriptedRolls::new(vec![]).roll_face(1, 6), 1);
    }

    #[cfg(feature = "roll")]
    #[test]
    fn test_rng_source_range() {
        use rand::SeedableRng;
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..1000 {
            let face = rng.roll_face(1, 6);
            assert!((1..=6).contains(&face));
        }
    }
}
