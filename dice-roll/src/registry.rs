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

use crate::error::EvaluationError;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use log::debug;

#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormulaEntry {
    pub alias: String,
    pub formula: String,
}

impl FormulaEntry {
    pub fn new<A: Into<String>, F: Into<String>>(alias: A, formula: F) -> FormulaEntry {
        FormulaEntry {
            alias: alias.into(),
            formula: formula.into(),
        }
    }
}

/// Immutable alias map. Edits build a new snapshot.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct FormulaSnapshot {
    formulas: HashMap<String, String>,
}

impl FormulaSnapshot {
    pub fn new<I: IntoIterator<Item = FormulaEntry>>(entries: I) -> FormulaSnapshot {
        FormulaSnapshot {
            formulas: entries
                .into_iter()
                .map(|entry| (entry.alias, entry.formula))
                .collect(),
        }
    }

    /// Looks up one alias. The returned formula is never resolved again.
    pub fn resolve(&self, alias: &str) -> Result<&str, EvaluationError> {
        self.formulas
            .get(alias)
            .map(String::as_str)
            .ok_or_else(|| EvaluationError::UnknownAlias(alias.to_owned()))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.formulas.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// All entries, sorted by alias.
    pub fn entries(&self) -> Vec<FormulaEntry> {
        let mut entries: Vec<FormulaEntry> = self
            .formulas
            .iter()
            .map(|(alias, formula)| FormulaEntry::new(alias.as_str(), formula.as_str()))
            .collect();
        entries.sort();
        entries
    }
}

/// Shared handle to the current snapshot.
#[derive(Debug, Default)]
pub struct FormulaRegistry {
    current: RwLock<Arc<FormulaSnapshot>>,
}

impl FormulaRegistry {
    pub fn new(snapshot: FormulaSnapshot) -> FormulaRegistry {
        FormulaRegistry {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<FormulaSnapshot> {
        self.current.read().clone()
    }

    pub fn resolve(&self, alias: &str) -> Result<String, EvaluationError> {
        self.snapshot().resolve(alias).map(str::to_owned)
    }

    /// Replaces the current snapshot. Readers holding the old one keep it.
    pub fn publish(&self, snapshot: FormulaSnapshot) {
        #[cfg(feature = "logging")]
        {
            debug!("publishing {} formulas", snapshot.len());
        }
        *self.current.write() = Arc::new(snapshot);
    }
}
