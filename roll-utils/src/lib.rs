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

pub mod commands;
pub mod rolls;
pub mod settings;

use dice_roll::{FormulaEntry, RollOutcome};
use rolls::{ExecutorError, RollExecutor};
use settings::{Settings, SettingsStore, StoreError};
use std::path::PathBuf;

pub enum CommandResult {
    Help,
    Settings(Settings),
    AddAlias(Result<(), StoreError>),
    EditAlias(Result<(), StoreError>),
    RemoveAlias(Result<FormulaEntry, StoreError>),
    ListAlias(Vec<FormulaEntry>),
    Roll(Result<RollOutcome, ExecutorError>),
    Repeat(Result<Vec<RollOutcome>, ExecutorError>),
}

/// Settings and roll executor shared by every command.
pub struct RollUtils {
    store: SettingsStore,
    executor: RollExecutor,
}

impl RollUtils {
    /// Needs a running tokio runtime.
    pub async fn new<P: Into<PathBuf>>(path: P, workers: u32, reseed_after: u32) -> RollUtils {
        RollUtils {
            store: SettingsStore::open(path).await,
            executor: RollExecutor::new(workers, reseed_after),
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    async fn record(&self, settings: &Settings, outcomes: &[RollOutcome]) {
        if !settings.persist_results {
            return;
        }
        for outcome in outcomes {
            if let Err(err) = self.store.record(outcome).await {
                log::warn!("unable to persist roll result: {}", err);
            }
        }
    }

    /// Runs one input line. A line naming a saved formula rolls it, even when
    /// it spells a command.
    pub async fn eval(&self, line: &str) -> Option<CommandResult> {
        let alias = line.trim();
        let command = if self.store.registry().snapshot().contains(alias) {
            log::info!("rolling saved formula {}", alias);
            commands::Command::Roll(alias.to_owned())
        } else {
            commands::parse_logging(line)?
        };
        Some(match command {
            commands::Command::Help => CommandResult::Help,
            commands::Command::Settings => CommandResult::Settings(self.store.settings().await),
            commands::Command::AddAlias(entry) => {
                CommandResult::AddAlias(self.store.add_formula(entry).await)
            }
            commands::Command::EditAlias(old, entry) => {
                CommandResult::EditAlias(self.store.edit_formula(&old, entry).await)
            }
            commands::Command::RemoveAlias(alias) => {
                CommandResult::RemoveAlias(self.store.remove_formula(&alias).await)
            }
            commands::Command::ListAliases => CommandResult::ListAlias(self.store.formulas().await),
            commands::Command::Roll(formula) => {
                let result = self.executor.roll(self.store.roller().await, formula).await;
                if let Ok(outcome) = &result {
                    self.record(&self.store.settings().await, std::slice::from_ref(outcome))
                        .await;
                }
                CommandResult::Roll(result)
            }
            commands::Command::Repeat(times, formula) => {
                let settings = self.store.settings().await;
                let result = self
                    .executor
                    .roll_many(
                        self.store.roller().await,
                        formula,
                        times,
                        settings.max_repeat,
                    )
                    .await;
                if let Ok(outcomes) = &result {
                    self.record(&settings, outcomes).await;
                }
                CommandResult::Repeat(result)
            }
        })
    }
}
