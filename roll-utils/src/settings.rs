/*
 *  Copyright 2021 Robin Marchart
 *
 *     Licensed under the Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at
 *
 *         http://www.apache.org/licenses/LICENSE-2.0
 *
 *     Unless required by applicable law or agreed to in writing, software
 *     distributed under the License is distributed on an "AS IS" BASIS,
 *     WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *     See the License for the specific language governing permissions and
 *     limitations under the License.
 */

use dice_roll::{
    DiceRoller, Division, FormulaEntry, FormulaRegistry, FormulaSnapshot, RollConfig, RollOutcome,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("unable to encode roll result: {0}")]
    Record(#[from] serde_json::Error),
    #[error("alias must not be empty")]
    EmptyAlias,
    #[error("formula for `{0}` must not be empty")]
    EmptyFormula(String),
    #[error("no formula named `{0}`")]
    UnknownAlias(String),
}

/// Persisted plugin settings. Missing keys take their default.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub return_all_tags: bool,
    pub roll_links_for_tags: bool,
    pub copy_content_button: bool,
    /// Show the formula next to each result.
    pub display_results_inline: bool,
    pub persist_results: bool,
    pub default_roll: u32,
    pub default_face: u32,
    pub iteration_cap: u32,
    pub max_dice: u32,
    pub division: Division,
    /// Upper bound for `repeat <n>`.
    pub max_repeat: u32,
    // tables come last in toml
    pub formulas: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Settings {
        let config = RollConfig::default();
        Settings {
            return_all_tags: true,
            roll_links_for_tags: false,
            copy_content_button: true,
            display_results_inline: false,
            persist_results: false,
            default_roll: config.default_roll,
            default_face: config.default_face,
            iteration_cap: config.iteration_cap,
            max_dice: config.max_dice,
            division: config.division,
            max_repeat: 100,
            formulas: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn roll_config(&self) -> RollConfig {
        RollConfig {
            default_roll: self.default_roll,
            default_face: self.default_face,
            iteration_cap: self.iteration_cap,
            max_dice: self.max_dice,
            division: self.division,
        }
    }

    pub fn snapshot(&self) -> FormulaSnapshot {
        FormulaSnapshot::new(
            self.formulas
                .iter()
                .map(|(alias, formula)| FormulaEntry::new(alias.as_str(), formula.as_str())),
        )
    }

    fn insert(&mut self, entry: FormulaEntry) -> Result<(), StoreError> {
        let alias = entry.alias.trim();
        let formula = entry.formula.trim();
        if alias.is_empty() {
            return Err(StoreError::EmptyAlias);
        }
        if formula.is_empty() {
            return Err(StoreError::EmptyFormula(alias.to_owned()));
        }
        self.formulas.insert(alias.to_owned(), formula.to_owned());
        Ok(())
    }
}

fn parse_settings(content: &str, path: &Path) -> Settings {
    match toml::from_str(content) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!(
                "Parsing settings from {:?} resulted in Error {}.\n Using default values",
                path,
                err
            );
            Settings::default()
        }
    }
}

/// Settings file with its live formula registry.
///
/// Mutations are written to disk before they become visible; a failed write
/// leaves both the settings and the registry unchanged.
#[derive(Debug)]
pub struct SettingsStore {
    path: Box<Path>,
    settings: Mutex<Settings>,
    registry: Arc<FormulaRegistry>,
}

impl SettingsStore {
    pub async fn open<P: Into<PathBuf>>(path: P) -> SettingsStore {
        let path = path.into().into_boxed_path();
        let settings = match fs::read_to_string(&path).await {
            Ok(content) => parse_settings(&content, &path),
            Err(err) => {
                log::warn!(
                    "Reading settings from {:?} resulted in Error {}.\n Using default values",
                    &path,
                    err
                );
                Settings::default()
            }
        };
        let registry = Arc::new(FormulaRegistry::new(settings.snapshot()));
        SettingsStore {
            path,
            settings: Mutex::new(settings),
            registry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> Arc<FormulaRegistry> {
        self.registry.clone()
    }

    pub async fn settings(&self) -> Settings {
        self.settings.lock().await.clone()
    }

    /// Roller bound to the current engine settings and the live registry.
    pub async fn roller(&self) -> DiceRoller {
        DiceRoller::new(
            self.settings.lock().await.roll_config(),
            self.registry.clone(),
        )
    }

    async fn write(&self, settings: &Settings) -> Result<(), StoreError> {
        let content = toml::to_string(settings)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }
        fs::write(&self.path, content)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.to_path_buf(),
                source,
            })
    }

    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.lock().await;
        self.write(&settings).await
    }

    /// Applies `change` to a copy, persists it, then swaps it in and publishes
    /// the new formula snapshot.
    async fn commit<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Settings) -> Result<T, StoreError>,
    {
        let mut current = self.settings.lock().await;
        let mut next = current.clone();
        let result = change(&mut next)?;
        if let Err(err) = self.write(&next).await {
            log::warn!("unable to persist settings: {}", err);
            return Err(err);
        }
        self.registry.publish(next.snapshot());
        *current = next;
        Ok(result)
    }

    /// Adds a formula, replacing one with the same alias.
    pub async fn add_formula(&self, entry: FormulaEntry) -> Result<(), StoreError> {
        log::info!("adding formula {} = {}", &entry.alias, &entry.formula);
        self.commit(|settings| settings.insert(entry)).await
    }

    pub async fn edit_formula(
        &self,
        old_alias: &str,
        entry: FormulaEntry,
    ) -> Result<(), StoreError> {
        log::info!(
            "editing formula {} to {} = {}",
            old_alias,
            &entry.alias,
            &entry.formula
        );
        self.commit(|settings| match settings.formulas.remove(old_alias) {
            Some(_) => settings.insert(entry),
            None => Err(StoreError::UnknownAlias(old_alias.to_owned())),
        })
        .await
    }

    pub async fn remove_formula(&self, alias: &str) -> Result<FormulaEntry, StoreError> {
        log::info!("removing formula {}", alias);
        self.commit(|settings| match settings.formulas.remove(alias) {
            Some(formula) => Ok(FormulaEntry::new(alias, formula)),
            None => Err(StoreError::UnknownAlias(alias.to_owned())),
        })
        .await
    }

    /// All formulas, sorted by alias.
    pub async fn formulas(&self) -> Vec<FormulaEntry> {
        self.settings
            .lock()
            .await
            .formulas
            .iter()
            .map(|(alias, formula)| FormulaEntry::new(alias.as_str(), formula.as_str()))
            .collect()
    }

    /// File receiving roll results when `persist_results` is set.
    pub fn results_path(&self) -> PathBuf {
        self.path.with_extension("results.jsonl")
    }

    /// Appends one outcome as a json line to [`results_path`](Self::results_path).
    pub async fn record(&self, outcome: &RollOutcome) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(outcome)?;
        line.push('\n');
        let path = self.results_path();
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)
    }
}
