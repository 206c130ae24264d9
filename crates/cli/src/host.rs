//! The shell session as seen by the `node`, `resource` and `setting` types.

use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glob::Pattern;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use quill_core::host::{Host, Setting};
use quill_core::types::{TypeOptions, TypeSpec};
use quill_core::value::Value;

use crate::error::{Error, Result};

pub const SHELL_SETTING: &str = "shell";
pub const DRY_RUN_SETTING: &str = "dry_run";
pub const HISTORY_SIZE_SETTING: &str = "history_size";

/// Resources are the definition files commands were loaded from.
pub const DEFINITIONS_RESOURCE: &str = "definitions";

/// Settings, the files of one directory and the loaded definition files.
#[derive(Debug)]
pub struct ShellHost {
    settings: RwLock<IndexMap<String, Setting>>,
    root: PathBuf,
    definition_files: Vec<String>,
}

impl ShellHost {
    pub fn new(root: PathBuf, shell: &str, dry_run: bool, history_size: usize) -> Self {
        let history_size_type = TypeOptions {
            min: Some(0.0),
            ..TypeOptions::new("number")
        };
        let settings = [
            Setting::new(SHELL_SETTING, "string".into())
                .with_description("The shell commands run through")
                .with_value(Value::from(shell)),
            Setting::new(DRY_RUN_SETTING, "boolean".into())
                .with_description("Print command lines instead of running them")
                .with_value(Value::from(dry_run)),
            Setting::new(HISTORY_SIZE_SETTING, TypeSpec::Options(history_size_type))
                .with_description("How many lines the history keeps")
                .with_value(Value::from(history_size as f64)),
        ];

        Self {
            settings: RwLock::new(settings.into_iter().map(|s| (s.name.clone(), s)).collect()),
            root,
            definition_files: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_definition_files(mut self, files: Vec<String>) -> Self {
        self.definition_files = files;
        self
    }

    pub fn setting(&self, name: &str) -> Option<Value> {
        self.read().get(name).and_then(|setting| setting.value.clone())
    }

    /// Changes a setting.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such setting or `value` is not of
    /// its type.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let mut settings = self.write();
        let setting = settings
            .get_mut(name)
            .ok_or_else(|| Error::UnknownSetting(name.to_string()))?;

        let fits = match setting.type_spec.name() {
            "boolean" => value.as_bool().is_some(),
            "number" => value.as_f64().is_some_and(|n| n >= 0.0),
            _ => value.as_str().is_some(),
        };
        if !fits {
            return Err(Error::InvalidSetting(name.to_string(), value.to_string()));
        }

        info!("Setting `{name}` to `{value}`");
        setting.value = Some(value);
        Ok(())
    }

    pub fn shell(&self) -> String {
        self.setting(SHELL_SETTING)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(crate::config::default_shell)
    }

    pub fn dry_run(&self) -> bool {
        self.setting(DRY_RUN_SETTING)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    pub fn history_size(&self) -> usize {
        self.setting(HISTORY_SIZE_SETTING)
            .and_then(|value| value.as_f64())
            .map_or(crate::config::DEFAULT_HISTORY_SIZE, |n| n as usize)
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Setting>> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Setting>> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Host for ShellHost {
    fn select_nodes(&self, query: &str) -> std::result::Result<Vec<String>, String> {
        if query.contains('/') {
            return Err(format!("Only names in `{}` can be selected", self.root.display()));
        }

        let pattern = Pattern::new(query).map_err(|e| format!("Bad pattern `{query}`: {e}"))?;
        let entries = fs::read_dir(&self.root)
            .map_err(|e| format!("Cannot read `{}`: {e}", self.root.display()))?;
        let nodes = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| pattern.matches(name))
            .sorted()
            .collect::<Vec<_>>();
        debug!("`{query}` selected {} nodes", nodes.len());
        Ok(nodes)
    }

    fn resources(&self, kind: Option<&str>) -> Vec<String> {
        match kind {
            None | Some(DEFINITIONS_RESOURCE) => self.definition_files.clone(),
            Some(_) => Vec::new(),
        }
    }

    fn settings(&self) -> Vec<Setting> {
        self.read().values().cloned().collect()
    }
}
