use log::{debug, error};

use crate::file_handling::{get_history, write_history};

/// Lines that executed successfully, oldest first, in canonical form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<String>,
    /// Where to save after every change, `None` to keep it in memory.
    path: Option<String>,
}

impl History {
    pub fn in_memory(entries: Vec<String>) -> Self {
        Self { entries, path: None }
    }

    /// Loads the history saved at `path`. A missing or unreadable file
    /// starts an empty history.
    pub fn load(path: &str, save: bool) -> Self {
        let entries = get_history(path).unwrap_or_else(|e| {
            error!("Ignoring history: {e}");
            Vec::new()
        });
        Self {
            entries,
            path: save.then(|| path.to_string()),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The entry `back` steps from the newest, starting at `1`.
    pub fn recall(&self, back: usize) -> Option<&str> {
        back.checked_sub(1)
            .and_then(|offset| self.entries.len().checked_sub(offset + 1))
            .and_then(|index| self.entries.get(index))
            .map(String::as_str)
    }

    /// Adds `line` as the newest entry, keeping at most `limit` entries.
    /// Repeating the newest entry does nothing.
    pub fn push(&mut self, line: &str, limit: usize) {
        if line.is_empty() || self.entries.last().is_some_and(|last| last == line) {
            return;
        }

        self.entries.push(line.to_string());
        let excess = self.entries.len().saturating_sub(limit);
        self.entries.drain(..excess);
        debug!("History has {} entries", self.entries.len());

        if let Some(path) = &self.path {
            if let Err(e) = write_history(path, &self.entries) {
                error!("Could not save history: {e}");
            }
        }
    }
}
