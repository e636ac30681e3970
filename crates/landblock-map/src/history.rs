use crate::config::HistoryConfig;
use crate::database::DocumentId;
use crate::edit::{EditTarget, TerrainCommand};
use crate::error::EditError;
use crate::layer::LayerId;

use std::collections::VecDeque;
use std::fmt;

/// Sent to history subscribers after every change to the history.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HistoryEvent {
    pub can_undo: bool,
    pub can_redo: bool,
    pub cursor: Option<usize>,
    pub len: usize,
    pub truncated: bool,
}

type Subscriber = Box<dyn FnMut(&HistoryEvent) + Send>;

struct HistoryEntry {
    target: EditTarget,
    command: TerrainCommand,
}

/// An ordered list of applied commands and a cursor at the most recently applied one.
///
/// Entries after the cursor form the redo branch, which is dropped as soon as a new command is recorded. Once the
/// history holds more than `max_depth` entries the oldest is forgotten and the history is marked as truncated for good.
pub struct CommandHistory {
    entries: VecDeque<HistoryEntry>,
    cursor: Option<usize>,
    max_depth: usize,
    truncated: bool,
    subscribers: Vec<Subscriber>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_config(&HistoryConfig::default())
    }
}

impl fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("labels", &self.labels())
            .field("cursor", &self.cursor)
            .field("max_depth", &self.max_depth)
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl CommandHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            max_depth: max_depth.max(1),
            truncated: false,
            subscribers: Vec::new(),
        }
    }

    pub fn with_config(config: &HistoryConfig) -> Self {
        Self::new(config.max_depth)
    }

    /// Runs `command` against `target` and records it. Returns `false` without recording if it changed nothing.
    pub fn execute(
        &mut self,
        target: &EditTarget,
        mut command: TerrainCommand,
    ) -> Result<bool, EditError> {
        command.execute(target)?;
        if command.is_empty() {
            return Ok(false);
        }
        self.record(target.clone(), command);
        Ok(true)
    }

    /// Records a command that has already been applied, like a finished tool stroke.
    pub fn record(&mut self, target: EditTarget, command: TerrainCommand) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push_back(HistoryEntry { target, command });
        self.cursor = Some(self.entries.len() - 1);

        while self.entries.len() > self.max_depth {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!("Evicting history entry {:?}", evicted.command.label());
            }
            self.cursor = self.cursor.and_then(|c| c.checked_sub(1));
            self.truncated = true;
        }
        self.notify();
    }

    /// Undoes the command at the cursor. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditError> {
        let done = self.step_back()?;
        if done {
            self.notify();
        }
        Ok(done)
    }

    /// Reapplies the command after the cursor. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditError> {
        let done = self.step_forward()?;
        if done {
            self.notify();
        }
        Ok(done)
    }

    /// Undoes or redoes until `index` is the most recently applied entry. `None` undoes everything.
    pub fn jump_to(&mut self, index: Option<usize>) -> Result<(), EditError> {
        if let Some(index) = index {
            if index >= self.entries.len() {
                return Err(EditError::HistoryIndexOutOfBounds {
                    index,
                    len: self.entries.len(),
                });
            }
        }
        let start = self.cursor;
        let result = self.walk_to(index);
        if self.cursor != start {
            self.notify();
        }
        result
    }

    /// Drops every entry that edits the document `id`, keeping the cursor on the same surviving entry. Returns how many
    /// entries were dropped.
    pub fn forget(&mut self, id: &DocumentId) -> usize {
        self.retain(|entry| entry.target.document.id() != id)
    }

    /// Drops every entry pinned to `layer` of the document `id`. Call this once the layer is gone, since those entries
    /// can no longer be undone or redone.
    pub fn forget_layer(&mut self, id: &DocumentId, layer: LayerId) -> usize {
        self.retain(|entry| entry.target.document.id() != id || !entry.command.writes_to(layer))
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&HistoryEvent) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// True once any entry has been evicted.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.command.label()).collect()
    }

    fn retain(&mut self, mut keep: impl FnMut(&HistoryEntry) -> bool) -> usize {
        let (old_cursor, old_len) = (self.cursor, self.entries.len());
        let mut kept = VecDeque::with_capacity(self.entries.len());
        let mut cursor = None;
        for (i, entry) in self.entries.drain(..).enumerate() {
            if !keep(&entry) {
                continue;
            }
            kept.push_back(entry);
            if old_cursor.map_or(false, |c| i <= c) {
                cursor = Some(kept.len() - 1);
            }
        }
        self.entries = kept;
        self.cursor = cursor;
        let removed = old_len - self.entries.len();
        if removed > 0 {
            self.notify();
        }
        removed
    }

    fn walk_to(&mut self, index: Option<usize>) -> Result<(), EditError> {
        while self.cursor > index {
            self.step_back()?;
        }
        while self.cursor < index {
            self.step_forward()?;
        }
        Ok(())
    }

    fn step_back(&mut self) -> Result<bool, EditError> {
        let cursor = match self.cursor {
            Some(c) => c,
            None => return Ok(false),
        };
        let entry = &mut self.entries[cursor];
        entry.command.undo(&entry.target)?;
        self.cursor = cursor.checked_sub(1);
        Ok(true)
    }

    fn step_forward(&mut self) -> Result<bool, EditError> {
        let next = self.cursor.map_or(0, |c| c + 1);
        let entry = match self.entries.get_mut(next) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        entry.command.execute(&entry.target)?;
        self.cursor = Some(next);
        Ok(true)
    }

    fn notify(&mut self) {
        let event = HistoryEvent {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            cursor: self.cursor,
            len: self.entries.len(),
            truncated: self.truncated,
        };
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&event);
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
