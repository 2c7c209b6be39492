//! Keyboard-driven suggestion state and the positional slots that collect selections.
//!
//! [`Autocomplete`] is the state of one code input field: the current suggestions, which one
//! is highlighted, and whether the list is shown. It is driven by discrete events and never
//! touches the reference list it searches.
//!
//! [`CodeSlots`] holds what the user has committed for one list (diagnoses or procedures).
//! There is always exactly one open slot at the end to keep adding codes.

use crate::codes::{CodeEntry, CodeList};
use crate::error::{LaudoError, LaudoResult};

/// Keys the suggestion list reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

/// Suggestion state for a single input field.
///
/// `highlight` is `None` when nothing is highlighted (the `-1` position). Moving down from
/// the last suggestion or up from nothing stays put.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Autocomplete {
    matches: Vec<CodeEntry>,
    highlight: Option<usize>,
    visible: bool,
}

impl Autocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes suggestions for the text currently in the field.
    ///
    /// The highlight is cleared because it referred to the previous suggestions. The list
    /// is shown only when there is at least one match.
    pub fn input(&mut self, list: &CodeList, query: &str) {
        self.matches = list.search(query).into_iter().cloned().collect();
        self.highlight = None;
        self.visible = !self.matches.is_empty();
    }

    /// Applies a key press. Returns the committed entry when `Enter` selects one.
    pub fn key(&mut self, key: Key) -> Option<CodeEntry> {
        match key {
            Key::ArrowDown => {
                let last = self.matches.len().checked_sub(1)?;
                self.highlight = Some(match self.highlight {
                    None => 0,
                    Some(i) => (i + 1).min(last),
                });
                None
            }
            Key::ArrowUp => {
                self.highlight = match self.highlight {
                    None | Some(0) => None,
                    Some(i) => Some(i - 1),
                };
                None
            }
            Key::Enter => {
                let index = self.highlight?;
                self.commit(index)
            }
            Key::Escape => {
                self.dismiss();
                None
            }
        }
    }

    /// Selects a suggestion directly (mouse click). Out-of-range indexes are ignored.
    pub fn click(&mut self, index: usize) -> Option<CodeEntry> {
        self.commit(index)
    }

    /// Hides the list and clears the highlight, as for an interaction outside the field.
    pub fn dismiss(&mut self) {
        self.visible = false;
        self.highlight = None;
    }

    pub fn matches(&self) -> &[CodeEntry] {
        &self.matches
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn commit(&mut self, index: usize) -> Option<CodeEntry> {
        let entry = self.matches.get(index).cloned()?;
        self.dismiss();
        Some(entry)
    }
}

/// Positional selections for one code list.
///
/// Slot 0 is the primary code, later slots are additional ones. A slot, once opened, is never
/// removed or reordered; saved drafts replay codes by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSlots {
    slots: Vec<Option<CodeEntry>>,
}

impl Default for CodeSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeSlots {
    /// One open primary slot.
    pub fn new() -> Self {
        Self { slots: vec![None] }
    }

    /// Rebuilds slots from a saved ordered list: codes fill slots `0..n` and one open slot
    /// follows them.
    pub fn restore(codes: impl IntoIterator<Item = CodeEntry>) -> Self {
        let mut slots: Vec<Option<CodeEntry>> = codes.into_iter().map(Some).collect();
        slots.push(None);
        Self { slots }
    }

    /// Records `entry` in slot `index`.
    ///
    /// Filling the highest-numbered slot opens a new empty one after it. Returns the index
    /// of the newly opened slot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LaudoError::SlotOutOfRange`] when `index` has not been opened.
    pub fn select(&mut self, index: usize, entry: CodeEntry) -> LaudoResult<Option<usize>> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(LaudoError::SlotOutOfRange { index, len })?;
        *slot = Some(entry);

        if index + 1 == len {
            self.slots.push(None);
            return Ok(Some(len));
        }
        Ok(None)
    }

    /// Number of opened slots, filled or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CodeEntry> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Selected entries in slot order, skipping open slots.
    pub fn filled(&self) -> impl Iterator<Item = &CodeEntry> + '_ {
        self.slots.iter().flatten()
    }

    /// Owned copy of [`filled`](Self::filled), the form stored in drafts.
    pub fn to_vec(&self) -> Vec<CodeEntry> {
        self.filled().cloned().collect()
    }

    pub fn has_selection(&self) -> bool {
        self.filled().next().is_some()
    }
}
