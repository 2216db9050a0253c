//! Headless stand-in for a page: a flat list of selector-addressed fields.

use std::fmt;

use crate::binding::BindingTable;
use crate::target::TargetResolver;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Field {
    selector: String,
    text: String,
    writes: usize,
}

/// In-memory field targets keyed by exact selector text.
///
/// Fields can be added and removed between dispatches to model a page whose
/// markup changes under the binder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldBoard {
    fields: Vec<Field>,
}

impl FieldBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// A board with one empty field per selector in the table.
    pub fn from_table(table: &BindingTable) -> Self {
        let mut board = Self::new();
        for selector in table.selectors() {
            board.insert(selector, "");
        }
        board
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_field(mut self, selector: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(selector, text);
        self
    }

    /// Add a field, or reset the text of an existing one.
    pub fn insert(&mut self, selector: impl Into<String>, text: impl Into<String>) {
        let selector = selector.into();
        let text = text.into();
        match self.fields.iter_mut().find(|f| f.selector == selector) {
            Some(field) => field.text = text,
            None => self.fields.push(Field {
                selector,
                text,
                writes: 0,
            }),
        }
    }

    /// Remove a field, returning its last text.
    pub fn remove(&mut self, selector: &str) -> Option<String> {
        let idx = self.position(selector)?;
        Some(self.fields.remove(idx).text)
    }

    /// Whether a field exists for `selector`.
    pub fn contains(&self, selector: &str) -> bool {
        self.position(selector).is_some()
    }

    /// Current text of a field.
    pub fn text(&self, selector: &str) -> Option<&str> {
        self.position(selector)
            .map(|idx| self.fields[idx].text.as_str())
    }

    /// How many times the binder wrote to this field.
    pub fn write_count(&self, selector: &str) -> usize {
        self.position(selector)
            .map_or(0, |idx| self.fields[idx].writes)
    }

    /// Total writes across every field.
    pub fn total_writes(&self) -> usize {
        self.fields.iter().map(|f| f.writes).sum()
    }

    /// `(selector, text)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|f| (f.selector.as_str(), f.text.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the board has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn position(&self, selector: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.selector == selector)
    }
}

impl TargetResolver for FieldBoard {
    type Target = usize;

    fn resolve(&self, selector: &str) -> Option<usize> {
        self.position(selector)
    }

    fn write_text(&mut self, target: &usize, text: &str) {
        if let Some(field) = self.fields.get_mut(*target) {
            text.clone_into(&mut field.text);
            field.writes += 1;
        }
    }
}

impl fmt::Display for FieldBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .fields
            .iter()
            .map(|field| field.selector.len())
            .max()
            .unwrap_or(0);
        for field in &self.fields {
            writeln!(f, "{:<width$}  {}", field.selector, field.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_table_seeds_every_selector() {
        let board = FieldBoard::from_table(&BindingTable::builtin());
        assert_eq!(board.len(), 8);
        assert_eq!(board.text("[data-agent-hq]"), Some(""));
        assert_eq!(board.total_writes(), 0);
    }

    #[test]
    fn insert_resets_existing_text() {
        let mut board = FieldBoard::new().with_field("[data-status]", "old");
        board.insert("[data-status]", "new");
        assert_eq!(board.len(), 1);
        assert_eq!(board.text("[data-status]"), Some("new"));
    }

    #[test]
    fn resolve_misses_unknown_selectors() {
        let board = FieldBoard::new().with_field("[data-status]", "");
        assert_eq!(board.resolve("[data-status]"), Some(0));
        assert_eq!(board.resolve("[data-agent-id]"), None);
    }

    #[test]
    fn write_replaces_text_and_counts() {
        let mut board = FieldBoard::new().with_field("[data-status]", "loading…");
        let target = board.resolve("[data-status]").unwrap();
        board.write_text(&target, "ONLINE");
        board.write_text(&target, "ONLINE");
        assert_eq!(board.text("[data-status]"), Some("ONLINE"));
        assert_eq!(board.write_count("[data-status]"), 2);
        assert_eq!(board.write_count("[data-missing]"), 0);
    }

    #[test]
    fn removed_fields_stop_resolving() {
        let mut board = FieldBoard::from_table(&BindingTable::builtin());
        assert_eq!(board.remove("[data-agent-hq]"), Some(String::new()));
        assert!(!board.contains("[data-agent-hq]"));
        assert!(board.resolve("[data-agent-hq]").is_none());
        assert!(board.remove("[data-agent-hq]").is_none());
    }

    #[test]
    fn display_aligns_selectors() {
        let board = FieldBoard::new()
            .with_field("[data-status]", "ONLINE")
            .with_field("[data-agent-id]", "A1");
        let rendered = board.to_string();
        assert_eq!(
            rendered,
            "[data-status]    ONLINE\n[data-agent-id]  A1\n"
        );
    }
}
