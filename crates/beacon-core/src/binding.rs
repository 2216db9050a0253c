//! The binding table: which display fields exist and which payload key
//! feeds each of them.
//!
//! Event kinds form a closed set. Adding a display field means adding one
//! [`Binding`] to the relevant field map below; nothing else changes.

use std::fmt;

/// Event types that have a registered field map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Server status line.
    Status,
    /// The player's agent summary.
    Agent,
    /// The currently tracked contract.
    Contract,
}

impl EventKind {
    /// Every registered kind, in table order.
    pub const ALL: [Self; 3] = [Self::Status, Self::Agent, Self::Contract];

    /// Resolve a wire tag. Unknown tags yield `None`; the server may add new
    /// kinds at any time.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "status" => Some(Self::Status),
            "agent" => Some(Self::Agent),
            "contract" => Some(Self::Contract),
            _ => None,
        }
    }

    /// The wire tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Agent => "agent",
            Self::Contract => "contract",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(target selector, source key)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Attribute query identifying zero or one target element.
    pub selector: &'static str,
    /// Key looked up in the envelope's `data` object.
    pub key: &'static str,
}

impl Binding {
    /// Pair a selector with a payload key.
    pub const fn new(selector: &'static str, key: &'static str) -> Self {
        Self { selector, key }
    }
}

/// Ordered bindings for one event kind.
pub type FieldMap = &'static [Binding];

const STATUS_FIELDS: FieldMap = &[Binding::new("[data-status]", "status")];

const AGENT_FIELDS: FieldMap = &[
    Binding::new("[data-agent-id]", "id"),
    Binding::new("[data-agent-symbol]", "symbol"),
    Binding::new("[data-agent-hq]", "headquarters"),
    Binding::new("[data-agent-credits]", "credits"),
    Binding::new("[data-agent-faction]", "faction"),
    Binding::new("[data-agent-ship-count]", "shipCount"),
];

const CONTRACT_FIELDS: FieldMap = &[Binding::new("[data-contract-id]", "id")];

/// Immutable mapping from event kind to field map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingTable {
    status: FieldMap,
    agent: FieldMap,
    contract: FieldMap,
}

impl BindingTable {
    /// The table the page markup is built against.
    pub const fn builtin() -> Self {
        Self::new(STATUS_FIELDS, AGENT_FIELDS, CONTRACT_FIELDS)
    }

    /// A table with custom field maps.
    pub const fn new(status: FieldMap, agent: FieldMap, contract: FieldMap) -> Self {
        Self {
            status,
            agent,
            contract,
        }
    }

    /// Field map for a registered kind.
    pub fn field_map(&self, kind: EventKind) -> FieldMap {
        match kind {
            EventKind::Status => self.status,
            EventKind::Agent => self.agent,
            EventKind::Contract => self.contract,
        }
    }

    /// Resolve a wire tag to its kind and field map.
    pub fn resolve(&self, tag: &str) -> Option<(EventKind, FieldMap)> {
        EventKind::from_tag(tag).map(|kind| (kind, self.field_map(kind)))
    }

    /// All `(kind, field map)` entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (EventKind, FieldMap)> + '_ {
        EventKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.field_map(kind)))
    }

    /// Every selector the table writes to, in table order.
    pub fn selectors(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter()
            .flat_map(|(_, fields)| fields.iter().map(|binding| binding.selector))
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_kind() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_and_superseded_tags_are_not_registered() {
        assert_eq!(EventKind::from_tag("ships"), None);
        assert_eq!(EventKind::from_tag("Agent"), None);
        assert_eq!(EventKind::from_tag(""), None);
    }

    #[test]
    fn agent_field_map_order_matches_page_contract() {
        let table = BindingTable::builtin();
        let keys: Vec<_> = table
            .field_map(EventKind::Agent)
            .iter()
            .map(|b| (b.selector, b.key))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("[data-agent-id]", "id"),
                ("[data-agent-symbol]", "symbol"),
                ("[data-agent-hq]", "headquarters"),
                ("[data-agent-credits]", "credits"),
                ("[data-agent-faction]", "faction"),
                ("[data-agent-ship-count]", "shipCount"),
            ]
        );
    }

    #[test]
    fn resolve_returns_kind_and_fields() {
        let table = BindingTable::default();
        let (kind, fields) = table.resolve("contract").unwrap();
        assert_eq!(kind, EventKind::Contract);
        assert_eq!(fields, &[Binding::new("[data-contract-id]", "id")]);
        assert!(table.resolve("unknown_kind").is_none());
    }

    #[test]
    fn selectors_cover_every_binding_once() {
        let table = BindingTable::builtin();
        let selectors: Vec<_> = table.selectors().collect();
        assert_eq!(selectors.len(), 8);
        assert_eq!(selectors.first(), Some(&"[data-status]"));
        assert_eq!(selectors.last(), Some(&"[data-contract-id]"));

        let mut deduped = selectors.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), selectors.len());
    }

    #[test]
    fn kind_display_uses_wire_tag() {
        assert_eq!(EventKind::Agent.to_string(), "agent");
    }
}
