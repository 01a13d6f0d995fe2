#![forbid(unsafe_code)]

//! Attach options: which operations to expose and where the bus lives.

use std::collections::HashMap;

use bitflags::bitflags;
use evbus_core::BusHandle;

use crate::error::OptionsError;

bitflags! {
    /// Operations of the evented surface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Operations: u8 {
        const ON = 1 << 0;
        const ONE = 1 << 1;
        const ANY = 1 << 2;
        const OFF = 1 << 3;
        const TRIGGER = 1 << 4;
        /// The set an object needs to count as capability-bearing.
        const CORE = Self::ON.bits() | Self::ONE.bits() | Self::OFF.bits() | Self::TRIGGER.bits();
    }
}

impl Default for Operations {
    fn default() -> Self {
        Self::empty()
    }
}

impl Operations {
    /// Parse one operation name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "on" => Some(Self::ON),
            "one" => Some(Self::ONE),
            "any" => Some(Self::ANY),
            "off" => Some(Self::OFF),
            "trigger" => Some(Self::TRIGGER),
            _ => None,
        }
    }

    /// Parse a `|`- or `,`-separated list of names, e.g. `"on|trigger"`.
    ///
    /// Empty segments are ignored. All unknown names are reported.
    pub fn parse_names(names: &str) -> Result<Self, Vec<OptionsError>> {
        let mut ops = Self::empty();
        let mut errors = Vec::new();
        for name in names.split(['|', ',']).map(str::trim).filter(|n| !n.is_empty()) {
            match Self::parse(name) {
                Some(op) => ops |= op,
                None => errors.push(OptionsError::new(
                    "exclude",
                    name,
                    "expected on|one|any|off|trigger",
                )),
            }
        }
        if errors.is_empty() { Ok(ops) } else { Err(errors) }
    }
}

/// Options for [`crate::attach`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachOptions {
    /// Operations left off the public surface.
    pub exclude: Operations,
    /// Reuse the host's handle stored under this key instead of creating one.
    pub event_bus_key: Option<String>,
}

impl AttachOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_exclude(mut self, exclude: Operations) -> Self {
        self.exclude = exclude;
        self
    }

    /// Like [`Self::with_exclude`], from names such as `"one|any"`.
    pub fn with_exclude_names(self, names: &str) -> Result<Self, Vec<OptionsError>> {
        Ok(self.with_exclude(Operations::parse_names(names)?))
    }

    #[must_use]
    pub fn with_event_bus_key(mut self, key: impl Into<String>) -> Self {
        self.event_bus_key = Some(key.into());
        self
    }

    /// Surface that remains after exclusions.
    #[must_use]
    pub fn surface(&self) -> Operations {
        Operations::all().difference(self.exclude)
    }
}

/// Hosts that can lend an existing bus handle by key.
pub trait HandleSlots {
    fn handle_slot(&self, key: &str) -> Option<BusHandle>;
}

/// A host with no slots; only fresh handles can be attached.
impl HandleSlots for () {
    fn handle_slot(&self, _key: &str) -> Option<BusHandle> {
        None
    }
}

impl HandleSlots for HashMap<String, BusHandle> {
    fn handle_slot(&self, key: &str) -> Option<BusHandle> {
        self.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_excludes_any() {
        assert!(Operations::CORE.contains(Operations::ON | Operations::TRIGGER));
        assert!(!Operations::CORE.contains(Operations::ANY));
    }

    #[test]
    fn parse_single_names() {
        assert_eq!(Operations::parse("on"), Some(Operations::ON));
        assert_eq!(Operations::parse(" Trigger "), Some(Operations::TRIGGER));
        assert_eq!(Operations::parse("emit"), None);
    }

    #[test]
    fn parse_name_lists() {
        assert_eq!(
            Operations::parse_names("one|any"),
            Ok(Operations::ONE | Operations::ANY)
        );
        assert_eq!(
            Operations::parse_names("on, off,"),
            Ok(Operations::ON | Operations::OFF)
        );
        assert_eq!(Operations::parse_names(""), Ok(Operations::empty()));
    }

    #[test]
    fn parse_reports_every_unknown_name() {
        let errors = Operations::parse_names("on|emit|fire").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].value, "emit");
        assert_eq!(errors[1].value, "fire");
    }

    #[test]
    fn surface_subtracts_exclusions() {
        let opts = AttachOptions::new().with_exclude(Operations::ANY | Operations::ONE);
        assert_eq!(
            opts.surface(),
            Operations::ON | Operations::OFF | Operations::TRIGGER
        );
        assert_eq!(AttachOptions::default().surface(), Operations::all());
    }

    #[test]
    fn exclude_names_builder() {
        let opts = AttachOptions::new()
            .with_event_bus_key("el")
            .with_exclude_names("trigger")
            .unwrap();
        assert_eq!(opts.exclude, Operations::TRIGGER);
        assert_eq!(opts.event_bus_key.as_deref(), Some("el"));
        assert!(AttachOptions::new().with_exclude_names("nope").is_err());
    }

    #[test]
    fn map_slots() {
        let handle = BusHandle::new();
        let mut slots = HashMap::new();
        slots.insert("el".to_string(), handle.clone());
        assert_eq!(slots.handle_slot("el"), Some(handle));
        assert_eq!(slots.handle_slot("missing"), None);
        assert_eq!(().handle_slot("el"), None);
    }
}
