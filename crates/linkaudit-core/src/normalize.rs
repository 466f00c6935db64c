//! Interface name and device identity normalization
//!
//! Both functions are total: every input maps to an output, so the
//! inference and diff stages never have to reject data.
//!
//! Interface names are rewritten to the short `Eth` spelling: `Ethernet1/1`,
//! `GigabitEthernet1/1`, `Gi1/1`, `Te1-1` and `xe-0/0/1` all become `Eth…`
//! with `/` as the slot/port delimiter. Names with no known prefix are
//! returned lowercased.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Device, IdentityCertainty, UNKNOWN_VALUE};

/// Canonical prefix every recognised Ethernet spelling is rewritten to
pub const CANONICAL_ETHERNET_PREFIX: &str = "Eth";

/// Lowercase vendor prefixes, longest first. A prefix only matches when the
/// remainder starts with a digit (optionally after a single `-`).
const ETHERNET_PREFIXES: &[&str] = &[
    "hundredgigabitethernet",
    "fortygigabitethernet",
    "tengigabitethernet",
    "gigabitethernet",
    "twentyfivegige",
    "hundredgige",
    "tengigabit",
    "fortygige",
    "ethernet",
    "gigabit",
    "tengige",
    "gige",
    "eth",
    "twe",
    "et",
    "fo",
    "ge",
    "gi",
    "hu",
    "te",
    "xe",
];

/// Normalize an interface name to its canonical form.
pub fn normalize_interface(raw_name: &str) -> String {
    let cleaned: String = raw_name.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return UNKNOWN_VALUE.to_string();
    }

    let lowered = unify_delimiters(&cleaned).to_ascii_lowercase();
    for prefix in ETHERNET_PREFIXES {
        if let Some(rest) = lowered.strip_prefix(prefix) {
            let rest = match rest.strip_prefix('-') {
                Some(stripped) => stripped,
                None => rest,
            };
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return format!("{CANONICAL_ETHERNET_PREFIX}{rest}");
            }
        }
    }

    lowered
}

/// `1-1` and `1_1` become `1/1`; separators not between digits are kept.
fn unify_delimiters(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let between_digits = i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_ascii_digit()
                && chars[i + 1].is_ascii_digit();
            if (c == '-' || c == '_') && between_digits {
                '/'
            } else {
                c
            }
        })
        .collect()
}

/// Lookup from canonical names and aliases to inventory device names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    names: BTreeSet<String>,
    /// Lowercased name or alias -> canonical name
    lookup: BTreeMap<String, String>,
}

impl AliasMap {
    pub fn from_devices(devices: &[Device]) -> Self {
        let mut map = Self::default();
        for device in devices {
            map.insert_device(&device.name, &device.aliases);
        }
        map
    }

    /// Registers a device. The first device to claim a name or alias keeps it.
    pub fn insert_device(&mut self, name: &str, aliases: &[String]) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.names.insert(name.to_string());

        let keys = std::iter::once(name).chain(aliases.iter().map(|a| a.trim()));
        for key in keys.filter(|k| !k.is_empty()) {
            let folded = key.to_lowercase();
            match self.lookup.get(&folded) {
                Some(existing) if existing != name => {
                    crate::log_warn!(
                        "Alias '{}' already maps to {}; ignoring it for {}",
                        key,
                        existing,
                        name
                    );
                }
                Some(_) => {}
                None => {
                    self.lookup.insert(folded, name.to_string());
                }
            }
        }
    }

    /// Canonical device name for `raw`, if any.
    pub fn canonical(&self, raw: &str) -> Option<&str> {
        let raw = raw.trim();
        if let Some(name) = self.names.get(raw) {
            return Some(name.as_str());
        }
        self.lookup.get(&raw.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolve a system name or chassis id to an inventory device name.
pub fn resolve_device_identity(raw: &str, aliases: &AliasMap) -> (String, IdentityCertainty) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (UNKNOWN_VALUE.to_string(), IdentityCertainty::Unresolved);
    }
    match aliases.canonical(trimmed) {
        Some(name) => (name.to_string(), IdentityCertainty::Resolved),
        None => (trimmed.to_string(), IdentityCertainty::Unresolved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnmpCredential;

    fn device(name: &str, aliases: &[&str]) -> Device {
        Device::new(
            name,
            "192.0.2.1",
            SnmpCredential::V2c {
                community: "public".to_string(),
            },
        )
        .with_aliases(aliases.iter().copied())
    }

    #[test]
    fn normalize_maps_vendor_prefixes() {
        assert_eq!(normalize_interface("Eth1/1"), "Eth1/1");
        assert_eq!(normalize_interface("ethernet1/2"), "Eth1/2");
        assert_eq!(normalize_interface("Gi1/3"), "Eth1/3");
        assert_eq!(normalize_interface("GigabitEthernet1/4"), "Eth1/4");
        assert_eq!(normalize_interface("Te1-1"), "Eth1/1");
        assert_eq!(normalize_interface("TenGigabitEthernet1/0/7"), "Eth1/0/7");
        assert_eq!(normalize_interface("xe-0/0/1"), "Eth0/0/1");
        assert_eq!(normalize_interface("Ethernet1/1.100"), "Eth1/1.100");
    }

    #[test]
    fn normalize_strips_whitespace() {
        assert_eq!(normalize_interface("  Ethernet 1/5 "), "Eth1/5");
    }

    #[test]
    fn normalize_handles_empty() {
        assert_eq!(normalize_interface(""), UNKNOWN_VALUE);
        assert_eq!(normalize_interface("   "), UNKNOWN_VALUE);
    }

    #[test]
    fn normalize_passes_unknown_names_through_lowercased() {
        assert_eq!(normalize_interface("Port-Channel10"), "port-channel10");
        assert_eq!(normalize_interface("swp12"), "swp12");
        assert_eq!(normalize_interface("mgmt0"), "mgmt0");
        assert_eq!(normalize_interface("Test1"), "test1");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["Gi1/0/1", "Te1-1", "Port-Channel10", "", "Ethernet1/1"] {
            let once = normalize_interface(raw);
            assert_eq!(normalize_interface(&once), once);
        }
    }

    #[test]
    fn prefix_table_is_longest_first() {
        for pair in ETHERNET_PREFIXES.windows(2) {
            assert!(pair[0].len() >= pair[1].len(), "{:?}", pair);
        }
    }

    #[test]
    fn resolve_prefers_canonical_name_then_alias() {
        let aliases = AliasMap::from_devices(&[
            device("leaf01", &["leaf-1", "LEAF-ONE"]),
            device("spine01", &[]),
        ]);

        assert_eq!(
            resolve_device_identity("leaf01", &aliases),
            ("leaf01".to_string(), IdentityCertainty::Resolved)
        );
        assert_eq!(
            resolve_device_identity("leaf-one", &aliases),
            ("leaf01".to_string(), IdentityCertainty::Resolved)
        );
        assert_eq!(
            resolve_device_identity("SPINE01", &aliases),
            ("spine01".to_string(), IdentityCertainty::Resolved)
        );
    }

    #[test]
    fn resolve_returns_raw_identifier_when_unknown() {
        let aliases = AliasMap::from_devices(&[device("leaf01", &[])]);
        assert_eq!(
            resolve_device_identity("aa:bb:cc:dd:ee:ff", &aliases),
            (
                "aa:bb:cc:dd:ee:ff".to_string(),
                IdentityCertainty::Unresolved
            )
        );
        assert_eq!(
            resolve_device_identity("  ", &aliases),
            (UNKNOWN_VALUE.to_string(), IdentityCertainty::Unresolved)
        );
    }

    #[test]
    fn conflicting_alias_keeps_first_device() {
        let aliases = AliasMap::from_devices(&[
            device("leaf01", &["rack-a"]),
            device("leaf02", &["rack-a"]),
        ]);
        assert_eq!(aliases.canonical("rack-a"), Some("leaf01"));
    }
}
