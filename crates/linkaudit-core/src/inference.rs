//! Link inference
//!
//! Every raw row is one directional sighting ("`reporter` port X sees
//! neighbor Y port Z"). Sightings are grouped under the canonical
//! [`LinkKey`] of their two endpoints, and each group becomes one undirected
//! [`LinkObservation`]:
//!
//! - both endpoints reported the key: `observed`
//! - one endpoint reported it: `partial`
//! - one endpoint reported it, and the far end has neither a known port nor
//!   a resolved identity: `unknown`

use std::collections::BTreeMap;

use crate::collector::lldp::PORT_SUBTYPE_MAC;
use crate::models::{
    Confidence, IdentityCertainty, LinkKey, LinkObservation, RawDiscoveryRow, UNKNOWN_VALUE,
};
use crate::normalize::{AliasMap, normalize_interface, resolve_device_identity};

/// One row seen from its reporter's side
#[derive(Debug, Clone)]
struct Sighting {
    reporter: String,
    local_port_raw: String,
    local_port_norm: String,
    remote_device: String,
    remote_device_id: String,
    remote_device_name: String,
    remote_port_raw: String,
    remote_port_norm: String,
    identity: IdentityCertainty,
    evidence: String,
}

impl Sighting {
    fn from_row(row: &RawDiscoveryRow, aliases: &AliasMap) -> Self {
        let local_port_raw = row
            .local_port_id
            .clone()
            .or_else(|| row.local_port_desc.clone())
            .unwrap_or_else(|| UNKNOWN_VALUE.to_string());

        let remote_port_raw = match (&row.remote_port, &row.remote_port_desc) {
            (Some(port), Some(desc)) if port.subtype == PORT_SUBTYPE_MAC => desc.clone(),
            (Some(port), _) => port.value.clone(),
            (None, _) => UNKNOWN_VALUE.to_string(),
        };

        let chassis_id = row.remote_chassis.as_ref().map(|c| c.value.as_str());
        let (remote_device, identity) =
            resolve_remote(row.remote_sys_name.as_deref(), chassis_id, aliases);
        let remote_device_name = match identity {
            IdentityCertainty::Resolved => remote_device.clone(),
            IdentityCertainty::Unresolved => UNKNOWN_VALUE.to_string(),
        };

        Self {
            reporter: row.device.clone(),
            local_port_norm: normalize_interface(&local_port_raw),
            evidence: format!("lldp:{}:{}", row.device, local_port_raw),
            local_port_raw,
            remote_device,
            remote_device_id: chassis_id.unwrap_or(UNKNOWN_VALUE).to_string(),
            remote_device_name,
            remote_port_norm: normalize_interface(&remote_port_raw),
            remote_port_raw,
            identity,
        }
    }

    fn key(&self) -> LinkKey {
        LinkKey::new(
            &self.reporter,
            &self.local_port_norm,
            &self.remote_device,
            &self.remote_port_norm,
        )
    }

    fn reported_from(&self, device: &str, port: &str) -> bool {
        self.reporter == device && self.local_port_norm == port
    }
}

/// System name first, then chassis id; the raw identifier when neither
/// resolves.
fn resolve_remote(
    sys_name: Option<&str>,
    chassis_id: Option<&str>,
    aliases: &AliasMap,
) -> (String, IdentityCertainty) {
    for candidate in [sys_name, chassis_id].into_iter().flatten() {
        let (name, identity) = resolve_device_identity(candidate, aliases);
        if identity == IdentityCertainty::Resolved {
            return (name, identity);
        }
    }
    match sys_name.or(chassis_id) {
        Some(raw) => resolve_device_identity(raw, aliases),
        None => (UNKNOWN_VALUE.to_string(), IdentityCertainty::Unresolved),
    }
}

fn sorted_unique_evidence<'a>(sightings: impl Iterator<Item = &'a Sighting>) -> Vec<String> {
    let mut tags: Vec<String> = sightings.map(|s| s.evidence.clone()).collect();
    tags.sort();
    tags.dedup();
    tags
}

fn merge_group(key: LinkKey, sightings: Vec<Sighting>) -> Option<LinkObservation> {
    let identity = if sightings
        .iter()
        .any(|s| s.identity == IdentityCertainty::Unresolved)
    {
        IdentityCertainty::Unresolved
    } else {
        IdentityCertainty::Resolved
    };

    let from_a: Vec<&Sighting> = sightings
        .iter()
        .filter(|s| s.reported_from(&key.device_a, &key.port_a))
        .collect();
    let from_b: Vec<&Sighting> = sightings
        .iter()
        .filter(|s| s.reported_from(&key.device_b, &key.port_b))
        .collect();
    let both_sides = !from_a.is_empty() && !from_b.is_empty() && sightings.len() > 1;

    let (lead, confidence, evidence) = if both_sides {
        let mut evidence = sorted_unique_evidence(from_a.iter().copied());
        for tag in sorted_unique_evidence(from_b.iter().copied()) {
            if !evidence.contains(&tag) {
                evidence.push(tag);
            }
        }
        let lead = from_a
            .iter()
            .copied()
            .min_by(|x, y| x.evidence.cmp(&y.evidence))?;
        (lead, Confidence::Observed, evidence)
    } else {
        let lead = sightings.iter().min_by(|x, y| x.evidence.cmp(&y.evidence))?;
        let confidence = if lead.remote_port_norm == UNKNOWN_VALUE
            && identity == IdentityCertainty::Unresolved
        {
            Confidence::Unknown
        } else {
            Confidence::Partial
        };
        (lead, confidence, sorted_unique_evidence(sightings.iter()))
    };

    Some(LinkObservation {
        local_device: lead.reporter.clone(),
        local_port_raw: lead.local_port_raw.clone(),
        local_port_norm: lead.local_port_norm.clone(),
        remote_device: lead.remote_device.clone(),
        remote_device_id: lead.remote_device_id.clone(),
        remote_device_name: lead.remote_device_name.clone(),
        remote_port_raw: lead.remote_port_raw.clone(),
        remote_port_norm: lead.remote_port_norm.clone(),
        confidence,
        identity,
        evidence,
        key,
    })
}

/// Deduplicates raw rows into undirected observations.
///
/// Output is sorted by local device, local port, remote device and remote
/// port, and does not depend on the order of `rows`.
pub fn infer_links(rows: &[RawDiscoveryRow], aliases: &AliasMap) -> Vec<LinkObservation> {
    let mut groups: BTreeMap<LinkKey, Vec<Sighting>> = BTreeMap::new();
    for row in rows {
        let sighting = Sighting::from_row(row, aliases);
        groups.entry(sighting.key()).or_default().push(sighting);
    }

    let mut observations: Vec<LinkObservation> = groups
        .into_iter()
        .filter_map(|(key, sightings)| merge_group(key, sightings))
        .collect();
    observations.sort_by(|x, y| {
        x.sort_key()
            .cmp(&y.sort_key())
            .then_with(|| x.key.cmp(&y.key))
    });

    crate::log_debug!(
        "Inferred {} links from {} rows",
        observations.len(),
        rows.len()
    );
    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Device, LldpId, SnmpCredential};

    fn aliases() -> AliasMap {
        let credential = SnmpCredential::V2c {
            community: "public".to_string(),
        };
        AliasMap::from_devices(&[
            Device::new("leaf01", "192.0.2.11", credential.clone()),
            Device::new("leaf02", "192.0.2.12", credential.clone()),
            Device::new("spine01", "192.0.2.1", credential).with_aliases(["spine01.lab"]),
        ])
    }

    fn row(
        device: &str,
        index: &str,
        local: &str,
        sys_name: Option<&str>,
        port: Option<&str>,
    ) -> RawDiscoveryRow {
        let mut row = RawDiscoveryRow::new(device, index);
        row.local_port_id = Some(local.to_string());
        row.remote_chassis = Some(LldpId::new(4, "aa:bb:cc:00:00:01"));
        row.remote_sys_name = sys_name.map(str::to_string);
        row.remote_port = port.map(|p| LldpId::new(5, p));
        row
    }

    fn both_sides() -> Vec<RawDiscoveryRow> {
        vec![
            row("leaf01", "0.1.1", "Ethernet1/49", Some("spine01"), Some("Ethernet1/1")),
            row("spine01", "0.1.1", "Eth1/1", Some("leaf01"), Some("Eth1/49")),
        ]
    }

    #[test]
    fn mutual_sightings_merge_into_one_observed_link() {
        let links = infer_links(&both_sides(), &aliases());
        assert_eq!(links.len(), 1);

        let link = &links[0];
        assert_eq!(link.key, LinkKey::new("leaf01", "Eth1/49", "spine01", "Eth1/1"));
        assert_eq!(link.confidence, Confidence::Observed);
        assert_eq!(link.identity, IdentityCertainty::Resolved);
        assert_eq!(link.local_device, "leaf01");
        assert_eq!(link.remote_device_name, "spine01");
        assert_eq!(
            link.evidence,
            vec![
                "lldp:leaf01:Ethernet1/49".to_string(),
                "lldp:spine01:Eth1/1".to_string()
            ]
        );
    }

    #[test]
    fn output_ignores_row_order() {
        let mut rows = both_sides();
        rows.push(row("leaf02", "0.2.1", "Eth1/50", Some("spine01.lab"), Some("Eth1/2")));
        let forward = infer_links(&rows, &aliases());
        rows.reverse();
        let backward = infer_links(&rows, &aliases());
        assert_eq!(forward, backward);
    }

    #[test]
    fn duplicated_rows_do_not_change_the_result() {
        let rows = both_sides();
        let doubled: Vec<RawDiscoveryRow> = rows.iter().chain(rows.iter()).cloned().collect();
        assert_eq!(infer_links(&rows, &aliases()), infer_links(&doubled, &aliases()));
    }

    #[test]
    fn either_side_alone_yields_the_same_key() {
        let rows = both_sides();
        let from_leaf = infer_links(&rows[..1], &aliases());
        let from_spine = infer_links(&rows[1..], &aliases());
        assert_eq!(from_leaf[0].key, from_spine[0].key);
        assert_eq!(from_leaf[0].confidence, Confidence::Partial);
        assert_eq!(from_spine[0].confidence, Confidence::Partial);
        assert_eq!(from_spine[0].local_device, "spine01");
    }

    #[test]
    fn adding_the_reverse_sighting_never_lowers_confidence() {
        let rows = both_sides();
        let one = infer_links(&rows[..1], &aliases());
        let two = infer_links(&rows, &aliases());
        assert!(two[0].confidence.rank() >= one[0].confidence.rank());
    }

    #[test]
    fn alias_resolves_remote_identity() {
        let rows = vec![row("leaf02", "0.2.1", "Eth1/50", Some("SPINE01.LAB"), Some("Eth1/2"))];
        let links = infer_links(&rows, &aliases());
        assert_eq!(links[0].remote_device_name, "spine01");
        assert_eq!(links[0].identity, IdentityCertainty::Resolved);
    }

    #[test]
    fn unresolved_neighbor_without_port_is_unknown() {
        let mut lone = row("leaf01", "0.3.1", "Eth1/3", None, None);
        lone.remote_chassis = Some(LldpId::new(4, "de:ad:be:ef:00:01"));
        let links = infer_links(&[lone], &aliases());

        let link = &links[0];
        assert_eq!(link.confidence, Confidence::Unknown);
        assert_eq!(link.identity, IdentityCertainty::Unresolved);
        assert_eq!(link.remote_device, "de:ad:be:ef:00:01");
        assert_eq!(link.remote_device_id, "de:ad:be:ef:00:01");
        assert_eq!(link.remote_device_name, UNKNOWN_VALUE);
        assert_eq!(link.remote_port_norm, UNKNOWN_VALUE);
    }

    #[test]
    fn unresolved_neighbor_with_port_stays_partial() {
        let rows = vec![row("leaf01", "0.4.1", "Eth1/4", Some("server-x"), Some("eno1"))];
        let links = infer_links(&rows, &aliases());
        assert_eq!(links[0].confidence, Confidence::Partial);
        assert_eq!(links[0].identity, IdentityCertainty::Unresolved);
        assert_eq!(links[0].remote_device, "server-x");
    }

    #[test]
    fn mac_typed_remote_port_uses_description() {
        let mut mac_port = row("leaf01", "0.5.1", "Eth1/5", Some("spine01"), None);
        mac_port.remote_port = Some(LldpId::new(3, "aa:bb:cc:00:00:05"));
        mac_port.remote_port_desc = Some("Ethernet1/5".to_string());
        let links = infer_links(&[mac_port], &aliases());
        assert_eq!(links[0].remote_port_norm, "Eth1/5");
    }

    #[test]
    fn output_is_sorted_by_local_endpoint() {
        let rows = vec![
            row("spine01", "0.9.1", "Eth1/9", Some("leaf02"), Some("Eth1/1")),
            row("leaf02", "0.7.1", "Eth1/7", Some("server-a"), Some("eth0")),
            row("leaf01", "0.8.1", "Eth1/8", Some("server-b"), Some("eth0")),
        ];
        let links = infer_links(&rows, &aliases());
        let locals: Vec<&str> = links.iter().map(|l| l.local_device.as_str()).collect();
        assert_eq!(locals, vec!["leaf01", "leaf02", "spine01"]);
    }
}
