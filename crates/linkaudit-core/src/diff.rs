//! Intended vs observed link classification
//!
//! Each intent is classified on its own, by the first rule that applies:
//!
//! 1. `EXACT_MATCH`: an observation has the intent's canonical key.
//! 2. `PORT_MISMATCH`: a complete observation joins the same two devices
//!    on other ports.
//! 3. `DEVICE_MISMATCH`: a complete observation starts at an intended
//!    endpoint but ends on another device, or uses the intended ports
//!    with another device on at least one end.
//! 4. `PARTIAL_OBSERVED`: the only sightings are incomplete (unknown port or
//!    unresolved neighbor) and either sit at an intended endpoint, join the
//!    two intended devices, or reach an intended device on an unknown port.
//! 5. `MISSING_ASIS`: nothing was seen at either intended endpoint.
//!
//! Inside rules 2 and 3 candidates are ranked anchored-first, then by
//! confidence. When several candidates share the top rank the verdict is
//! `UNKNOWN` and every tied candidate is listed.

use crate::models::{DiffStatus, LinkDiff, LinkIntent, LinkObservation, UNKNOWN_VALUE};

/// Whether the observation shares an exact `(device, port)` endpoint with
/// the intent.
fn is_anchored(intent: &LinkIntent, obs: &LinkObservation) -> bool {
    obs.key.has_endpoint(&intent.device_a, &intent.port_a_norm)
        || obs.key.has_endpoint(&intent.device_b, &intent.port_b_norm)
}

fn joins_same_devices(intent: &LinkIntent, obs: &LinkObservation) -> bool {
    (obs.key.device_a == intent.device_a && obs.key.device_b == intent.device_b)
        || (obs.key.device_a == intent.device_b && obs.key.device_b == intent.device_a)
}

/// An intended device on an end whose port was never learned.
fn touches_intended_device_on_unknown_port(intent: &LinkIntent, obs: &LinkObservation) -> bool {
    let key = &obs.key;
    [(&key.device_a, &key.port_a), (&key.device_b, &key.port_b)]
        .into_iter()
        .any(|(device, port)| {
            port == UNKNOWN_VALUE && (*device == intent.device_a || *device == intent.device_b)
        })
}

/// Anchored at one intended endpoint, far end on a device other than the
/// intended peer.
fn diverts_to_other_device(intent: &LinkIntent, obs: &LinkObservation) -> bool {
    let from_a = obs
        .key
        .far_end(&intent.device_a, &intent.port_a_norm)
        .is_some_and(|(device, _)| device != intent.device_b);
    let from_b = obs
        .key
        .far_end(&intent.device_b, &intent.port_b_norm)
        .is_some_and(|(device, _)| device != intent.device_a);
    from_a || from_b
}

/// Intended ports on both ends (in some orientation) with at least one
/// device swapped.
fn ports_match_devices_differ(intent: &LinkIntent, obs: &LinkObservation) -> bool {
    let key = &obs.key;
    let oriented = [
        (&key.device_a, &key.port_a, &key.device_b, &key.port_b),
        (&key.device_b, &key.port_b, &key.device_a, &key.port_a),
    ];
    oriented.iter().any(|(dx, px, dy, py)| {
        **px == intent.port_a_norm
            && **py == intent.port_b_norm
            && (**dx != intent.device_a || **dy != intent.device_b)
    })
}

fn rank(intent: &LinkIntent, obs: &LinkObservation) -> (bool, u8) {
    (is_anchored(intent, obs), obs.confidence.rank())
}

/// Top-ranked candidates, best first; more than one means a tie.
fn top_ranked<'a>(
    intent: &LinkIntent,
    candidates: Vec<&'a LinkObservation>,
) -> Vec<&'a LinkObservation> {
    let Some(best) = candidates.iter().map(|obs| rank(intent, obs)).max() else {
        return Vec::new();
    };
    let mut top: Vec<&LinkObservation> = candidates
        .into_iter()
        .filter(|obs| rank(intent, obs) == best)
        .collect();
    top.sort_by(|x, y| x.key.cmp(&y.key));
    top
}

fn describe(obs: &LinkObservation) -> String {
    format!("{} ({})", obs.key, obs.confidence.as_str())
}

fn describe_all(observations: &[&LinkObservation]) -> String {
    observations
        .iter()
        .map(|obs| describe(obs))
        .collect::<Vec<_>>()
        .join(", ")
}

fn verdict(
    intent: &LinkIntent,
    observations: Vec<&LinkObservation>,
    status: DiffStatus,
    reason: String,
) -> LinkDiff {
    LinkDiff {
        intent: intent.clone(),
        observations: observations.into_iter().cloned().collect(),
        status,
        reason,
    }
}

/// Resolves rules 2 and 3: one winner, or `UNKNOWN` on a tie.
fn ranked_verdict(
    intent: &LinkIntent,
    candidates: Vec<&LinkObservation>,
    status: DiffStatus,
    label: &str,
) -> Option<LinkDiff> {
    let top = top_ranked(intent, candidates);
    match top.len() {
        0 => None,
        1 => {
            let winner = top[0];
            let reason = format!(
                "{}: observed {}, remote {}:{}",
                label,
                describe(winner),
                winner.remote_device,
                winner.remote_port_norm
            );
            Some(verdict(intent, top, status, reason))
        }
        _ => {
            let reason = format!("multiple candidates ({}): {}", label, describe_all(&top));
            Some(verdict(intent, top, DiffStatus::Unknown, reason))
        }
    }
}

fn classify_one(intent: &LinkIntent, observations: &[LinkObservation]) -> LinkDiff {
    let intent_key = intent.key();

    if let Some(exact) = observations.iter().find(|obs| obs.key == intent_key) {
        let reason = format!(
            "normalized ports matched ({}; evidence: {})",
            exact.confidence.as_str(),
            exact.evidence.join(", ")
        );
        return verdict(intent, vec![exact], DiffStatus::ExactMatch, reason);
    }

    let complete: Vec<&LinkObservation> =
        observations.iter().filter(|obs| obs.is_complete()).collect();

    let port_candidates: Vec<&LinkObservation> = complete
        .iter()
        .copied()
        .filter(|obs| joins_same_devices(intent, obs))
        .collect();
    if let Some(diff) = ranked_verdict(
        intent,
        port_candidates,
        DiffStatus::PortMismatch,
        "remote port differs",
    ) {
        return diff;
    }

    let device_candidates: Vec<&LinkObservation> = complete
        .iter()
        .copied()
        .filter(|obs| !joins_same_devices(intent, obs))
        .filter(|obs| {
            diverts_to_other_device(intent, obs) || ports_match_devices_differ(intent, obs)
        })
        .collect();
    if let Some(diff) = ranked_verdict(
        intent,
        device_candidates,
        DiffStatus::DeviceMismatch,
        "remote device differs",
    ) {
        return diff;
    }

    let partial = observations
        .iter()
        .filter(|obs| !obs.is_complete())
        .filter(|obs| {
            is_anchored(intent, obs)
                || joins_same_devices(intent, obs)
                || touches_intended_device_on_unknown_port(intent, obs)
        })
        .max_by(|x, y| {
            rank(intent, x)
                .cmp(&rank(intent, y))
                .then_with(|| y.key.cmp(&x.key))
        });
    if let Some(obs) = partial {
        let reason = format!(
            "partial LLDP observation at {}:{}: remote chassis {}, remote port {} ({}, identity {})",
            obs.local_device,
            obs.local_port_norm,
            obs.remote_device_id,
            obs.remote_port_raw,
            obs.confidence.as_str(),
            obs.identity.as_str()
        );
        return verdict(intent, vec![obs], DiffStatus::PartialObserved, reason);
    }

    let reason = format!(
        "no LLDP observation at {}:{} or {}:{}",
        intent.device_a, intent.port_a_norm, intent.device_b, intent.port_b_norm
    );
    verdict(intent, Vec::new(), DiffStatus::MissingAsis, reason)
}

/// Classifies every intent against the observed links.
///
/// Produces exactly one diff per intent, sorted by the intent's endpoints.
pub fn classify_links(intents: &[LinkIntent], observations: &[LinkObservation]) -> Vec<LinkDiff> {
    let mut diffs: Vec<LinkDiff> = intents
        .iter()
        .map(|intent| classify_one(intent, observations))
        .collect();
    diffs.sort_by(|x, y| x.intent.sort_key().cmp(&y.intent.sort_key()));
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::infer_links;
    use crate::models::{
        Confidence, Device, IdentityCertainty, LinkKey, LldpId, RawDiscoveryRow, SnmpCredential,
        UNKNOWN_VALUE,
    };
    use crate::normalize::AliasMap;

    fn aliases() -> AliasMap {
        let credential = SnmpCredential::V2c {
            community: "public".to_string(),
        };
        let devices: Vec<Device> = ["leaf01", "leaf02", "leaf03", "spine01", "spine02"]
            .into_iter()
            .map(|name| Device::new(name, "192.0.2.1", credential.clone()))
            .collect();
        AliasMap::from_devices(&devices)
    }

    fn row(
        device: &str,
        local: &str,
        sys_name: Option<&str>,
        chassis: &str,
        port: Option<&str>,
    ) -> RawDiscoveryRow {
        let mut row = RawDiscoveryRow::new(device, format!("0.{}.1", local.len()));
        row.local_port_id = Some(local.to_string());
        row.remote_chassis = Some(LldpId::new(4, chassis));
        row.remote_sys_name = sys_name.map(str::to_string);
        row.remote_port = port.map(|p| LldpId::new(5, p));
        row
    }

    fn observed(
        a: (&str, &str),
        b: (&str, &str),
        confidence: Confidence,
    ) -> LinkObservation {
        LinkObservation {
            key: LinkKey::new(a.0, a.1, b.0, b.1),
            local_device: a.0.to_string(),
            local_port_raw: a.1.to_string(),
            local_port_norm: a.1.to_string(),
            remote_device: b.0.to_string(),
            remote_device_id: "aa:bb:cc:00:00:01".to_string(),
            remote_device_name: b.0.to_string(),
            remote_port_raw: b.1.to_string(),
            remote_port_norm: b.1.to_string(),
            confidence,
            identity: IdentityCertainty::Resolved,
            evidence: vec![format!("lldp:{}:{}", a.0, a.1)],
        }
    }

    fn single(intent: LinkIntent, observations: &[LinkObservation]) -> LinkDiff {
        let mut diffs = classify_links(&[intent], observations);
        assert_eq!(diffs.len(), 1);
        diffs.remove(0)
    }

    #[test]
    fn mutual_sighting_is_exact_match() {
        let rows = vec![
            row("leaf01", "Eth1/1", Some("spine01"), "aa:00:00:00:00:01", Some("Eth1/1")),
            row("spine01", "Eth1/1", Some("leaf01"), "aa:00:00:00:00:02", Some("Eth1/1")),
        ];
        let observations = infer_links(&rows, &aliases());
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].confidence, Confidence::Observed);

        let diff = single(LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"), &observations);
        assert_eq!(diff.status, DiffStatus::ExactMatch);
        assert!(diff.reason.contains("observed"));
    }

    #[test]
    fn intent_spelling_is_normalized_before_matching() {
        let observations = vec![observed(
            ("leaf01", "Eth1/1"),
            ("spine01", "Eth1/1"),
            Confidence::Observed,
        )];
        let diff = single(
            LinkIntent::new("spine01", "Ethernet1/1", "leaf01", "GigabitEthernet1/1"),
            &observations,
        );
        assert_eq!(diff.status, DiffStatus::ExactMatch);
    }

    #[test]
    fn other_port_on_same_devices_is_port_mismatch() {
        let rows = vec![row(
            "leaf02",
            "Eth1/1",
            Some("spine01"),
            "aa:00:00:00:00:01",
            Some("Eth1/3"),
        )];
        let observations = infer_links(&rows, &aliases());

        let diff = single(LinkIntent::new("leaf02", "Eth1/1", "spine01", "Eth1/2"), &observations);
        assert_eq!(diff.status, DiffStatus::PortMismatch);
        assert!(diff.reason.contains("Eth1/3"), "{}", diff.reason);
        assert_eq!(diff.observations.len(), 1);
    }

    #[test]
    fn nothing_seen_is_missing_asis() {
        let observations = vec![observed(
            ("leaf03", "Eth1/9"),
            ("spine02", "Eth1/9"),
            Confidence::Observed,
        )];
        let diff = single(LinkIntent::new("leaf01", "Eth1/2", "leaf02", "Eth1/2"), &observations);
        assert_eq!(diff.status, DiffStatus::MissingAsis);
        assert!(diff.reason.contains("leaf01:Eth1/2"));
        assert!(diff.reason.contains("leaf02:Eth1/2"));
        assert!(diff.observations.is_empty());
    }

    #[test]
    fn chassis_only_neighbor_is_partial_observed() {
        let rows = vec![row("leaf01", "Eth1/4", None, "aa:bb:cc:dd:ee:ff", Some("Eth1/4"))];
        let observations = infer_links(&rows, &aliases());
        assert_eq!(observations[0].remote_device_name, UNKNOWN_VALUE);

        let diff = single(LinkIntent::new("leaf01", "Eth1/4", "spine01", "Eth1/4"), &observations);
        assert_eq!(diff.status, DiffStatus::PartialObserved);
        assert!(diff.reason.contains("aa:bb:cc:dd:ee:ff"), "{}", diff.reason);
    }

    #[test]
    fn sighting_without_local_port_is_partial_observed() {
        let mut with_port = row(
            "leaf01",
            "",
            Some("spine01"),
            "aa:00:00:00:00:01",
            Some("Ethernet1/9"),
        );
        with_port.local_port_id = None;
        let mut without_port = with_port.clone();
        without_port.remote_port = None;

        for rows in [vec![with_port], vec![without_port]] {
            let observations = infer_links(&rows, &aliases());
            assert_eq!(observations.len(), 1);
            assert_eq!(observations[0].key.port_a, UNKNOWN_VALUE);

            let diff =
                single(LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"), &observations);
            assert_eq!(diff.status, DiffStatus::PartialObserved, "{}", diff.reason);
            assert_eq!(diff.observations.len(), 1);
        }
    }

    #[test]
    fn unknown_port_on_intended_device_is_partial_observed() {
        let observations = vec![observed(
            ("leaf01", UNKNOWN_VALUE),
            ("spine02", "Eth1/3"),
            Confidence::Partial,
        )];
        let diff = single(LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"), &observations);
        assert_eq!(diff.status, DiffStatus::PartialObserved);
        assert!(!diff.reason.starts_with("no LLDP observation"), "{}", diff.reason);
    }

    #[test]
    fn equally_ranked_candidates_are_unknown() {
        let observations = vec![
            observed(("leaf01", "Eth1/1"), ("spine01", "Eth1/5"), Confidence::Partial),
            observed(("leaf01", "Eth1/7"), ("spine01", "Eth1/1"), Confidence::Partial),
        ];
        let diff = single(LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"), &observations);
        assert_eq!(diff.status, DiffStatus::Unknown);
        assert_eq!(diff.observations.len(), 2);
        assert!(diff.reason.contains("leaf01:Eth1/1-spine01:Eth1/5"), "{}", diff.reason);
        assert!(diff.reason.contains("leaf01:Eth1/7-spine01:Eth1/1"), "{}", diff.reason);
    }

    #[test]
    fn observed_candidate_outranks_partial_one() {
        let observations = vec![
            observed(("leaf01", "Eth1/1"), ("spine01", "Eth1/5"), Confidence::Observed),
            observed(("leaf01", "Eth1/7"), ("spine01", "Eth1/1"), Confidence::Partial),
        ];
        let diff = single(LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"), &observations);
        assert_eq!(diff.status, DiffStatus::PortMismatch);
        assert!(diff.reason.contains("Eth1/5"));
    }

    #[test]
    fn anchored_candidate_outranks_unanchored_one() {
        let observations = vec![
            observed(("leaf01", "Eth1/1"), ("spine01", "Eth1/5"), Confidence::Partial),
            observed(("leaf01", "Eth1/8"), ("spine01", "Eth1/9"), Confidence::Observed),
        ];
        let diff = single(LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"), &observations);
        assert_eq!(diff.status, DiffStatus::PortMismatch);
        assert_eq!(diff.observations[0].key.port_b, "Eth1/5");
    }

    #[test]
    fn intended_port_landing_on_other_device_is_device_mismatch() {
        let observations = vec![observed(
            ("leaf01", "Eth1/1"),
            ("spine02", "Eth1/1"),
            Confidence::Observed,
        )];
        let diff = single(LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"), &observations);
        assert_eq!(diff.status, DiffStatus::DeviceMismatch);
        assert!(diff.reason.contains("spine02"), "{}", diff.reason);
    }

    #[test]
    fn swapped_devices_on_intended_ports_is_device_mismatch() {
        let observations = vec![observed(
            ("leaf03", "Eth1/2"),
            ("spine02", "Eth1/6"),
            Confidence::Observed,
        )];
        let diff = single(LinkIntent::new("leaf01", "Eth1/2", "spine01", "Eth1/6"), &observations);
        assert_eq!(diff.status, DiffStatus::DeviceMismatch);
    }

    #[test]
    fn every_intent_gets_exactly_one_sorted_verdict() {
        let intents = vec![
            LinkIntent::new("spine01", "Eth1/1", "leaf02", "Eth1/1"),
            LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"),
            LinkIntent::new("leaf01", "Eth1/1", "spine01", "Eth1/1"),
        ];
        let diffs = classify_links(&intents, &[]);
        assert_eq!(diffs.len(), 3);
        assert!(diffs.iter().all(|d| !d.reason.is_empty()));
        assert_eq!(diffs[0].intent.device_a, "leaf01");
        assert_eq!(diffs[2].intent.device_a, "spine01");
    }
}
