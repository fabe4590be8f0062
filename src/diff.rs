use std::collections::BTreeMap;

use crate::domain::DomainObjects;
use crate::types::Event;

fn measurements(snapshot: &DomainObjects) -> BTreeMap<&str, (Option<&str>, Option<&str>)> {
    let mut map = BTreeMap::new();
    for pl in snapshot.point_logs() {
        let Some(id) = pl.id.as_deref() else {
            continue;
        };
        let value = pl.measurement.as_ref().and_then(|m| m.value.as_deref());
        map.entry(id).or_insert((pl.log_type.as_deref(), value));
    }
    map
}

fn active_rule_ids(snapshot: &DomainObjects) -> Vec<String> {
    snapshot
        .active_rules()
        .map(|r| r.id.clone().unwrap_or_default())
        .collect()
}

/// Events describing how `current` differs from `previous`.
///
/// With no previous snapshot every measurement is reported as new, and the
/// active rules are reported once.
pub(crate) fn diff_snapshots(
    previous: Option<&DomainObjects>,
    current: &DomainObjects,
) -> Vec<Event> {
    let mut events = Vec::new();
    let before = previous.map(measurements).unwrap_or_default();

    for (id, (log_type, value)) in measurements(current) {
        let old = before.get(id).and_then(|(_, v)| *v);
        if before.contains_key(id) && old == value {
            continue;
        }
        events.push(Event::MeasurementChanged {
            point_log_id: id.to_string(),
            log_type: log_type.map(str::to_string),
            old: old.map(str::to_string),
            new: value.map(str::to_string),
        });
    }

    let active = active_rule_ids(current);
    if previous.map(active_rule_ids).as_ref() != Some(&active) {
        events.push(Event::ActiveRulesChanged { active });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tests::ANNA_DOMAIN_OBJECTS;

    fn anna() -> DomainObjects {
        DomainObjects::parse(ANNA_DOMAIN_OBJECTS).unwrap()
    }

    #[test]
    fn first_snapshot_reports_everything() {
        let events = diff_snapshots(None, &anna());
        let measured = events
            .iter()
            .filter(|e| matches!(e, Event::MeasurementChanged { .. }))
            .count();
        assert_eq!(measured, 5);
        assert!(events.contains(&Event::ActiveRulesChanged {
            active: vec!["r1".to_string()]
        }));
    }

    #[test]
    fn identical_snapshots_report_nothing() {
        let snapshot = anna();
        assert!(diff_snapshots(Some(&snapshot), &snapshot).is_empty());
    }

    #[test]
    fn changed_measurement_is_reported() {
        let previous = anna();
        let changed = ANNA_DOMAIN_OBJECTS.replace(">19.5<", ">20.0<");
        let current = DomainObjects::parse(&changed).unwrap();
        let events = diff_snapshots(Some(&previous), &current);
        assert_eq!(
            events,
            vec![Event::MeasurementChanged {
                point_log_id: "42".to_string(),
                log_type: Some("temperature".to_string()),
                old: Some("19.5".to_string()),
                new: Some("20.0".to_string()),
            }]
        );
    }

    #[test]
    fn rule_activation_is_reported() {
        let previous = anna();
        let current = DomainObjects::parse(
            &ANNA_DOMAIN_OBJECTS.replace("<active>false</active>", "<active>true</active>"),
        )
        .unwrap();
        let events = diff_snapshots(Some(&previous), &current);
        assert_eq!(
            events,
            vec![Event::ActiveRulesChanged {
                active: vec!["r0".to_string(), "r1".to_string()]
            }]
        );
    }
}
