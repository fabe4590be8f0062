//! Typed view of `/core/domain_objects`.
//!
//! The document is converted once per fetch. Every lookup walks these vectors
//! in document order and returns the first hit.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::Result;
use crate::xml::{self, Element};

const THERMOSTAT_TYPE: &str = "thermostat";
const PRESET_STATE_LOG: &str = "preset_state";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainObjects {
    pub objects: Vec<DomainObject>,
    pub modules: Vec<Module>,
    pub rules: Vec<Rule>,
}

/// A top-level entity (appliance, location, ...) and the point logs it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainObject {
    pub tag: String,
    pub id: Option<String>,
    pub object_type: Option<String>,
    pub point_logs: Vec<PointLog>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointLog {
    pub id: Option<String>,
    pub log_type: Option<String>,
    pub measurement: Option<Measurement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Measurement {
    pub value: Option<String>,
    pub log_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Module {
    pub id: Option<String>,
    pub services: Vec<Service>,
}

/// One entry under `module/services`; `kind` is the element name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Service {
    pub kind: String,
    pub id: Option<String>,
    pub log_type: Option<String>,
    pub point_log_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rule {
    pub id: Option<String>,
    pub name: Option<String>,
    pub active: bool,
    pub actions: Vec<RuleAction>,
}

/// A `directives/when/then` action of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleAction {
    pub icon: Option<String>,
}

impl DomainObjects {
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self::from_element(&xml::parse(xml)?))
    }

    pub fn from_element(root: &Element) -> Self {
        let mut snapshot = DomainObjects::default();
        for child in &root.children {
            match child.name.as_str() {
                "module" => snapshot.modules.push(module_from(child)),
                "rule" => {
                    snapshot.rules.push(rule_from(child));
                    continue;
                }
                _ => {}
            }
            let holds_logs = child.child("logs").is_some();
            if holds_logs || matches!(child.name.as_str(), "appliance" | "location") {
                snapshot.objects.push(object_from(child));
            }
        }
        snapshot
    }

    pub fn appliances(&self) -> impl Iterator<Item = &DomainObject> {
        self.objects.iter().filter(|o| o.tag == "appliance")
    }

    /// Id of the point log attached to a module service of the given log type.
    pub fn point_log_id(&self, log_type: &str) -> Option<&str> {
        self.modules
            .iter()
            .flat_map(|m| &m.services)
            .filter(|s| s.log_type.as_deref() == Some(log_type))
            .find_map(|s| s.point_log_ids.first())
            .map(String::as_str)
    }

    pub fn point_log(&self, point_log_id: &str) -> Option<&PointLog> {
        self.point_logs()
            .filter(|pl| pl.id.as_deref() == Some(point_log_id))
            .find(|pl| pl.measurement.is_some())
    }

    /// Latest measurement text of the point log with this id.
    pub fn measurement(&self, point_log_id: &str) -> Option<&str> {
        self.point_log(point_log_id)
            .and_then(|pl| pl.measurement.as_ref())
            .and_then(|m| m.value.as_deref())
    }

    /// Measurement element of the thermostat appliance's `preset_state` log.
    /// Present but empty when the thermostat has no preset to report.
    pub fn thermostat_preset_measurement(&self) -> Option<&Measurement> {
        self.appliances()
            .filter(|a| a.object_type.as_deref() == Some(THERMOSTAT_TYPE))
            .flat_map(|a| &a.point_logs)
            .filter(|pl| pl.log_type.as_deref() == Some(PRESET_STATE_LOG))
            .find_map(|pl| pl.measurement.as_ref())
    }

    /// Preset reported by the thermostat appliance's `preset_state` log.
    pub fn thermostat_preset(&self) -> Option<&str> {
        self.thermostat_preset_measurement()
            .and_then(|m| m.value.as_deref())
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.active)
    }

    /// Icon of the first action of the active rules, as used by legacy Annas
    /// to carry the preset.
    pub fn active_rule_icon(&self) -> Option<&str> {
        self.active_rules()
            .flat_map(|r| &r.actions)
            .next()
            .and_then(|a| a.icon.as_deref())
    }

    pub(crate) fn point_logs(&self) -> impl Iterator<Item = &PointLog> {
        self.objects.iter().flat_map(|o| &o.point_logs)
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn object_from(el: &Element) -> DomainObject {
    let point_logs = el
        .children_named("logs")
        .flat_map(|logs| logs.children_named("point_log"))
        .map(point_log_from)
        .collect();
    DomainObject {
        tag: el.name.clone(),
        id: owned(el.attr("id")),
        object_type: owned(el.child_text("type")),
        point_logs,
    }
}

fn point_log_from(el: &Element) -> PointLog {
    let measurement = el
        .children_named("period")
        .find_map(|period| period.child("measurement"))
        .map(|m| Measurement {
            value: owned(m.text()),
            log_date: m
                .attr("log_date")
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok()),
        });
    PointLog {
        id: owned(el.attr("id")),
        log_type: owned(el.child_text("type")),
        measurement,
    }
}

fn module_from(el: &Element) -> Module {
    let services = el
        .children_named("services")
        .flat_map(|s| &s.children)
        .map(|svc| Service {
            kind: svc.name.clone(),
            id: owned(svc.attr("id")),
            log_type: owned(svc.attr("log_type")),
            point_log_ids: svc
                .children_named("functionalities")
                .flat_map(|f| f.children_named("point_log"))
                .filter_map(|pl| owned(pl.attr("id")))
                .collect(),
        })
        .collect();
    Module {
        id: owned(el.attr("id")),
        services,
    }
}

fn rule_from(el: &Element) -> Rule {
    let actions = el
        .children_named("directives")
        .flat_map(|d| d.children_named("when"))
        .flat_map(|w| w.children_named("then"))
        .map(|then| RuleAction {
            icon: owned(then.attr("icon")),
        })
        .collect();
    Rule {
        id: owned(el.attr("id")),
        name: owned(el.child_text("name")),
        active: el.child_text("active") == Some("true"),
        actions,
    }
}
