use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_snapshots;
use crate::domain::DomainObjects;
use crate::types::Event;

pub enum MessageLogMode {
    Full,
    Diffed,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_snapshot: Option<DomainObjects>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_snapshot: None,
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str, attempt: u32) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "attempt": attempt,
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, path: &str, status: u16, body: &str) {
        let mut entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "resp",
            "path": path,
            "status": status,
            "bytes": body.len(),
        });
        if let MessageLogMode::Full = self.mode {
            entry["body"] = Value::String(body.to_string());
        }
        self.write_line(&entry);
    }

    pub fn log_failure(&mut self, path: &str, reason: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "fail",
            "path": path,
            "reason": reason,
        });
        self.write_line(&entry);
    }

    /// In diffed mode the first snapshot is written whole, later ones as the
    /// list of changes. Full mode already has the raw body.
    pub fn log_snapshot(&mut self, snapshot: &DomainObjects) {
        if let MessageLogMode::Full = self.mode {
            return;
        }
        let entry = match self.previous_snapshot {
            None => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "snapshot",
                "full": true,
                "body": serde_json::to_value(snapshot).unwrap_or(Value::Null),
            }),
            Some(ref previous) => {
                let changes: Vec<Value> = diff_snapshots(Some(previous), snapshot)
                    .iter()
                    .map(change_entry)
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "snapshot",
                    "changes": changes,
                })
            }
        };
        self.write_line(&entry);
        self.previous_snapshot = Some(snapshot.clone());
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

fn change_entry(event: &Event) -> Value {
    match event {
        Event::MeasurementChanged {
            point_log_id,
            log_type,
            old,
            new,
        } => json!({ "point_log": point_log_id, "type": log_type, "old": old, "new": new }),
        Event::ActiveRulesChanged { active } => json!({ "active_rules": active }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tests::ANNA_DOMAIN_OBJECTS;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn log_request_writes_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_request("GET", "/core/domain_objects", 1);

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "req");
        assert_eq!(lines[0]["method"], "GET");
        assert_eq!(lines[0]["attempt"], 1);
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn full_mode_keeps_body() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_response("/ping", 404, "<error/>");
        logger.log_snapshot(&DomainObjects::default());

        let lines = read_lines(path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["body"], "<error/>");
        assert_eq!(lines[0]["status"], 404);
    }

    #[test]
    fn diffed_mode_logs_full_first_then_changes() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();

        logger.log_response("/core/domain_objects", 200, ANNA_DOMAIN_OBJECTS);
        let first = DomainObjects::parse(ANNA_DOMAIN_OBJECTS).unwrap();
        logger.log_snapshot(&first);
        let changed = ANNA_DOMAIN_OBJECTS.replace(">19.5<", ">19.0<");
        let second = DomainObjects::parse(&changed).unwrap();
        logger.log_snapshot(&second);

        let lines = read_lines(path);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].get("body").is_none());
        assert_eq!(lines[1]["full"], true);
        assert!(lines[1]["body"]["objects"].is_array());
        let changes = lines[2]["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0]["point_log"], "42");
        assert_eq!(changes[0]["new"], "19.0");
    }

    #[test]
    fn log_failure_records_reason() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();
        logger.log_failure("/core/domain_objects", "timeout");

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "fail");
        assert_eq!(lines[0]["reason"], "timeout");
    }
}
