//! Cross-entity audit of the output directory.

use crate::error::Result;
use crate::paths;
use crate::status::ConversionStatus;
use crate::types::{OverallStatus, StepState};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingOutput {
    pub step_number: u32,
    pub name: String,
    pub status: StepState,
    pub output_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAudit {
    pub entity: String,
    pub overall_status: OverallStatus,
    pub completed_steps: usize,
    pub skipped_steps: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<u32>,
    pub missing_outputs: Vec<MissingOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableStatus {
    pub entity: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub completed: Vec<EntityAudit>,
    pub in_progress: Vec<EntityAudit>,
    pub failed: Vec<EntityAudit>,
    /// Output directories with no status document.
    pub without_status: Vec<String>,
    pub unreadable: Vec<UnreadableStatus>,
}

impl AuditReport {
    pub fn entities(&self) -> impl Iterator<Item = &EntityAudit> {
        self.completed
            .iter()
            .chain(self.in_progress.iter())
            .chain(self.failed.iter())
    }

    pub fn missing_output_count(&self) -> usize {
        self.entities().map(|e| e.missing_outputs.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
            && self.unreadable.is_empty()
            && self.missing_output_count() == 0
    }
}

/// Walk `output_root/*/`. A malformed status document is reported, not
/// fatal, so one broken entity does not hide the rest.
pub fn audit(output_root: &Path) -> Result<AuditReport> {
    let mut report = AuditReport::default();
    let entries = match std::fs::read_dir(output_root) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    for dir in dirs {
        let entity = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !paths::status_path(&dir).exists() {
            report.without_status.push(entity);
            continue;
        }
        let status = match ConversionStatus::load(&dir) {
            Ok(Some(s)) => s,
            Ok(None) => {
                report.without_status.push(entity);
                continue;
            }
            Err(e) => {
                report.unreadable.push(UnreadableStatus {
                    entity,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let audit = entity_audit(&status, &dir);
        match status.overall_status {
            OverallStatus::Completed => report.completed.push(audit),
            OverallStatus::Running => report.in_progress.push(audit),
            OverallStatus::Failed => report.failed.push(audit),
        }
    }
    Ok(report)
}

fn entity_audit(status: &ConversionStatus, entity_dir: &Path) -> EntityAudit {
    EntityAudit {
        entity: status.entity.clone(),
        overall_status: status.overall_status,
        completed_steps: status.completed_steps,
        skipped_steps: status.skipped_steps,
        total_steps: status.total_steps,
        failed_step: status
            .steps
            .iter()
            .find(|s| s.status == StepState::Failed)
            .map(|s| s.step_number),
        missing_outputs: status
            .missing_outputs(entity_dir)
            .into_iter()
            .map(|s| MissingOutput {
                step_number: s.step_number,
                name: s.name.clone(),
                status: s.status,
                output_file: s.output_file.clone().unwrap_or_default(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversionMode;
    use tempfile::TempDir;

    fn completed_entity(root: &Path, entity: &str) -> std::path::PathBuf {
        let dir = root.join(entity);
        let mut status = ConversionStatus::new(entity, None, ConversionMode::SearchDetail);
        for n in 1..=status.total_steps as u32 {
            let file = status.step(n).and_then(|s| s.output_file.clone());
            if let Some(f) = &file {
                let p = dir.join(f);
                if f.ends_with(".json") {
                    std::fs::create_dir_all(&dir).unwrap();
                    std::fs::write(p, "{}").unwrap();
                } else {
                    std::fs::create_dir_all(p).unwrap();
                }
            }
            status.start_step(n).unwrap();
            status.complete_step(n, file.as_deref()).unwrap();
        }
        status.set_overall(OverallStatus::Completed);
        status.save(&dir).unwrap();
        dir
    }

    #[test]
    fn groups_entities_by_overall_status() {
        let tmp = TempDir::new().unwrap();
        completed_entity(tmp.path(), "Facility");

        let failed = tmp.path().join("Barge");
        let mut status = ConversionStatus::new("Barge", None, ConversionMode::SearchDetail);
        std::fs::create_dir_all(&failed).unwrap();
        std::fs::write(failed.join("form-structure-search.json"), "{}").unwrap();
        status.start_step(1).unwrap();
        status
            .complete_step(1, Some("form-structure-search.json"))
            .unwrap();
        status.start_step(2).unwrap();
        status.fail_step(2, 3).unwrap();
        status.save(&failed).unwrap();

        std::fs::create_dir_all(tmp.path().join("Orphan")).unwrap();
        std::fs::create_dir_all(tmp.path().join("Broken")).unwrap();
        std::fs::write(tmp.path().join("Broken/conversion-status.json"), "{").unwrap();

        let report = audit(tmp.path()).unwrap();
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].entity, "Facility");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].failed_step, Some(2));
        assert_eq!(report.without_status, vec!["Orphan"]);
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.unreadable[0].entity, "Broken");
        assert!(!report.is_clean());
    }

    #[test]
    fn deleted_output_is_reported_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = completed_entity(tmp.path(), "Facility");
        std::fs::remove_file(dir.join("business-logic.json")).unwrap();

        let report = audit(tmp.path()).unwrap();
        let missing = &report.completed[0].missing_outputs;
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].output_file, "business-logic.json");
        assert_eq!(missing[0].status, StepState::Completed);
        assert_eq!(report.missing_output_count(), 1);
    }

    #[test]
    fn missing_output_root_is_empty_report() {
        let tmp = TempDir::new().unwrap();
        let report = audit(&tmp.path().join("nope")).unwrap();
        assert_eq!(report, AuditReport::default());
        assert!(report.is_clean());
    }
}
