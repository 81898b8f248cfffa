use crate::error::{ConvertError, Result};
use crate::paths;
use crate::steps::{self, StepDefinition};
use crate::types::{ConversionMode, OverallStatus, StepState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    pub step_number: u32,
    pub name: String,
    pub status: StepState,
    /// Relative to the entity output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl StepStatus {
    pub fn pending(def: &StepDefinition) -> Self {
        Self {
            step_number: def.number,
            name: def.name.to_string(),
            status: StepState::Pending,
            output_file: def.output_file.map(str::to_string),
            started_at: None,
            finished_at: None,
            exit_code: None,
        }
    }

    /// Whether the declared output exists under `entity_dir`. Steps that
    /// declare no output trivially have it.
    pub fn output_present(&self, entity_dir: &Path) -> bool {
        self.output_file
            .as_deref()
            .map(|f| entity_dir.join(f).exists())
            .unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// ConversionStatus
// ---------------------------------------------------------------------------

/// Persisted progress of one entity's conversion (`conversion-status.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStatus {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    #[serde(default)]
    pub mode: ConversionMode,
    pub overall_status: OverallStatus,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub skipped_steps: usize,
    pub failed_steps: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepStatus>,
}

impl ConversionStatus {
    pub fn new(entity: impl Into<String>, form_name: Option<String>, mode: ConversionMode) -> Self {
        let steps: Vec<StepStatus> = steps::catalogue(mode)
            .iter()
            .map(StepStatus::pending)
            .collect();
        let now = Utc::now();
        Self {
            entity: entity.into(),
            form_name,
            mode,
            overall_status: OverallStatus::Running,
            total_steps: steps.len(),
            completed_steps: 0,
            skipped_steps: 0,
            failed_steps: 0,
            started_at: Some(now),
            updated_at: Some(now),
            steps,
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// `Ok(None)` when no status file exists yet. Malformed JSON is an error.
    pub fn load(entity_dir: &Path) -> Result<Option<Self>> {
        let path = paths::status_path(entity_dir);
        let Some(data) = crate::io::read_optional(&path)? else {
            return Ok(None);
        };
        let status: ConversionStatus = serde_json::from_str(&data)?;
        Ok(Some(status))
    }

    pub fn save(&self, entity_dir: &Path) -> Result<()> {
        crate::io::write_json(&paths::status_path(entity_dir), self)
    }

    // ---------------------------------------------------------------------------
    // Step list maintenance
    // ---------------------------------------------------------------------------

    /// True when the recorded steps are exactly the catalogue for `mode`.
    pub fn matches_catalogue(&self, mode: ConversionMode) -> bool {
        let defs = steps::catalogue(mode);
        self.mode == mode
            && self.steps.len() == defs.len()
            && self
                .steps
                .iter()
                .zip(defs)
                .all(|(s, d)| s.step_number == d.number && s.name == d.name)
    }

    /// Put every step back to `pending` using the catalogue for `mode`.
    pub fn reset(&mut self, mode: ConversionMode) {
        self.mode = mode;
        self.steps = steps::catalogue(mode)
            .iter()
            .map(StepStatus::pending)
            .collect();
        self.overall_status = OverallStatus::Running;
        self.started_at = Some(Utc::now());
        self.recount();
    }

    pub fn step(&self, number: u32) -> Option<&StepStatus> {
        self.steps.iter().find(|s| s.step_number == number)
    }

    fn step_mut(&mut self, number: u32) -> Result<&mut StepStatus> {
        let mode = self.mode;
        self.steps
            .iter_mut()
            .find(|s| s.step_number == number)
            .ok_or_else(|| ConvertError::UnknownStep {
                number,
                mode: mode.to_string(),
            })
    }

    // ---------------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------------

    pub fn start_step(&mut self, number: u32) -> Result<()> {
        let step = self.step_mut(number)?;
        step.status = StepState::Running;
        step.started_at = Some(Utc::now());
        step.finished_at = None;
        step.exit_code = None;
        self.recount();
        Ok(())
    }

    pub fn complete_step(&mut self, number: u32, output_file: Option<&str>) -> Result<()> {
        let step = self.step_mut(number)?;
        step.status = StepState::Completed;
        step.finished_at = Some(Utc::now());
        step.exit_code = Some(0);
        if let Some(f) = output_file {
            step.output_file = Some(f.to_string());
        }
        self.recount();
        Ok(())
    }

    pub fn fail_step(&mut self, number: u32, exit_code: i32) -> Result<()> {
        let step = self.step_mut(number)?;
        step.status = StepState::Failed;
        step.finished_at = Some(Utc::now());
        step.exit_code = Some(exit_code);
        self.overall_status = OverallStatus::Failed;
        self.recount();
        Ok(())
    }

    pub fn skip_step(&mut self, number: u32) -> Result<()> {
        let step = self.step_mut(number)?;
        step.status = StepState::Skipped;
        step.finished_at = Some(Utc::now());
        self.recount();
        Ok(())
    }

    pub fn set_overall(&mut self, overall: OverallStatus) {
        self.overall_status = overall;
        self.updated_at = Some(Utc::now());
    }

    fn recount(&mut self) {
        let count = |state: StepState| self.steps.iter().filter(|s| s.status == state).count();
        self.total_steps = self.steps.len();
        self.completed_steps = count(StepState::Completed);
        self.skipped_steps = count(StepState::Skipped);
        self.failed_steps = count(StepState::Failed);
        self.updated_at = Some(Utc::now());
    }

    // ---------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------

    /// Whether step `number` can be skipped on this run: `completed` with its
    /// declared output on disk, or explicitly `skipped` (no file required).
    pub fn is_step_complete(&self, number: u32, entity_dir: &Path) -> bool {
        match self.step(number) {
            Some(s) => match s.status {
                StepState::Skipped => true,
                StepState::Completed => s.output_present(entity_dir),
                _ => false,
            },
            None => false,
        }
    }

    /// Steps claiming `completed`, `failed` or `running` whose declared output
    /// file is missing. Consistency check between this document and the disk.
    pub fn missing_outputs(&self, entity_dir: &Path) -> Vec<&StepStatus> {
        self.steps
            .iter()
            .filter(|s| s.status.expects_output() && !s.output_present(entity_dir))
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.status, StepState::Completed | StepState::Skipped))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_status_is_all_pending() {
        let status = ConversionStatus::new("Facility", None, ConversionMode::SearchDetail);
        assert_eq!(status.total_steps, 11);
        assert!(status.steps.iter().all(|s| s.status == StepState::Pending));
        assert_eq!(status.overall_status, OverallStatus::Running);
    }

    #[test]
    fn roundtrip_preserves_order_and_output_file() {
        let dir = TempDir::new().unwrap();
        let mut status = ConversionStatus::new(
            "Facility",
            Some("frmFacilitySearch".into()),
            ConversionMode::SearchDetail,
        );
        status.start_step(1).unwrap();
        status.complete_step(1, None).unwrap();
        status.skip_step(2).unwrap();
        status.steps[10].output_file = None;
        status.save(dir.path()).unwrap();

        let loaded = ConversionStatus::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, status);
        assert_eq!(
            loaded.steps.iter().map(|s| s.step_number).collect::<Vec<_>>(),
            (1..=11).collect::<Vec<_>>()
        );
        assert_eq!(
            loaded.steps[0].output_file.as_deref(),
            Some("form-structure-search.json")
        );
        assert!(loaded.steps[10].output_file.is_none());
    }

    #[test]
    fn json_uses_camel_case_schema() {
        let status = ConversionStatus::new("Barge", None, ConversionMode::SingleForm);
        let v: serde_json::Value = serde_json::to_value(&status).unwrap();
        assert_eq!(v["entity"], "Barge");
        assert_eq!(v["overallStatus"], "running");
        assert_eq!(v["totalSteps"], 10);
        assert_eq!(v["steps"][0]["stepNumber"], 1);
        assert_eq!(v["steps"][0]["outputFile"], "form-structure.json");
        assert!(v.get("formName").is_none());
    }

    #[test]
    fn missing_file_is_none_and_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(ConversionStatus::load(dir.path()).unwrap().is_none());

        std::fs::write(paths::status_path(dir.path()), "{ not json").unwrap();
        assert!(matches!(
            ConversionStatus::load(dir.path()),
            Err(ConvertError::Json(_))
        ));
    }

    #[test]
    fn completed_requires_output_but_skipped_does_not() {
        let dir = TempDir::new().unwrap();
        let mut status = ConversionStatus::new("Facility", None, ConversionMode::SearchDetail);
        status.complete_step(4, None).unwrap();
        status.skip_step(5).unwrap();

        assert!(!status.is_step_complete(4, dir.path()));
        assert!(status.is_step_complete(5, dir.path()));

        std::fs::write(dir.path().join("business-logic.json"), "{}").unwrap();
        assert!(status.is_step_complete(4, dir.path()));
        assert!(!status.is_step_complete(6, dir.path()));
    }

    #[test]
    fn missing_outputs_ignores_pending_and_skipped() {
        let dir = TempDir::new().unwrap();
        let mut status = ConversionStatus::new("Facility", None, ConversionMode::SearchDetail);
        status.complete_step(4, None).unwrap();
        status.fail_step(5, 2).unwrap();
        status.skip_step(6).unwrap();

        let missing: Vec<u32> = status
            .missing_outputs(dir.path())
            .iter()
            .map(|s| s.step_number)
            .collect();
        assert_eq!(missing, vec![4, 5]);
    }

    #[test]
    fn counters_follow_transitions() {
        let mut status = ConversionStatus::new("Facility", None, ConversionMode::SingleForm);
        status.complete_step(1, None).unwrap();
        status.skip_step(2).unwrap();
        status.fail_step(3, 7).unwrap();
        assert_eq!(status.completed_steps, 1);
        assert_eq!(status.skipped_steps, 1);
        assert_eq!(status.failed_steps, 1);
        assert_eq!(status.overall_status, OverallStatus::Failed);
        assert_eq!(status.step(3).unwrap().exit_code, Some(7));
        assert!(status.start_step(42).is_err());
    }

    #[test]
    fn catalogue_mismatch_detected_and_reset() {
        let mut status = ConversionStatus::new("Facility", None, ConversionMode::SearchDetail);
        status.complete_step(1, None).unwrap();
        assert!(status.matches_catalogue(ConversionMode::SearchDetail));
        assert!(!status.matches_catalogue(ConversionMode::SingleForm));

        status.reset(ConversionMode::SingleForm);
        assert_eq!(status.total_steps, 10);
        assert_eq!(status.completed_steps, 0);
        assert!(status.matches_catalogue(ConversionMode::SingleForm));
    }
}
