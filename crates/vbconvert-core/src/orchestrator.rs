//! Sequential step runner for one entity.
//!
//! Steps run strictly in step-number order because later prompts read the
//! JSON written by earlier steps. The first failing step halts the run; its
//! exit code becomes the run's exit code. Outputs already on disk are never
//! rolled back, so the next invocation resumes where this one stopped.

use crate::config::Config;
use crate::error::Result;
use crate::paths;
use crate::prompt::{self, ComposedPrompt};
use crate::status::ConversionStatus;
use crate::steps::{self, StepDefinition};
use crate::types::{ConversionMode, OverallStatus};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// StepExecutor seam
// ---------------------------------------------------------------------------

/// Everything an executor needs to run one step.
#[derive(Debug)]
pub struct StepRequest<'a> {
    pub entity: &'a str,
    pub step: &'a StepDefinition,
    pub prompt: ComposedPrompt,
    pub entity_dir: &'a Path,
}

/// Result of one subprocess invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub exit_code: i32,
    /// This process received SIGINT/SIGTERM while the step was running.
    pub interrupted: bool,
}

impl StepOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.interrupted
    }
}

/// Runs a single step, typically by spawning the coding-assistant CLI.
pub trait StepExecutor {
    fn execute(&mut self, request: &StepRequest<'_>) -> Result<StepOutcome>;
}

// ---------------------------------------------------------------------------
// RunOptions / RunSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub entity: String,
    pub form_name: Option<String>,
    /// Steps to mark `skipped` without invoking the executor.
    pub skip_steps: BTreeSet<u32>,
    /// Discard any recorded progress and start from step 1.
    pub fresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedStep {
    pub number: u32,
    pub exit_code: i32,
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: ConversionMode,
    pub executed: Vec<u32>,
    pub skipped: Vec<u32>,
    pub already_complete: Vec<u32>,
    pub failed: Option<FailedStep>,
    pub status: ConversionStatus,
}

impl RunSummary {
    /// The failing step's exit code, never 0 for a failed run.
    pub fn exit_code(&self) -> i32 {
        match self.failed {
            Some(f) if f.exit_code == 0 => 1,
            Some(f) => f.exit_code,
            None => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    config: &'a Config,
    options: RunOptions,
    entity_dir: PathBuf,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, output_root: &Path, options: RunOptions) -> Result<Self> {
        paths::validate_entity(&options.entity)?;
        let entity_dir = paths::entity_output_dir(output_root, &options.entity);
        Ok(Self {
            config,
            options,
            entity_dir,
        })
    }

    pub fn entity_dir(&self) -> &Path {
        &self.entity_dir
    }

    /// Run every unsatisfied step in order, halting on the first failure.
    pub fn run(&self, executor: &mut dyn StepExecutor) -> Result<RunSummary> {
        let mut status = self.prepare_status()?;
        let mode = status.mode;
        tracing::info!(
            entity = %self.options.entity,
            mode = %mode,
            steps = status.total_steps,
            "starting conversion"
        );

        let mut summary = RunSummary {
            mode,
            executed: Vec::new(),
            skipped: Vec::new(),
            already_complete: Vec::new(),
            failed: None,
            status: status.clone(),
        };

        for def in steps::catalogue(mode) {
            if status.is_step_complete(def.number, &self.entity_dir) {
                tracing::info!(step = def.number, name = def.name, "already complete, skipping");
                summary.already_complete.push(def.number);
                continue;
            }

            if self.options.skip_steps.contains(&def.number) {
                tracing::info!(step = def.number, name = def.name, "skipped by request");
                status.skip_step(def.number)?;
                status.save(&self.entity_dir)?;
                summary.skipped.push(def.number);
                continue;
            }

            summary.executed.push(def.number);
            let outcome = self.run_step(&mut status, def, executor)?;
            if !outcome.success() {
                summary.failed = Some(FailedStep {
                    number: def.number,
                    exit_code: outcome.exit_code,
                    interrupted: outcome.interrupted,
                });
                summary.status = status;
                return Ok(summary);
            }
        }

        status.set_overall(OverallStatus::Completed);
        status.save(&self.entity_dir)?;
        tracing::info!(entity = %self.options.entity, "conversion complete");
        summary.status = status;
        Ok(summary)
    }

    /// Run exactly one step regardless of its recorded status.
    pub fn run_single(&self, number: u32, executor: &mut dyn StepExecutor) -> Result<RunSummary> {
        let mut status = self.prepare_status()?;
        let mode = status.mode;
        let def = steps::find_step(mode, number)?;

        let outcome = self.run_step(&mut status, def, executor)?;
        let failed = (!outcome.success()).then_some(FailedStep {
            number,
            exit_code: outcome.exit_code,
            interrupted: outcome.interrupted,
        });
        if failed.is_none() {
            let overall = if status.is_finished() {
                OverallStatus::Completed
            } else {
                OverallStatus::Running
            };
            status.set_overall(overall);
            status.save(&self.entity_dir)?;
        }

        Ok(RunSummary {
            mode,
            executed: vec![number],
            skipped: Vec::new(),
            already_complete: Vec::new(),
            failed,
            status,
        })
    }

    // ---------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------

    /// Load (or create) the status document and align it with the mode's
    /// step list. Malformed JSON aborts here.
    fn prepare_status(&self) -> Result<ConversionStatus> {
        crate::io::ensure_dir(&self.entity_dir)?;
        let existing = if self.options.fresh {
            None
        } else {
            ConversionStatus::load(&self.entity_dir)?
        };

        let form_name = self
            .options
            .form_name
            .clone()
            .or_else(|| existing.as_ref().and_then(|s| s.form_name.clone()));
        let mode = self.resolve_mode(form_name.as_deref(), existing.as_ref());
        for &number in &self.options.skip_steps {
            steps::find_step(mode, number)?;
        }

        let mut status = match existing {
            Some(mut s) => {
                if !s.matches_catalogue(mode) {
                    tracing::warn!(
                        entity = %self.options.entity,
                        recorded = %s.mode,
                        inferred = %mode,
                        "recorded steps do not match the inferred mode, resetting"
                    );
                    s.reset(mode);
                }
                s.form_name = form_name;
                s
            }
            None => ConversionStatus::new(self.options.entity.clone(), form_name, mode),
        };
        status.set_overall(OverallStatus::Running);
        status.save(&self.entity_dir)?;
        Ok(status)
    }

    /// Markers on disk, then the form-name hint, then the mode recorded by a
    /// previous run, then the search/detail default.
    fn resolve_mode(
        &self,
        form_name: Option<&str>,
        existing: Option<&ConversionStatus>,
    ) -> ConversionMode {
        if let Some(mode) = steps::mode_from_markers(&self.entity_dir) {
            return mode;
        }
        if form_name.is_some() {
            return steps::infer_mode(&self.entity_dir, form_name);
        }
        existing.map(|s| s.mode).unwrap_or_default()
    }

    fn run_step(
        &self,
        status: &mut ConversionStatus,
        def: &StepDefinition,
        executor: &mut dyn StepExecutor,
    ) -> Result<StepOutcome> {
        tracing::info!(step = def.number, name = def.name, "running step");
        status.start_step(def.number)?;
        status.save(&self.entity_dir)?;

        let composed = prompt::compose(
            self.config,
            &self.options.entity,
            status.mode,
            status.form_name.as_deref(),
            def,
            &self.entity_dir,
        )?;
        let request = StepRequest {
            entity: &self.options.entity,
            step: def,
            prompt: composed,
            entity_dir: &self.entity_dir,
        };

        let outcome = match executor.execute(&request) {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(step = def.number, error = %e, "step could not be executed");
                status.fail_step(def.number, 1)?;
                status.save(&self.entity_dir)?;
                return Err(e);
            }
        };

        if outcome.success() {
            status.complete_step(def.number, def.output_file)?;
            if let Some(step) = status.step(def.number) {
                if !step.output_present(&self.entity_dir) {
                    tracing::warn!(
                        step = def.number,
                        output = def.output_file.unwrap_or_default(),
                        "step succeeded but its output file is missing"
                    );
                }
            }
        } else {
            tracing::error!(
                step = def.number,
                name = def.name,
                exit_code = outcome.exit_code,
                interrupted = outcome.interrupted,
                "step failed, halting"
            );
            status.fail_step(def.number, outcome.exit_code)?;
        }
        status.save(&self.entity_dir)?;
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
