//! Gap analysis: master-plan items that the analysis files never mention.

use crate::analysis::AnalysisBundle;
use crate::master_plan::MasterPlan;
use crate::types::ConversionMode;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    Form,
    Class,
    Procedure,
    Endpoint,
    Feature,
    Inconsistency,
}

impl GapType {
    pub fn as_str(self) -> &'static str {
        match self {
            GapType::Form => "form",
            GapType::Class => "class",
            GapType::Procedure => "procedure",
            GapType::Endpoint => "endpoint",
            GapType::Feature => "feature",
            GapType::Inconsistency => "inconsistency",
        }
    }

    /// Severity is fixed per gap type.
    pub fn severity(self) -> Severity {
        match self {
            GapType::Form => Severity::High,
            GapType::Class | GapType::Procedure => Severity::Medium,
            GapType::Endpoint | GapType::Feature | GapType::Inconsistency => Severity::Low,
        }
    }
}

impl fmt::Display for GapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    #[serde(rename = "type")]
    pub gap_type: GapType,
    pub item: String,
    pub description: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Gap {
    fn new(gap_type: GapType, item: &str, description: String, recommendation: &str) -> Self {
        Self {
            gap_type,
            item: item.to_string(),
            description,
            severity: gap_type.severity(),
            recommendation: Some(recommendation.to_string()),
        }
    }
}

/// Compare the master plan against what the analysis captured for `entity`.
///
/// Forms, procedures and classes are matched by name against the names the
/// analysis lists. Endpoints and features have no structured home in the
/// analysis, so they only need to appear somewhere in its text.
///
/// Each form-structure file also stands for the form it was extracted from:
/// `frm{E}Search`/`frm{E}Detail`, or for a single form `frm{E}` and the
/// recorded `form_name`.
pub fn analyze(
    entity: &str,
    form_name: Option<&str>,
    plan: &MasterPlan,
    bundle: &AnalysisBundle,
) -> Vec<Gap> {
    let mut gaps = Vec::new();

    let mut forms = lowered(bundle.form_names());
    if bundle.has(crate::analysis::FORM_STRUCTURE_SEARCH) {
        forms.insert(format!("frm{entity}search").to_ascii_lowercase());
    }
    if bundle.has(crate::analysis::FORM_STRUCTURE_DETAIL) {
        forms.insert(format!("frm{entity}detail").to_ascii_lowercase());
    }
    if bundle.has(crate::analysis::FORM_STRUCTURE) {
        forms.insert(format!("frm{entity}").to_ascii_lowercase());
        if let Some(form) = form_name {
            forms.insert(form.to_ascii_lowercase());
        }
    }
    for form in plan.forms() {
        if !forms.contains(&form.to_ascii_lowercase()) {
            gaps.push(Gap::new(
                GapType::Form,
                &form,
                format!("{form} is listed in the master plan but was not analyzed"),
                "Run the conversion for this form or record why it is out of scope",
            ));
        }
    }

    let procedures = lowered(bundle.procedure_names());
    for proc_name in plan.procedures() {
        if !procedures.contains(&proc_name.to_ascii_lowercase()) {
            gaps.push(Gap::new(
                GapType::Procedure,
                &proc_name,
                format!("{proc_name} is not covered by business-logic or data-access analysis"),
                "Re-run the data access extraction step",
            ));
        }
    }

    let classes = lowered(bundle.class_names());
    for class in plan.classes() {
        if !classes.contains(&class.to_ascii_lowercase()) {
            gaps.push(Gap::new(
                GapType::Class,
                &class,
                format!("{class} does not appear in business logic or related entities"),
                "Check whether the class needs a service or DTO",
            ));
        }
    }

    let haystack = bundle.haystack();
    for endpoint in plan.endpoints() {
        let route = endpoint
            .split_whitespace()
            .last()
            .unwrap_or(&endpoint)
            .to_lowercase();
        if !haystack.contains(&route) {
            gaps.push(Gap::new(
                GapType::Endpoint,
                &endpoint,
                format!("no analysis file mentions {route}"),
                "Confirm the controller action is planned",
            ));
        }
    }
    for feature in plan.features() {
        if !haystack.contains(&feature.to_lowercase()) {
            gaps.push(Gap::new(
                GapType::Feature,
                &feature,
                format!("feature '{feature}' is not mentioned in the analysis"),
                "Verify the feature manually in the legacy form",
            ));
        }
    }

    gaps
}

/// A gap when the status document and the marker files disagree on mode.
pub fn mode_inconsistency(
    recorded: Option<ConversionMode>,
    inferred: Option<ConversionMode>,
) -> Option<Gap> {
    match (recorded, inferred) {
        (Some(r), Some(i)) if r != i => Some(Gap::new(
            GapType::Inconsistency,
            "mode",
            format!("status document records {r} but analysis files indicate {i}"),
            "Re-run the conversion with a fresh status document",
        )),
        _ => None,
    }
}

fn lowered(items: Vec<String>) -> HashSet<String> {
    items.into_iter().map(|s| s.to_ascii_lowercase()).collect()
}
