//! The fixed analysis/generation step lists and the mode heuristic that picks
//! between them.

use crate::error::{ConvertError, Result};
use crate::paths;
use crate::types::ConversionMode;
use std::collections::BTreeSet;
use std::path::Path;

pub const SINGLE_FORM_MARKER: &str = "form-structure.json";
pub const SEARCH_FORM_MARKER: &str = "form-structure-search.json";
pub const DETAIL_FORM_MARKER: &str = "form-structure-detail.json";

// ---------------------------------------------------------------------------
// StepDefinition
// ---------------------------------------------------------------------------

/// One numbered stage of the pipeline.
///
/// `key` names the prompt file (`{promptsDir}/{key}.md`); `output_file` is
/// relative to the entity output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub number: u32,
    pub key: &'static str,
    pub name: &'static str,
    pub output_file: Option<&'static str>,
    pub instruction: &'static str,
}

const TABS: &str = "Analyze the tab pages of the legacy forms: tab names, the controls on each tab and any tab-specific load logic.";
const BUSINESS_LOGIC: &str = "Extract the business rules from the business object and form code-behind: public procedures, calculations, defaulting and state changes.";
const DATA_ACCESS: &str = "Extract data access: stored procedures, inline SQL, parameters, result columns and transaction boundaries.";
const VALIDATION: &str = "Extract validation rules: required fields, formats, ranges, cross-field checks and the messages shown to the user.";
const SECURITY: &str = "Extract security checks: permissions, roles, and controls enabled or hidden by authorization.";
const RELATED: &str = "Identify related entities: child grids, lookups, foreign keys and child forms opened from these forms.";
const UI_MAPPING: &str = "Map every legacy control to its ASP.NET Core MVC equivalent (input, select, grid, modal) with binding names.";
const WORKFLOW: &str = "Describe the user workflow: search, open, create, edit, save, delete, and navigation between forms.";
const TEMPLATES: &str = "Generate the conversion scaffolding (DTOs, repository, service, controller, views, JavaScript) from the analysis files.";

const SEARCH_DETAIL_STEPS: &[StepDefinition] = &[
    StepDefinition {
        number: 1,
        key: "extract-search-form",
        name: "Extract search form structure",
        output_file: Some(SEARCH_FORM_MARKER),
        instruction: "Analyze the legacy search form and its designer file: search criteria controls, result grid columns, buttons and event handlers.",
    },
    StepDefinition {
        number: 2,
        key: "extract-detail-form",
        name: "Extract detail form structure",
        output_file: Some(DETAIL_FORM_MARKER),
        instruction: "Analyze the legacy detail form and its designer file: input controls, grids, buttons and event handlers.",
    },
    StepDefinition {
        number: 3,
        key: "analyze-tabs",
        name: "Analyze tabs",
        output_file: Some("tabs.json"),
        instruction: TABS,
    },
    StepDefinition {
        number: 4,
        key: "extract-business-logic",
        name: "Extract business logic",
        output_file: Some("business-logic.json"),
        instruction: BUSINESS_LOGIC,
    },
    StepDefinition {
        number: 5,
        key: "extract-data-access",
        name: "Extract data access",
        output_file: Some("data-access.json"),
        instruction: DATA_ACCESS,
    },
    StepDefinition {
        number: 6,
        key: "extract-validation",
        name: "Extract validation rules",
        output_file: Some("validation.json"),
        instruction: VALIDATION,
    },
    StepDefinition {
        number: 7,
        key: "extract-security",
        name: "Extract security",
        output_file: Some("security.json"),
        instruction: SECURITY,
    },
    StepDefinition {
        number: 8,
        key: "analyze-related-entities",
        name: "Analyze related entities",
        output_file: Some("related-entities.json"),
        instruction: RELATED,
    },
    StepDefinition {
        number: 9,
        key: "map-ui",
        name: "Map UI components",
        output_file: Some("ui-mapping.json"),
        instruction: UI_MAPPING,
    },
    StepDefinition {
        number: 10,
        key: "extract-workflow",
        name: "Extract workflow",
        output_file: Some("workflow.json"),
        instruction: WORKFLOW,
    },
    StepDefinition {
        number: 11,
        key: "generate-templates",
        name: "Generate API templates",
        output_file: Some(paths::TEMPLATES_DIR),
        instruction: TEMPLATES,
    },
];

const SINGLE_FORM_STEPS: &[StepDefinition] = &[
    StepDefinition {
        number: 1,
        key: "extract-form",
        name: "Extract form structure",
        output_file: Some(SINGLE_FORM_MARKER),
        instruction: "Analyze the legacy form and its designer file: the search area, the detail area, grids, buttons and event handlers.",
    },
    StepDefinition {
        number: 2,
        key: "analyze-tabs",
        name: "Analyze tabs",
        output_file: Some("tabs.json"),
        instruction: TABS,
    },
    StepDefinition {
        number: 3,
        key: "extract-business-logic",
        name: "Extract business logic",
        output_file: Some("business-logic.json"),
        instruction: BUSINESS_LOGIC,
    },
    StepDefinition {
        number: 4,
        key: "extract-data-access",
        name: "Extract data access",
        output_file: Some("data-access.json"),
        instruction: DATA_ACCESS,
    },
    StepDefinition {
        number: 5,
        key: "extract-validation",
        name: "Extract validation rules",
        output_file: Some("validation.json"),
        instruction: VALIDATION,
    },
    StepDefinition {
        number: 6,
        key: "extract-security",
        name: "Extract security",
        output_file: Some("security.json"),
        instruction: SECURITY,
    },
    StepDefinition {
        number: 7,
        key: "analyze-related-entities",
        name: "Analyze related entities",
        output_file: Some("related-entities.json"),
        instruction: RELATED,
    },
    StepDefinition {
        number: 8,
        key: "map-ui",
        name: "Map UI components",
        output_file: Some("ui-mapping.json"),
        instruction: UI_MAPPING,
    },
    StepDefinition {
        number: 9,
        key: "extract-workflow",
        name: "Extract workflow",
        output_file: Some("workflow.json"),
        instruction: WORKFLOW,
    },
    StepDefinition {
        number: 10,
        key: "generate-templates",
        name: "Generate API templates",
        output_file: Some(paths::TEMPLATES_DIR),
        instruction: TEMPLATES,
    },
];

pub fn catalogue(mode: ConversionMode) -> &'static [StepDefinition] {
    match mode {
        ConversionMode::SingleForm => SINGLE_FORM_STEPS,
        ConversionMode::SearchDetail => SEARCH_DETAIL_STEPS,
    }
}

pub fn find_step(mode: ConversionMode, number: u32) -> Result<&'static StepDefinition> {
    catalogue(mode)
        .iter()
        .find(|s| s.number == number)
        .ok_or_else(|| ConvertError::UnknownStep {
            number,
            mode: mode.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Mode inference
// ---------------------------------------------------------------------------

/// Pick the step list for an entity.
///
/// Marker files already in the output directory win; then the form-name hint
/// (`frm<E>Search|Detail` means a search/detail pair, any other name a single
/// form); with no signal at all, search/detail.
pub fn infer_mode(entity_dir: &Path, form_name: Option<&str>) -> ConversionMode {
    if let Some(mode) = mode_from_markers(entity_dir) {
        return mode;
    }
    match form_name {
        Some(form) if paths::extract_entity_name(form).is_none() => ConversionMode::SingleForm,
        _ => ConversionMode::SearchDetail,
    }
}

/// Mode implied purely by which form-structure files exist, if any.
pub fn mode_from_markers(entity_dir: &Path) -> Option<ConversionMode> {
    if entity_dir.join(SINGLE_FORM_MARKER).exists() {
        return Some(ConversionMode::SingleForm);
    }
    if entity_dir.join(SEARCH_FORM_MARKER).exists() || entity_dir.join(DETAIL_FORM_MARKER).exists()
    {
        return Some(ConversionMode::SearchDetail);
    }
    None
}

// ---------------------------------------------------------------------------
// --skip-steps parsing
// ---------------------------------------------------------------------------

/// Highest step number in any catalogue.
pub fn max_step_number() -> u32 {
    [SEARCH_DETAIL_STEPS, SINGLE_FORM_STEPS]
        .iter()
        .filter_map(|c| c.last())
        .map(|s| s.number)
        .max()
        .unwrap_or(0)
}

/// Parse `"1,2,5"` (ranges like `"3-5"` allowed) into a set of step numbers.
/// Every number must lie in `1..=max_step_number()`; whether it exists in a
/// given mode is checked once the mode is known.
pub fn parse_step_list(raw: &str) -> Result<BTreeSet<u32>> {
    let max = max_step_number();
    let invalid = || ConvertError::InvalidStepList(raw.to_string());
    let number = |s: &str| -> Result<u32> {
        match s.trim().parse::<u32>() {
            Ok(n) if (1..=max).contains(&n) => Ok(n),
            _ => Err(invalid()),
        }
    };

    let mut steps = BTreeSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (number(lo)?, number(hi)?);
                if lo > hi {
                    return Err(invalid());
                }
                steps.extend(lo..=hi);
            }
            None => {
                steps.insert(number(part)?);
            }
        }
    }
    Ok(steps)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn catalogues_are_strictly_ordered() {
        for mode in [ConversionMode::SingleForm, ConversionMode::SearchDetail] {
            let steps = catalogue(mode);
            for (i, step) in steps.iter().enumerate() {
                assert_eq!(step.number, i as u32 + 1, "{mode}: {}", step.key);
            }
        }
    }

    #[test]
    fn business_logic_is_step_four_for_search_detail() {
        let step = find_step(ConversionMode::SearchDetail, 4).unwrap();
        assert_eq!(step.output_file, Some("business-logic.json"));
        assert!(find_step(ConversionMode::SingleForm, 11).is_err());
    }

    #[test]
    fn markers_decide_mode() {
        let dir = TempDir::new().unwrap();
        assert_eq!(mode_from_markers(dir.path()), None);

        std::fs::write(dir.path().join(DETAIL_FORM_MARKER), "{}").unwrap();
        assert_eq!(
            infer_mode(dir.path(), Some("frmBarge")),
            ConversionMode::SearchDetail
        );

        std::fs::write(dir.path().join(SINGLE_FORM_MARKER), "{}").unwrap();
        assert_eq!(infer_mode(dir.path(), None), ConversionMode::SingleForm);
    }

    #[test]
    fn form_name_hint_used_without_markers() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            infer_mode(dir.path(), Some("frmBarge")),
            ConversionMode::SingleForm
        );
        assert_eq!(
            infer_mode(dir.path(), Some("frmBargeSearch")),
            ConversionMode::SearchDetail
        );
        assert_eq!(infer_mode(dir.path(), None), ConversionMode::SearchDetail);
    }

    #[test]
    fn step_list_parsing() {
        let s = parse_step_list("1,2,5").unwrap();
        assert_eq!(s.into_iter().collect::<Vec<_>>(), vec![1, 2, 5]);

        let s = parse_step_list(" 3-5 , 9,").unwrap();
        assert_eq!(s.into_iter().collect::<Vec<_>>(), vec![3, 4, 5, 9]);

        assert!(parse_step_list("").unwrap().is_empty());
        assert!(parse_step_list("1,x").is_err());
        assert!(parse_step_list("5-3").is_err());
    }

    #[test]
    fn step_list_rejects_numbers_outside_every_catalogue() {
        assert_eq!(max_step_number(), 11);
        assert_eq!(parse_step_list("11").unwrap().len(), 1);
        assert_eq!(parse_step_list("1-11").unwrap().len(), 11);

        for raw in ["0", "12", "1-12", "0-3", "1-20000000", "4294967295"] {
            assert!(
                matches!(parse_step_list(raw), Err(ConvertError::InvalidStepList(_))),
                "{raw} should be rejected"
            );
        }
    }
}
