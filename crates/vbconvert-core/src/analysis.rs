//! Loaded analysis JSON for one entity.
//!
//! The files are written by the external assistant, so their shape is loose.
//! Lookups accept several common key spellings and treat anything
//! unrecognised as absent.

use crate::error::{ConvertError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

pub const FORM_STRUCTURE: &str = "form-structure.json";
pub const FORM_STRUCTURE_SEARCH: &str = "form-structure-search.json";
pub const FORM_STRUCTURE_DETAIL: &str = "form-structure-detail.json";
pub const BUSINESS_LOGIC: &str = "business-logic.json";
pub const DATA_ACCESS: &str = "data-access.json";
pub const SECURITY: &str = "security.json";
pub const VALIDATION: &str = "validation.json";
pub const RELATED_ENTITIES: &str = "related-entities.json";
pub const TABS: &str = "tabs.json";
pub const UI_MAPPING: &str = "ui-mapping.json";
pub const WORKFLOW: &str = "workflow.json";

pub const ANALYSIS_FILES: &[&str] = &[
    FORM_STRUCTURE,
    FORM_STRUCTURE_SEARCH,
    FORM_STRUCTURE_DETAIL,
    BUSINESS_LOGIC,
    DATA_ACCESS,
    SECURITY,
    VALIDATION,
    RELATED_ENTITIES,
    TABS,
    UI_MAPPING,
    WORKFLOW,
];

const NAME_FIELDS: &[&str] = &[
    "name",
    "formName",
    "procedureName",
    "className",
    "entity",
    "title",
    "id",
];

#[derive(Debug, Clone, Default)]
pub struct AnalysisBundle {
    files: BTreeMap<&'static str, Value>,
}

impl AnalysisBundle {
    /// Load whichever analysis files exist. Malformed JSON is an error naming
    /// the file.
    pub fn load(entity_dir: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        for name in ANALYSIS_FILES {
            let path = entity_dir.join(name);
            let Some(data) = crate::io::read_optional(&path)? else {
                continue;
            };
            let value: Value = serde_json::from_str(&data).map_err(|e| ConvertError::Analysis {
                path: path.display().to_string(),
                source: e,
            })?;
            files.insert(*name, value);
        }
        Ok(Self { files })
    }

    #[cfg(test)]
    pub(crate) fn from_values(values: Vec<(&'static str, Value)>) -> Self {
        Self {
            files: values.into_iter().collect(),
        }
    }

    pub fn get(&self, file: &str) -> Option<&Value> {
        self.files.get(file)
    }

    pub fn has(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    pub fn loaded_files(&self) -> Vec<&'static str> {
        self.files.keys().copied().collect()
    }

    pub fn missing_files(&self) -> Vec<&'static str> {
        ANALYSIS_FILES
            .iter()
            .copied()
            .filter(|f| !self.files.contains_key(f))
            .collect()
    }

    /// Names listed under any of `keys` in `file`.
    pub fn names(&self, file: &str, keys: &[&str]) -> Vec<String> {
        self.get(file)
            .map(|v| named_items(v, keys))
            .unwrap_or_default()
    }

    /// Form names recorded in the form-structure files.
    pub fn form_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        for file in [FORM_STRUCTURE, FORM_STRUCTURE_SEARCH, FORM_STRUCTURE_DETAIL] {
            if let Some(v) = self.get(file) {
                if let Some(name) = ["formName", "name", "form"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(Value::as_str))
                {
                    out.push(name.to_string());
                }
                out.extend(named_items(v, &["childForms", "forms"]));
            }
        }
        out
    }

    pub fn procedure_names(&self) -> Vec<String> {
        let mut out = self.names(BUSINESS_LOGIC, &["procedures", "methods", "functions"]);
        out.extend(self.names(
            DATA_ACCESS,
            &["storedProcedures", "procedures", "queries"],
        ));
        out
    }

    pub fn class_names(&self) -> Vec<String> {
        let mut out = self.names(BUSINESS_LOGIC, &["classes", "businessObjects"]);
        if let Some(name) = self
            .get(BUSINESS_LOGIC)
            .and_then(|v| v.get("className"))
            .and_then(Value::as_str)
        {
            out.push(name.to_string());
        }
        out.extend(self.names(RELATED_ENTITIES, &["relatedEntities", "entities"]));
        out
    }

    /// Lowercased dump of every loaded file, for presence checks.
    pub fn haystack(&self) -> String {
        self.files
            .values()
            .map(|v| v.to_string().to_lowercase())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Items of the first array found under `keys`: strings as-is, objects by
/// their first name-like field.
pub fn named_items(value: &Value, keys: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for key in keys {
        let Some(Value::Array(items)) = value.get(*key) else {
            continue;
        };
        for item in items {
            match item {
                Value::String(s) => out.push(s.clone()),
                Value::Object(map) => {
                    if let Some(name) = NAME_FIELDS
                        .iter()
                        .find_map(|f| map.get(*f).and_then(Value::as_str))
                    {
                        out.push(name.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    out
}

/// Length of the first array found under `keys`, 0 if none.
pub fn count_items(value: Option<&Value>, keys: &[&str]) -> usize {
    value
        .and_then(|v| {
            keys.iter()
                .find_map(|k| v.get(*k).and_then(Value::as_array))
        })
        .map(Vec::len)
        .unwrap_or(0)
}
