use crate::config::{Config, ProjectLayout};
use crate::error::{ConvertError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Output layout constants
// ---------------------------------------------------------------------------

pub const STATUS_FILE: &str = "conversion-status.json";
pub const TEMPLATES_DIR: &str = "templates";
pub const TASKS_DIR: &str = "tasks";
pub const LOGS_DIR: &str = "logs";
pub const SPEC_FILE: &str = "spec.md";
pub const CHECKLIST_FILE: &str = "quality-checklist.md";
pub const SHARED_PROMPTS_DIR: &str = "shared";
pub const ARCHITECTURE_PROMPT: &str = "architecture-patterns.md";

// ---------------------------------------------------------------------------
// Legacy source paths
// ---------------------------------------------------------------------------

pub fn forms_dir(config: &Config) -> PathBuf {
    config.input_root().join(&config.forms_path)
}

pub fn search_form(config: &Config, entity: &str) -> PathBuf {
    forms_dir(config).join(format!("frm{entity}Search.vb"))
}

pub fn detail_form(config: &Config, entity: &str) -> PathBuf {
    forms_dir(config).join(format!("frm{entity}Detail.vb"))
}

pub fn single_form(config: &Config, entity: &str) -> PathBuf {
    forms_dir(config).join(format!("frm{entity}.vb"))
}

/// Form by explicit name (`frmFacilitySearch` → `.../frmFacilitySearch.vb`).
pub fn named_form(config: &Config, form: &str) -> PathBuf {
    forms_dir(config).join(format!("{form}.vb"))
}

/// The `.Designer.vb` companion of a form source file.
pub fn designer_file(form_path: &Path) -> PathBuf {
    let stem = form_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    form_path.with_file_name(format!("{stem}.Designer.vb"))
}

pub fn business_object(config: &Config, entity: &str) -> PathBuf {
    config
        .input_root()
        .join(&config.business_objects_path)
        .join(format!("{entity}.vb"))
}

pub fn list_class(config: &Config, entity: &str) -> PathBuf {
    config
        .input_root()
        .join(&config.lists_path)
        .join(format!("{entity}List.vb"))
}

// ---------------------------------------------------------------------------
// Reference / target project paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Reference,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFolder {
    Controllers,
    Dtos,
    Repositories,
    Services,
    Views,
    Javascript,
}

impl ProjectFolder {
    pub fn all() -> &'static [ProjectFolder] {
        &[
            ProjectFolder::Controllers,
            ProjectFolder::Dtos,
            ProjectFolder::Repositories,
            ProjectFolder::Services,
            ProjectFolder::Views,
            ProjectFolder::Javascript,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectFolder::Controllers => "controllers",
            ProjectFolder::Dtos => "dtos",
            ProjectFolder::Repositories => "repositories",
            ProjectFolder::Services => "services",
            ProjectFolder::Views => "views",
            ProjectFolder::Javascript => "javascript",
        }
    }

    fn sub_path(self, layout: &ProjectLayout) -> &str {
        match self {
            ProjectFolder::Controllers => &layout.controllers,
            ProjectFolder::Dtos => &layout.dtos,
            ProjectFolder::Repositories => &layout.repositories,
            ProjectFolder::Services => &layout.services,
            ProjectFolder::Views => &layout.views,
            ProjectFolder::Javascript => &layout.javascript,
        }
    }
}

pub fn project_root(config: &Config, kind: ProjectKind) -> PathBuf {
    let layout = match kind {
        ProjectKind::Reference => &config.reference_project,
        ProjectKind::Target => &config.target_project,
    };
    config.resolve(&layout.root)
}

pub fn project_folder(config: &Config, kind: ProjectKind, folder: ProjectFolder) -> PathBuf {
    let layout = match kind {
        ProjectKind::Reference => &config.reference_project,
        ProjectKind::Target => &config.target_project,
    };
    project_root(config, kind).join(folder.sub_path(layout))
}

/// `Views/{Entity}` in the given project.
pub fn entity_views_dir(config: &Config, kind: ProjectKind, entity: &str) -> PathBuf {
    project_folder(config, kind, ProjectFolder::Views).join(entity)
}

// ---------------------------------------------------------------------------
// Output paths
// ---------------------------------------------------------------------------

pub fn entity_output_dir(output_root: &Path, entity: &str) -> PathBuf {
    output_root.join(entity)
}

pub fn status_path(entity_dir: &Path) -> PathBuf {
    entity_dir.join(STATUS_FILE)
}

pub fn templates_dir(entity_dir: &Path) -> PathBuf {
    entity_dir.join(TEMPLATES_DIR)
}

pub fn tasks_dir(entity_dir: &Path) -> PathBuf {
    entity_dir.join(TASKS_DIR)
}

pub fn logs_dir(entity_dir: &Path) -> PathBuf {
    entity_dir.join(LOGS_DIR)
}

pub fn master_plan(config: &Config, entity: &str) -> Option<PathBuf> {
    config
        .master_plan_dir
        .as_ref()
        .map(|d| config.resolve(d).join(format!("{entity}-master-plan.md")))
}

// ---------------------------------------------------------------------------
// Entity names
// ---------------------------------------------------------------------------

static FORM_ENTITY_RE: OnceLock<Regex> = OnceLock::new();
static ENTITY_RE: OnceLock<Regex> = OnceLock::new();

fn form_entity_re() -> &'static Regex {
    FORM_ENTITY_RE.get_or_init(|| Regex::new(r"(?i)^frm(.+?)(Search|Detail)$").unwrap())
}

fn entity_re() -> &'static Regex {
    ENTITY_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap())
}

/// `frmFacilitySearch` → `Some("Facility")`; anything not shaped like
/// `frm<Entity>Search|Detail` → `None`.
pub fn extract_entity_name(form_name: &str) -> Option<String> {
    form_entity_re()
        .captures(form_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn validate_entity(entity: &str) -> Result<()> {
    if entity.len() > 128 || !entity_re().is_match(entity) {
        return Err(ConvertError::InvalidEntity(entity.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Form discovery
// ---------------------------------------------------------------------------

/// Form names (without `.vb`) found in the legacy forms directory, sorted.
/// Designer files are excluded. A missing directory yields an empty list.
pub fn list_forms(config: &Config) -> Result<Vec<String>> {
    let dir = forms_dir(config);
    let entries = match std::fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut forms = Vec::new();
    for entry in entries {
        let name = entry?.file_name().to_string_lossy().into_owned();
        let lower = name.to_ascii_lowercase();
        if !lower.starts_with("frm") || !lower.ends_with(".vb") || lower.ends_with(".designer.vb")
        {
            continue;
        }
        forms.push(name[..name.len() - 3].to_string());
    }
    forms.sort();
    Ok(forms)
}

/// Forms grouped by the entity they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormGroup {
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Combined search+detail form, when the entity uses a single form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single: Option<String>,
}

/// `list_forms` grouped by entity.
pub fn list_entities(config: &Config) -> Result<Vec<FormGroup>> {
    Ok(group_forms(&list_forms(config)?))
}

pub fn group_forms(forms: &[String]) -> Vec<FormGroup> {
    let mut groups: BTreeMap<String, FormGroup> = BTreeMap::new();
    for form in forms {
        match extract_entity_name(form) {
            Some(entity) => {
                let group = groups.entry(entity.clone()).or_insert_with(|| FormGroup {
                    entity,
                    ..Default::default()
                });
                if form.to_ascii_lowercase().ends_with("search") {
                    group.search = Some(form.clone());
                } else {
                    group.detail = Some(form.clone());
                }
            }
            None => {
                let entity = form.get(3..).unwrap_or_default().to_string();
                if entity.is_empty() {
                    continue;
                }
                let group = groups.entry(entity.clone()).or_insert_with(|| FormGroup {
                    entity,
                    ..Default::default()
                });
                group.single = Some(form.clone());
            }
        }
    }
    groups.into_values().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: &Path) -> Config {
        Config {
            input_dir: PathBuf::from("/legacy"),
            forms_path: "UI/Forms".into(),
            business_objects_path: "BO".into(),
            lists_path: "Lists".into(),
            output_dir: PathBuf::from("output"),
            prompts_dir: PathBuf::from("prompts"),
            master_plan_dir: Some(PathBuf::from("plans")),
            reference_project: ProjectLayout::new("/ref"),
            target_project: ProjectLayout::new("target"),
            claude: Default::default(),
            root: root.to_path_buf(),
        }
    }

    #[test]
    fn legacy_paths() {
        let c = config(Path::new("/work"));
        assert_eq!(
            search_form(&c, "Facility"),
            PathBuf::from("/legacy/UI/Forms/frmFacilitySearch.vb")
        );
        assert_eq!(
            detail_form(&c, "Facility"),
            PathBuf::from("/legacy/UI/Forms/frmFacilityDetail.vb")
        );
        assert_eq!(
            designer_file(&detail_form(&c, "Facility")),
            PathBuf::from("/legacy/UI/Forms/frmFacilityDetail.Designer.vb")
        );
        assert_eq!(
            business_object(&c, "Barge"),
            PathBuf::from("/legacy/BO/Barge.vb")
        );
        assert_eq!(
            list_class(&c, "Barge"),
            PathBuf::from("/legacy/Lists/BargeList.vb")
        );
    }

    #[test]
    fn project_paths() {
        let c = config(Path::new("/work"));
        assert_eq!(
            project_folder(&c, ProjectKind::Reference, ProjectFolder::Dtos),
            PathBuf::from("/ref/Models/DTOs")
        );
        assert_eq!(
            project_folder(&c, ProjectKind::Target, ProjectFolder::Javascript),
            PathBuf::from("/work/target/wwwroot/js")
        );
        assert_eq!(
            entity_views_dir(&c, ProjectKind::Target, "Facility"),
            PathBuf::from("/work/target/Views/Facility")
        );
        assert_eq!(
            master_plan(&c, "Facility"),
            Some(PathBuf::from("/work/plans/Facility-master-plan.md"))
        );
    }

    #[test]
    fn entity_extraction() {
        assert_eq!(
            extract_entity_name("frmFacilitySearch").as_deref(),
            Some("Facility")
        );
        assert_eq!(
            extract_entity_name("FRMBargeDETAIL").as_deref(),
            Some("Barge")
        );
        assert_eq!(
            extract_entity_name("frmBoatLocationDetail").as_deref(),
            Some("BoatLocation")
        );
        for bad in ["frmFacility", "Facility", "frmSearch", "xfrmFacilitySearch", ""] {
            assert!(extract_entity_name(bad).is_none(), "expected None: {bad}");
        }
    }

    #[test]
    fn entity_validation() {
        validate_entity("Facility").unwrap();
        validate_entity("Boat_Location2").unwrap();
        for bad in ["", "1abc", "../etc", "Fac ility"] {
            assert!(validate_entity(bad).is_err(), "expected invalid: {bad}");
        }
    }

    #[test]
    fn list_and_group_forms() {
        let dir = TempDir::new().unwrap();
        let mut c = config(dir.path());
        c.input_dir = PathBuf::from("legacy");
        let forms = forms_dir(&c);
        std::fs::create_dir_all(&forms).unwrap();
        for f in [
            "frmFacilitySearch.vb",
            "frmFacilitySearch.Designer.vb",
            "frmFacilityDetail.vb",
            "frmBarge.vb",
            "modHelpers.vb",
            "readme.txt",
        ] {
            std::fs::write(forms.join(f), "").unwrap();
        }

        let listed = list_forms(&c).unwrap();
        assert_eq!(
            listed,
            vec!["frmBarge", "frmFacilityDetail", "frmFacilitySearch"]
        );

        let groups = group_forms(&listed);
        assert_eq!(groups, list_entities(&c).unwrap());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].entity, "Barge");
        assert_eq!(groups[0].single.as_deref(), Some("frmBarge"));
        assert_eq!(groups[1].search.as_deref(), Some("frmFacilitySearch"));
        assert_eq!(groups[1].detail.as_deref(), Some("frmFacilityDetail"));
    }

    #[test]
    fn list_forms_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut c = config(dir.path());
        c.input_dir = PathBuf::from("nowhere");
        assert!(list_forms(&c).unwrap().is_empty());
    }
}
