//! Implementation spec, quality checklist and task files for one entity,
//! rendered from its analysis JSON and the optional master plan.

use crate::analysis::{self, AnalysisBundle};
use crate::config::Config;
use crate::error::Result;
use crate::gaps::{self, Gap};
use crate::master_plan::{MasterPlan, PlanSection};
use crate::paths::{self, ProjectFolder, ProjectKind};
use crate::prompt;
use crate::scan::{self, ChildFormRef};
use crate::status::ConversionStatus;
use crate::steps;
use crate::types::ConversionMode;
use chrono::Utc;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lists longer than this are cut to "first N, M more".
pub const DISPLAY_LIMIT: usize = 10;

pub struct SpecRequest<'a> {
    pub config: &'a Config,
    pub entity: &'a str,
    pub entity_dir: &'a Path,
    /// Overrides the configured `{masterPlanDir}/{entity}-master-plan.md`.
    pub master_plan: Option<&'a Path>,
}

#[derive(Debug, Clone)]
pub struct SpecReport {
    pub mode: ConversionMode,
    pub master_plan: Option<PathBuf>,
    pub gaps: Vec<Gap>,
    /// Expected master plan sections that were not found. Empty without a plan.
    pub missing_sections: Vec<PlanSection>,
    pub child_forms: Vec<ChildFormRef>,
    pub written: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// Task catalogue
// ---------------------------------------------------------------------------

struct TaskDef {
    file: &'static str,
    title: &'static str,
    folder: Option<ProjectFolder>,
    inputs: &'static [&'static str],
    goal: &'static str,
    items: fn(&AnalysisBundle) -> Vec<String>,
}

const TASKS: &[TaskDef] = &[
    TaskDef {
        file: "01-dtos.md",
        title: "DTOs",
        folder: Some(ProjectFolder::Dtos),
        inputs: &[
            analysis::UI_MAPPING,
            analysis::FORM_STRUCTURE,
            analysis::FORM_STRUCTURE_DETAIL,
        ],
        goal: "Create request and response DTOs carrying every mapped field.",
        items: dto_items,
    },
    TaskDef {
        file: "02-repository.md",
        title: "Repository",
        folder: Some(ProjectFolder::Repositories),
        inputs: &[analysis::DATA_ACCESS],
        goal: "Wrap each stored procedure in a repository method.",
        items: repository_items,
    },
    TaskDef {
        file: "03-service.md",
        title: "Service",
        folder: Some(ProjectFolder::Services),
        inputs: &[analysis::BUSINESS_LOGIC, analysis::WORKFLOW],
        goal: "Move business rules out of the form code into a service.",
        items: service_items,
    },
    TaskDef {
        file: "04-controller.md",
        title: "Controller",
        folder: Some(ProjectFolder::Controllers),
        inputs: &[analysis::WORKFLOW, analysis::SECURITY],
        goal: "Expose each user action as a controller action with authorization.",
        items: controller_items,
    },
    TaskDef {
        file: "05-views.md",
        title: "Views",
        folder: Some(ProjectFolder::Views),
        inputs: &[
            analysis::FORM_STRUCTURE_SEARCH,
            analysis::FORM_STRUCTURE_DETAIL,
            analysis::FORM_STRUCTURE,
            analysis::TABS,
            analysis::UI_MAPPING,
        ],
        goal: "Build Razor views matching the legacy layout and tab order.",
        items: view_items,
    },
    TaskDef {
        file: "06-javascript.md",
        title: "JavaScript",
        folder: Some(ProjectFolder::Javascript),
        inputs: &[analysis::UI_MAPPING, analysis::WORKFLOW],
        goal: "Port client-side behaviour (grid events, dirty tracking, dialogs).",
        items: script_items,
    },
    TaskDef {
        file: "07-validation-security.md",
        title: "Validation and security",
        folder: None,
        inputs: &[analysis::VALIDATION, analysis::SECURITY],
        goal: "Carry every validation rule and permission check over.",
        items: guard_items,
    },
    TaskDef {
        file: "08-testing.md",
        title: "Testing",
        folder: None,
        inputs: &[analysis::BUSINESS_LOGIC, analysis::DATA_ACCESS],
        goal: "Cover each service and repository method with tests.",
        items: AnalysisBundle::procedure_names,
    },
];

fn dto_items(b: &AnalysisBundle) -> Vec<String> {
    b.names(analysis::UI_MAPPING, &["fields", "mappings", "controls"])
}

fn repository_items(b: &AnalysisBundle) -> Vec<String> {
    b.names(
        analysis::DATA_ACCESS,
        &["storedProcedures", "procedures", "queries"],
    )
}

fn service_items(b: &AnalysisBundle) -> Vec<String> {
    b.names(
        analysis::BUSINESS_LOGIC,
        &["procedures", "methods", "functions"],
    )
}

fn controller_items(b: &AnalysisBundle) -> Vec<String> {
    b.names(analysis::WORKFLOW, &["actions", "events", "workflows"])
}

fn view_items(b: &AnalysisBundle) -> Vec<String> {
    b.names(analysis::TABS, &["tabs"])
}

fn script_items(b: &AnalysisBundle) -> Vec<String> {
    b.names(analysis::UI_MAPPING, &["events", "clientEvents"])
}

fn guard_items(b: &AnalysisBundle) -> Vec<String> {
    let mut out = b.names(analysis::VALIDATION, &["rules", "validations"]);
    out.extend(b.names(analysis::SECURITY, &["permissions", "roles"]));
    out
}

/// File names written under `tasks/`.
pub fn task_files() -> Vec<&'static str> {
    TASKS.iter().map(|t| t.file).collect()
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

pub fn generate(req: &SpecRequest) -> Result<SpecReport> {
    let bundle = AnalysisBundle::load(req.entity_dir)?;
    let status = ConversionStatus::load(req.entity_dir)?;

    let inferred = steps::mode_from_markers(req.entity_dir);
    let recorded = status.as_ref().map(|s| s.mode);
    let mode = inferred.or(recorded).unwrap_or_default();
    let form_name = status.as_ref().and_then(|s| s.form_name.clone());

    let plan_path = req
        .master_plan
        .map(Path::to_path_buf)
        .or_else(|| paths::master_plan(req.config, req.entity));
    let plan = match &plan_path {
        Some(p) => crate::io::read_optional(p)?.map(|text| MasterPlan::parse(&text)),
        None => None,
    };
    let master_plan = plan_path.filter(|_| plan.is_some());

    let mut found_gaps = Vec::new();
    let mut missing_sections = Vec::new();
    if let Some(plan) = &plan {
        found_gaps = gaps::analyze(req.entity, form_name.as_deref(), plan, &bundle);
        missing_sections = plan.missing_sections();
        if !missing_sections.is_empty() {
            warn!(
                entity = req.entity,
                missing = missing_sections.len(),
                "master plan lacks expected sections"
            );
        }
    }
    if let Some(gap) = gaps::mode_inconsistency(recorded, inferred) {
        found_gaps.push(gap);
    }

    let child_forms = child_forms(req.config, req.entity, mode, form_name.as_deref())?;

    let ctx = RenderContext {
        config: req.config,
        entity: req.entity,
        mode,
        form_name: form_name.as_deref(),
        bundle: &bundle,
        plan: plan.as_ref(),
        gaps: &found_gaps,
        missing_sections: &missing_sections,
        child_forms: &child_forms,
    };

    crate::io::ensure_dir(&paths::tasks_dir(req.entity_dir))?;
    let mut written = Vec::new();

    let spec_path = req.entity_dir.join(paths::SPEC_FILE);
    crate::io::atomic_write(&spec_path, render_spec(&ctx).as_bytes())?;
    written.push(spec_path);

    let checklist_path = req.entity_dir.join(paths::CHECKLIST_FILE);
    crate::io::atomic_write(&checklist_path, render_checklist(&ctx).as_bytes())?;
    written.push(checklist_path);

    for task in TASKS {
        let path = paths::tasks_dir(req.entity_dir).join(task.file);
        crate::io::atomic_write(&path, render_task(&ctx, task).as_bytes())?;
        debug!(file = task.file, "wrote task");
        written.push(path);
    }

    info!(
        entity = req.entity,
        mode = %mode,
        gaps = found_gaps.len(),
        "generated implementation spec"
    );

    Ok(SpecReport {
        mode,
        master_plan,
        gaps: found_gaps,
        missing_sections,
        child_forms,
        written,
    })
}

/// Child forms opened from the entity's legacy form code.
fn child_forms(
    config: &Config,
    entity: &str,
    mode: ConversionMode,
    form_name: Option<&str>,
) -> Result<Vec<ChildFormRef>> {
    let forms: Vec<PathBuf> = match mode {
        ConversionMode::SearchDetail => vec![
            paths::search_form(config, entity),
            paths::detail_form(config, entity),
        ],
        ConversionMode::SingleForm => vec![match form_name {
            Some(f) => paths::named_form(config, f),
            None => paths::single_form(config, entity),
        }],
    };

    let mut seen: HashSet<String> = forms
        .iter()
        .filter_map(|p| p.file_stem())
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .collect();
    let mut out = Vec::new();
    for form in &forms {
        let scanned = scan::detect_child_forms_in_file(form, None)?;
        for found in scanned.matches {
            if seen.insert(found.form.to_ascii_lowercase()) {
                out.push(found);
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

struct RenderContext<'a> {
    config: &'a Config,
    entity: &'a str,
    mode: ConversionMode,
    form_name: Option<&'a str>,
    bundle: &'a AnalysisBundle,
    plan: Option<&'a MasterPlan>,
    gaps: &'a [Gap],
    missing_sections: &'a [PlanSection],
    child_forms: &'a [ChildFormRef],
}

/// Markdown bullets, cut after `limit` items with a trailing count.
pub fn bullets(items: &[String], limit: usize) -> String {
    if items.is_empty() {
        return "- _none found_\n".to_string();
    }
    let mut out = String::new();
    for item in items.iter().take(limit) {
        let _ = writeln!(out, "- {item}");
    }
    if items.len() > limit {
        let _ = writeln!(out, "- ...and {} more", items.len() - limit);
    }
    out
}

fn checkboxes(items: &[String], limit: usize) -> String {
    let mut out = String::new();
    for item in items.iter().take(limit) {
        let _ = writeln!(out, "- [ ] {item}");
    }
    if items.len() > limit {
        let _ = writeln!(out, "- [ ] ...and {} more", items.len() - limit);
    }
    out
}

/// Target files the conversion produces, paired with the reference folder
/// they should imitate.
fn target_files(config: &Config, entity: &str) -> Vec<(ProjectFolder, PathBuf, PathBuf)> {
    let file = |folder: ProjectFolder| -> PathBuf {
        let dir = paths::project_folder(config, ProjectKind::Target, folder);
        match folder {
            ProjectFolder::Dtos => dir.join(format!("{entity}Dto.cs")),
            ProjectFolder::Repositories => dir.join(format!("{entity}Repository.cs")),
            ProjectFolder::Services => dir.join(format!("{entity}Service.cs")),
            ProjectFolder::Controllers => dir.join(format!("{entity}Controller.cs")),
            ProjectFolder::Views => dir.join(entity),
            ProjectFolder::Javascript => dir.join(format!("{}.js", entity.to_ascii_lowercase())),
        }
    };
    ProjectFolder::all()
        .iter()
        .map(|f| {
            (
                *f,
                file(*f),
                paths::project_folder(config, ProjectKind::Reference, *f),
            )
        })
        .collect()
}

fn render_spec(ctx: &RenderContext) -> String {
    let b = ctx.bundle;
    let mut out = String::new();
    let _ = writeln!(out, "# {} conversion specification\n", ctx.entity);
    let _ = writeln!(out, "- Mode: {}", ctx.mode);
    if let Some(form) = ctx.form_name {
        let _ = writeln!(out, "- Form: {form}");
    }
    let _ = writeln!(out, "- Generated: {}\n", Utc::now().to_rfc3339());

    out.push_str("## Legacy sources\n\n");
    for src in prompt::source_files(ctx.config, ctx.entity, ctx.mode, ctx.form_name) {
        let _ = writeln!(out, "- {}: `{}`", src.label, src.path.display());
    }

    out.push_str("\n## Target files\n\n| Layer | Target | Reference |\n|-------|--------|-----------|\n");
    for (folder, target, reference) in target_files(ctx.config, ctx.entity) {
        let _ = writeln!(
            out,
            "| {} | `{}` | `{}` |",
            folder.as_str(),
            target.display(),
            reference.display()
        );
    }

    out.push_str("\n## Analysis coverage\n\n");
    let loaded: Vec<String> = b.loaded_files().iter().map(|s| s.to_string()).collect();
    let _ = writeln!(out, "Loaded:\n\n{}", bullets(&loaded, DISPLAY_LIMIT));
    let missing: Vec<String> = b
        .missing_files()
        .iter()
        .filter(|f| !not_applicable(ctx.mode, f))
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        let _ = writeln!(out, "Missing:\n\n{}", bullets(&missing, DISPLAY_LIMIT));
    }

    let controls: usize = [
        analysis::FORM_STRUCTURE,
        analysis::FORM_STRUCTURE_SEARCH,
        analysis::FORM_STRUCTURE_DETAIL,
    ]
    .iter()
    .map(|f| analysis::count_items(b.get(f), &["controls"]))
    .sum();
    let _ = writeln!(out, "## Form structure\n\n- Controls: {controls}");
    let tabs = view_items(b);
    let _ = writeln!(out, "- Tabs: {}\n", tabs.len());
    if !tabs.is_empty() {
        out.push_str(&bullets(&tabs, DISPLAY_LIMIT));
        out.push('\n');
    }

    section(&mut out, "Business logic", &service_items(b));
    section(&mut out, "Data access", &repository_items(b));
    section(
        &mut out,
        "Validation rules",
        &b.names(analysis::VALIDATION, &["rules", "validations"]),
    );
    section(
        &mut out,
        "Security",
        &b.names(analysis::SECURITY, &["permissions", "roles"]),
    );
    section(
        &mut out,
        "Related entities",
        &b.names(analysis::RELATED_ENTITIES, &["relatedEntities", "entities"]),
    );

    out.push_str("## Child forms\n\n");
    if ctx.child_forms.is_empty() {
        out.push_str("- _none detected_\n");
    } else {
        let forms: Vec<String> = ctx
            .child_forms
            .iter()
            .map(|c| format!("{} (line {})", c.form, c.line))
            .collect();
        out.push_str(&bullets(&forms, DISPLAY_LIMIT));
    }
    out.push_str("\nDetected heuristically from the form code; verify before converting.\n\n");

    out.push_str("## Master plan gaps\n\n");
    if ctx.plan.is_none() {
        out.push_str("No master plan found. Gap analysis was skipped.\n");
    }
    for missing in ctx.missing_sections {
        let _ = writeln!(
            out,
            "- {} section not found in master plan",
            missing.heading()
        );
    }
    if !ctx.missing_sections.is_empty() {
        out.push('\n');
    }
    if ctx.gaps.is_empty() {
        if ctx.plan.is_some() && ctx.missing_sections.len() < PlanSection::ALL.len() {
            out.push_str("No gaps found in the sections present.\n");
        }
    } else {
        out.push_str("| Type | Item | Severity | Description |\n|------|------|----------|-------------|\n");
        for gap in ctx.gaps {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                gap.gap_type, gap.item, gap.severity, gap.description
            );
        }
    }

    out.push_str("\n## Tasks\n\n");
    for task in TASKS {
        let _ = writeln!(out, "- [{}]({}/{})", task.title, paths::TASKS_DIR, task.file);
    }
    out
}

fn section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "## {title}\n\n{}", bullets(items, DISPLAY_LIMIT));
}

/// Analysis files that the mode never produces.
fn not_applicable(mode: ConversionMode, file: &str) -> bool {
    match mode {
        ConversionMode::SingleForm => {
            file == analysis::FORM_STRUCTURE_SEARCH || file == analysis::FORM_STRUCTURE_DETAIL
        }
        ConversionMode::SearchDetail => file == analysis::FORM_STRUCTURE,
    }
}

fn render_checklist(ctx: &RenderContext) -> String {
    let b = ctx.bundle;
    let mut out = format!("# {} quality checklist\n\n", ctx.entity);

    out.push_str("## Structure\n\n");
    for (folder, target, _) in target_files(ctx.config, ctx.entity) {
        let _ = writeln!(out, "- [ ] {} exists: `{}`", folder.as_str(), target.display());
    }

    let procs: Vec<String> = b
        .procedure_names()
        .into_iter()
        .map(|p| format!("`{p}` has a repository or service method"))
        .collect();
    if !procs.is_empty() {
        out.push_str("\n## Behaviour\n\n");
        out.push_str(&checkboxes(&procs, DISPLAY_LIMIT));
    }

    let rules: Vec<String> = b
        .names(analysis::VALIDATION, &["rules", "validations"])
        .into_iter()
        .map(|r| format!("Validation enforced server-side: {r}"))
        .collect();
    let perms: Vec<String> = b
        .names(analysis::SECURITY, &["permissions", "roles"])
        .into_iter()
        .map(|p| format!("Authorization check: {p}"))
        .collect();
    if !rules.is_empty() || !perms.is_empty() {
        out.push_str("\n## Validation and security\n\n");
        out.push_str(&checkboxes(&rules, DISPLAY_LIMIT));
        out.push_str(&checkboxes(&perms, DISPLAY_LIMIT));
    }

    let tabs: Vec<String> = view_items(b)
        .into_iter()
        .map(|t| format!("Tab rendered: {t}"))
        .collect();
    out.push_str("\n## UI\n\n");
    out.push_str(&checkboxes(&tabs, DISPLAY_LIMIT));
    out.push_str("- [ ] Layout matches the reference project views\n");
    out.push_str("- [ ] No inline SQL in controllers or views\n");

    if !ctx.gaps.is_empty() {
        let gaps: Vec<String> = ctx
            .gaps
            .iter()
            .map(|g| format!("Resolve {} gap ({}): {}", g.gap_type, g.severity, g.item))
            .collect();
        out.push_str("\n## Master plan\n\n");
        out.push_str(&checkboxes(&gaps, DISPLAY_LIMIT));
    }
    out
}

fn render_task(ctx: &RenderContext, task: &TaskDef) -> String {
    let mut out = format!("# {}: {}\n\n{}\n\n", ctx.entity, task.title, task.goal);

    if let Some(folder) = task.folder {
        let targets = target_files(ctx.config, ctx.entity);
        if let Some((_, target, reference)) = targets.iter().find(|(f, _, _)| *f == folder) {
            let _ = writeln!(out, "- Target: `{}`", target.display());
            let _ = writeln!(out, "- Follow the patterns in: `{}`\n", reference.display());
        }
    }

    out.push_str("## Inputs\n\n");
    for input in task.inputs {
        if ctx.bundle.has(input) {
            let _ = writeln!(out, "- {input}");
        } else if !not_applicable(ctx.mode, input) {
            let _ = writeln!(out, "- {input} (missing)");
        }
    }

    out.push_str("\n## Items\n\n");
    out.push_str(&checkboxes_or_none(&(task.items)(ctx.bundle)));
    out
}

fn checkboxes_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "- _none found in analysis_\n".to_string()
    } else {
        checkboxes(items, DISPLAY_LIMIT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectLayout;
    use tempfile::TempDir;

    fn config(root: &Path) -> Config {
        Config {
            input_dir: root.join("legacy"),
            forms_path: "Forms".into(),
            business_objects_path: "BO".into(),
            lists_path: "Lists".into(),
            output_dir: PathBuf::from("output"),
            prompts_dir: PathBuf::from("prompts"),
            master_plan_dir: Some(PathBuf::from("plans")),
            reference_project: ProjectLayout::new("/ref"),
            target_project: ProjectLayout::new("/target"),
            claude: Default::default(),
            root: root.to_path_buf(),
        }
    }

    fn entity_dir(root: &Path) -> PathBuf {
        let dir = root.join("output/Facility");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bullets_truncate_after_limit() {
        let items: Vec<String> = (1..=13).map(|i| format!("item{i}")).collect();
        let out = bullets(&items, DISPLAY_LIMIT);
        assert!(out.contains("- item10\n"));
        assert!(!out.contains("item11"));
        assert!(out.ends_with("- ...and 3 more\n"));
        assert_eq!(bullets(&[], 10), "- _none found_\n");
    }

    #[test]
    fn writes_spec_checklist_and_all_tasks() {
        let dir = TempDir::new().unwrap();
        let c = config(dir.path());
        let out = entity_dir(dir.path());
        std::fs::write(out.join(analysis::FORM_STRUCTURE_SEARCH), r#"{"controls":[1,2]}"#)
            .unwrap();
        std::fs::write(
            out.join(analysis::DATA_ACCESS),
            r#"{"storedProcedures":["usp_Facility_Search"]}"#,
        )
        .unwrap();

        let report = generate(&SpecRequest {
            config: &c,
            entity: "Facility",
            entity_dir: &out,
            master_plan: None,
        })
        .unwrap();

        assert_eq!(report.mode, ConversionMode::SearchDetail);
        assert!(report.master_plan.is_none());
        assert_eq!(report.written.len(), 2 + 8);
        for file in task_files() {
            assert!(out.join("tasks").join(file).exists(), "{file}");
        }
        assert!(out.join("tasks/08-testing.md").exists());

        let spec = std::fs::read_to_string(out.join("spec.md")).unwrap();
        assert!(spec.contains("No master plan found"));
        assert!(spec.contains("- Controls: 2"));
        assert!(spec.contains("/target/Controllers/FacilityController.cs"));
        assert!(spec.contains("- usp_Facility_Search"));

        let repo = std::fs::read_to_string(out.join("tasks/02-repository.md")).unwrap();
        assert!(repo.contains("- [ ] usp_Facility_Search"));
        assert!(repo.contains("`/ref/Repositories`"));
    }

    #[test]
    fn master_plan_gaps_and_child_forms_are_reported() {
        let dir = TempDir::new().unwrap();
        let c = config(dir.path());
        let out = entity_dir(dir.path());
        std::fs::write(out.join(analysis::FORM_STRUCTURE_SEARCH), "{}").unwrap();
        std::fs::write(out.join(analysis::FORM_STRUCTURE_DETAIL), "{}").unwrap();

        std::fs::create_dir_all(dir.path().join("plans")).unwrap();
        std::fs::write(
            dir.path().join("plans/Facility-master-plan.md"),
            "## FORMS TO CONVERT\n- frmFacilitySearch\n- frmFacilityDetail\n- frmFacilityAudit\n",
        )
        .unwrap();

        let forms = dir.path().join("legacy/Forms");
        std::fs::create_dir_all(&forms).unwrap();
        std::fs::write(
            forms.join("frmFacilitySearch.vb"),
            "Dim f As New frmFacilityDetail\nf.Show()\n",
        )
        .unwrap();
        std::fs::write(
            forms.join("frmFacilityDetail.vb"),
            "frmLocationPicker.ShowDialog(Me)\n",
        )
        .unwrap();

        let report = generate(&SpecRequest {
            config: &c,
            entity: "Facility",
            entity_dir: &out,
            master_plan: None,
        })
        .unwrap();

        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].item, "frmFacilityAudit");
        let children: Vec<&str> = report.child_forms.iter().map(|c| c.form.as_str()).collect();
        assert_eq!(children, vec!["frmLocationPicker"]);

        let spec = std::fs::read_to_string(out.join("spec.md")).unwrap();
        assert!(spec.contains("| form | frmFacilityAudit | high |"));
        assert!(spec.contains("frmLocationPicker (line 1)"));
        let checklist = std::fs::read_to_string(out.join("quality-checklist.md")).unwrap();
        assert!(checklist.contains("Resolve form gap (high): frmFacilityAudit"));
    }

    #[test]
    fn marker_mode_disagreeing_with_status_is_an_inconsistency() {
        let dir = TempDir::new().unwrap();
        let c = config(dir.path());
        let out = entity_dir(dir.path());
        ConversionStatus::new("Facility", None, ConversionMode::SearchDetail)
            .save(&out)
            .unwrap();
        std::fs::write(out.join(analysis::FORM_STRUCTURE), "{}").unwrap();

        let report = generate(&SpecRequest {
            config: &c,
            entity: "Facility",
            entity_dir: &out,
            master_plan: Some(&dir.path().join("nowhere.md")),
        })
        .unwrap();

        assert_eq!(report.mode, ConversionMode::SingleForm);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].gap_type, gaps::GapType::Inconsistency);
        let spec = std::fs::read_to_string(out.join("spec.md")).unwrap();
        assert!(spec.contains("No master plan found"));
        assert!(spec.contains("| inconsistency | mode | low |"));
    }

    #[test]
    fn plan_without_expected_sections_is_not_clean() {
        let dir = TempDir::new().unwrap();
        let c = config(dir.path());
        let out = entity_dir(dir.path());
        let plan = dir.path().join("facility-plan.md");
        std::fs::write(
            &plan,
            "# Facility plan\n\nForms: frmFacilitySearch, frmFacilityPurge\n",
        )
        .unwrap();

        let report = generate(&SpecRequest {
            config: &c,
            entity: "Facility",
            entity_dir: &out,
            master_plan: Some(&plan),
        })
        .unwrap();

        assert_eq!(report.master_plan.as_deref(), Some(plan.as_path()));
        assert!(report.gaps.is_empty());
        assert_eq!(report.missing_sections, PlanSection::ALL.to_vec());

        let spec = std::fs::read_to_string(out.join("spec.md")).unwrap();
        assert!(spec.contains("- FORMS TO CONVERT section not found in master plan"));
        assert!(spec.contains("- FEATURES section not found in master plan"));
        assert!(!spec.contains("No gaps found"));
    }

    #[test]
    fn malformed_analysis_aborts() {
        let dir = TempDir::new().unwrap();
        let c = config(dir.path());
        let out = entity_dir(dir.path());
        std::fs::write(out.join(analysis::TABS), "{not json").unwrap();
        let err = generate(&SpecRequest {
            config: &c,
            entity: "Facility",
            entity_dir: &out,
            master_plan: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("tabs.json"));
        assert!(!out.join("spec.md").exists());
    }
}
