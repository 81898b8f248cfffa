//! Prompt composition: per-step instructions from the prompts directory plus
//! the shared architecture reference, with entity placeholders filled in.

use crate::config::Config;
use crate::error::Result;
use crate::paths::{self, ProjectKind};
use crate::steps::{self, StepDefinition};
use crate::types::ConversionMode;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// Passed as `--system-prompt`.
    pub system: String,
    /// Passed as the positional prompt argument.
    pub user: String,
}

/// A legacy source file the step should read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub label: &'static str,
    pub path: PathBuf,
}

/// Legacy files relevant to `entity` under the given mode.
pub fn source_files(
    config: &Config,
    entity: &str,
    mode: ConversionMode,
    form_name: Option<&str>,
) -> Vec<SourceFile> {
    let mut files = Vec::new();
    match mode {
        ConversionMode::SearchDetail => {
            let search = paths::search_form(config, entity);
            let detail = paths::detail_form(config, entity);
            files.push(SourceFile {
                label: "search form designer",
                path: paths::designer_file(&search),
            });
            files.push(SourceFile {
                label: "search form",
                path: search,
            });
            files.push(SourceFile {
                label: "detail form designer",
                path: paths::designer_file(&detail),
            });
            files.push(SourceFile {
                label: "detail form",
                path: detail,
            });
        }
        ConversionMode::SingleForm => {
            let form = match form_name {
                Some(name) => paths::named_form(config, name),
                None => paths::single_form(config, entity),
            };
            files.push(SourceFile {
                label: "form designer",
                path: paths::designer_file(&form),
            });
            files.push(SourceFile {
                label: "form",
                path: form,
            });
        }
    }
    files.push(SourceFile {
        label: "business object",
        path: paths::business_object(config, entity),
    });
    files.push(SourceFile {
        label: "list class",
        path: paths::list_class(config, entity),
    });
    files
}

/// Build the system and user prompts for one step.
pub fn compose(
    config: &Config,
    entity: &str,
    mode: ConversionMode,
    form_name: Option<&str>,
    step: &StepDefinition,
    entity_dir: &Path,
) -> Result<ComposedPrompt> {
    let prompts = config.prompts_root();
    let sources = source_files(config, entity, mode, form_name);
    let output_path = step.output_file.map(|f| entity_dir.join(f));

    let mut vars: Vec<(&str, String)> = vec![
        ("entity", entity.to_string()),
        ("outputDir", entity_dir.display().to_string()),
        (
            "outputFile",
            output_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        ),
        (
            "searchForm",
            paths::search_form(config, entity).display().to_string(),
        ),
        (
            "detailForm",
            paths::detail_form(config, entity).display().to_string(),
        ),
        (
            "singleForm",
            paths::single_form(config, entity).display().to_string(),
        ),
        (
            "businessObject",
            paths::business_object(config, entity).display().to_string(),
        ),
        (
            "listClass",
            paths::list_class(config, entity).display().to_string(),
        ),
        (
            "referenceRoot",
            paths::project_root(config, ProjectKind::Reference)
                .display()
                .to_string(),
        ),
        (
            "targetRoot",
            paths::project_root(config, ProjectKind::Target)
                .display()
                .to_string(),
        ),
    ];
    if let Some(form) = form_name {
        vars.push(("formName", form.to_string()));
    }

    let step_prompt = crate::io::read_optional(&prompts.join(format!("{}.md", step.key)))?
        .unwrap_or_else(|| fallback_system_prompt(step));
    let mut system = substitute(&step_prompt, &vars);

    let shared = prompts
        .join(paths::SHARED_PROMPTS_DIR)
        .join(paths::ARCHITECTURE_PROMPT);
    if let Some(patterns) = crate::io::read_optional(&shared)? {
        system.push_str("\n\n---\n\n# Architecture patterns\n\n");
        system.push_str(&substitute(&patterns, &vars));
    }

    let user = user_prompt(entity, mode, step, entity_dir, &sources, output_path.as_deref());
    Ok(ComposedPrompt { system, user })
}

/// Replace `{{name}}` placeholders. Unknown placeholders are left as-is.
pub fn substitute(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

fn fallback_system_prompt(step: &StepDefinition) -> String {
    format!(
        "You are converting the legacy VB.NET Windows Forms entity {{{{entity}}}} to ASP.NET Core MVC.\n\n\
         {}\n\n\
         Only read the legacy sources and earlier analysis files. Write your result to {{{{outputFile}}}}.",
        step.instruction
    )
}

fn user_prompt(
    entity: &str,
    mode: ConversionMode,
    step: &StepDefinition,
    entity_dir: &Path,
    sources: &[SourceFile],
    output_path: Option<&Path>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Entity: {entity}");
    let _ = writeln!(out, "Step {}: {}", step.number, step.name);
    let _ = writeln!(out, "\n{}", step.instruction);

    let _ = writeln!(out, "\nLegacy sources:");
    for src in sources {
        let _ = writeln!(out, "- {}: {}", src.label, src.path.display());
    }

    let earlier: Vec<&str> = steps::catalogue(mode)
        .iter()
        .take_while(|s| s.number < step.number)
        .filter_map(|s| s.output_file)
        .filter(|f| entity_dir.join(f).exists())
        .collect();
    if !earlier.is_empty() {
        let _ = writeln!(
            out,
            "\nEarlier analysis available in {}:",
            entity_dir.display()
        );
        for f in earlier {
            let _ = writeln!(out, "- {f}");
        }
    }

    if let Some(p) = output_path {
        let _ = writeln!(out, "\nWrite the output to: {}", p.display());
    }
    out
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
            input_dir: PathBuf::from("/legacy"),
            forms_path: "Forms".into(),
            business_objects_path: "BO".into(),
            lists_path: "Lists".into(),
            output_dir: PathBuf::from("output"),
            prompts_dir: PathBuf::from("prompts"),
            master_plan_dir: None,
            reference_project: ProjectLayout::new("/ref"),
            target_project: ProjectLayout::new("/target"),
            claude: Default::default(),
            root: root.to_path_buf(),
        }
    }

    #[test]
    fn substitute_replaces_known_placeholders_only() {
        let vars = vec![("entity", "Facility".to_string())];
        assert_eq!(
            substitute("{{entity}} and {{other}}", &vars),
            "Facility and {{other}}"
        );
    }

    #[test]
    fn prompt_file_and_shared_patterns_are_combined() {
        let dir = TempDir::new().unwrap();
        let c = config(dir.path());
        let prompts = c.prompts_root();
        std::fs::create_dir_all(prompts.join("shared")).unwrap();
        std::fs::write(
            prompts.join("extract-business-logic.md"),
            "Analyze {{entity}} from {{businessObject}}",
        )
        .unwrap();
        std::fs::write(
            prompts.join("shared/architecture-patterns.md"),
            "Controllers live in {{targetRoot}}",
        )
        .unwrap();

        let entity_dir = dir.path().join("output/Facility");
        std::fs::create_dir_all(&entity_dir).unwrap();
        std::fs::write(entity_dir.join("form-structure-search.json"), "{}").unwrap();

        let step = steps::find_step(ConversionMode::SearchDetail, 4).unwrap();
        let p = compose(&c, "Facility", ConversionMode::SearchDetail, None, step, &entity_dir)
            .unwrap();

        assert!(p.system.starts_with("Analyze Facility from /legacy/BO/Facility.vb"));
        assert!(p.system.contains("# Architecture patterns"));
        assert!(p.system.contains("Controllers live in /target"));
        assert!(p.user.contains("Step 4: Extract business logic"));
        assert!(p.user.contains("/legacy/Forms/frmFacilitySearch.vb"));
        assert!(p.user.contains("- form-structure-search.json"));
        assert!(!p.user.contains("- form-structure-detail.json"));
        assert!(p.user.contains("business-logic.json"));
    }

    #[test]
    fn missing_prompt_file_falls_back_to_instruction() {
        let dir = TempDir::new().unwrap();
        let c = config(dir.path());
        let step = steps::find_step(ConversionMode::SingleForm, 1).unwrap();
        let p = compose(
            &c,
            "Barge",
            ConversionMode::SingleForm,
            Some("frmBargeMaint"),
            step,
            dir.path(),
        )
        .unwrap();
        assert!(p.system.contains("legacy VB.NET Windows Forms entity Barge"));
        assert!(!p.system.contains("Architecture patterns"));
        assert!(p.user.contains("/legacy/Forms/frmBargeMaint.vb"));
        assert!(p.user.contains("/legacy/Forms/frmBargeMaint.Designer.vb"));
    }
}
