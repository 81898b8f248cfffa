use serde::Serialize;
use std::path::{Path, PathBuf};
use vbconvert_core::paths::{self, ProjectFolder, ProjectKind};

use crate::output::{print_json, print_table};

#[derive(Serialize)]
struct ResolvedPath {
    group: &'static str,
    name: String,
    path: PathBuf,
    exists: bool,
}

pub fn run(config_path: &Path, entity: Option<&str>, json: bool) -> anyhow::Result<()> {
    let entity = super::require_entity(entity)?;
    paths::validate_entity(entity)?;
    let config = super::load_config(config_path)?;

    let mut resolved = Vec::new();
    let mut push = |group: &'static str, name: &str, path: PathBuf| {
        resolved.push(ResolvedPath {
            group,
            name: name.to_string(),
            exists: path.exists(),
            path,
        });
    };

    let search = paths::search_form(&config, entity);
    let detail = paths::detail_form(&config, entity);
    push("legacy", "search form", search.clone());
    push("legacy", "search designer", paths::designer_file(&search));
    push("legacy", "detail form", detail.clone());
    push("legacy", "detail designer", paths::designer_file(&detail));
    push("legacy", "single form", paths::single_form(&config, entity));
    push("legacy", "business object", paths::business_object(&config, entity));
    push("legacy", "list class", paths::list_class(&config, entity));

    for (group, kind) in [
        ("reference", ProjectKind::Reference),
        ("target", ProjectKind::Target),
    ] {
        for folder in ProjectFolder::all() {
            let path = match folder {
                ProjectFolder::Views => paths::entity_views_dir(&config, kind, entity),
                _ => paths::project_folder(&config, kind, *folder),
            };
            push(group, folder.as_str(), path);
        }
    }

    let out = paths::entity_output_dir(&config.output_root(), entity);
    push("output", "entity dir", out.clone());
    push("output", "status", paths::status_path(&out));
    push("output", "templates", paths::templates_dir(&out));
    push("output", "tasks", paths::tasks_dir(&out));
    if let Some(plan) = paths::master_plan(&config, entity) {
        push("output", "master plan", plan);
    }

    if json {
        return print_json(&resolved);
    }
    let rows = resolved
        .iter()
        .map(|r| {
            vec![
                r.group.to_string(),
                r.name.clone(),
                r.path.display().to_string(),
                if r.exists { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["GROUP", "NAME", "PATH", "EXISTS"], rows);
    Ok(())
}
