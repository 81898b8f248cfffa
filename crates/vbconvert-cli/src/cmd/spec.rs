use anyhow::Context;
use serde_json::json;
use std::path::Path;
use vbconvert_core::paths;
use vbconvert_core::specgen::{self, SpecRequest};

use crate::output::{print_json, print_table};

pub fn run(
    config_path: &Path,
    entity: Option<&str>,
    master_plan: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let entity = super::require_entity(entity)?;
    paths::validate_entity(entity)?;
    let config = super::load_config(config_path)?;
    let entity_dir = paths::entity_output_dir(&super::output_root(&config, output), entity);

    let report = specgen::generate(&SpecRequest {
        config: &config,
        entity,
        entity_dir: &entity_dir,
        master_plan,
    })
    .with_context(|| format!("spec generation for '{entity}' failed"))?;

    if json {
        return print_json(&json!({
            "entity": entity,
            "mode": report.mode.as_str(),
            "masterPlan": report.master_plan,
            "gaps": report.gaps,
            "missingSections": report
                .missing_sections
                .iter()
                .map(|s| s.heading())
                .collect::<Vec<_>>(),
            "childForms": report.child_forms,
            "written": report.written,
        }));
    }

    println!("Generated {} files for {entity} ({} mode):", report.written.len(), report.mode);
    for path in &report.written {
        println!("  {}", path.display());
    }
    match &report.master_plan {
        Some(p) => println!("\nMaster plan: {}", p.display()),
        None => println!("\nNo master plan found"),
    }
    for missing in &report.missing_sections {
        println!("{} section not found in master plan", missing.heading());
    }
    if !report.gaps.is_empty() {
        println!();
        let rows = report
            .gaps
            .iter()
            .map(|g| {
                vec![
                    g.severity.to_string(),
                    g.gap_type.to_string(),
                    g.item.clone(),
                    g.description.clone(),
                ]
            })
            .collect();
        print_table(&["SEVERITY", "TYPE", "ITEM", "DESCRIPTION"], rows);
    }
    Ok(())
}
