use std::path::Path;
use vbconvert_core::paths;
use vbconvert_core::scan;

use crate::output::{print_json, print_table};

pub fn run(config_path: &Path, children: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if let Some(form) = children {
        let path = paths::named_form(&config, form);
        if !path.exists() {
            anyhow::bail!("form not found: {}", path.display());
        }
        let result = scan::detect_child_forms_in_file(&path, Some(form))?;
        if json {
            return print_json(&result);
        }
        if result.matches.is_empty() {
            println!("{form} opens no other forms (heuristic scan)");
            return Ok(());
        }
        let rows = result
            .matches
            .iter()
            .map(|m| {
                vec![
                    m.form.clone(),
                    format!("{:?}", m.pattern),
                    m.line.to_string(),
                ]
            })
            .collect();
        print_table(&["FORM", "PATTERN", "LINE"], rows);
        println!("\nMatches are heuristic; verify against the source.");
        return Ok(());
    }

    let groups = paths::list_entities(&config)?;
    if json {
        return print_json(&groups);
    }
    if groups.is_empty() {
        println!("No forms found in {}", paths::forms_dir(&config).display());
        return Ok(());
    }
    let dash = || "-".to_string();
    let rows = groups
        .iter()
        .map(|g| {
            vec![
                g.entity.clone(),
                g.search.clone().unwrap_or_else(dash),
                g.detail.clone().unwrap_or_else(dash),
                g.single.clone().unwrap_or_else(dash),
            ]
        })
        .collect();
    print_table(&["ENTITY", "SEARCH", "DETAIL", "SINGLE"], rows);
    Ok(())
}
