use std::path::Path;
use vbconvert_core::paths;
use vbconvert_core::status::ConversionStatus;
use vbconvert_core::ConvertError;

use crate::output::{print_json, print_table};

pub fn run(
    config_path: &Path,
    entity: Option<&str>,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let entity = super::require_entity(entity)?;
    let config = super::load_config(config_path)?;
    let dir = paths::entity_output_dir(&super::output_root(&config, output), entity);
    let status = ConversionStatus::load(&dir)?
        .ok_or_else(|| ConvertError::StatusNotFound(entity.to_string()))?;

    if json {
        return print_json(&status);
    }

    println!(
        "{} [{}] {}: {}/{} completed, {} skipped, {} failed",
        status.entity,
        status.mode,
        status.overall_status,
        status.completed_steps,
        status.total_steps,
        status.skipped_steps,
        status.failed_steps
    );
    if let Some(form) = &status.form_name {
        println!("form: {form}");
    }
    println!();

    let rows = status
        .steps
        .iter()
        .map(|s| {
            let output = match &s.output_file {
                Some(f) if !s.output_present(&dir) && s.status.expects_output() => {
                    format!("{f} (missing)")
                }
                Some(f) => f.clone(),
                None => "-".to_string(),
            };
            vec![
                s.step_number.to_string(),
                s.name.clone(),
                s.status.to_string(),
                output,
                s.exit_code.map(|c| c.to_string()).unwrap_or_default(),
                s.finished_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["#", "STEP", "STATUS", "OUTPUT", "EXIT", "FINISHED"], rows);
    Ok(())
}
