use std::path::Path;
use vbconvert_core::audit::{self, EntityAudit};

use crate::output::print_json;

pub fn run(config_path: &Path, output: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let report = audit::audit(&super::output_root(&config, output))?;

    if json {
        return print_json(&report);
    }

    section("Completed", &report.completed);
    section("In progress", &report.in_progress);
    section("Failed", &report.failed);

    if !report.without_status.is_empty() {
        println!("No status document ({}):", report.without_status.len());
        for entity in &report.without_status {
            println!("  {entity}");
        }
        println!();
    }
    if !report.unreadable.is_empty() {
        println!("Unreadable status document ({}):", report.unreadable.len());
        for u in &report.unreadable {
            println!("  {}: {}", u.entity, u.error);
        }
        println!();
    }

    let missing: Vec<&EntityAudit> = report
        .entities()
        .filter(|e| !e.missing_outputs.is_empty())
        .collect();
    if missing.is_empty() {
        println!("No missing step output files.");
    } else {
        println!("Missing step output files ({}):", report.missing_output_count());
        for e in missing {
            for m in &e.missing_outputs {
                println!(
                    "  {}: step {} {} [{}] {}",
                    e.entity, m.step_number, m.name, m.status, m.output_file
                );
            }
        }
    }
    Ok(())
}

fn section(title: &str, entities: &[EntityAudit]) {
    if entities.is_empty() {
        return;
    }
    println!("{title} ({}):", entities.len());
    for e in entities {
        let failed = e
            .failed_step
            .map(|n| format!(", failed at step {n}"))
            .unwrap_or_default();
        println!(
            "  {}: {}/{} steps{}",
            e.entity, e.completed_steps, e.total_steps, failed
        );
    }
    println!();
}
