//! mesh check command - run print checks.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_printcheck::{CheckConfig, CheckKind, check_source};
use serde::Serialize;

use crate::load::load_object;
use crate::{Cli, OutputFormat, ThresholdArgs, output};

#[derive(Serialize)]
struct CheckResultInfo {
    path: String,
    clean: bool,
    flagged: usize,
    entries: Vec<EntryInfo>,
}

#[derive(Serialize)]
struct EntryInfo {
    check: CheckKind,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    count: usize,
    indices: Vec<u32>,
}

/// Start from the config file, if any, then apply command-line overrides.
fn build_config(config_path: Option<&Path>, thresholds: &ThresholdArgs) -> Result<CheckConfig> {
    let mut config = match config_path {
        Some(path) => CheckConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => CheckConfig::default(),
    };

    if let Some(v) = thresholds.threshold_zero {
        config.threshold_zero = v;
    }
    if let Some(v) = thresholds.angle_nonplanar {
        config.angle_nonplanar = v.to_radians();
    }
    if let Some(v) = thresholds.thickness_min {
        config.thickness_min = v;
    }
    if let Some(v) = thresholds.angle_sharp {
        config.angle_sharp = v.to_radians();
    }
    if let Some(v) = thresholds.angle_overhang {
        config.angle_overhang = v.to_radians();
    }
    if thresholds.triangulate {
        config.triangulate = true;
    }

    config.validate()?;
    Ok(config)
}

pub fn run(
    input: &Path,
    only: &[CheckKind],
    config_path: Option<&Path>,
    thresholds: &ThresholdArgs,
    list: bool,
    cli: &Cli,
) -> Result<bool> {
    let config = build_config(config_path, thresholds)?;
    let object = load_object(input)?;

    let kinds: Vec<CheckKind> = if only.is_empty() {
        CheckKind::all().to_vec()
    } else {
        only.to_vec()
    };
    let report = check_source(&object, &config, &kinds)
        .with_context(|| format!("Failed to check {:?}", input))?;

    let result = CheckResultInfo {
        path: input.display().to_string(),
        clean: report.is_clean(),
        flagged: report.flagged_count(),
        entries: report
            .entries()
            .iter()
            .map(|e| EntryInfo {
                check: e.kind,
                label: e.label().to_string(),
                kind: e.finding.kind().map(|k| k.to_string()),
                count: e.finding.len(),
                indices: e.finding.indices().to_vec(),
            })
            .collect(),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Print Check".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());

                for entry in &result.entries {
                    if entry.kind.is_none() {
                        println!("  {}", entry.label.dimmed());
                        continue;
                    }
                    println!("  {}: {}", entry.label.cyan(), output::count(entry.count));
                    if list && entry.count > 0 {
                        println!("    {}", output::index_list(&entry.indices, 20));
                    }
                }

                if result.clean {
                    println!("  {}: {}", "Status".cyan(), "Printable".green().bold());
                } else {
                    println!(
                        "  {}: {} ({} elements flagged)",
                        "Status".cyan(),
                        "Issues found".red().bold(),
                        result.flagged
                    );
                }
            }
        }
    }

    Ok(result.clean)
}
