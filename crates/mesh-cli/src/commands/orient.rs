//! mesh orient command - search for the print orientation with least overhang.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_printcheck::orient_object;
use serde::Serialize;

use crate::load::load_object;
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct OrientInfo {
    path: String,
    improved: bool,
    evaluated: usize,
    overhangs_before: usize,
    overhangs_after: usize,
    min_angle_before_deg: f64,
    min_angle_after_deg: f64,
    /// Best rotation as `[w, x, y, z]`.
    quaternion: [f64; 4],
    /// Resulting world transform, row-major.
    matrix: [[f64; 4]; 4],
}

pub fn run(input: &Path, angle: f64, iterations: usize, cli: &Cli) -> Result<bool> {
    let mut object = load_object(input)?;

    let result = orient_object(&mut object, angle.to_radians(), iterations, true)
        .with_context(|| format!("Failed to orient {:?}", input))?;

    let q = result.best.rotation;
    let t = object.transform;
    let info = OrientInfo {
        path: input.display().to_string(),
        improved: result.improved(),
        evaluated: result.evaluated,
        overhangs_before: result.base.score.overhang_count,
        overhangs_after: result.best.score.overhang_count,
        min_angle_before_deg: result.base.score.min_angle.to_degrees(),
        min_angle_after_deg: result.best.score.min_angle.to_degrees(),
        quaternion: [q.w, q.i, q.j, q.k],
        matrix: std::array::from_fn(|r| std::array::from_fn(|c| t[(r, c)])),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Orientation".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("{}", result);
                if info.improved {
                    println!("  {}:", "Transform".cyan());
                    for row in &info.matrix {
                        println!(
                            "    [{:>9.5} {:>9.5} {:>9.5} {:>9.5}]",
                            row[0], row[1], row[2], row[3]
                        );
                    }
                } else {
                    println!("  {}", "Current orientation is already the best found".green());
                }
            }
        }
    }

    Ok(true)
}
