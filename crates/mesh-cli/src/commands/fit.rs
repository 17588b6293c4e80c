//! mesh fit command - compare the mesh size against a build volume.

use std::path::Path;

use anyhow::{Result, bail};
use colored::Colorize;
use mesh_printcheck::measure::{Axis, bounds_lengths};
use mesh_printcheck::{BuildOptions, build, check_bed_fit};
use nalgebra::Vector3;
use serde::Serialize;

use crate::load::load_object;
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct FitInfo {
    path: String,
    fits: bool,
    bed: [f64; 3],
    size: [f64; 3],
    overflow_axes: Vec<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<f64>,
    scaled_size: [f64; 3],
}

pub fn run(input: &Path, bed: &[f64], auto_scale: bool, cli: &Cli) -> Result<bool> {
    let &[x, y, z] = bed else {
        bail!("--bed takes exactly three values, got {}", bed.len());
    };
    let bed = Vector3::new(x, y, z);

    let object = load_object(input)?;
    let mesh = build(&object, &BuildOptions::default())?;
    let lengths = bounds_lengths(&mesh);
    let fit = check_bed_fit(&lengths, &bed, auto_scale)?;

    let info = FitInfo {
        path: input.display().to_string(),
        fits: fit.fits,
        bed: [x, y, z],
        size: [lengths.x, lengths.y, lengths.z],
        overflow_axes: fit.overflow_axes,
        scale: fit.scale_applied,
        scaled_size: fit.lengths,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Build Volume".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!(
                    "  {}: {:.2} x {:.2} x {:.2}",
                    "Object".cyan(),
                    info.size[0],
                    info.size[1],
                    info.size[2]
                );
                println!(
                    "  {}: {:.2} x {:.2} x {:.2}",
                    "Bed".cyan(),
                    info.bed[0],
                    info.bed[1],
                    info.bed[2]
                );
                if !info.overflow_axes.is_empty() {
                    let axes: Vec<String> =
                        info.overflow_axes.iter().map(|a| a.to_string()).collect();
                    println!("  {}: {}", "Too large on".yellow(), axes.join(", "));
                }
                if let Some(scale) = info.scale {
                    println!(
                        "  {}: {:.4} ({:.2} x {:.2} x {:.2})",
                        "Scale".cyan(),
                        scale,
                        info.scaled_size[0],
                        info.scaled_size[1],
                        info.scaled_size[2]
                    );
                }
                if info.fits {
                    println!("  {}: {}", "Status".cyan(), "Fits".green().bold());
                } else {
                    println!("  {}: {}", "Status".cyan(), "Does not fit".red().bold());
                }
            }
        }
    }

    Ok(info.fits)
}
