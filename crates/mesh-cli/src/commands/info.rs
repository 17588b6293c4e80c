//! mesh info command - display mesh statistics.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use mesh_printcheck::measure::MeshStats;
use mesh_printcheck::units::{format_area, format_length, format_volume};
use mesh_printcheck::{BuildOptions, LengthUnit, UnitSettings, UnitSystem, build};
use serde::Serialize;

use crate::load::load_object;
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct MeshInfo {
    path: String,
    vertices: usize,
    edges: usize,
    faces: usize,
    triangles: usize,
    solid: bool,
    bounds: BoundsInfo,
    volume: f64,
    surface_area: f64,
    display: DisplayInfo,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: [f64; 3],
}

/// Values formatted in the requested units.
#[derive(Serialize)]
struct DisplayInfo {
    volume: String,
    surface_area: String,
    dimensions: [String; 3],
}

pub fn run(
    input: &Path,
    system: UnitSystem,
    length_unit: LengthUnit,
    scale_length: f64,
    cli: &Cli,
) -> Result<bool> {
    let object = load_object(input)?;
    let mesh = build(&object, &BuildOptions::default())?;

    let units = UnitSettings {
        system,
        length_unit,
        scale_length,
    };
    let stats = MeshStats::of(&mesh);
    let (min, max) = mesh.bounds();

    let info = MeshInfo {
        path: input.display().to_string(),
        vertices: mesh.vertex_count(),
        edges: mesh.edge_count(),
        faces: mesh.face_count(),
        triangles: mesh.triangle_count(),
        solid: mesh.is_solid(),
        bounds: BoundsInfo {
            min: [min.x, min.y, min.z],
            max: [max.x, max.y, max.z],
            dimensions: stats.lengths,
        },
        volume: stats.volume,
        surface_area: stats.area,
        display: DisplayInfo {
            volume: format_volume(stats.volume, &units),
            surface_area: format_area(stats.area, &units),
            dimensions: stats.lengths.map(|l| format_length(l, &units)),
        },
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Mesh Information".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Vertices".cyan(), info.vertices);
                println!("  {}: {}", "Edges".cyan(), info.edges);
                println!("  {}: {}", "Faces".cyan(), info.faces);
                if info.triangles != info.faces {
                    println!("  {}: {}", "Triangles".cyan(), info.triangles);
                }
                println!(
                    "  {}: {}",
                    "Solid".cyan(),
                    if info.solid {
                        "yes".green()
                    } else {
                        "no".yellow()
                    }
                );

                let [x, y, z] = &info.display.dimensions;
                println!("  {}: {} x {} x {}", "Dimensions".cyan(), x, y, z);
                println!(
                    "  {}: ({:.2}, {:.2}, {:.2})",
                    "Min bounds".cyan(),
                    info.bounds.min[0],
                    info.bounds.min[1],
                    info.bounds.min[2]
                );
                println!(
                    "  {}: ({:.2}, {:.2}, {:.2})",
                    "Max bounds".cyan(),
                    info.bounds.max[0],
                    info.bounds.max[1],
                    info.bounds.max[2]
                );
                println!("  {}: {}", "Volume".cyan(), info.display.volume);
                println!("  {}: {}", "Surface area".cyan(), info.display.surface_area);
            }
        }
    }

    Ok(true)
}
