//! OBJ loading into a host-side [`PrintObject`].

use std::path::Path;

use anyhow::{Context, Result, bail};
use mesh_printcheck::{PrintObject, SourceMesh};
use nalgebra::Point3;
use tracing::debug;

/// Load every model in an OBJ file as one object, keeping polygon faces.
///
/// Models are concatenated in file order; their vertices are not merged.
pub fn load_object(path: &Path) -> Result<PrintObject> {
    let options = tobj::LoadOptions {
        triangulate: false,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj(path, &options)
        .with_context(|| format!("Failed to load mesh from {:?}", path))?;

    let mut source = SourceMesh::default();
    for model in &models {
        let mesh = &model.mesh;
        let offset = source.positions.len() as u32;
        source.positions.extend(
            mesh.positions
                .chunks_exact(3)
                .map(|c| Point3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2]))),
        );

        if mesh.face_arities.is_empty() {
            source.faces.extend(
                mesh.indices
                    .chunks_exact(3)
                    .map(|tri| tri.iter().map(|&i| i + offset).collect::<Vec<u32>>()),
            );
        } else {
            let mut start = 0;
            for &arity in &mesh.face_arities {
                let end = start + arity as usize;
                let Some(corners) = mesh.indices.get(start..end) else {
                    bail!("model '{}' has truncated face data", model.name);
                };
                source.faces.push(corners.iter().map(|&i| i + offset).collect());
                start = end;
            }
        }
        debug!(
            model = %model.name,
            vertices = mesh.positions.len() / 3,
            "Loaded OBJ model"
        );
    }

    if source.faces.is_empty() {
        bail!("{:?} contains no faces", path);
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    Ok(PrintObject::new(name, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_obj(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".obj").unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_quads_are_preserved() {
        let file = write_obj(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 0.5 0.5 1\n\
             f 1 4 3 2\nf 1 2 5\nf 2 3 5\nf 3 4 5\nf 4 1 5\n",
        );
        let object = load_object(file.path()).unwrap();
        assert_eq!(object.mesh.positions.len(), 5);
        assert_eq!(object.mesh.faces.len(), 5);
        assert_eq!(object.mesh.faces[0].len(), 4);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let file = write_obj("# nothing here\n");
        assert!(load_object(file.path()).is_err());
    }
}
