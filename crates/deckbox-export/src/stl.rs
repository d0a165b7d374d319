//! STL encoding of a RenderMesh, binary and ASCII.

use deckbox_kernel::RenderMesh;

/// One triangle: unit normal and three corners.
struct Facet {
    normal: [f32; 3],
    corners: [[f32; 3]; 3],
}

/// Triangles of `mesh` with normals from the winding. Fails on an empty
/// mesh or an index past the vertex table.
fn facets(mesh: &RenderMesh) -> Result<Vec<Facet>, String> {
    if mesh.indices.len() < 3 {
        return Err("mesh has no triangles".to_string());
    }
    if mesh.indices.len() % 3 != 0 {
        return Err(format!(
            "index count {} is not a multiple of 3",
            mesh.indices.len()
        ));
    }
    let vertex_count = mesh.vertices.len() / 3;
    let vertex = |idx: u32| -> Result<[f32; 3], String> {
        let i = idx as usize;
        if i >= vertex_count {
            return Err(format!(
                "index {idx} out of range (vertex count = {vertex_count})"
            ));
        }
        Ok([
            mesh.vertices[i * 3],
            mesh.vertices[i * 3 + 1],
            mesh.vertices[i * 3 + 2],
        ])
    };

    mesh.indices
        .chunks_exact(3)
        .map(|tri| {
            let corners = [vertex(tri[0])?, vertex(tri[1])?, vertex(tri[2])?];
            let a = sub(corners[1], corners[0]);
            let b = sub(corners[2], corners[0]);
            let n = [
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ];
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            let normal = if len > 1e-12 {
                [n[0] / len, n[1] / len, n[2] / len]
            } else {
                [0.0, 0.0, 1.0]
            };
            Ok(Facet { normal, corners })
        })
        .collect()
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Binary STL: 80-byte header, u32 triangle count, then 50 bytes per
/// triangle (normal, three vertices, u16 attribute), all little-endian.
pub fn binary_stl(mesh: &RenderMesh, name: &str) -> Result<Vec<u8>, String> {
    let facets = facets(mesh)?;
    let mut buf = Vec::with_capacity(84 + facets.len() * 50);

    let header = format!("binary STL: {name}");
    let header = header.as_bytes();
    buf.extend_from_slice(&header[..header.len().min(80)]);
    buf.resize(80, 0u8);
    buf.extend_from_slice(&(facets.len() as u32).to_le_bytes());

    for facet in &facets {
        for v in std::iter::once(&facet.normal).chain(facet.corners.iter()) {
            for c in v {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }
    Ok(buf)
}

/// ASCII STL with fixed-precision coordinates.
pub fn ascii_stl(mesh: &RenderMesh, name: &str) -> Result<String, String> {
    let facets = facets(mesh)?;
    let mut out = String::with_capacity(facets.len() * 260);
    out.push_str(&format!("solid {name}\n"));
    for facet in &facets {
        let [nx, ny, nz] = facet.normal;
        out.push_str(&format!("  facet normal {nx:.6e} {ny:.6e} {nz:.6e}\n"));
        out.push_str("    outer loop\n");
        for [x, y, z] in facet.corners {
            out.push_str(&format!("      vertex {x:.6e} {y:.6e} {z:.6e}\n"));
        }
        out.push_str("    endloop\n  endfacet\n");
    }
    out.push_str(&format!("endsolid {name}\n"));
    Ok(out)
}
