//! MockKernel: deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Every solid carries its construction history as an ordered list of
//! axis-aligned add/remove blocks. Volume and tessellation are evaluated
//! on the compressed cell grid those blocks induce, so they are exact for
//! rectilinear geometry. Fillets and chamfers do not change the cell model;
//! their removed material is tracked analytically.
//! Used by modeling-ops and deckbox-engine for unit testing.

use crate::geometry::{axis_side, shell_cavity, Aabb};
use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;
use std::collections::{HashMap, HashSet};

const EPS: f64 = 1e-9;

/// A mock vertex with known position.
#[derive(Debug, Clone)]
struct MockVertex {
    id: KernelId,
    position: [f64; 3],
}

/// A straight mock edge.
#[derive(Debug, Clone)]
struct MockEdge {
    id: KernelId,
    start: [f64; 3],
    end: [f64; 3],
}

impl MockEdge {
    fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    fn midpoint(&self) -> [f64; 3] {
        lerp(self.start, self.end, 0.5)
    }
}

/// A mock face with known properties.
#[derive(Debug, Clone)]
struct MockFace {
    id: KernelId,
    edges: Vec<KernelId>,
    normal: [f64; 3],
    centroid: [f64; 3],
    area: f64,
    surface_type: String,
}

/// One step of a solid's construction: material added or removed.
#[derive(Debug, Clone, Copy)]
struct Block {
    bounds: Aabb,
    add: bool,
}

#[derive(Debug, Clone)]
struct MockSolid {
    vertices: Vec<MockVertex>,
    edges: Vec<MockEdge>,
    faces: Vec<MockFace>,
    blocks: Vec<Block>,
    /// Material removed by fillets and chamfers.
    rounded_volume: f64,
    valid: bool,
}

impl MockSolid {
    fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
            blocks: Vec::new(),
            rounded_volume: 0.0,
            valid: true,
        }
    }

    fn volume(&self) -> f64 {
        CellGrid::evaluate(&self.blocks).volume() - self.rounded_volume
    }

    fn bounds(&self) -> Option<Aabb> {
        CellGrid::evaluate(&self.blocks).bounds()
    }
}

/// A planar face waiting to be extruded.
#[derive(Debug, Clone)]
struct PendingFace {
    points: Vec<[f64; 3]>,
}

/// One entry of the call journal.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelCall {
    MakeFace { area: f64 },
    Extrude { depth: f64 },
    Shell { thickness: f64, removed_faces: usize },
    Union,
    Subtract,
    Fillet { edges: usize, radius: f64 },
    Chamfer { edges: usize, distance: f64 },
    Tessellate,
    CheckSolid,
    ExportStep { solids: usize },
}

/// Deterministic test double for the geometry kernel.
/// Implements both Kernel and KernelIntrospect.
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    solids: HashMap<u64, MockSolid>,
    /// Faces created by make_face_from_profile, consumed by extrude.
    standalone_faces: HashMap<u64, PendingFace>,
    journal: Vec<KernelCall>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            solids: HashMap::new(),
            standalone_faces: HashMap::new(),
            journal: Vec::new(),
        }
    }

    /// Every kernel call made so far, in order.
    pub fn journal(&self) -> &[KernelCall] {
        &self.journal
    }

    /// Mark a solid as corrupt so the next validity check reports it open.
    pub fn invalidate(&mut self, handle: &KernelSolidHandle) {
        if let Some(s) = self.solids.get_mut(&handle.id()) {
            s.valid = false;
        }
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn alloc_handle(&mut self) -> KernelSolidHandle {
        let h = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn solid(&self, handle: &KernelSolidHandle) -> Result<&MockSolid, KernelError> {
        self.solids
            .get(&handle.id())
            .ok_or(KernelError::EntityNotFound {
                id: KernelId(handle.id()),
            })
    }

    fn insert(&mut self, solid: MockSolid) -> KernelSolidHandle {
        let handle = self.alloc_handle();
        self.solids.insert(handle.id(), solid);
        handle
    }

    /// Prism swept from a closed polygon along `offset`.
    /// n-gon base gives 2n vertices, 3n edges, n+2 faces.
    fn prism(&mut self, base: &[[f64; 3]], offset: [f64; 3]) -> MockSolid {
        let n = base.len();
        let top: Vec<[f64; 3]> = base.iter().map(|p| add(*p, offset)).collect();
        let dir = normalize(offset);
        // Side normals point outward only if the base winds CCW about the sweep.
        let flip = dot(newell_normal(base), dir) < 0.0;

        let mut vertices = Vec::with_capacity(2 * n);
        for p in base.iter().chain(top.iter()) {
            vertices.push(MockVertex {
                id: self.alloc_id(),
                position: *p,
            });
        }

        let mut edges = Vec::with_capacity(3 * n);
        for ring in [base, top.as_slice()] {
            for i in 0..n {
                edges.push(MockEdge {
                    id: self.alloc_id(),
                    start: ring[i],
                    end: ring[(i + 1) % n],
                });
            }
        }
        for i in 0..n {
            edges.push(MockEdge {
                id: self.alloc_id(),
                start: base[i],
                end: top[i],
            });
        }

        let cap_area = polygon_area(base);
        let mut faces = Vec::with_capacity(n + 2);
        faces.push(MockFace {
            id: self.alloc_id(),
            edges: edges[..n].iter().map(|e| e.id).collect(),
            normal: scale(dir, -1.0),
            centroid: average(base),
            area: cap_area,
            surface_type: "planar".to_string(),
        });
        faces.push(MockFace {
            id: self.alloc_id(),
            edges: edges[n..2 * n].iter().map(|e| e.id).collect(),
            normal: dir,
            centroid: average(&top),
            area: cap_area,
            surface_type: "planar".to_string(),
        });
        for i in 0..n {
            let j = (i + 1) % n;
            let along = sub(base[j], base[i]);
            let mut normal = normalize(cross(along, dir));
            if flip {
                normal = scale(normal, -1.0);
            }
            faces.push(MockFace {
                id: self.alloc_id(),
                edges: vec![
                    edges[i].id,
                    edges[n + i].id,
                    edges[2 * n + i].id,
                    edges[2 * n + j].id,
                ],
                normal,
                centroid: add(lerp(base[i], base[j], 0.5), scale(offset, 0.5)),
                area: norm(along) * norm(offset),
                surface_type: "planar".to_string(),
            });
        }

        let bounds = Aabb::from_points(base.iter().chain(top.iter()).copied())
            .unwrap_or(Aabb::new([0.0; 3], [0.0; 3]));
        MockSolid {
            vertices,
            edges,
            faces,
            blocks: vec![Block { bounds, add: true }],
            rounded_volume: 0.0,
            valid: true,
        }
    }

    /// Copy a solid's topology under fresh ids, as a real kernel would
    /// after any modifying operation.
    fn reid(&mut self, src: &MockSolid, keep_face: impl Fn(&MockFace) -> bool) -> MockSolid {
        let mut id_map: HashMap<KernelId, KernelId> = HashMap::new();
        let mut out = MockSolid {
            blocks: src.blocks.clone(),
            rounded_volume: src.rounded_volume,
            valid: src.valid,
            ..MockSolid::empty()
        };
        for v in &src.vertices {
            out.vertices.push(MockVertex {
                id: self.alloc_id(),
                position: v.position,
            });
        }
        for e in &src.edges {
            let id = self.alloc_id();
            id_map.insert(e.id, id);
            out.edges.push(MockEdge { id, ..e.clone() });
        }
        for f in src.faces.iter().filter(|f| keep_face(f)) {
            out.faces.push(MockFace {
                id: self.alloc_id(),
                edges: f.edges.iter().filter_map(|e| id_map.get(e).copied()).collect(),
                ..f.clone()
            });
        }
        out
    }

    /// Replace `edges` with blend faces: one new face and two boundary
    /// edges per original edge. `removed` is the material each unit of
    /// edge length loses.
    fn blend_edges(
        &mut self,
        source: &MockSolid,
        edges: &[KernelId],
        setback: f64,
        removed: f64,
        surface_type: &str,
    ) -> MockSolid {
        let blended: HashSet<KernelId> = edges.iter().copied().collect();
        let mut out = self.reid(source, |_| true);
        // reid preserves edge order, so position i maps source edge i.
        let mut kept_edges = Vec::with_capacity(out.edges.len());
        for (src_edge, new_edge) in source.edges.iter().zip(out.edges.drain(..)) {
            if !blended.contains(&src_edge.id) {
                kept_edges.push(new_edge);
            }
        }
        out.edges = kept_edges;
        let live: HashSet<KernelId> = out.edges.iter().map(|e| e.id).collect();
        for f in &mut out.faces {
            f.edges.retain(|e| live.contains(e));
        }

        for eid in edges {
            let Some(edge) = source.edges.iter().find(|e| e.id == *eid) else {
                continue;
            };
            let normals: Vec<[f64; 3]> = source
                .faces
                .iter()
                .filter(|f| f.edges.contains(eid))
                .map(|f| f.normal)
                .collect();
            let mut boundary = Vec::with_capacity(2);
            for n in normals.iter().rev().take(2) {
                let shift = scale(*n, -setback);
                boundary.push(MockEdge {
                    id: self.alloc_id(),
                    start: add(edge.start, shift),
                    end: add(edge.end, shift),
                });
            }
            let summed = normals.iter().fold([0.0; 3], |acc, n| add(acc, *n));
            let normal = if norm(summed) > EPS {
                normalize(summed)
            } else {
                [0.0, 0.0, 1.0]
            };
            let length = edge.length();
            out.faces.push(MockFace {
                id: self.alloc_id(),
                edges: boundary.iter().map(|e| e.id).collect(),
                normal,
                centroid: edge.midpoint(),
                area: length * setback,
                surface_type: surface_type.to_string(),
            });
            out.edges.extend(boundary);
            out.rounded_volume += removed * length;
        }
        out
    }

    /// Cut every edge of `solid` where it runs through the interior of
    /// `cut`. Edges lying on the box boundary are kept whole.
    fn split_edges(&mut self, solid: &mut MockSolid, cut: &Aabb) {
        let mut replaced: HashMap<KernelId, Vec<KernelId>> = HashMap::new();
        let mut edges = Vec::with_capacity(solid.edges.len());
        for edge in std::mem::take(&mut solid.edges) {
            let Some(pieces) = outside_pieces(edge.start, edge.end, cut) else {
                edges.push(edge);
                continue;
            };
            let mut ids = Vec::with_capacity(pieces.len());
            for (t0, t1) in pieces {
                let piece = MockEdge {
                    id: self.alloc_id(),
                    start: lerp(edge.start, edge.end, t0),
                    end: lerp(edge.start, edge.end, t1),
                };
                for p in [piece.start, piece.end] {
                    if !solid.vertices.iter().any(|v| distance(v.position, p) < EPS) {
                        let id = self.alloc_id();
                        solid.vertices.push(MockVertex { id, position: p });
                    }
                }
                ids.push(piece.id);
                edges.push(piece);
            }
            replaced.insert(edge.id, ids);
        }
        solid.edges = edges;
        for f in &mut solid.faces {
            f.edges = f
                .edges
                .iter()
                .flat_map(|e| replaced.get(e).cloned().unwrap_or_else(|| vec![*e]))
                .collect();
        }
    }

    fn check_edges(source: &MockSolid, edges: &[KernelId]) -> Result<(), String> {
        if edges.is_empty() {
            return Err("no edges selected".to_string());
        }
        for eid in edges {
            if !source.edges.iter().any(|e| e.id == *eid) {
                return Err(format!("edge {:?} not found in solid", eid));
            }
        }
        Ok(())
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for MockKernel {
    fn make_face_from_profile(&mut self, profile: &Profile) -> Result<KernelId, KernelError> {
        if profile.is_degenerate() {
            return Err(KernelError::InvalidProfile {
                reason: format!(
                    "profile with {} points and area {:.3e} cannot bound a face",
                    profile.points.len(),
                    profile.area()
                ),
            });
        }
        self.journal.push(KernelCall::MakeFace {
            area: profile.area(),
        });
        let id = self.alloc_id();
        self.standalone_faces.insert(
            id.0,
            PendingFace {
                points: profile.world_points(),
            },
        );
        Ok(id)
    }

    fn extrude_face(
        &mut self,
        face: KernelId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let pending = self
            .standalone_faces
            .remove(&face.0)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        if !(depth > 0.0) || !depth.is_finite() {
            return Err(KernelError::ExtrudeFailed {
                reason: format!("depth must be positive, got {depth}"),
            });
        }
        if norm(direction) < EPS {
            return Err(KernelError::ExtrudeFailed {
                reason: "zero extrusion direction".to_string(),
            });
        }
        self.journal.push(KernelCall::Extrude { depth });
        let offset = scale(normalize(direction), depth);
        let solid = self.prism(&pending.points, offset);
        Ok(self.insert(solid))
    }

    fn shell(
        &mut self,
        solid: &KernelSolidHandle,
        faces_to_remove: &[KernelId],
        thickness: f64,
        face_thickness: &[(KernelId, f64)],
    ) -> Result<KernelSolidHandle, KernelError> {
        let source = self.solid(solid)?.clone();
        let normal_of = |id: &KernelId| {
            source
                .faces
                .iter()
                .find(|f| f.id == *id)
                .map(|f| f.normal)
                .ok_or_else(|| KernelError::ShellFailed {
                    reason: format!("face {:?} not found in solid", id),
                })
        };
        let open = faces_to_remove
            .iter()
            .map(normal_of)
            .collect::<Result<Vec<_>, _>>()?;
        let overrides = face_thickness
            .iter()
            .map(|(id, t)| normal_of(id).map(|n| (n, *t)))
            .collect::<Result<Vec<_>, _>>()?;
        let outer = source.bounds().ok_or_else(|| KernelError::ShellFailed {
            reason: "solid has no material".to_string(),
        })?;
        let cavity = shell_cavity(&outer, &open, thickness, &overrides)?;
        self.journal.push(KernelCall::Shell {
            thickness,
            removed_faces: faces_to_remove.len(),
        });

        let removed: HashSet<KernelId> = faces_to_remove.iter().copied().collect();
        let mut out = self.reid(&source, |f| !removed.contains(&f.id));

        // Cavity walls: an inward-facing box clipped to the outer bounds,
        // minus its open sides.
        let visible = cavity.intersection(&outer);
        let open_sides: Vec<(usize, bool)> = open.iter().filter_map(|n| axis_side(*n)).collect();
        let inner = self.prism(
            &[
                [visible.min[0], visible.min[1], visible.min[2]],
                [visible.max[0], visible.min[1], visible.min[2]],
                [visible.max[0], visible.max[1], visible.min[2]],
                [visible.min[0], visible.max[1], visible.min[2]],
            ],
            [0.0, 0.0, visible.extent(2)],
        );
        out.vertices.extend(inner.vertices);
        out.edges.extend(inner.edges);
        for mut f in inner.faces {
            let open_side = axis_side(f.normal).map_or(false, |s| open_sides.contains(&s));
            if !open_side {
                f.normal = scale(f.normal, -1.0);
                out.faces.push(f);
            }
        }
        out.blocks.push(Block {
            bounds: cavity,
            add: false,
        });
        Ok(self.insert(out))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.solid(a)?.clone();
        let solid_b = self.solid(b)?.clone();
        self.journal.push(KernelCall::Union);

        let mut merged = self.reid(&solid_a, |_| true);
        let other = self.reid(&solid_b, |_| true);
        merged.vertices.extend(other.vertices);
        merged.edges.extend(other.edges);
        merged.faces.extend(other.faces);
        merged.blocks.extend(other.blocks);
        merged.rounded_volume += other.rounded_volume;
        merged.valid &= other.valid;
        Ok(self.insert(merged))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.solid(a)?.clone();
        let solid_b = self.solid(b)?.clone();
        if solid_b.blocks.iter().any(|blk| !blk.add) {
            return Err(KernelError::NotSupported {
                operation: "subtracting a hollow tool body".to_string(),
            });
        }
        self.journal.push(KernelCall::Subtract);

        let region = solid_a.bounds().unwrap_or(Aabb::new([0.0; 3], [0.0; 3]));
        let mut result = self.reid(&solid_a, |_| true);
        for blk in &solid_b.blocks {
            self.split_edges(&mut result, &blk.bounds);
        }
        // Only the part of the tool's boundary inside the target survives.
        let tool = self.reid(&solid_b, |f| region.contains(f.centroid, EPS));
        let tool_edges: Vec<MockEdge> = tool
            .edges
            .into_iter()
            .filter(|e| region.contains(e.midpoint(), EPS))
            .collect();
        let live: HashSet<KernelId> = tool_edges.iter().map(|e| e.id).collect();
        result.edges.extend(tool_edges);
        for mut f in tool.faces {
            f.normal = scale(f.normal, -1.0);
            f.edges.retain(|e| live.contains(e));
            result.faces.push(f);
        }
        result.vertices.extend(
            tool.vertices
                .into_iter()
                .filter(|v| region.contains(v.position, EPS)),
        );
        result.blocks.extend(solid_b.blocks.iter().map(|blk| Block {
            bounds: blk.bounds,
            add: false,
        }));

        if result.volume() <= EPS {
            return Err(KernelError::BooleanFailed {
                reason: "subtraction leaves no material".to_string(),
            });
        }
        Ok(self.insert(result))
    }

    fn fillet_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(KernelError::FilletFailed {
                reason: "radius must be positive".to_string(),
            });
        }
        let source = self.solid(solid)?.clone();
        Self::check_edges(&source, edges).map_err(|reason| KernelError::FilletFailed { reason })?;
        self.journal.push(KernelCall::Fillet {
            edges: edges.len(),
            radius,
        });
        let removed = (1.0 - std::f64::consts::FRAC_PI_4) * radius * radius;
        let out = self.blend_edges(&source, edges, radius, removed, "cylindrical");
        Ok(self.insert(out))
    }

    fn chamfer_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        distance: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        if !(distance > 0.0) || !distance.is_finite() {
            return Err(KernelError::ChamferFailed {
                reason: "chamfer distance must be positive".to_string(),
            });
        }
        let source = self.solid(solid)?.clone();
        Self::check_edges(&source, edges)
            .map_err(|reason| KernelError::ChamferFailed { reason })?;
        self.journal.push(KernelCall::Chamfer {
            edges: edges.len(),
            distance,
        });
        let removed = distance * distance / 2.0;
        let out = self.blend_edges(&source, edges, distance, removed, "planar");
        Ok(self.insert(out))
    }

    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        _tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        let s = self.solid(solid)?;
        let grid = CellGrid::evaluate(&s.blocks);
        let face_for = |side: (usize, bool)| {
            s.faces
                .iter()
                .find(|f| axis_side(f.normal) == Some(side))
                .map_or(KernelId(0), |f| f.id)
        };
        let mesh = grid.boundary_mesh(face_for);
        self.journal.push(KernelCall::Tessellate);
        if mesh.indices.is_empty() {
            return Err(KernelError::TessellationFailed {
                reason: "solid has no material".to_string(),
            });
        }
        Ok(mesh)
    }

    fn check_solid(&mut self, solid: &KernelSolidHandle) -> Result<SolidCheck, KernelError> {
        let s = self.solid(solid)?;
        let volume = s.volume();
        let closed = s.valid && volume > EPS;
        self.journal.push(KernelCall::CheckSolid);
        Ok(SolidCheck { closed, volume })
    }

    fn export_step(
        &mut self,
        solids: &[KernelSolidHandle],
        name: &str,
    ) -> Result<String, KernelError> {
        if solids.is_empty() {
            return Err(KernelError::StepFailed {
                reason: "no solids to export".to_string(),
            });
        }
        let mut data = String::new();
        for (i, handle) in solids.iter().enumerate() {
            let s = self.solid(handle)?;
            if !s.valid {
                return Err(KernelError::StepFailed {
                    reason: format!("solid {} is not closed", i + 1),
                });
            }
            let bb = s.bounds().unwrap_or(Aabb::new([0.0; 3], [0.0; 3]));
            data.push_str(&format!(
                "#{}=MOCK_SOLID('{}_{}',{:.6},({:.6},{:.6},{:.6}),({:.6},{:.6},{:.6}));\n",
                i + 1,
                name,
                i + 1,
                s.volume(),
                bb.min[0],
                bb.min[1],
                bb.min[2],
                bb.max[0],
                bb.max[1],
                bb.max[2],
            ));
        }
        self.journal.push(KernelCall::ExportStep {
            solids: solids.len(),
        });
        Ok(format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION(('deckbox mock export'),'2;1');\n\
             FILE_NAME('{name}','',(''),(''),'deckbox-kernel','','');\n\
             FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n{data}ENDSEC;\nEND-ISO-10303-21;\n"
        ))
    }
}

impl KernelIntrospect for MockKernel {
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.solids
            .get(&solid.id())
            .map(|s| s.faces.iter().map(|f| f.id).collect())
            .unwrap_or_default()
    }

    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.solids
            .get(&solid.id())
            .map(|s| s.edges.iter().map(|e| e.id).collect())
            .unwrap_or_default()
    }

    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.solids
            .get(&solid.id())
            .map(|s| s.vertices.iter().map(|v| v.id).collect())
            .unwrap_or_default()
    }

    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId> {
        let mut result = Vec::new();
        for solid in self.solids.values() {
            for f in &solid.faces {
                if f.edges.contains(&edge) {
                    result.push(f.id);
                }
            }
        }
        result.sort();
        result
    }

    fn compute_signature(&self, entity: KernelId, kind: TopoKind) -> TopoSignature {
        for solid in self.solids.values() {
            match kind {
                TopoKind::Face => {
                    if let Some(f) = solid.faces.iter().find(|f| f.id == entity) {
                        return TopoSignature {
                            surface_type: Some(f.surface_type.clone()),
                            area: Some(f.area),
                            centroid: Some(f.centroid),
                            normal: Some(f.normal),
                            ..TopoSignature::empty()
                        };
                    }
                }
                TopoKind::Edge => {
                    if let Some(e) = solid.edges.iter().find(|e| e.id == entity) {
                        let bb = Aabb::from_points([e.start, e.end]);
                        return TopoSignature {
                            surface_type: Some("line".to_string()),
                            centroid: Some(e.midpoint()),
                            direction: Some(normalize(sub(e.end, e.start))),
                            bbox: bb.map(|b| {
                                [b.min[0], b.min[1], b.min[2], b.max[0], b.max[1], b.max[2]]
                            }),
                            length: Some(e.length()),
                            ..TopoSignature::empty()
                        };
                    }
                }
                TopoKind::Vertex => {
                    if let Some(v) = solid.vertices.iter().find(|v| v.id == entity) {
                        return TopoSignature {
                            surface_type: Some("point".to_string()),
                            centroid: Some(v.position),
                            ..TopoSignature::empty()
                        };
                    }
                }
            }
        }
        TopoSignature::empty()
    }
}

/// Occupancy of the grid induced by every block boundary.
struct CellGrid {
    coords: [Vec<f64>; 3],
    filled: Vec<bool>,
}

impl CellGrid {
    fn evaluate(blocks: &[Block]) -> Self {
        let mut coords: [Vec<f64>; 3] = Default::default();
        for (axis, axis_coords) in coords.iter_mut().enumerate() {
            for b in blocks {
                axis_coords.push(b.bounds.min[axis]);
                axis_coords.push(b.bounds.max[axis]);
            }
            axis_coords.sort_by(f64::total_cmp);
            axis_coords.dedup_by(|a, b| (*a - *b).abs() < EPS);
        }
        let dims = coords.each_ref().map(|c| c.len().saturating_sub(1));
        let mut filled = vec![false; dims[0] * dims[1] * dims[2]];
        for k in 0..dims[2] {
            for j in 0..dims[1] {
                for i in 0..dims[0] {
                    let center = [
                        (coords[0][i] + coords[0][i + 1]) / 2.0,
                        (coords[1][j] + coords[1][j + 1]) / 2.0,
                        (coords[2][k] + coords[2][k + 1]) / 2.0,
                    ];
                    // The last block covering a cell decides it.
                    let inside = blocks
                        .iter()
                        .rev()
                        .find(|b| b.bounds.contains(center, 0.0))
                        .map_or(false, |b| b.add);
                    filled[(k * dims[1] + j) * dims[0] + i] = inside;
                }
            }
        }
        Self { coords, filled }
    }

    fn dims(&self) -> [usize; 3] {
        self.coords.each_ref().map(|c| c.len().saturating_sub(1))
    }

    fn is_filled(&self, cell: [isize; 3]) -> bool {
        let dims = self.dims();
        if (0..3).any(|a| cell[a] < 0 || cell[a] as usize >= dims[a]) {
            return false;
        }
        let [i, j, k] = cell.map(|c| c as usize);
        self.filled[(k * dims[1] + j) * dims[0] + i]
    }

    fn cells(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let dims = self.dims();
        (0..dims[2]).flat_map(move |k| {
            (0..dims[1]).flat_map(move |j| (0..dims[0]).map(move |i| [i, j, k]))
        })
    }

    fn cell_bounds(&self, c: [usize; 3]) -> Aabb {
        Aabb::new(
            [
                self.coords[0][c[0]],
                self.coords[1][c[1]],
                self.coords[2][c[2]],
            ],
            [
                self.coords[0][c[0] + 1],
                self.coords[1][c[1] + 1],
                self.coords[2][c[2] + 1],
            ],
        )
    }

    fn filled_cells(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.cells()
            .filter(|c| self.is_filled(c.map(|x| x as isize)))
    }

    fn volume(&self) -> f64 {
        self.filled_cells().map(|c| self.cell_bounds(c).volume()).sum()
    }

    fn bounds(&self) -> Option<Aabb> {
        self.filled_cells()
            .map(|c| self.cell_bounds(c))
            .reduce(|a, b| a.union(&b))
    }

    /// Outward-facing quads on every filled/empty cell interface,
    /// grouped by side into one face range each.
    fn boundary_mesh(&self, face_for: impl Fn((usize, bool)) -> KernelId) -> RenderMesh {
        let mut mesh = RenderMesh::empty();
        for axis in 0..3 {
            for positive in [false, true] {
                let start_index = mesh.indices.len() as u32;
                let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
                let mut normal = [0.0f32; 3];
                normal[axis] = if positive { 1.0 } else { -1.0 };
                for c in self.filled_cells() {
                    let mut neighbor = c.map(|x| x as isize);
                    neighbor[axis] += if positive { 1 } else { -1 };
                    if self.is_filled(neighbor) {
                        continue;
                    }
                    let bb = self.cell_bounds(c);
                    let plane = if positive { bb.max[axis] } else { bb.min[axis] };
                    let mut corners = [(bb.min[u], bb.min[v]), (bb.max[u], bb.min[v]), (bb.max[u], bb.max[v]), (bb.min[u], bb.max[v])];
                    if !positive {
                        corners.reverse();
                    }
                    let base = (mesh.vertices.len() / 3) as u32;
                    for (cu, cv) in corners {
                        let mut p = [0.0f32; 3];
                        p[axis] = plane as f32;
                        p[u] = cu as f32;
                        p[v] = cv as f32;
                        mesh.vertices.extend_from_slice(&p);
                        mesh.normals.extend_from_slice(&normal);
                    }
                    mesh.indices
                        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
                }
                let end_index = mesh.indices.len() as u32;
                if end_index > start_index {
                    mesh.face_ranges.push(FaceRange {
                        face_id: face_for((axis, positive)),
                        start_index,
                        end_index,
                    });
                }
            }
        }
        mesh
    }
}

/// Parameter ranges of the segment `start..end` left after removing the
/// part strictly inside `cut`. `None` when nothing is removed.
fn outside_pieces(start: [f64; 3], end: [f64; 3], cut: &Aabb) -> Option<Vec<(f64, f64)>> {
    let d = sub(end, start);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for i in 0..3 {
        let (lo, hi) = (cut.min[i] + EPS, cut.max[i] - EPS);
        if d[i].abs() < EPS {
            if start[i] <= lo || start[i] >= hi {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - start[i]) / d[i], (hi - start[i]) / d[i]);
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }
    if t1 - t0 <= EPS {
        return None;
    }
    let mut pieces = Vec::with_capacity(2);
    if t0 > EPS {
        pieces.push((0.0, t0));
    }
    if t1 < 1.0 - EPS {
        pieces.push((t1, 1.0));
    }
    Some(pieces)
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn normalize(a: [f64; 3]) -> [f64; 3] {
    let n = norm(a);
    if n < EPS {
        a
    } else {
        scale(a, 1.0 / n)
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    norm(sub(a, b))
}

fn lerp(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    add(a, scale(sub(b, a), t))
}

fn average(pts: &[[f64; 3]]) -> [f64; 3] {
    let sum = pts.iter().fold([0.0; 3], |acc, p| add(acc, *p));
    scale(sum, 1.0 / pts.len().max(1) as f64)
}

/// Polygon normal scaled by twice its area (Newell's method).
fn newell_normal(pts: &[[f64; 3]]) -> [f64; 3] {
    let n = pts.len();
    (0..n).fold([0.0; 3], |acc, i| add(acc, cross(pts[i], pts[(i + 1) % n])))
}

fn polygon_area(pts: &[[f64; 3]]) -> f64 {
    norm(newell_normal(pts)) / 2.0
}
