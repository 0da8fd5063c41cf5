//! The aggregate in-memory map: every decoded lump collection plus the raw
//! bytes of lumps this crate doesn't interpret. Owned and exclusively
//! borrowed — there's no interior mutability anywhere in this type.

use std::path::Path;

use crate::byte_view::ByteReader;
use crate::entities::{decode_entities, Entity, EntityLump};
use crate::error::{Error, Result, Warning};
use crate::header::{Header, LoadOptions, LumpDirectory, LumpId};
use crate::lump_codecs;
use crate::records::*;
use crate::vis::{decode_visibility, VisData};

/// Raw bytes for the lumps this crate has no named record type for. These
/// round-trip byte-for-byte across every edit because nothing ever
/// interprets or rewrites them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaqueLumps {
    pub leaf_brush_table: Vec<u8>,
    pub brush_sides: Vec<u8>,
    pub pop: Vec<u8>,
    pub areas: Vec<u8>,
    pub area_portals: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct BspModel {
    pub header: Header,
    pub directory: LumpDirectory,

    pub worldspawn: Entity,
    pub entities: Vec<Entity>,

    pub planes: Vec<Plane>,
    pub vertices: Vec<Vertex>,
    pub vis: VisData,
    pub nodes: Vec<Node>,
    pub tex_infos: Vec<TexInfo>,
    pub faces: Vec<Face>,
    pub lightmap: Vec<LightmapTexel>,
    pub leaves: Vec<BspLeaf>,
    pub leaf_faces: Vec<LeafFaceEntry>,
    pub edges: Vec<Edge>,
    pub face_edges: Vec<FaceEdge>,
    pub models: Vec<Model>,
    pub brushes: Vec<Brush>,

    pub opaque: OpaqueLumps,

    /// Raw bytes for every lump as last written or last read, indexed by
    /// [`LumpId`] position. [`crate::edit_ops`] is the only code that
    /// overwrites entries here; everything else is a read-only snapshot
    /// taken at load time so an unedited save round-trips byte-for-byte.
    pub(crate) lump_bodies: [Vec<u8>; 19],
}

/// The result of a load: the model plus every non-fatal condition
/// encountered along the way.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub model: BspModel,
    pub warnings: Vec<Warning>,
}

pub fn load(path: &Path, options: LoadOptions) -> Result<Loaded> {
    let bytes = std::fs::read(path)?;
    BspModel::from_bytes(&bytes, options)
}

fn lump_slice<'a>(r: &ByteReader<'a>, directory: &LumpDirectory, id: LumpId) -> Result<&'a [u8]> {
    let entry = directory.entry(id);
    r.read_bytes(id.name(), entry.offset as usize, entry.length as usize)
}

impl BspModel {
    pub fn from_bytes(bytes: &[u8], options: LoadOptions) -> Result<Loaded> {
        let r = ByteReader::new(bytes);
        let mut warnings = Vec::new();

        let header = Header::decode(&r, &options, &mut warnings)?;
        let directory = LumpDirectory::decode(&r)?;

        let entity_lump = decode_entities(lump_slice(&r, &directory, LumpId::Entities)?, &mut warnings)?;
        let EntityLump { worldspawn, entities } = entity_lump;

        let planes = lump_codecs::decode_planes(&r, directory.entry(LumpId::Planes))?;
        let vertices = lump_codecs::decode_vertices(&r, directory.entry(LumpId::Vertices))?;
        let vis = decode_visibility(lump_slice(&r, &directory, LumpId::Visibility)?, &mut warnings)?;
        let nodes = lump_codecs::decode_nodes(&r, directory.entry(LumpId::Nodes))?;
        let tex_infos = lump_codecs::decode_tex_infos(&r, directory.entry(LumpId::TextureInformation))?;
        let faces = lump_codecs::decode_faces(&r, directory.entry(LumpId::Faces))?;
        let lightmap = lump_codecs::decode_lightmap_texels(lump_slice(&r, &directory, LumpId::Lightmaps)?)?;
        let leaves = lump_codecs::decode_leaves(&r, directory.entry(LumpId::Leaves))?;
        let leaf_faces = lump_codecs::decode_leaf_faces(&r, directory.entry(LumpId::LeafFaceTable))?;
        let edges = lump_codecs::decode_edges(&r, directory.entry(LumpId::Edges))?;
        let face_edges = lump_codecs::decode_face_edges(&r, directory.entry(LumpId::FaceEdgeTable))?;
        let models = lump_codecs::decode_models(&r, directory.entry(LumpId::Models))?;
        let brushes = lump_codecs::decode_brushes(&r, directory.entry(LumpId::Brushes))?;

        let opaque = OpaqueLumps {
            leaf_brush_table: lump_slice(&r, &directory, LumpId::LeafBrushTable)?.to_vec(),
            brush_sides: lump_slice(&r, &directory, LumpId::BrushSides)?.to_vec(),
            pop: lump_slice(&r, &directory, LumpId::Pop)?.to_vec(),
            areas: lump_slice(&r, &directory, LumpId::Areas)?.to_vec(),
            area_portals: lump_slice(&r, &directory, LumpId::AreaPortals)?.to_vec(),
        };

        let mut lump_bodies: [Vec<u8>; 19] = Default::default();
        for id in LumpId::ALL {
            lump_bodies[id as usize] = lump_slice(&r, &directory, id)?.to_vec();
        }

        let model = BspModel {
            header,
            directory,
            worldspawn,
            entities,
            planes,
            vertices,
            vis,
            nodes,
            tex_infos,
            faces,
            lightmap,
            leaves,
            leaf_faces,
            edges,
            face_edges,
            models,
            brushes,
            opaque,
            lump_bodies,
        };

        model.check_invariants(&options, &mut warnings)?;

        Ok(Loaded { model, warnings })
    }

    fn bounds_check(
        &self,
        opts: &LoadOptions,
        warnings: &mut Vec<Warning>,
        table: &'static str,
        index: i64,
        bound: usize,
    ) -> Result<()> {
        if index < 0 || index as usize >= bound {
            if opts.strict {
                return Err(Error::IndexOutOfRange { table, index, bound });
            }
            let w = Warning::IndexOutOfRange { table, index, bound };
            w.log();
            warnings.push(w);
        }
        Ok(())
    }

    /// Checks a `(first, count)` range lies within `bound`, as the spec's
    /// `first + count <= bound` invariant. A zero-length range is always
    /// valid regardless of `first` — this is what lets leaf 0's
    /// `first_leaf_face == 0, num_leaf_faces == 0` (the solid/outside leaf
    /// every map has) pass even though `first` itself points at nothing.
    fn range_check(
        &self,
        opts: &LoadOptions,
        warnings: &mut Vec<Warning>,
        table: &'static str,
        first: i64,
        count: i64,
        bound: usize,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let end = first + count;
        if first < 0 || end as usize > bound {
            if opts.strict {
                return Err(Error::IndexOutOfRange { table, index: end - 1, bound });
            }
            let w = Warning::IndexOutOfRange { table, index: end - 1, bound };
            w.log();
            warnings.push(w);
        }
        Ok(())
    }

    /// Checks every cross-lump index invariant: face-edges against edges,
    /// edges against vertices, face/leaf/model ranges against their target
    /// tables, node plane/child indices, and face texture-info indices.
    /// Violations are warnings in lenient mode and errors in strict mode.
    fn check_invariants(&self, opts: &LoadOptions, warnings: &mut Vec<Warning>) -> Result<()> {
        for &fe in &self.face_edges {
            self.bounds_check(opts, warnings, "Edges", fe.unsigned_abs() as i64, self.edges.len())?;
        }
        for e in &self.edges {
            self.bounds_check(opts, warnings, "Vertices", e.v0 as i64, self.vertices.len())?;
            self.bounds_check(opts, warnings, "Vertices", e.v1 as i64, self.vertices.len())?;
        }
        for f in &self.faces {
            self.range_check(opts, warnings, "FaceEdgeTable", f.first_edge as i64, f.num_edges as i64, self.face_edges.len())?;
            self.bounds_check(opts, warnings, "Planes", f.plane as i64, self.planes.len())?;
            self.bounds_check(opts, warnings, "TextureInformation", f.texture_info as i64, self.tex_infos.len())?;
        }
        for l in &self.leaves {
            self.range_check(opts, warnings, "LeafFaceTable", l.first_leaf_face as i64, l.num_leaf_faces as i64, self.leaf_faces.len())?;
        }
        for &lf in &self.leaf_faces {
            self.bounds_check(opts, warnings, "Faces", lf as i64, self.faces.len())?;
        }
        for m in &self.models {
            self.range_check(opts, warnings, "Faces", m.first_face as i64, m.num_faces as i64, self.faces.len())?;
        }
        for n in &self.nodes {
            self.bounds_check(opts, warnings, "Planes", n.plane as i64, self.planes.len())?;
            self.check_node_child(opts, warnings, n.front)?;
            self.check_node_child(opts, warnings, n.back)?;
        }
        Ok(())
    }

    /// A non-negative child index selects a node; a negative one selects a
    /// leaf via `-(leaf_index) - 1`.
    fn check_node_child(&self, opts: &LoadOptions, warnings: &mut Vec<Warning>, child: i32) -> Result<()> {
        if child >= 0 {
            self.bounds_check(opts, warnings, "Nodes", child as i64, self.nodes.len())
        } else {
            self.bounds_check(opts, warnings, "Leaves", -(child as i64) - 1, self.leaves.len())
        }
    }

    /// Reconstructs a face's polygon as the sequence of vertex positions
    /// implied by its face-edge range: a non-negative face-edge index `k`
    /// contributes `Edges[k]`'s first vertex, a negative `-k` contributes
    /// its second. A face-edge value of `0` has no sign to read (`-0 == 0`)
    /// and is always treated as the positive case.
    pub fn face_polygon(&self, face_index: usize) -> Result<Vec<Vertex>> {
        let face = self
            .faces
            .get(face_index)
            .ok_or(Error::IndexOutOfRange { table: "Faces", index: face_index as i64, bound: self.faces.len() })?;
        let start = face.first_edge as usize;
        let end = start + face.num_edges as usize;
        let slice = self.face_edges.get(start..end).ok_or(Error::IndexOutOfRange {
            table: "FaceEdgeTable",
            index: end as i64,
            bound: self.face_edges.len(),
        })?;

        let mut polygon = Vec::with_capacity(slice.len());
        for &fe in slice {
            let edge_index = fe.unsigned_abs() as usize;
            let edge = self.edges.get(edge_index).ok_or(Error::IndexOutOfRange {
                table: "Edges",
                index: edge_index as i64,
                bound: self.edges.len(),
            })?;
            let vertex_index = if fe >= 0 { edge.v0 } else { edge.v1 } as usize;
            let vertex = self.vertices.get(vertex_index).ok_or(Error::IndexOutOfRange {
                table: "Vertices",
                index: vertex_index as i64,
                bound: self.vertices.len(),
            })?;
            polygon.push(*vertex);
        }
        Ok(polygon)
    }

    fn mean_of_vertices(vertices: &[Vertex]) -> Option<Vec3f> {
        if vertices.is_empty() {
            return None;
        }
        let n = vertices.len() as f32;
        let (mut sx, mut sy, mut sz) = (0.0f32, 0.0f32, 0.0f32);
        for v in vertices {
            sx += v.x;
            sy += v.y;
            sz += v.z;
        }
        Some(Vec3f { x: sx / n, y: sy / n, z: sz / n })
    }

    /// The mean position of every vertex of every face this model directly
    /// owns (`None` if it owns no faces).
    pub fn model_centroid(&self, model_index: usize) -> Result<Option<Vec3f>> {
        let m = self.models.get(model_index).ok_or(Error::IndexOutOfRange {
            table: "Models",
            index: model_index as i64,
            bound: self.models.len(),
        })?;
        let mut verts = Vec::new();
        for i in 0..m.num_faces as usize {
            verts.extend(self.face_polygon(m.first_face as usize + i)?);
        }
        Ok(Self::mean_of_vertices(&verts))
    }

    /// The mean position of every vertex of every face reachable through
    /// this leaf's leaf-face range (`None` if it reaches no faces).
    pub fn leaf_centroid(&self, leaf_index: usize) -> Result<Option<Vec3f>> {
        let l = self.leaves.get(leaf_index).ok_or(Error::IndexOutOfRange {
            table: "Leaves",
            index: leaf_index as i64,
            bound: self.leaves.len(),
        })?;
        let mut verts = Vec::new();
        for i in 0..l.num_leaf_faces as usize {
            let face_index = self.leaf_faces[l.first_leaf_face as usize + i] as usize;
            verts.extend(self.face_polygon(face_index)?);
        }
        Ok(Self::mean_of_vertices(&verts))
    }

    pub fn is_vised(&self) -> bool {
        self.vis.is_vised()
    }

    pub fn is_lit(&self) -> bool {
        !self.lightmap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> BspModel {
        let vertices = vec![
            Vec3f { x: 0.0, y: 0.0, z: 0.0 },
            Vec3f { x: 10.0, y: 0.0, z: 0.0 },
            Vec3f { x: 10.0, y: 10.0, z: 0.0 },
            Vec3f { x: 0.0, y: 10.0, z: 0.0 },
        ];
        let edges = vec![
            Edge { v0: 0, v1: 1 },
            Edge { v0: 1, v1: 2 },
            Edge { v0: 2, v1: 3 },
            Edge { v0: 3, v1: 0 },
        ];
        let face_edges: Vec<FaceEdge> = vec![0, 1, 2, 3];
        let faces = vec![Face {
            plane: 0,
            plane_side: 0,
            first_edge: 0,
            num_edges: 4,
            texture_info: 0,
            lightmap_styles: 0,
            lightmap_offsets: 0,
        }];
        let models = vec![Model {
            bbox_min: Vec3f { x: 0.0, y: 0.0, z: 0.0 },
            bbox_max: Vec3f { x: 10.0, y: 10.0, z: 0.0 },
            origin: Vec3f { x: 0.0, y: 0.0, z: 0.0 },
            opaque_headnode: [0; 4],
            first_face: 0,
            num_faces: 1,
        }];

        BspModel {
            header: Header { magic: crate::header::MAGIC, version: crate::header::VERSION },
            directory: LumpDirectory::decode(&ByteReader::new(&[0u8; 160])).unwrap(),
            worldspawn: Entity::default(),
            entities: Vec::new(),
            planes: vec![Plane { normal: Vec3f { x: 0.0, y: 0.0, z: 1.0 }, distance: 0.0, plane_type: 2 }],
            vertices,
            vis: VisData::default(),
            nodes: Vec::new(),
            tex_infos: Vec::new(),
            faces,
            lightmap: Vec::new(),
            leaves: vec![BspLeaf {
                opaque_head: [0; 4],
                cluster: 0,
                opaque_area: [0; 2],
                bbox_min: Vec3s { x: 0, y: 0, z: 0 },
                bbox_max: Vec3s { x: 10, y: 10, z: 0 },
                first_leaf_face: 0,
                num_leaf_faces: 1,
            }],
            leaf_faces: vec![0],
            edges,
            face_edges,
            models,
            brushes: Vec::new(),
            opaque: OpaqueLumps::default(),
            lump_bodies: Default::default(),
        }
    }

    #[test]
    fn face_polygon_walks_edges_in_stored_direction() {
        let model = sample();
        let polygon = model.face_polygon(0).unwrap();
        assert_eq!(
            polygon,
            vec![
                Vec3f { x: 0.0, y: 0.0, z: 0.0 },
                Vec3f { x: 10.0, y: 0.0, z: 0.0 },
                Vec3f { x: 10.0, y: 10.0, z: 0.0 },
                Vec3f { x: 0.0, y: 10.0, z: 0.0 },
            ]
        );
    }

    #[test]
    fn model_centroid_averages_owned_face_vertices() {
        let model = sample();
        let centroid = model.model_centroid(0).unwrap().unwrap();
        assert_eq!(centroid, Vec3f { x: 5.0, y: 5.0, z: 0.0 });
    }

    #[test]
    fn leaf_centroid_averages_referenced_face_vertices() {
        let model = sample();
        let centroid = model.leaf_centroid(0).unwrap().unwrap();
        assert_eq!(centroid, Vec3f { x: 5.0, y: 5.0, z: 0.0 });
    }

    #[test]
    fn model_with_no_faces_has_no_centroid() {
        let mut model = sample();
        model.models[0].num_faces = 0;
        assert_eq!(model.model_centroid(0).unwrap(), None);
    }

    #[test]
    fn out_of_range_face_edge_is_rejected() {
        let mut model = sample();
        model.face_edges[0] = 99;
        assert!(model.check_invariants(&LoadOptions { strict: true }, &mut Vec::new()).is_err());
    }
}
