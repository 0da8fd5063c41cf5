//! Editing and re-serialization. `insert_leaf_faces` mutates the decoded
//! collections directly; `update_lump_sizes`/`save_lightmaps` re-encode
//! those collections into the staged lump-body bytes that `save_map`
//! ultimately writes out. A model that's never edited keeps its raw,
//! as-loaded lump bodies, so saving it reproduces the source file exactly.

use std::path::{Path, PathBuf};

use crate::byte_view::{pad4, ByteWriter};
use crate::entities::{encode_entities, EntityLump};
use crate::error::Result;
use crate::header::LumpId;
use crate::lump_codecs;
use crate::model::BspModel;
use crate::records::LeafFaceEntry;
use crate::vis::encode_visibility;

impl BspModel {
    /// Inserts `faces` into the leaf-face table at `index`, shifting every
    /// leaf's `first_leaf_face`/`num_leaf_faces` so existing leaf-face
    /// ranges keep pointing at the same logical entries. A leaf whose range
    /// straddles `index` grows by `faces.len()`; a leaf entirely after
    /// `index` shifts its start by the same amount.
    pub fn insert_leaf_faces(&mut self, faces: &[LeafFaceEntry], index: usize) {
        for (i, &face) in faces.iter().enumerate() {
            self.leaf_faces.insert(index + i, face);
        }

        let inserted = faces.len() as u16;
        for leaf in &mut self.leaves {
            let first = leaf.first_leaf_face as usize;
            let count = leaf.num_leaf_faces as usize;
            if first < index && index <= count + first {
                leaf.num_leaf_faces += inserted;
            } else if first >= index {
                leaf.first_leaf_face += inserted;
            }
        }
    }

    /// Re-encodes the lightmap lump from `self.lightmap`. Kept separate
    /// from [`Self::update_lump_sizes`] because lightmap data can be large
    /// and most edits never touch it.
    pub fn save_lightmaps(&mut self) {
        self.lump_bodies[LumpId::Lightmaps as usize] = lump_codecs::encode_lightmap_texels(&self.lightmap);
    }

    /// Re-encodes every lump except Lightmaps from its decoded collection
    /// and recomputes the directory's offsets from the new lump lengths.
    pub fn update_lump_sizes(&mut self) {
        self.lump_bodies[LumpId::Visibility as usize] = encode_visibility(&self.vis);
        self.lump_bodies[LumpId::TextureInformation as usize] = lump_codecs::encode_tex_infos(&self.tex_infos);
        self.lump_bodies[LumpId::Leaves as usize] = lump_codecs::encode_leaves(&self.leaves);
        self.lump_bodies[LumpId::Models as usize] = lump_codecs::encode_models(&self.models);
        self.lump_bodies[LumpId::LeafFaceTable as usize] = lump_codecs::encode_leaf_faces(&self.leaf_faces);
        self.lump_bodies[LumpId::Brushes as usize] = lump_codecs::encode_brushes(&self.brushes);
        self.lump_bodies[LumpId::Faces as usize] = lump_codecs::encode_faces(&self.faces);
        self.lump_bodies[LumpId::Entities as usize] = encode_entities(&EntityLump {
            worldspawn: self.worldspawn.clone(),
            entities: self.entities.clone(),
        });
        self.lump_bodies[LumpId::Planes as usize] = lump_codecs::encode_planes(&self.planes);
        self.lump_bodies[LumpId::Vertices as usize] = lump_codecs::encode_vertices(&self.vertices);
        self.lump_bodies[LumpId::Edges as usize] = lump_codecs::encode_edges(&self.edges);
        self.lump_bodies[LumpId::FaceEdgeTable as usize] = lump_codecs::encode_face_edges(&self.face_edges);
        self.lump_bodies[LumpId::Nodes as usize] = lump_codecs::encode_nodes(&self.nodes);

        self.directory.recompute_offsets(&self.lump_bodies);
    }

    /// Lays out the header, directory, and every lump body (in file-offset
    /// order, each padded to a 4-byte multiple) into one buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        self.header.encode(&mut w);
        self.directory.encode(&mut w);
        for &idx in &self.directory.lump_order {
            let body = &self.lump_bodies[idx];
            w.push_bytes(body);
            for _ in 0..(pad4(body.len()) - body.len()) {
                w.push_u8(0);
            }
        }
        w.into_bytes()
    }

    /// Writes the map to a sibling of `original_path` with `suffix`
    /// inserted before the extension, leaving `original_path` untouched.
    pub fn save_map(&self, original_path: &Path, suffix: &str) -> Result<PathBuf> {
        let sibling = sibling_path(original_path, suffix);
        std::fs::write(&sibling, self.to_bytes())?;
        Ok(sibling)
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let mut filename = format!("{stem}{suffix}");
    if let Some(ext) = path.extension() {
        filename.push('.');
        filename.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::LoadOptions;
    use crate::records::*;
    use pretty_assertions::assert_eq;

    fn minimal_bsp_bytes() -> Vec<u8> {
        let entities = b"{\n\"classname\" \"worldspawn\"\n}\n\0".to_vec();
        let mut bodies: [Vec<u8>; 19] = Default::default();
        bodies[LumpId::Entities as usize] = entities;

        let mut w = ByteWriter::new();
        w.push_bytes(&crate::header::MAGIC);
        w.push_u32(crate::header::VERSION);

        let mut offset = crate::header::DIRECTORY_END as u32;
        let mut entries = Vec::with_capacity(19);
        for body in &bodies {
            entries.push((offset, body.len() as u32));
            offset += pad4(body.len()) as u32;
        }
        for (o, l) in &entries {
            w.push_u32(*o);
            w.push_u32(*l);
        }
        for body in &bodies {
            w.push_bytes(body);
            for _ in 0..(pad4(body.len()) - body.len()) {
                w.push_u8(0);
            }
        }
        w.into_bytes()
    }

    #[test]
    fn unedited_model_round_trips_byte_identical() {
        let bytes = minimal_bsp_bytes();
        let loaded = BspModel::from_bytes(&bytes, LoadOptions::default()).unwrap();
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.model.to_bytes(), bytes);
    }

    #[test]
    fn insert_leaf_faces_shifts_overlapping_and_later_leaves() {
        let mut model = test_model();
        model.leaf_faces = vec![10, 11, 12, 20, 21];
        model.leaves = vec![
            BspLeaf { first_leaf_face: 0, num_leaf_faces: 3, ..blank_leaf() },
            BspLeaf { first_leaf_face: 3, num_leaf_faces: 2, ..blank_leaf() },
        ];

        model.insert_leaf_faces(&[99], 2);

        assert_eq!(model.leaf_faces, vec![10, 11, 99, 12, 20, 21]);
        assert_eq!(model.leaves[0].first_leaf_face, 0);
        assert_eq!(model.leaves[0].num_leaf_faces, 4);
        assert_eq!(model.leaves[1].first_leaf_face, 4);
        assert_eq!(model.leaves[1].num_leaf_faces, 2);
    }

    #[test]
    fn update_lump_sizes_recomputes_offsets_after_edit() {
        let mut model = test_model();
        model.planes.push(Plane { normal: Vec3f { x: 1.0, y: 0.0, z: 0.0 }, distance: 5.0, plane_type: 0 });
        model.update_lump_sizes();
        let planes_entry = model.directory.entry(crate::header::LumpId::Planes);
        assert_eq!(planes_entry.length as usize, model.planes.len() * PLANE_SIZE);
    }

    fn blank_leaf() -> BspLeaf {
        BspLeaf {
            opaque_head: [0; 4],
            cluster: 0,
            opaque_area: [0; 2],
            bbox_min: Vec3s { x: 0, y: 0, z: 0 },
            bbox_max: Vec3s { x: 0, y: 0, z: 0 },
            first_leaf_face: 0,
            num_leaf_faces: 0,
            opaque_tail: [0; 4],
        }
    }

    fn test_model() -> BspModel {
        let bytes = minimal_bsp_bytes();
        BspModel::from_bytes(&bytes, LoadOptions::default()).unwrap().model
    }
}
