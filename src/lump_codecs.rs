//! Per-lump decode/encode routines for every fixed-record lump. Each
//! `decode_*` divides the lump length by its record size (a partial record
//! is a [`Error::ShortLump`]) and decodes every record with a per-type
//! routine; each `encode_*` is the exact inverse, called by
//! [`crate::edit_ops`]'s `save_*` rebuilders.

use crate::byte_view::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::header::LumpEntry;
use crate::records::*;

fn record_count(lump: &'static str, len: usize, record_size: usize) -> Result<usize> {
    if len % record_size != 0 {
        return Err(Error::ShortLump { lump, len, record_size });
    }
    Ok(len / record_size)
}

fn read_vec3f(r: &ByteReader, lump: &'static str, offset: usize) -> Result<Vec3f> {
    Ok(Vec3f {
        x: r.read_f32(lump, offset)?,
        y: r.read_f32(lump, offset + 4)?,
        z: r.read_f32(lump, offset + 8)?,
    })
}

fn write_vec3f(w: &mut ByteWriter, v: Vec3f) {
    w.push_f32(v.x);
    w.push_f32(v.y);
    w.push_f32(v.z);
}

fn read_vec3s(r: &ByteReader, lump: &'static str, offset: usize) -> Result<Vec3s> {
    Ok(Vec3s {
        x: r.read_i16(lump, offset)?,
        y: r.read_i16(lump, offset + 2)?,
        z: r.read_i16(lump, offset + 4)?,
    })
}

fn write_vec3s(w: &mut ByteWriter, v: Vec3s) {
    w.push_i16(v.x);
    w.push_i16(v.y);
    w.push_i16(v.z);
}

// ---- Planes (lump 1, 20 B) ----

pub fn decode_planes(r: &ByteReader, entry: LumpEntry) -> Result<Vec<Plane>> {
    let base = entry.offset as usize;
    let n = record_count("Planes", entry.length as usize, PLANE_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * PLANE_SIZE;
        out.push(Plane {
            normal: read_vec3f(r, "Planes", o)?,
            distance: r.read_f32("Planes", o + 12)?,
            plane_type: r.read_u32("Planes", o + 16)?,
        });
    }
    Ok(out)
}

pub fn encode_planes(planes: &[Plane]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(planes.len() * PLANE_SIZE);
    for p in planes {
        write_vec3f(&mut w, p.normal);
        w.push_f32(p.distance);
        w.push_u32(p.plane_type);
    }
    w.into_bytes()
}

// ---- Vertices (lump 2, 12 B) ----

pub fn decode_vertices(r: &ByteReader, entry: LumpEntry) -> Result<Vec<Vertex>> {
    let base = entry.offset as usize;
    let n = record_count("Vertices", entry.length as usize, VERTEX_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        out.push(read_vec3f(r, "Vertices", base + i * VERTEX_SIZE)?);
    }
    Ok(out)
}

pub fn encode_vertices(vertices: &[Vertex]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(vertices.len() * VERTEX_SIZE);
    for v in vertices {
        write_vec3f(&mut w, *v);
    }
    w.into_bytes()
}

// ---- Edges (lump 11, 4 B) ----

pub fn decode_edges(r: &ByteReader, entry: LumpEntry) -> Result<Vec<Edge>> {
    let base = entry.offset as usize;
    let n = record_count("Edges", entry.length as usize, EDGE_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * EDGE_SIZE;
        out.push(Edge {
            v0: r.read_u16("Edges", o)?,
            v1: r.read_u16("Edges", o + 2)?,
        });
    }
    Ok(out)
}

pub fn encode_edges(edges: &[Edge]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(edges.len() * EDGE_SIZE);
    for e in edges {
        w.push_u16(e.v0);
        w.push_u16(e.v1);
    }
    w.into_bytes()
}

// ---- Face-edge table (lump 12, 4 B signed) ----

pub fn decode_face_edges(r: &ByteReader, entry: LumpEntry) -> Result<Vec<FaceEdge>> {
    let base = entry.offset as usize;
    let n = record_count("FaceEdgeTable", entry.length as usize, FACE_EDGE_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        out.push(r.read_i32("FaceEdgeTable", base + i * FACE_EDGE_SIZE)?);
    }
    Ok(out)
}

pub fn encode_face_edges(face_edges: &[FaceEdge]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(face_edges.len() * FACE_EDGE_SIZE);
    for &fe in face_edges {
        w.push_i32(fe);
    }
    w.into_bytes()
}

// ---- Nodes (lump 4, 28 B) ----

pub fn decode_nodes(r: &ByteReader, entry: LumpEntry) -> Result<Vec<Node>> {
    let base = entry.offset as usize;
    let n = record_count("Nodes", entry.length as usize, NODE_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * NODE_SIZE;
        out.push(Node {
            plane: r.read_u32("Nodes", o)?,
            front: r.read_i32("Nodes", o + 4)?,
            back: r.read_i32("Nodes", o + 8)?,
            bbox_min: read_vec3s(r, "Nodes", o + 12)?,
            bbox_max: read_vec3s(r, "Nodes", o + 18)?,
            first_face: r.read_u16("Nodes", o + 24)?,
            num_faces: r.read_u16("Nodes", o + 26)?,
        });
    }
    Ok(out)
}

pub fn encode_nodes(nodes: &[Node]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(nodes.len() * NODE_SIZE);
    for n in nodes {
        w.push_u32(n.plane);
        w.push_i32(n.front);
        w.push_i32(n.back);
        write_vec3s(&mut w, n.bbox_min);
        write_vec3s(&mut w, n.bbox_max);
        w.push_u16(n.first_face);
        w.push_u16(n.num_faces);
    }
    w.into_bytes()
}

// ---- TexInfo (lump 5, 76 B) ----

pub fn decode_tex_infos(r: &ByteReader, entry: LumpEntry) -> Result<Vec<TexInfo>> {
    let base = entry.offset as usize;
    let n = record_count("TextureInformation", entry.length as usize, TEX_INFO_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * TEX_INFO_SIZE;
        let u_axis = read_vec3f(r, "TextureInformation", o)?;
        let u_offset = r.read_f32("TextureInformation", o + 12)?;
        let v_axis = read_vec3f(r, "TextureInformation", o + 16)?;
        let v_offset = r.read_f32("TextureInformation", o + 28)?;
        let raw_flags = r.read_u32("TextureInformation", o + 32)?;
        let value = r.read_u32("TextureInformation", o + 36)?;
        let mut texture_name = [0u8; 32];
        texture_name.copy_from_slice(r.read_bytes("TextureInformation", o + 40, 32)?);
        let next_texinfo = r.read_u32("TextureInformation", o + 72)?;
        out.push(TexInfo {
            u_axis,
            u_offset,
            v_axis,
            v_offset,
            flags: SurfaceFlags::from_bits_retain(raw_flags),
            value,
            texture_name,
            next_texinfo,
        });
    }
    Ok(out)
}

pub fn encode_tex_infos(tex_infos: &[TexInfo]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(tex_infos.len() * TEX_INFO_SIZE);
    for t in tex_infos {
        write_vec3f(&mut w, t.u_axis);
        w.push_f32(t.u_offset);
        write_vec3f(&mut w, t.v_axis);
        w.push_f32(t.v_offset);
        w.push_u32(t.flags.bits());
        w.push_u32(t.value);
        w.push_bytes(&t.texture_name);
        w.push_u32(t.next_texinfo);
    }
    w.into_bytes()
}

// ---- Faces (lump 6, 20 B) ----

pub fn decode_faces(r: &ByteReader, entry: LumpEntry) -> Result<Vec<Face>> {
    let base = entry.offset as usize;
    let n = record_count("Faces", entry.length as usize, FACE_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * FACE_SIZE;
        out.push(Face {
            plane: r.read_u16("Faces", o)?,
            plane_side: r.read_u16("Faces", o + 2)?,
            first_edge: r.read_u32("Faces", o + 4)?,
            num_edges: r.read_u16("Faces", o + 8)?,
            texture_info: r.read_u16("Faces", o + 10)?,
            lightmap_styles: r.read_u32("Faces", o + 12)?,
            lightmap_offsets: r.read_u32("Faces", o + 16)?,
        });
    }
    Ok(out)
}

pub fn encode_faces(faces: &[Face]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(faces.len() * FACE_SIZE);
    for f in faces {
        w.push_u16(f.plane);
        w.push_u16(f.plane_side);
        w.push_u32(f.first_edge);
        w.push_u16(f.num_edges);
        w.push_u16(f.texture_info);
        w.push_u32(f.lightmap_styles);
        w.push_u32(f.lightmap_offsets);
    }
    w.into_bytes()
}

// ---- BSP leaves (lump 8, 28 B) ----

pub fn decode_leaves(r: &ByteReader, entry: LumpEntry) -> Result<Vec<BspLeaf>> {
    let base = entry.offset as usize;
    let n = record_count("Leaves", entry.length as usize, LEAF_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * LEAF_SIZE;
        let mut opaque_head = [0u8; 4];
        opaque_head.copy_from_slice(r.read_bytes("Leaves", o, 4)?);
        let cluster = r.read_u16("Leaves", o + 4)?;
        let mut opaque_area = [0u8; 2];
        opaque_area.copy_from_slice(r.read_bytes("Leaves", o + 6, 2)?);
        let bbox_min = read_vec3s(r, "Leaves", o + 8)?;
        let bbox_max = read_vec3s(r, "Leaves", o + 14)?;
        let first_leaf_face = r.read_u16("Leaves", o + 20)?;
        let num_leaf_faces = r.read_u16("Leaves", o + 22)?;
        let mut opaque_tail = [0u8; 4];
        opaque_tail.copy_from_slice(r.read_bytes("Leaves", o + 24, 4)?);
        out.push(BspLeaf {
            opaque_head,
            cluster,
            opaque_area,
            bbox_min,
            bbox_max,
            first_leaf_face,
            num_leaf_faces,
            opaque_tail,
        });
    }
    Ok(out)
}

pub fn encode_leaves(leaves: &[BspLeaf]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(leaves.len() * LEAF_SIZE);
    for l in leaves {
        w.push_bytes(&l.opaque_head);
        w.push_u16(l.cluster);
        w.push_bytes(&l.opaque_area);
        write_vec3s(&mut w, l.bbox_min);
        write_vec3s(&mut w, l.bbox_max);
        w.push_u16(l.first_leaf_face);
        w.push_u16(l.num_leaf_faces);
        w.push_bytes(&l.opaque_tail);
    }
    w.into_bytes()
}

// ---- Leaf-face table (lump 9, 2 B) ----

pub fn decode_leaf_faces(r: &ByteReader, entry: LumpEntry) -> Result<Vec<LeafFaceEntry>> {
    let base = entry.offset as usize;
    let n = record_count("LeafFaceTable", entry.length as usize, LEAF_FACE_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        out.push(r.read_u16("LeafFaceTable", base + i * LEAF_FACE_SIZE)?);
    }
    Ok(out)
}

pub fn encode_leaf_faces(entries: &[LeafFaceEntry]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(entries.len() * LEAF_FACE_SIZE);
    for &e in entries {
        w.push_u16(e);
    }
    w.into_bytes()
}

// ---- Models (lump 13, 48 B) ----

pub fn decode_models(r: &ByteReader, entry: LumpEntry) -> Result<Vec<Model>> {
    let base = entry.offset as usize;
    let n = record_count("Models", entry.length as usize, MODEL_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * MODEL_SIZE;
        let bbox_min = read_vec3f(r, "Models", o)?;
        let bbox_max = read_vec3f(r, "Models", o + 12)?;
        let origin = read_vec3f(r, "Models", o + 24)?;
        let mut opaque_headnode = [0u8; 4];
        opaque_headnode.copy_from_slice(r.read_bytes("Models", o + 36, 4)?);
        let first_face = r.read_u32("Models", o + 40)?;
        let num_faces = r.read_u32("Models", o + 44)?;
        out.push(Model {
            bbox_min,
            bbox_max,
            origin,
            opaque_headnode,
            first_face,
            num_faces,
        });
    }
    Ok(out)
}

pub fn encode_models(models: &[Model]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(models.len() * MODEL_SIZE);
    for m in models {
        write_vec3f(&mut w, m.bbox_min);
        write_vec3f(&mut w, m.bbox_max);
        write_vec3f(&mut w, m.origin);
        w.push_bytes(&m.opaque_headnode);
        w.push_u32(m.first_face);
        w.push_u32(m.num_faces);
    }
    w.into_bytes()
}

// ---- Brushes (lump 14, 12 B) ----

pub fn decode_brushes(r: &ByteReader, entry: LumpEntry) -> Result<Vec<Brush>> {
    let base = entry.offset as usize;
    let n = record_count("Brushes", entry.length as usize, BRUSH_SIZE)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let o = base + i * BRUSH_SIZE;
        out.push(Brush {
            first_brush_side: r.read_u32("Brushes", o)?,
            num_brush_sides: r.read_u32("Brushes", o + 4)?,
            contents: ContentFlags::from_bits_retain(r.read_u32("Brushes", o + 8)?),
        });
    }
    Ok(out)
}

pub fn encode_brushes(brushes: &[Brush]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(brushes.len() * BRUSH_SIZE);
    for b in brushes {
        w.push_u32(b.first_brush_side);
        w.push_u32(b.num_brush_sides);
        w.push_u32(b.contents.bits());
    }
    w.into_bytes()
}

// ---- Lightmaps (lump 7, 3 B) ----

pub fn decode_lightmap_texels(bytes: &[u8]) -> Result<Vec<LightmapTexel>> {
    if bytes.len() % LIGHTMAP_TEXEL_SIZE != 0 {
        return Err(Error::ShortLump {
            lump: "Lightmaps",
            len: bytes.len(),
            record_size: LIGHTMAP_TEXEL_SIZE,
        });
    }
    Ok(bytes
        .chunks_exact(LIGHTMAP_TEXEL_SIZE)
        .map(|c| LightmapTexel { r: c[0], g: c[1], b: c[2] })
        .collect())
}

pub fn encode_lightmap_texels(texels: &[LightmapTexel]) -> Vec<u8> {
    let mut out = Vec::with_capacity(texels.len() * LIGHTMAP_TEXEL_SIZE);
    for t in texels {
        out.extend_from_slice(&[t.r, t.g, t.b]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::LumpEntry;
    use pretty_assertions::assert_eq;

    #[test]
    fn plane_round_trips() {
        let planes = vec![
            Plane { normal: Vec3f { x: 0.0, y: 0.0, z: 1.0 }, distance: 64.0, plane_type: 2 },
            Plane { normal: Vec3f { x: 1.0, y: 0.0, z: 0.0 }, distance: -16.0, plane_type: 0 },
        ];
        let bytes = encode_planes(&planes);
        let r = ByteReader::new(&bytes);
        let entry = LumpEntry { offset: 0, length: bytes.len() as u32 };
        let decoded = decode_planes(&r, entry).unwrap();
        assert_eq!(decoded, planes);
    }

    #[test]
    fn short_lump_is_rejected() {
        let bytes = vec![0u8; 7];
        let r = ByteReader::new(&bytes);
        let entry = LumpEntry { offset: 0, length: 7 };
        let err = decode_edges(&r, entry).unwrap_err();
        assert!(matches!(err, Error::ShortLump { lump: "Edges", len: 7, record_size: 4 }));
    }

    #[test]
    fn leaf_preserves_opaque_ranges() {
        let mut bytes = vec![0u8; LEAF_SIZE];
        bytes[0..4].copy_from_slice(&[1, 2, 3, 4]);
        bytes[24..28].copy_from_slice(&[9, 8, 7, 6]);
        let r = ByteReader::new(&bytes);
        let entry = LumpEntry { offset: 0, length: LEAF_SIZE as u32 };
        let leaves = decode_leaves(&r, entry).unwrap();
        assert_eq!(leaves[0].opaque_head, [1, 2, 3, 4]);
        assert_eq!(leaves[0].opaque_tail, [9, 8, 7, 6]);
        let re_encoded = encode_leaves(&leaves);
        assert_eq!(re_encoded, bytes);
    }

    #[test]
    fn tex_info_round_trips_with_high_flag_bits() {
        let mut tex = TexInfo {
            u_axis: Vec3f { x: 1.0, y: 0.0, z: 0.0 },
            u_offset: 0.0,
            v_axis: Vec3f { x: 0.0, y: 1.0, z: 0.0 },
            v_offset: 0.0,
            flags: SurfaceFlags::from_bits_retain(0x000F_0001),
            value: 0,
            texture_name: [0u8; 32],
            next_texinfo: 0,
        };
        tex.set_texture_name("metal1");
        let bytes = encode_tex_infos(&[tex]);
        let r = ByteReader::new(&bytes);
        let entry = LumpEntry { offset: 0, length: bytes.len() as u32 };
        let decoded = decode_tex_infos(&r, entry).unwrap();
        assert!(decoded[0].flags.contains(SurfaceFlags::LIGHT));
        assert_eq!(decoded[0].flags.bits(), 0x000F_0001);
    }
}
