//! Peer record types decoded from the fixed-record lumps. These mirror the
//! on-disk layouts field-for-field; encoding/decoding lives in
//! [`crate::lump_codecs`] so the types here stay plain data.

use bitflags::bitflags;

/// A 32-bit float triple, used for both positions and plane normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A 16-bit signed integer triple, used for node/leaf bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vec3s {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

pub const PLANE_SIZE: usize = 20;
pub const VERTEX_SIZE: usize = 12;
pub const EDGE_SIZE: usize = 4;
pub const FACE_EDGE_SIZE: usize = 4;
pub const NODE_SIZE: usize = 28;
pub const TEX_INFO_SIZE: usize = 76;
pub const FACE_SIZE: usize = 20;
pub const LEAF_SIZE: usize = 28;
pub const LEAF_FACE_SIZE: usize = 2;
pub const MODEL_SIZE: usize = 48;
pub const BRUSH_SIZE: usize = 12;
pub const LIGHTMAP_TEXEL_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3f,
    pub distance: f32,
    pub plane_type: u32,
}

pub type Vertex = Vec3f;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub v0: u16,
    pub v1: u16,
}

/// Signed face-edge index: a positive value `k` selects `Edges[k]` in its
/// stored direction; a negative value `-k` selects `Edges[k]` reversed.
pub type FaceEdge = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub plane: u32,
    pub front: i32,
    pub back: i32,
    pub bbox_min: Vec3s,
    pub bbox_max: Vec3s,
    pub first_face: u16,
    pub num_faces: u16,
}

bitflags! {
    /// The low 10 named bits of a [`TexInfo`]'s flags word. Bits 10..32 are
    /// not named here but are retained by [`TexInfo::flags`] regardless,
    /// since `bitflags` 2.x's `from_bits_retain` keeps unknown bits instead
    /// of masking them away.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SurfaceFlags: u32 {
        const LIGHT    = 1 << 0;
        const SLICK    = 1 << 1;
        const SKY      = 1 << 2;
        const WARP     = 1 << 3;
        const TRANS33  = 1 << 4;
        const TRANS66  = 1 << 5;
        const FLOWING  = 1 << 6;
        const NODRAW   = 1 << 7;
        const HINT     = 1 << 8;
        const SKIP     = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexInfo {
    pub u_axis: Vec3f,
    pub u_offset: f32,
    pub v_axis: Vec3f,
    pub v_offset: f32,
    /// Named flags plus every preserved high bit, both folded into one
    /// value via [`SurfaceFlags::from_bits_retain`].
    pub flags: SurfaceFlags,
    pub value: u32,
    pub texture_name: [u8; 32],
    pub next_texinfo: u32,
}

impl TexInfo {
    pub fn texture_name_str(&self) -> String {
        let end = self.texture_name.iter().position(|&b| b == 0).unwrap_or(32);
        String::from_utf8_lossy(&self.texture_name[..end]).into_owned()
    }

    pub fn set_texture_name(&mut self, name: &str) {
        let mut bytes = [0u8; 32];
        let src = name.as_bytes();
        let n = src.len().min(32);
        bytes[..n].copy_from_slice(&src[..n]);
        self.texture_name = bytes;
    }

    /// Every set bit of the flags word, named or opaque, as `1 << n` values.
    pub fn flags_raw_bits(&self) -> impl Iterator<Item = u32> + '_ {
        let bits = self.flags.bits();
        (0..32u32).filter(move |n| bits & (1 << n) != 0).map(|n| 1u32 << n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub plane: u16,
    pub plane_side: u16,
    pub first_edge: u32,
    pub num_edges: u16,
    pub texture_info: u16,
    pub lightmap_styles: u32,
    pub lightmap_offsets: u32,
}

/// A leaf node. Bytes `[0..4]` (contents, in the original format) and
/// `[24..28]` (first/num leaf-brush) are not interpreted; `[6..8]` (area)
/// likewise. All three are retained verbatim across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BspLeaf {
    pub opaque_head: [u8; 4],
    pub cluster: u16,
    pub opaque_area: [u8; 2],
    pub bbox_min: Vec3s,
    pub bbox_max: Vec3s,
    pub first_leaf_face: u16,
    pub num_leaf_faces: u16,
    pub opaque_tail: [u8; 4],
}

pub type LeafFaceEntry = u16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Model {
    pub bbox_min: Vec3f,
    pub bbox_max: Vec3f,
    pub origin: Vec3f,
    /// Bytes `[36..40]` (headnode, in the original format); not interpreted.
    pub opaque_headnode: [u8; 4],
    pub first_face: u32,
    pub num_faces: u32,
}

bitflags! {
    /// Named content bits at positions 0..7 and 15..30. Every other bit is
    /// preserved opaquely via `from_bits_retain`, same as [`SurfaceFlags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContentFlags: u32 {
        const SOLID        = 1 << 0;
        const WINDOW        = 1 << 1;
        const AUX           = 1 << 2;
        const LAVA          = 1 << 3;
        const SLIME         = 1 << 4;
        const WATER         = 1 << 5;
        const MIST          = 1 << 6;
        const AREA_PORTAL   = 1 << 15;
        const PLAYER_CLIP   = 1 << 16;
        const MONSTER_CLIP  = 1 << 17;
        const CURRENT_0     = 1 << 18;
        const CURRENT_90    = 1 << 19;
        const CURRENT_180   = 1 << 20;
        const CURRENT_270   = 1 << 21;
        const CURRENT_UP    = 1 << 22;
        const CURRENT_DOWN  = 1 << 23;
        const ORIGIN        = 1 << 24;
        const MONSTER       = 1 << 25;
        const DEAD_MONSTER  = 1 << 26;
        const DETAIL        = 1 << 27;
        const TRANSLUCENT   = 1 << 28;
        const LADDER        = 1 << 29;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    pub first_brush_side: u32,
    pub num_brush_sides: u32,
    pub contents: ContentFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightmapTexel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn surface_flags_preserve_high_bits() {
        let flags = SurfaceFlags::from_bits_retain(0x000F_0001);
        assert!(flags.contains(SurfaceFlags::LIGHT));
        assert!(!flags.contains(SurfaceFlags::SLICK));
        assert_eq!(flags.bits(), 0x000F_0001);
    }

    #[test]
    fn texture_name_round_trips_through_padding() {
        let mut tex = TexInfo {
            u_axis: Vec3f { x: 1.0, y: 0.0, z: 0.0 },
            u_offset: 0.0,
            v_axis: Vec3f { x: 0.0, y: 1.0, z: 0.0 },
            v_offset: 0.0,
            flags: SurfaceFlags::empty(),
            value: 0,
            texture_name: [0u8; 32],
            next_texinfo: 0,
        };
        tex.set_texture_name("e1u1/metal1");
        assert_eq!(tex.texture_name_str(), "e1u1/metal1");
    }

    #[test]
    fn content_flags_cover_named_bit_ranges() {
        let contents = ContentFlags::from_bits_retain(1 | (1 << 29) | (1 << 10));
        assert!(contents.contains(ContentFlags::SOLID));
        assert!(contents.contains(ContentFlags::LADDER));
        assert_eq!(contents.bits() & (1 << 10), 1 << 10);
    }
}
