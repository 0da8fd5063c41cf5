//! The visibility lump: a run-length-encoded cluster-to-cluster PVS/PHS
//! bitset table. Grounded in `Q2BSP.py`'s `__get_vis_data`/`save_vis_data`
//! pair: the header is a cluster count followed by that many
//! `(pvs_offset, phs_offset)` pairs into a shared compressed byte stream, and
//! the compression scheme is "a literal byte is itself; a zero byte is
//! followed by a repeat count and expands to that many zero bytes".

use crate::error::{Result, Warning};

const LUMP: &str = "Visibility";

/// One cluster's decompressed potentially-visible-set and
/// potentially-hearable-set bit rows. Bit `b` of row byte `b/8` is cluster
/// `b`'s visibility/audibility from this cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterVis {
    pub pvs: Vec<u8>,
    pub phs: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisData {
    pub clusters: Vec<ClusterVis>,
}

fn row_bytes(num_clusters: usize) -> usize {
    (num_clusters + 7) / 8
}

fn bit_is_set(row: &[u8], idx: usize) -> bool {
    (row[idx / 8] >> (idx % 8)) & 1 != 0
}

fn set_bit(row: &mut [u8], idx: usize, value: bool) {
    if value {
        row[idx / 8] |= 1 << (idx % 8);
    } else {
        row[idx / 8] &= !(1 << (idx % 8));
    }
}

/// Expands one compressed row starting at `start`, stopping once `len` bytes
/// have been produced. A zero byte followed by a missing count byte, or a
/// stream that runs out before `len` bytes are produced, is tolerated: the
/// remainder is treated as zero and a [`Warning::TruncatedVisRun`] is raised.
fn decompress_row(buf: &[u8], start: usize, len: usize, cluster: usize) -> (Vec<u8>, Option<Warning>) {
    let mut out = Vec::with_capacity(len);
    let mut i = start;
    while out.len() < len {
        if i >= buf.len() {
            out.resize(len, 0);
            return (out, Some(Warning::TruncatedVisRun { cluster }));
        }
        let b = buf[i];
        i += 1;
        if b == 0 {
            if i >= buf.len() {
                out.resize(len, 0);
                return (out, Some(Warning::TruncatedVisRun { cluster }));
            }
            let count = buf[i] as usize;
            i += 1;
            let take = count.min(len - out.len());
            out.extend(std::iter::repeat(0u8).take(take));
        } else {
            out.push(b);
        }
    }
    (out, None)
}

/// Compresses one row: literal bytes pass through, zero runs become
/// `(0x00, count)` pairs with `count` capped at 255, splitting longer runs
/// into multiple pairs.
fn compress_row(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < row.len() {
        if row[i] == 0 {
            let mut run = 0usize;
            while i + run < row.len() && row[i + run] == 0 {
                run += 1;
            }
            let mut remaining = run;
            while remaining > 0 {
                let chunk = remaining.min(255);
                out.push(0);
                out.push(chunk as u8);
                remaining -= chunk;
            }
            i += run;
        } else {
            out.push(row[i]);
            i += 1;
        }
    }
    out
}

pub fn decode_visibility(bytes: &[u8], warnings: &mut Vec<Warning>) -> Result<VisData> {
    if bytes.is_empty() {
        return Ok(VisData::default());
    }

    let r = crate::byte_view::ByteReader::new(bytes);
    let num_clusters = r.read_u32(LUMP, 0)? as usize;
    if num_clusters == 0 {
        return Ok(VisData::default());
    }

    let mut pvs_offsets = Vec::with_capacity(num_clusters);
    let mut phs_offsets = Vec::with_capacity(num_clusters);
    for i in 0..num_clusters {
        let base = 4 + i * 8;
        pvs_offsets.push(r.read_u32(LUMP, base)? as usize);
        phs_offsets.push(r.read_u32(LUMP, base + 4)? as usize);
    }

    let len = row_bytes(num_clusters);
    let mut clusters = Vec::with_capacity(num_clusters);
    for i in 0..num_clusters {
        let (pvs, pvs_warn) = decompress_row(bytes, pvs_offsets[i], len, i);
        if let Some(w) = pvs_warn {
            w.log();
            warnings.push(w);
        }
        let (phs, phs_warn) = decompress_row(bytes, phs_offsets[i], len, i);
        if let Some(w) = phs_warn {
            w.log();
            warnings.push(w);
        }
        clusters.push(ClusterVis { pvs, phs });
    }

    Ok(VisData { clusters })
}

/// Re-emits the cluster table and compressed streams. An unvised model
/// (`clusters` empty) round-trips to a zero-length lump with no header at
/// all, matching what an unvised source file actually stores.
pub fn encode_visibility(data: &VisData) -> Vec<u8> {
    if data.clusters.is_empty() {
        return Vec::new();
    }

    let num_clusters = data.clusters.len();
    let hdr_size = 4 + num_clusters * 8;

    let pvs_blocks: Vec<Vec<u8>> = data.clusters.iter().map(|c| compress_row(&c.pvs)).collect();
    let phs_blocks: Vec<Vec<u8>> = data.clusters.iter().map(|c| compress_row(&c.phs)).collect();

    let mut pvs_offsets = Vec::with_capacity(num_clusters);
    let mut running = hdr_size;
    for block in &pvs_blocks {
        pvs_offsets.push(running as u32);
        running += block.len();
    }
    let mut phs_offsets = Vec::with_capacity(num_clusters);
    for block in &phs_blocks {
        phs_offsets.push(running as u32);
        running += block.len();
    }

    let mut w = crate::byte_view::ByteWriter::with_capacity(running);
    w.push_u32(num_clusters as u32);
    for i in 0..num_clusters {
        w.push_u32(pvs_offsets[i]);
        w.push_u32(phs_offsets[i]);
    }
    for block in &pvs_blocks {
        w.push_bytes(block);
    }
    for block in &phs_blocks {
        w.push_bytes(block);
    }
    w.into_bytes()
}

impl VisData {
    pub fn is_vised(&self) -> bool {
        !self.clusters.is_empty()
    }

    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_visible(&self, from: usize, to: usize) -> bool {
        bit_is_set(&self.clusters[from].pvs, to)
    }

    pub fn is_audible(&self, from: usize, to: usize) -> bool {
        bit_is_set(&self.clusters[from].phs, to)
    }

    /// Marks `to` visible from `from`. Correct assignment semantics: earlier
    /// Quake-era tooling this was ported from used `==` here by mistake,
    /// silently turning the call into a no-op comparison; this sets the bit.
    pub fn set_visible(&mut self, from: usize, to: usize) {
        set_bit(&mut self.clusters[from].pvs, to, true);
    }

    pub fn set_invisible(&mut self, from: usize, to: usize) {
        set_bit(&mut self.clusters[from].pvs, to, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decompresses_mixed_literal_and_zero_runs() {
        let compressed = [0u8, 3, 5, 0, 0, 0, 0, 0, 7];
        let (row, warn) = decompress_row(&compressed, 0, 11, 0);
        assert!(warn.is_none());
        assert_eq!(row, vec![0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn compresses_long_zero_run_into_255_byte_groups() {
        let row = vec![0u8; 600];
        let compressed = compress_row(&row);
        assert_eq!(compressed, vec![0, 255, 0, 255, 0, 90]);
        let (decoded, warn) = decompress_row(&compressed, 0, 600, 0);
        assert!(warn.is_none());
        assert_eq!(decoded, row);
    }

    #[test]
    fn truncated_trailing_zero_count_is_tolerated() {
        let compressed = [5u8, 0];
        let (row, warn) = decompress_row(&compressed, 0, 4, 2);
        assert_eq!(row, vec![5, 0, 0, 0]);
        assert!(matches!(warn, Some(Warning::TruncatedVisRun { cluster: 2 })));
    }

    #[test]
    fn empty_vis_data_encodes_to_zero_bytes() {
        assert_eq!(encode_visibility(&VisData::default()), Vec::<u8>::new());
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let mut data = VisData {
            clusters: vec![
                ClusterVis { pvs: vec![0b0000_0011], phs: vec![0b0000_0001] },
                ClusterVis { pvs: vec![0b0000_0010], phs: vec![0b0000_0011] },
            ],
        };
        data.set_visible(0, 1);
        let encoded = encode_visibility(&data);
        let mut warnings = Vec::new();
        let decoded = decode_visibility(&encoded, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(decoded, data);
        assert!(decoded.is_visible(0, 1));
    }

    #[test]
    fn set_invisible_clears_the_bit() {
        let mut data = VisData {
            clusters: vec![ClusterVis { pvs: vec![0b0000_0011], phs: vec![0u8] }],
        };
        data.set_invisible(0, 0);
        assert!(!data.is_visible(0, 0));
        assert!(data.is_visible(0, 1));
    }
}
