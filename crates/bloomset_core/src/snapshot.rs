//! Snapshot file format & IO
//!
//! Header (LE, 32 bytes):
//!   magic[4]   = "BLMS"
//!   version[2] = 1
//!   kind[2]    = FilterKind (1=basic, 2=blocked)
//!   k[4]       = hashes per (block) filter
//!   rsv[4]     = 0
//!   blocks[8]  = b (1 for basic)
//!   route[8]   = routing seed (0 for basic)
//!
//! Block record, repeated b times:
//!   [u32 nseeds][nseeds * u64 seed][u64 blen][blen bytes]
//!
//! Footer:
//!   [u32 crc32(everything above)]
//!
//! Every recorded parameter is taken as is; loading never re-derives (m, k).

use crate::blocked::BlockedFilter;
use crate::consts::{FilterKind, CRC_SIZE, HDR_SIZE, MAGIC_SNAP, VERSION};
use crate::errors::{malformed, BloomError, Result};
use crate::filter::BasicFilter;
use crate::kind::Filter;
use crate::utils::{crc32, read_u16, read_u32, read_u64, write_u16, write_u32, write_u64};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let f = std::fs::OpenOptions::new().read(true).custom_flags(libc::O_DIRECTORY).open(dir)?;
    f.sync_all()
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> { Ok(()) }

fn truncated(e: io::Error) -> BloomError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        malformed("snapshot is truncated")
    } else {
        BloomError::Io(e)
    }
}

fn encode_block<W: Write>(w: &mut W, block: &BasicFilter) -> io::Result<()> {
    write_u32(w, block.seeds().len() as u32)?;
    for &seed in block.seeds() {
        write_u64(w, seed)?;
    }
    write_u64(w, block.bits().len() as u64)?;
    w.write_all(block.bits())
}

pub fn encode(filter: &Filter) -> Result<Vec<u8>> {
    let (blocks, routing): (Vec<&BasicFilter>, u64) = match filter {
        Filter::Basic(f) => (vec![f], 0),
        Filter::Blocked(f) => (f.blocks().iter().collect(), f.routing_seed()),
    };
    let body: usize = blocks.iter().map(|b| 12 + b.seeds().len() * 8 + b.bits().len()).sum();
    let mut out = Vec::with_capacity(HDR_SIZE + body + CRC_SIZE);

    out.extend_from_slice(MAGIC_SNAP);
    write_u16(&mut out, VERSION)?;
    write_u16(&mut out, filter.kind() as u16)?;
    write_u32(&mut out, filter.k())?;
    write_u32(&mut out, 0)?; // rsv
    write_u64(&mut out, blocks.len() as u64)?;
    write_u64(&mut out, routing)?;
    debug_assert_eq!(out.len(), HDR_SIZE);

    for block in blocks {
        encode_block(&mut out, block)?;
    }
    let crc = crc32(&out);
    write_u32(&mut out, crc)?;
    Ok(out)
}

fn decode_block(rdr: &mut &[u8], k: u32, expect_bytes: Option<u64>) -> Result<BasicFilter> {
    let nseeds = read_u32(rdr).map_err(truncated)?;
    if nseeds != k {
        return Err(malformed(format!("block carries {nseeds} seeds, header says k={k}")));
    }
    if nseeds as u64 * 8 > rdr.len() as u64 {
        return Err(malformed(format!("{nseeds} seeds do not fit the snapshot")));
    }
    let mut seeds = Vec::with_capacity(nseeds as usize);
    for _ in 0..nseeds {
        seeds.push(read_u64(rdr).map_err(truncated)?);
    }
    let blen = read_u64(rdr).map_err(truncated)?;
    if let Some(want) = expect_bytes {
        if blen != want {
            return Err(malformed(format!("block holds {blen} bytes, expected {want}")));
        }
    }
    if blen == 0 || blen > rdr.len() as u64 {
        return Err(malformed(format!("bit array length {blen} does not fit the snapshot")));
    }
    let mut bits = vec![0u8; blen as usize];
    rdr.read_exact(&mut bits).map_err(truncated)?;
    BasicFilter::from_parts(blen * 8, seeds, bits)
}

pub fn decode(bytes: &[u8]) -> Result<Filter> {
    if bytes.len() < 4 || &bytes[0..4] != MAGIC_SNAP {
        return Err(BloomError::BadHeader);
    }
    if bytes.len() < HDR_SIZE + CRC_SIZE {
        return Err(malformed("snapshot is truncated"));
    }
    let (payload, footer) = bytes.split_at(bytes.len() - CRC_SIZE);
    let want = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    if crc32(payload) != want {
        return Err(BloomError::Corrupt);
    }

    let mut rdr = &payload[4..];
    let ver = read_u16(&mut rdr).map_err(truncated)?;
    if ver != VERSION { return Err(BloomError::BadHeader); }
    let raw_kind = read_u16(&mut rdr).map_err(truncated)?;
    let kind = FilterKind::from_u16(raw_kind).ok_or(BloomError::Unsupported(raw_kind))?;
    let k = read_u32(&mut rdr).map_err(truncated)?;
    let _rsv = read_u32(&mut rdr).map_err(truncated)?;
    let nblocks = read_u64(&mut rdr).map_err(truncated)?;
    let routing = read_u64(&mut rdr).map_err(truncated)?;

    if k == 0 {
        return Err(malformed("k must be at least 1"));
    }
    let filter = match kind {
        FilterKind::Basic => {
            if nblocks != 1 {
                return Err(malformed(format!("basic filter declares {nblocks} blocks")));
            }
            Filter::Basic(decode_block(&mut rdr, k, None)?)
        }
        FilterKind::Blocked => {
            // each block needs at least its nseeds and blen fields
            if nblocks == 0 || nblocks > (rdr.len() / 12) as u64 {
                return Err(malformed(format!("{nblocks} blocks do not fit the snapshot")));
            }
            let first = decode_block(&mut rdr, k, None)?;
            let block_bytes = first.bits().len() as u64;
            let mut blocks = Vec::with_capacity(nblocks as usize);
            blocks.push(first);
            for _ in 1..nblocks {
                blocks.push(decode_block(&mut rdr, k, Some(block_bytes))?);
            }
            Filter::Blocked(BlockedFilter::from_parts(routing, blocks)?)
        }
    };
    if !rdr.is_empty() {
        return Err(malformed(format!("{} trailing bytes after last block", rdr.len())));
    }
    Ok(filter)
}

/// Writes to a temp file beside `path`, then publishes it atomically.
pub fn write_snapshot(path: impl AsRef<Path>, filter: &Filter) -> Result<PathBuf> {
    let path_final = path.as_ref().to_path_buf();
    let dir = match path_final.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let bytes = encode(filter)?;
    let mut tmp = tempfile::Builder::new().prefix("bloom_snap_").tempfile_in(dir)?;
    tmp.as_file_mut().write_all(&bytes)?;
    tmp.as_file_mut().sync_all()?;
    let _persisted = tmp.persist(&path_final)?;
    let _ = fsync_dir(&path_final);
    tracing::debug!(path = %path_final.display(), bytes = bytes.len(), "snapshot written");
    Ok(path_final)
}

pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Filter> {
    let f = File::open(path.as_ref())?;
    let len = f.metadata()?.len();
    if len == 0 {
        return Err(BloomError::BadHeader);
    }
    // SAFETY: the map is read-only and dropped before returning; snapshots are
    // published by rename, never rewritten in place.
    let mmap = unsafe { Mmap::map(&f)? };
    let filter = decode(&mmap)?;
    tracing::debug!(path = %path.as_ref().display(), kind = %filter.kind(), "snapshot loaded");
    Ok(filter)
}
