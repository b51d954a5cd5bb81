//! Zstd back end, grounded on `compress.c`'s cached `ZSTD_CCtx` per level.
//! Named `zstd_backend` rather than `zstd` to avoid shadowing the crate.

use crate::error::CompressionResult;
use super::Level;

const LEVELS: usize = 5;

fn level_index(level: Level) -> usize {
	match level {
		Level::Lowest => 0,
		Level::Low => 1,
		Level::Normal => 2,
		Level::High => 3,
		Level::Highest => 4,
	}
}

#[derive(Default)]
pub struct ZstdCompressors {
	ctx: [Option<zstd::bulk::Compressor<'static>>; LEVELS],
}

#[derive(Default)]
pub struct ZstdDecompressor {
	ctx: Option<zstd::bulk::Decompressor<'static>>,
}

pub fn compress(ctx: &mut ZstdCompressors, dst: &mut [u8], src: &[u8], level: Level) -> Result<usize, CompressionResult> {
	let slot = &mut ctx.ctx[level_index(level)];
	let compressor = match slot {
		Some(c) => c,
		None => {
			let c = zstd::bulk::Compressor::new(level.zstd_level()).map_err(|_| CompressionResult::AllocFailed)?;
			slot.insert(c)
		}
	};
	match compressor.compress_to_buffer(src, dst) {
		Ok(written) => Ok(written),
		Err(_) => Err(CompressionResult::ShortBuffer),
	}
}

pub fn decompress(ctx: &mut ZstdDecompressor, dst: &mut [u8], src: &[u8]) -> Result<usize, CompressionResult> {
	let decompressor = match &mut ctx.ctx {
		Some(d) => d,
		None => {
			let d = zstd::bulk::Decompressor::new().map_err(|_| CompressionResult::AllocFailed)?;
			ctx.ctx.insert(d)
		}
	};
	match decompressor.decompress_to_buffer(src, dst) {
		Ok(written) => Ok(written),
		Err(_) => {
			if frame_content_len(src).map(|n| n > dst.len()).unwrap_or(false) {
				Err(CompressionResult::ShortBuffer)
			} else {
				Err(CompressionResult::Malformed)
			}
		}
	}
}

/// Zstd frames carry the content size in the frame header; decoding fully
/// is the portable way to recover it without depending on the lower-level
/// `zstd_safe` frame-inspection API directly.
pub fn frame_content_len(src: &[u8]) -> Option<usize> {
	zstd::stream::decode_all(src).ok().map(|v| v.len())
}
