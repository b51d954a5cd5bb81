//! Gzip / zlib / raw-deflate back end, grounded on `compress.c`'s libdeflate
//! usage and built on the teacher's existing `flate2` dependency.
//!
//! `flate2::Compress`/`Decompress` only know raw-deflate and zlib framing;
//! gzip framing (10-byte header + raw-deflate body + CRC32 + ISIZE trailer)
//! is assembled by hand around the same cached raw-deflate handle, the way
//! `compress.c` shares one libdeflate compressor across the whole deflate
//! family and only varies the framing.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::CompressionResult;
use crate::hash::ChecksumAlgorithm;
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
pub struct DeflateCompressors {
	raw: [Option<Compress>; LEVELS],
	zlib: [Option<Compress>; LEVELS],
}

#[derive(Default)]
pub struct DeflateDecompressors {
	raw: Option<Decompress>,
	zlib: Option<Decompress>,
}

fn raw_compressor(ctx: &mut DeflateCompressors, level: Level) -> &mut Compress {
	let slot = &mut ctx.raw[level_index(level)];
	slot.get_or_insert_with(|| Compress::new(Compression::new(level.deflate_level()), false))
}

fn zlib_compressor(ctx: &mut DeflateCompressors, level: Level) -> &mut Compress {
	let slot = &mut ctx.zlib[level_index(level)];
	slot.get_or_insert_with(|| Compress::new(Compression::new(level.deflate_level()), true))
}

fn run_compress(compress: &mut Compress, dst: &mut [u8], src: &[u8]) -> Result<usize, CompressionResult> {
	compress.reset();
	match compress.compress(src, dst, FlushCompress::Finish) {
		Ok(Status::StreamEnd) => Ok(compress.total_out() as usize),
		Ok(_) => Err(CompressionResult::ShortBuffer),
		Err(_) => Err(CompressionResult::AllocFailed),
	}
}

fn run_decompress(decompress: &mut Decompress, dst: &mut [u8], src: &[u8], zlib_header: bool) -> Result<usize, CompressionResult> {
	decompress.reset(zlib_header);
	match decompress.decompress(src, dst, FlushDecompress::Finish) {
		Ok(Status::StreamEnd) => Ok(decompress.total_out() as usize),
		Ok(_) => Err(CompressionResult::ShortBuffer),
		Err(_) => Err(CompressionResult::Malformed),
	}
}

pub fn compress_deflate(
	ctx: &mut DeflateCompressors,
	dst: &mut [u8],
	src: &[u8],
	level: Level,
) -> Result<usize, CompressionResult> {
	run_compress(raw_compressor(ctx, level), dst, src)
}

pub fn decompress_deflate(
	ctx: &mut DeflateDecompressors,
	dst: &mut [u8],
	src: &[u8],
) -> Result<usize, CompressionResult> {
	let decompress = ctx.raw.get_or_insert_with(|| Decompress::new(false));
	run_decompress(decompress, dst, src, false)
}

pub fn compress_zlib(
	ctx: &mut DeflateCompressors,
	dst: &mut [u8],
	src: &[u8],
	level: Level,
) -> Result<usize, CompressionResult> {
	run_compress(zlib_compressor(ctx, level), dst, src)
}

pub fn decompress_zlib(
	ctx: &mut DeflateDecompressors,
	dst: &mut [u8],
	src: &[u8],
) -> Result<usize, CompressionResult> {
	let decompress = ctx.zlib.get_or_insert_with(|| Decompress::new(true));
	run_decompress(decompress, dst, src, true)
}

pub fn compress_gzip(
	ctx: &mut DeflateCompressors,
	dst: &mut [u8],
	src: &[u8],
	level: Level,
) -> Result<usize, CompressionResult> {
	if dst.len() < 18 {
		return Err(CompressionResult::ShortBuffer);
	}
	dst[0..10].copy_from_slice(&[0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff]);
	let body_len = run_compress(raw_compressor(ctx, level), &mut dst[10..dst.len() - 8], src)?;
	let crc = ChecksumAlgorithm::Crc32.checksum(src) as u32;
	let trailer_at = 10 + body_len;
	if trailer_at + 8 > dst.len() {
		return Err(CompressionResult::ShortBuffer);
	}
	dst[trailer_at..trailer_at + 4].copy_from_slice(&crc.to_le_bytes());
	dst[trailer_at + 4..trailer_at + 8].copy_from_slice(&(src.len() as u32).to_le_bytes());
	Ok(trailer_at + 8)
}

pub fn decompress_gzip(
	ctx: &mut DeflateDecompressors,
	dst: &mut [u8],
	src: &[u8],
) -> Result<usize, CompressionResult> {
	if src.len() < 18 || src[0] != 0x1f || src[1] != 0x8b {
		return Err(CompressionResult::Malformed);
	}
	let decompress = ctx.raw.get_or_insert_with(|| Decompress::new(false));
	run_decompress(decompress, dst, &src[10..src.len() - 8], false)
}
