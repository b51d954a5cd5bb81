//! LZ4 frame back end, grounded on `compress.c`'s `LZ4F_compressFrame` path.
//!
//! `lz4_flex` has no persistent "context" the way `LZ4F_cctx` is cached in
//! the source — its frame encoder is cheap enough to construct per call, so
//! no handle is cached here (SPEC_FULL.md §4.1: "a single handle suffices
//! otherwise", re-expressed as "no handle is needed at all" where the
//! back-end itself is already stateless).

use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::io::{Read, Write};

use crate::error::CompressionResult;
use super::Level;

pub fn compress_frame(dst: &mut [u8], src: &[u8], _level: Level) -> Result<usize, CompressionResult> {
	let mut encoder = FrameEncoder::new(Vec::with_capacity(src.len()));
	encoder.write_all(src).map_err(|_| CompressionResult::AllocFailed)?;
	let buf = encoder.finish().map_err(|_| CompressionResult::AllocFailed)?;
	if buf.len() > dst.len() {
		return Err(CompressionResult::ShortBuffer);
	}
	dst[..buf.len()].copy_from_slice(&buf);
	Ok(buf.len())
}

pub fn decompress_frame(dst: &mut [u8], src: &[u8]) -> Result<usize, CompressionResult> {
	let mut decoder = FrameDecoder::new(src);
	let mut out = Vec::new();
	decoder.read_to_end(&mut out).map_err(|_| CompressionResult::Malformed)?;
	if out.len() > dst.len() {
		return Err(CompressionResult::ShortBuffer);
	}
	dst[..out.len()].copy_from_slice(&out);
	Ok(out.len())
}

/// LZ4 frames carry the uncompressed content size in their header when the
/// encoder set the flag (as `FrameEncoder` does by default), letting
/// `ShortBuffer` report the true decoded length without fully decoding.
pub fn frame_content_len(src: &[u8]) -> Option<usize> {
	let mut decoder = FrameDecoder::new(src);
	let mut probe = [0u8; 0];
	let _ = decoder.read(&mut probe);
	decoder.content_length().map(|n| n as usize)
}
