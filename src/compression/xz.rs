//! XZ/LZMA2 back end, grounded on `compress.c`'s `lzma_easy_encoder`/
//! `lzma_code` loop (liblzma via `xz2`).

use std::io::{Read, Write};
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::CompressionResult;
use super::Level;

pub fn compress(dst: &mut [u8], src: &[u8], level: Level) -> Result<usize, CompressionResult> {
	let mut encoder = XzEncoder::new(Vec::with_capacity(src.len()), level.xz_preset());
	encoder.write_all(src).map_err(|_| CompressionResult::AllocFailed)?;
	let buf = encoder.finish().map_err(|_| CompressionResult::AllocFailed)?;
	if buf.len() > dst.len() {
		return Err(CompressionResult::ShortBuffer);
	}
	dst[..buf.len()].copy_from_slice(&buf);
	Ok(buf.len())
}

pub fn decompress(dst: &mut [u8], src: &[u8]) -> Result<usize, CompressionResult> {
	let mut decoder = XzDecoder::new(src);
	let mut out = Vec::new();
	decoder.read_to_end(&mut out).map_err(|_| CompressionResult::Malformed)?;
	if out.len() > dst.len() {
		return Err(CompressionResult::ShortBuffer);
	}
	dst[..out.len()].copy_from_slice(&out);
	Ok(out.len())
}
