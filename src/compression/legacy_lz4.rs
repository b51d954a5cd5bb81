//! Legacy Minecraft LZ4 container: a 4-byte big-endian uncompressed-size
//! prefix followed by a raw (non-framed) LZ4 block, distinct from the
//! modern LZ4-frame method. Some Minecraft server forks historically used
//! this as an unofficial region compression scheme; carried here as
//! `Method::MinecraftLz4` per the glossary entry in SPEC_FULL.md.

use byteorder::{BigEndian, ByteOrder};

use crate::error::CompressionResult;

pub fn compress(dst: &mut [u8], src: &[u8]) -> Result<usize, CompressionResult> {
	if dst.len() < 4 {
		return Err(CompressionResult::ShortBuffer);
	}
	let body = lz4_flex::block::compress(src);
	if body.len() + 4 > dst.len() {
		return Err(CompressionResult::ShortBuffer);
	}
	BigEndian::write_u32(&mut dst[0..4], src.len() as u32);
	dst[4..4 + body.len()].copy_from_slice(&body);
	Ok(4 + body.len())
}

pub fn decompress(dst: &mut [u8], src: &[u8]) -> Result<usize, CompressionResult> {
	if src.len() < 4 {
		return Err(CompressionResult::Malformed);
	}
	let uncompressed_len = BigEndian::read_u32(&src[0..4]) as usize;
	if uncompressed_len > dst.len() {
		return Err(CompressionResult::ShortBuffer);
	}
	match lz4_flex::block::decompress(&src[4..], uncompressed_len) {
		Ok(out) => {
			dst[..out.len()].copy_from_slice(&out);
			Ok(out.len())
		}
		Err(_) => Err(CompressionResult::Malformed),
	}
}
