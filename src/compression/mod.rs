//! Multi-algorithm compression façade (SPEC_FULL.md §4.1), grounded on
//! `original_source/src/compression/{compress,decompress}.c`.
//!
//! The C source keeps one reusable handle per (method, level) inside a
//! `clod_compressor`/`clod_decompressor` struct so repeated calls on the
//! same thread avoid re-initializing a back-end. Here that becomes
//! `Compressor`/`Decompressor`: plain structs whose fields are lazily
//! populated `Option`s, exactly per the design note in SPEC_FULL.md §9.

mod bz2;
mod deflate;
mod legacy_lz4;
mod lz4;
mod xz;
mod zstd_backend;

use crate::error::CompressionResult;

/// Compression method, tagged per SPEC_FULL.md §6's wire byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
	Uncompressed,
	Gzip,
	Zlib,
	Deflate,
	Lz4Frame,
	Xz,
	Zstd,
	Bzip2,
	MinecraftLz4,
}

impl Method {
	pub fn tag(self) -> u8 {
		match self {
			Method::Uncompressed => 1,
			Method::Gzip => 2,
			Method::Zlib => 3,
			Method::Deflate => 4,
			Method::Lz4Frame => 5,
			Method::Xz => 6,
			Method::Zstd => 7,
			Method::Bzip2 => 8,
			Method::MinecraftLz4 => 10,
		}
	}

	pub fn from_tag(tag: u8) -> Option<Self> {
		Some(match tag {
			1 => Method::Uncompressed,
			2 => Method::Gzip,
			3 => Method::Zlib,
			4 => Method::Deflate,
			5 => Method::Lz4Frame,
			6 => Method::Xz,
			7 => Method::Zstd,
			8 => Method::Bzip2,
			10 => Method::MinecraftLz4,
			_ => return None,
		})
	}
}

/// Every method here is a mandatory dependency rather than a compile-time
/// feature, so this always reports the full set; it exists for interface
/// parity with `clod_compression_support()` (SPEC_FULL.md §1).
pub fn supported_methods() -> &'static [Method] {
	&[
		Method::Uncompressed,
		Method::Gzip,
		Method::Zlib,
		Method::Deflate,
		Method::Lz4Frame,
		Method::Xz,
		Method::Zstd,
		Method::Bzip2,
		Method::MinecraftLz4,
	]
}

/// Abstract compression level, mapped per back-end to a concrete native
/// level (the tables below mirror the ones in `compress.c`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
	Lowest,
	Low,
	Normal,
	High,
	Highest,
}

impl Level {
	fn deflate_level(self) -> u32 {
		match self {
			Level::Lowest => 1,
			Level::Low => 3,
			Level::Normal => 6,
			Level::High => 8,
			Level::Highest => 9,
		}
	}

	fn zstd_level(self) -> i32 {
		match self {
			Level::Lowest => 1,
			Level::Low => 5,
			Level::Normal => 9,
			Level::High => 15,
			Level::Highest => 19,
		}
	}

	fn xz_preset(self) -> u32 {
		match self {
			Level::Lowest => 0,
			Level::Low => 2,
			Level::Normal => 6,
			Level::High => 8,
			Level::Highest => 9,
		}
	}

	fn bzip2_level(self) -> u32 {
		match self {
			Level::Lowest => 1,
			Level::Low => 3,
			Level::Normal => 6,
			Level::High => 8,
			Level::Highest => 9,
		}
	}
}

/// Reusable, single-threaded compressor context. Not `Send`/`Sync` by
/// contract (SPEC_FULL.md §5.6): callers keep one per thread.
#[derive(Default)]
pub struct Compressor {
	deflate: deflate::DeflateCompressors,
	zstd: zstd_backend::ZstdCompressors,
	bz2: bz2::Bz2Compressor,
}

impl Compressor {
	pub fn new() -> Self {
		Self::default()
	}
}

#[derive(Default)]
pub struct Decompressor {
	deflate: deflate::DeflateDecompressors,
	zstd: zstd_backend::ZstdDecompressor,
	bz2: bz2::Bz2Decompressor,
}

impl Decompressor {
	pub fn new() -> Self {
		Self::default()
	}
}

/// Compresses `src` into `dst`, returning the result tag and (on success)
/// the number of bytes written.
pub fn compress(
	ctx: &mut Compressor,
	dst: &mut [u8],
	src: &[u8],
	method: Method,
	level: Level,
) -> (CompressionResult, usize) {
	if src.is_empty() {
		return (CompressionResult::Success, 0);
	}
	let outcome = match method {
		Method::Uncompressed => {
			if dst.len() < src.len() {
				Err(CompressionResult::ShortBuffer)
			} else {
				dst[..src.len()].copy_from_slice(src);
				Ok(src.len())
			}
		}
		Method::Gzip => deflate::compress_gzip(&mut ctx.deflate, dst, src, level),
		Method::Zlib => deflate::compress_zlib(&mut ctx.deflate, dst, src, level),
		Method::Deflate => deflate::compress_deflate(&mut ctx.deflate, dst, src, level),
		Method::Lz4Frame => lz4::compress_frame(dst, src, level),
		Method::Xz => xz::compress(dst, src, level),
		Method::Zstd => zstd_backend::compress(&mut ctx.zstd, dst, src, level),
		Method::Bzip2 => bz2::compress(&mut ctx.bz2, dst, src, level),
		Method::MinecraftLz4 => legacy_lz4::compress(dst, src),
	};
	match outcome {
		Ok(written) => (CompressionResult::Success, written),
		Err(result) => (result, 0),
	}
}

/// Decompresses `src` into `dst`.
///
/// When `want_actual_len` is true the caller is asking "how big is the
/// decoded output", mirroring a non-null `actual_out` pointer in the
/// source: on `ShortBuffer` the third element of the tuple carries the
/// true decoded length when the back-end exposes it (LZ4 frame / Zstd
/// frame content size), `None` otherwise. When `want_actual_len` is false,
/// a decoded length that doesn't exactly fill `dst` is `ShortOutput`.
pub fn decompress(
	ctx: &mut Decompressor,
	dst: &mut [u8],
	src: &[u8],
	method: Method,
	want_actual_len: bool,
) -> (CompressionResult, usize, Option<usize>) {
	if src.is_empty() {
		return (CompressionResult::Success, 0, Some(0));
	}
	let outcome: Result<(usize, Option<usize>), CompressionResult> = match method {
		Method::Uncompressed => {
			if dst.len() < src.len() {
				Err(CompressionResult::ShortBuffer)
			} else {
				dst[..src.len()].copy_from_slice(src);
				Ok((src.len(), Some(src.len())))
			}
		}
		Method::Gzip => deflate::decompress_gzip(&mut ctx.deflate, dst, src),
		Method::Zlib => deflate::decompress_zlib(&mut ctx.deflate, dst, src),
		Method::Deflate => deflate::decompress_deflate(&mut ctx.deflate, dst, src),
		Method::Lz4Frame => lz4::decompress_frame(dst, src),
		Method::Xz => xz::decompress(dst, src),
		Method::Zstd => zstd_backend::decompress(&mut ctx.zstd, dst, src),
		Method::Bzip2 => bz2::decompress(&mut ctx.bz2, dst, src),
		Method::MinecraftLz4 => legacy_lz4::decompress(dst, src),
	};
	match outcome {
		Ok((written, actual)) => {
			if !want_actual_len && written != dst.len() {
				(CompressionResult::ShortOutput, 0, None)
			} else {
				(CompressionResult::Success, written, actual)
			}
		}
		Err(CompressionResult::ShortBuffer) => {
			let actual = if want_actual_len { probe_actual_len(method, src) } else { None };
			(CompressionResult::ShortBuffer, 0, actual)
		}
		Err(result) => (result, 0, None),
	}
}

/// Best-effort true-length probe for `ShortBuffer`, used only by formats
/// that carry their decoded size in the frame (LZ4 frame content size,
/// Zstd frame content size).
fn probe_actual_len(method: Method, src: &[u8]) -> Option<usize> {
	match method {
		Method::Lz4Frame => lz4::frame_content_len(src),
		Method::Zstd => zstd_backend::frame_content_len(src),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn roundtrip(method: Method, level: Level) {
		let src = b"the quick brown fox jumps over the lazy dog, repeated. ".repeat(64);
		let mut ctx = Compressor::new();
		let mut dctx = Decompressor::new();
		let mut compressed = vec![0u8; src.len() * 2 + 1024];
		let (r, written) = compress(&mut ctx, &mut compressed, &src, method, level);
		assert_eq!(r, CompressionResult::Success, "{method:?}");
		let mut decompressed = vec![0u8; src.len()];
		let (r, dwritten, _) = decompress(&mut dctx, &mut decompressed, &compressed[..written], method, false);
		assert_eq!(r, CompressionResult::Success, "{method:?}");
		assert_eq!(dwritten, src.len());
		assert_eq!(&decompressed[..dwritten], &src[..]);
	}

	#[test]
	fn roundtrip_all_methods() {
		for &method in supported_methods() {
			roundtrip(method, Level::Normal);
		}
	}

	#[test]
	fn zero_length_source_is_success_zero() {
		let mut ctx = Compressor::new();
		let mut dst = [0u8; 16];
		for &method in supported_methods() {
			let (r, written) = compress(&mut ctx, &mut dst, &[], method, Level::Normal);
			assert_eq!(r, CompressionResult::Success);
			assert_eq!(written, 0);
		}
	}

	#[test]
	fn zstd_short_buffer_reports_actual_len() {
		let src = vec![0u8; 65536];
		let mut ctx = Compressor::new();
		let mut compressed = vec![0u8; src.len() + 1024];
		let (r, written) = compress(&mut ctx, &mut compressed, &src, Method::Zstd, Level::Normal);
		assert_eq!(r, CompressionResult::Success);
		let mut dctx = Decompressor::new();
		let mut tiny = [0u8; 1];
		let (r, _w, actual) = decompress(&mut dctx, &mut tiny, &compressed[..written], Method::Zstd, true);
		assert_eq!(r, CompressionResult::ShortBuffer);
		assert_eq!(actual, Some(65536));
	}
}
