//! The public Region façade: option validation, entry/leave guard, and
//! the read/write/mtime/iterate operations, grounded on
//! `original_source/src/region/region_open.c` (`read_opts`) and
//! `region_impl.h` (`REGION_PUBLIC_ENTER/LEAVE`), per SPEC_FULL.md §4.5/§5.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::compression::{self, Compressor, Decompressor, Level, Method};
use crate::error::{RegionError, RegionResult};
use crate::hash::ChecksumAlgorithm;

use super::clock::{Clock, SystemClock};
use super::coord::RegionCoord;
use super::filecache::FileCache;
use super::filename;
use super::header::{HeaderVersion, EXTENDED_MAGIC, EXTENDED_MAGIC_LEN, VANILLA_HEADER_BYTES};
use super::vmath;

/// Compile-time library version, checked against [`RegionOptions::library_version`]
/// (SPEC_FULL.md §6 — "must equal a compile-time constant, else INVALID_USAGE").
pub const LIBRARY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
	ReadOnly,
	ReadWrite,
}

/// Builder-validated options for [`Region::open`], validated once and
/// immutable afterward (SPEC_FULL.md §1 ambient stack / §4.5).
#[derive(Debug, Clone)]
pub struct RegionOptions {
	pub library_version: u32,
	pub dims: usize,
	pub mode: OpenMode,
	pub sector_size: u32,
	pub prefix: String,
	pub region_ext: String,
	pub chunk_ext: String,
	pub compression: Option<Method>,
	pub compression_level: Level,
	pub checksum: ChecksumAlgorithm,
	/// Forces the compound (vanilla + extended) header layout for
	/// backward compatibility; otherwise header shape is chosen per
	/// §3.5 (vanilla if vanilla-compatible, extended otherwise).
	pub force_compound_header: bool,
	/// Threshold, in 4KiB sectors, above which a chunk spills to a
	/// sidecar file (SPEC_FULL.md §9 open-question decision).
	pub spill_threshold_sectors: u8,
}

impl Default for RegionOptions {
	fn default() -> Self {
		RegionOptions {
			library_version: LIBRARY_VERSION,
			dims: 2,
			mode: OpenMode::ReadWrite,
			sector_size: 4096,
			prefix: "region".to_string(),
			region_ext: "mcr".to_string(),
			chunk_ext: "mcc".to_string(),
			compression: None,
			compression_level: Level::Normal,
			checksum: ChecksumAlgorithm::default(),
			force_compound_header: false,
			spill_threshold_sectors: 255,
		}
	}
}

impl RegionOptions {
	pub fn vanilla_compatible(&self) -> bool {
		self.dims == 2 && self.prefix == "region" && (self.region_ext == "mca" || self.region_ext == "mcr")
	}

	fn header_version(&self) -> HeaderVersion {
		if self.force_compound_header {
			HeaderVersion::Compound
		} else if self.vanilla_compatible() {
			HeaderVersion::Vanilla
		} else {
			HeaderVersion::Extended
		}
	}

	fn resolved_compression(&self) -> Method {
		self.compression.unwrap_or(if self.vanilla_compatible() { Method::Zlib } else { Method::Lz4Frame })
	}

	/// Validates and defaults options, per `read_opts()`.
	fn validate(&self) -> RegionResult<()> {
		if self.library_version != LIBRARY_VERSION {
			return Err(RegionError::invalid_usage("library version mismatch"));
		}
		if self.dims < 1 || self.dims > 10 {
			return Err(RegionError::invalid_usage("dimensionality must be between 1 and 10"));
		}
		if self.prefix.len() > filename::MAX_PREFIX_LEN || self.prefix.contains('.') {
			return Err(RegionError::invalid_usage("prefix must be <=30 chars and contain no '.'"));
		}
		if self.region_ext.len() > filename::MAX_EXT_LEN || self.chunk_ext.len() > filename::MAX_EXT_LEN {
			return Err(RegionError::invalid_usage("extension must be <=14 chars"));
		}
		if self.sector_size == 0 {
			return Err(RegionError::invalid_usage("sector size must be non-zero"));
		}
		Ok(())
	}
}

/// A Region owns validated options, a directory handle, a global mutex
/// guarding the file cache, and an in-use counter asserted on every
/// public entry (SPEC_FULL.md §3.2).
pub struct Region {
	options: RegionOptions,
	dir: PathBuf,
	cache: Mutex<FileCache>,
	clock: Box<dyn Clock>,
	in_use: AtomicUsize,
}

/// RAII entry/leave guard: increments on construction, decrements on
/// drop. Closing a Region while this counter is non-zero is a fatal
/// programmer error (SPEC_FULL.md §3.2/§5.4).
struct EntryGuard<'a> {
	region: &'a Region,
}

impl<'a> EntryGuard<'a> {
	fn enter(region: &'a Region) -> Self {
		region.in_use.fetch_add(1, Ordering::SeqCst);
		EntryGuard { region }
	}
}

impl Drop for EntryGuard<'_> {
	fn drop(&mut self) {
		self.region.in_use.fetch_sub(1, Ordering::SeqCst);
	}
}

impl Region {
	pub fn open(dir: impl AsRef<Path>, options: RegionOptions) -> RegionResult<Self> {
		options.validate()?;
		let dir = dir.as_ref().to_path_buf();
		std::fs::create_dir_all(&dir)?;
		let cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
		Ok(Region {
			options,
			dir,
			cache: Mutex::new(FileCache::new(cpu_count)),
			clock: Box::new(SystemClock::new()),
			in_use: AtomicUsize::new(0),
		})
	}

	fn writeable(&self) -> bool {
		self.options.mode == OpenMode::ReadWrite
	}

	fn split_pos(&self, pos: &[i64]) -> RegionResult<(Vec<i64>, RegionCoord)> {
		if pos.len() != self.options.dims {
			return Err(RegionError::invalid_usage("position dimensionality mismatch"));
		}
		let mut vec = pos.to_vec();
		let slot = vmath::group(&mut vec, 10);
		Ok((vec, RegionCoord::new(slot)))
	}

	/// Reads the chunk at `pos` into an owned buffer.
	pub fn read(&self, pos: &[i64]) -> RegionResult<Vec<u8>> {
		let _guard = EntryGuard::enter(self);
		let (region_coord, slot) = self.split_pos(pos)?;

		// The cache mutex stays held across `get_or_open` *and* the
		// `read_framed` call that takes `RegionFile`'s own lock, per
		// SPEC_FULL.md §5: Region mutex first, then RegionFile lock,
		// only then release the Region mutex. Releasing it the moment
		// `get_or_open` returns would let another thread evict/close
		// this handle before the read actually acquires its lock.
		let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
		let file = cache.get_or_open(
			&region_coord,
			&self.dir,
			&self.options.prefix,
			&self.options.region_ext,
			&self.options.chunk_ext,
			self.writeable(),
			self.options.spill_threshold_sectors,
			self.options.header_version(),
			self.clock.as_ref(),
		)?;

		// `RegionFile::read_framed` already strips the 4-byte sector-level
		// length prefix (SPEC_FULL.md §3.5's "4-byte length" field); what's
		// left is exactly `[1-byte method][compressed bytes]`.
		let framed = file.read_framed(slot)?.ok_or(RegionError::NotFound)?;
		drop(cache);
		if framed.is_empty() {
			return Err(RegionError::malformed("chunk framing truncated"));
		}
		let method = Method::from_tag(framed[0]).ok_or_else(|| RegionError::malformed("unknown compression method tag"))?;
		let compressed = &framed[1..];

		let mut dctx = Decompressor::new();
		// Decode into a generously-sized scratch buffer, growing on SHORT_BUFFER.
		let mut out = vec![0u8; compressed.len().max(4096) * 4];
		loop {
			let (result, written, actual) = compression::decompress(&mut dctx, &mut out, compressed, method, true);
			match result {
				crate::error::CompressionResult::Success => {
					out.truncate(written);
					return Ok(out);
				}
				crate::error::CompressionResult::ShortBuffer => {
					let grow_to = actual.unwrap_or(out.len() * 2).max(out.len() * 2);
					out.resize(grow_to, 0);
				}
				_ => return Err(RegionError::malformed("chunk decompression failed")),
			}
		}
	}

	/// Writes `data` at `pos` under the region's configured compression
	/// method, or deletes the slot when `data` is `None`.
	pub fn write(&self, pos: &[i64], data: Option<&[u8]>) -> RegionResult<()> {
		let _guard = EntryGuard::enter(self);
		if !self.writeable() {
			return Err(RegionError::invalid_usage("region opened read-only"));
		}
		let (region_coord, slot) = self.split_pos(pos)?;

		// See the comment in `read` for why the cache mutex is held across
		// the `get_or_open`/`write_framed`(or `delete`) pair.
		let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
		let file = cache.get_or_open(
			&region_coord,
			&self.dir,
			&self.options.prefix,
			&self.options.region_ext,
			&self.options.chunk_ext,
			true,
			self.options.spill_threshold_sectors,
			self.options.header_version(),
			self.clock.as_ref(),
		)?;

		let Some(data) = data else {
			let result = file.delete(slot);
			drop(cache);
			return result;
		};

		let method = self.options.resolved_compression();
		let mut ctx = Compressor::new();
		let mut compressed = vec![0u8; data.len() + data.len() / 2 + 256];
		let (result, written) = loop {
			let (result, written) = compression::compress(&mut ctx, &mut compressed, data, method, self.options.compression_level);
			if result == crate::error::CompressionResult::ShortBuffer {
				compressed.resize(compressed.len() * 2, 0);
				continue;
			}
			break (result, written);
		};
		if result != crate::error::CompressionResult::Success {
			return Err(RegionError::invalid_usage("chunk compression failed"));
		}

		// `RegionFile::write_framed` prepends the 4-byte sector-level length
		// prefix itself; here we only supply `[1-byte method][compressed bytes]`.
		let mut framed = Vec::with_capacity(1 + written);
		framed.push(method.tag());
		framed.extend_from_slice(&compressed[..written]);

		let result = file.write_framed(slot, &framed);
		drop(cache);
		result
	}

	pub fn mtime(&self, pos: &[i64]) -> RegionResult<u32> {
		let _guard = EntryGuard::enter(self);
		let (region_coord, slot) = self.split_pos(pos)?;
		let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
		let file = cache.get_or_open(
			&region_coord,
			&self.dir,
			&self.options.prefix,
			&self.options.region_ext,
			&self.options.chunk_ext,
			self.writeable(),
			self.options.spill_threshold_sectors,
			self.options.header_version(),
			self.clock.as_ref(),
		)?;
		let result = file.mtime(slot)?.ok_or(RegionError::NotFound);
		drop(cache);
		result
	}

	/// Enumerates region-file paths in the directory matching this
	/// region's filename grammar, parsing their coordinates back out.
	pub fn iter_region_coords(&self) -> RegionResult<Vec<Vec<i64>>> {
		let _guard = EntryGuard::enter(self);
		let mut out = Vec::new();
		for entry in std::fs::read_dir(&self.dir)? {
			let entry = entry?;
			let name = entry.file_name();
			let Some(name) = name.to_str() else { continue };
			if let Some(coords) = filename::parse(name, &self.options.prefix, self.options.dims, &self.options.region_ext) {
				out.push(coords);
			}
		}
		Ok(out)
	}

	/// Closes the region. Fatal (panics) if called while any other public
	/// call is still in progress, per SPEC_FULL.md §5.4/§7.
	pub fn close(self) {
		let in_use = self.in_use.load(Ordering::SeqCst);
		assert_eq!(in_use, 0, "Region::close called while {in_use} call(s) still in progress");
	}

	pub fn header_version(&self) -> HeaderVersion {
		self.options.header_version()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roundtrip_at_origin_d2() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(dir.path(), RegionOptions { compression: Some(Method::Zlib), ..Default::default() }).unwrap();
		let data = vec![0xAAu8; 1024];
		region.write(&[0, 0], Some(&data)).unwrap();
		let read_back = region.read(&[0, 0]).unwrap();
		assert_eq!(read_back, data);
		assert!(dir.path().join("region.0.0.mcr").exists());
	}

	#[test]
	fn spill_file_write_roundtrips() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(dir.path(), RegionOptions { compression: Some(Method::Uncompressed), spill_threshold_sectors: 4, ..Default::default() }).unwrap();
		let data = vec![0x42u8; 64 * 1024];
		region.write(&[0, 0], Some(&data)).unwrap();

		assert!(dir.path().join("region.0.0.mcc").exists(), "spill sidecar should exist");
		let read_back = region.read(&[0, 0]).unwrap();
		assert_eq!(read_back, data);
	}

	#[test]
	fn vanilla_interop_explicit_mode_uses_vanilla_header() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(
			dir.path(),
			RegionOptions { region_ext: "mca".to_string(), compression: Some(Method::Zlib), ..Default::default() },
		)
		.unwrap();
		assert_eq!(region.header_version(), HeaderVersion::Vanilla);

		region.write(&[1, -2], Some(b"vanilla-compatible chunk bytes")).unwrap();
		let bytes = std::fs::read(dir.path().join("region.1.-2.mca")).unwrap();
		assert!(bytes.len() >= VANILLA_HEADER_BYTES as usize);
		assert_eq!(region.read(&[1, -2]).unwrap(), b"vanilla-compatible chunk bytes".to_vec());
	}

	#[test]
	fn force_compound_header_writes_and_reads_back_both_copies() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(
			dir.path(),
			RegionOptions { force_compound_header: true, compression: Some(Method::Zlib), ..Default::default() },
		)
		.unwrap();
		assert_eq!(region.header_version(), HeaderVersion::Compound);

		region.write(&[3, -4], Some(b"compound header chunk bytes")).unwrap();
		let bytes = std::fs::read(dir.path().join("region.3.-4.mcr")).unwrap();
		assert!(bytes.len() as u64 >= VANILLA_HEADER_BYTES + EXTENDED_MAGIC_LEN as u64);
		assert_eq!(&bytes[VANILLA_HEADER_BYTES as usize..VANILLA_HEADER_BYTES as usize + EXTENDED_MAGIC.len()], EXTENDED_MAGIC);
		assert_eq!(region.read(&[3, -4]).unwrap(), b"compound header chunk bytes".to_vec());
	}

	#[test]
	fn non_vanilla_extension_uses_extended_header() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(
			dir.path(),
			RegionOptions { region_ext: "ext".to_string(), compression: Some(Method::Zlib), ..Default::default() },
		)
		.unwrap();
		assert_eq!(region.header_version(), HeaderVersion::Extended);

		region.write(&[0, 1], Some(b"extended header chunk bytes")).unwrap();
		let bytes = std::fs::read(dir.path().join("region.0.1.ext")).unwrap();
		assert_eq!(&bytes[..EXTENDED_MAGIC.len()], EXTENDED_MAGIC);
		assert_eq!(region.read(&[0, 1]).unwrap(), b"extended header chunk bytes".to_vec());
	}

	#[test]
	fn read_of_empty_slot_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(dir.path(), RegionOptions::default()).unwrap();
		match region.read(&[5, 5]) {
			Err(RegionError::NotFound) => {}
			other => panic!("expected NotFound, got {other:?}"),
		}
	}

	#[test]
	fn write_then_delete_then_read_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(dir.path(), RegionOptions::default()).unwrap();
		region.write(&[1, 1], Some(b"hello")).unwrap();
		region.write(&[1, 1], None).unwrap();
		match region.read(&[1, 1]) {
			Err(RegionError::NotFound) => {}
			other => panic!("expected NotFound, got {other:?}"),
		}
	}

	#[test]
	#[should_panic]
	fn close_while_in_use_is_fatal() {
		let dir = tempfile::tempdir().unwrap();
		let region = Region::open(dir.path(), RegionOptions::default()).unwrap();
		region.in_use.fetch_add(1, Ordering::SeqCst);
		region.close();
	}
}
