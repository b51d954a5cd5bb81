//! Position → [`RegionFile`] handle cache with time-based eviction,
//! grounded on `original_source/src/region/file_cache.c` (`evictable_duration_ns`,
//! linear-scan eviction, append-only growth reusing empty slots).

use std::path::Path;
use std::sync::Arc;

use crate::error::RegionResult;

use super::clock::Clock;
use super::filename;
use super::header::HeaderVersion;
use super::regionfile::RegionFile;

const MAX_EVICTABLE_NS: u64 = 10_000_000_000;

struct Entry {
	region_coord: Vec<i64>,
	file: Option<Arc<RegionFile>>,
	last_access: u64,
}

/// Invariant: at most one open [RegionFile] per region coordinate
/// (SPEC_FULL.md §4.4). Lookup is a deliberate linear scan — acceptable
/// because cache size tracks CPU count.
pub struct FileCache {
	entries: Vec<Entry>,
	cpu_count: usize,
}

impl FileCache {
	pub fn new(cpu_count: usize) -> Self {
		FileCache { entries: Vec::new(), cpu_count: cpu_count.max(1) }
	}

	fn evictable_duration_ns(&self) -> u64 {
		MAX_EVICTABLE_NS.saturating_sub((MAX_EVICTABLE_NS / self.cpu_count as u64) * self.entries.len() as u64)
	}

	fn evict_stale(&mut self, now: u64) {
		let duration = self.evictable_duration_ns();
		for entry in &mut self.entries {
			if entry.file.is_some() && now.saturating_sub(entry.last_access) > duration {
				entry.file = None;
			}
		}
	}

	/// Returns the region file for `region_coord`, opening (and caching)
	/// it if not already cached.
	#[allow(clippy::too_many_arguments)]
	pub fn get_or_open(
		&mut self,
		region_coord: &[i64],
		dir: &Path,
		prefix: &str,
		region_ext: &str,
		chunk_ext: &str,
		writeable: bool,
		spill_threshold_sectors: u8,
		header_version: HeaderVersion,
		clock: &dyn Clock,
	) -> RegionResult<Arc<RegionFile>> {
		let now = clock.monotonic_now();
		self.evict_stale(now);

		if let Some(entry) = self.entries.iter_mut().find(|e| e.region_coord == region_coord) {
			if let Some(file) = &entry.file {
				entry.last_access = now;
				return Ok(Arc::clone(file));
			}
			let opened = Self::open_file(region_coord, dir, prefix, region_ext, chunk_ext, writeable, spill_threshold_sectors, header_version)?;
			entry.file = Some(Arc::clone(&opened));
			entry.last_access = now;
			return Ok(opened);
		}

		let opened = Self::open_file(region_coord, dir, prefix, region_ext, chunk_ext, writeable, spill_threshold_sectors, header_version)?;
		if let Some(slot) = self.entries.iter_mut().find(|e| e.file.is_none()) {
			slot.region_coord = region_coord.to_vec();
			slot.file = Some(Arc::clone(&opened));
			slot.last_access = now;
		} else {
			self.entries.push(Entry { region_coord: region_coord.to_vec(), file: Some(Arc::clone(&opened)), last_access: now });
		}
		Ok(opened)
	}

	#[allow(clippy::too_many_arguments)]
	fn open_file(
		region_coord: &[i64],
		dir: &Path,
		prefix: &str,
		region_ext: &str,
		chunk_ext: &str,
		writeable: bool,
		spill_threshold_sectors: u8,
		header_version: HeaderVersion,
	) -> RegionResult<Arc<RegionFile>> {
		let name = filename::make(prefix, region_coord, region_ext);
		let path = dir.join(name);
		Ok(Arc::new(RegionFile::open(&path, writeable, chunk_ext, spill_threshold_sectors, header_version)?))
	}

	/// True if `region_coord` currently holds a live (non-evicted) handle.
	pub fn is_open(&self, region_coord: &[i64]) -> bool {
		self.entries.iter().any(|e| e.region_coord == region_coord && e.file.is_some())
	}

	pub fn len(&self) -> usize {
		self.entries.iter().filter(|e| e.file.is_some()).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::region::clock::FakeClock;

	#[test]
	fn eviction_closes_oldest_entry_after_duration_elapses() {
		let dir = tempfile::tempdir().unwrap();
		let clock = FakeClock::new();
		let mut cache = FileCache::new(4);

		for i in 0..5 {
			clock.advance(3_000_000_000);
			let coord = vec![i as i64, 0];
			cache.get_or_open(&coord, dir.path(), "region", "mcr", "mcc", true, 255, HeaderVersion::Vanilla, &clock).unwrap();
		}

		// Force a lookup (which evicts stale entries) once more time has passed.
		clock.advance(3_000_000_000);
		cache.get_or_open(&[5, 0], dir.path(), "region", "mcr", "mcc", true, 255, HeaderVersion::Vanilla, &clock).unwrap();

		assert!(!cache.is_open(&[0, 0]), "oldest entry should have been evicted");
	}
}
