//! mmap-backed per-region-file I/O, grounded on
//! `original_source/src/region/platform/unix/file.c` (mmap/mremap/truncate
//! logic) and the teacher's rwlock-guarded `RegionFile` handle shape
//! (`world/io/region/regionfile.rs`).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use memmap2::{Mmap, MmapMut};

use crate::error::{RegionError, RegionResult};
use crate::ioext::*;

use super::coord::RegionCoord;
use super::header::{encode_header, header_reserved_bytes, header_reserved_sectors, read_header, HeaderVersion, RegionHeader};
use super::sectormanager::{SectorAllocator, SectorManager};

const SECTOR_SIZE: u64 = 4096;

enum MapView {
	None,
	ReadOnly(Mmap),
	ReadWrite(MmapMut),
}

impl MapView {
	fn as_slice(&self) -> &[u8] {
		match self {
			MapView::None => &[],
			MapView::ReadOnly(m) => &m[..],
			MapView::ReadWrite(m) => &m[..],
		}
	}

	fn len(&self) -> usize {
		self.as_slice().len()
	}
}

/// One open region file: `CLOSED → OPEN_RO | OPEN_RW` per SPEC_FULL.md §4.3.
/// Readers take the read side of `lock`, writers the write side; the file
/// cache's global mutex must already be released before operating on this
/// lock (SPEC_FULL.md §5).
pub struct RegionFile {
	inner: RwLock<RegionFileInner>,
}

struct RegionFileInner {
	file: File,
	map: MapView,
	writeable: bool,
	sectors: SectorManager,
	path: PathBuf,
	chunk_ext: String,
	spill_threshold_sectors: u8,
	header_version: HeaderVersion,
}

impl RegionFile {
	/// Opens (creating if absent, in RW mode) the region file at `path`,
	/// writing and reading the header shape named by `header_version`
	/// (SPEC_FULL.md §3.5) rather than assuming the vanilla layout.
	pub fn open(path: &Path, writeable: bool, chunk_ext: &str, spill_threshold_sectors: u8, header_version: HeaderVersion) -> RegionResult<Self> {
		let file = OpenOptions::new()
			.read(true)
			.write(writeable)
			.create(writeable)
			.open(path)?;
		let len = file.metadata()?.len();

		let map = if len == 0 {
			MapView::None
		} else if writeable {
			MapView::ReadWrite(unsafe { MmapMut::map_mut(&file)? })
		} else {
			MapView::ReadOnly(unsafe { Mmap::map(&file)? })
		};

		let header_sectors = header_reserved_sectors(header_version)?;
		let sectors = if len == 0 {
			SectorManager::new_with_header_sectors(header_sectors)
		} else {
			let header = read_header(header_version, map.as_slice())?;
			SectorManager::from_table_with_header(&header.sectors, header_sectors)
		};

		Ok(RegionFile {
			inner: RwLock::new(RegionFileInner {
				file,
				map,
				writeable,
				sectors,
				path: path.to_path_buf(),
				chunk_ext: chunk_ext.to_string(),
				spill_threshold_sectors,
				header_version,
			}),
		})
	}

	fn spill_path(inner: &RegionFileInner, slot: RegionCoord) -> PathBuf {
		let mut name = inner.path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
		name.push_str(&format!(".slot{}.{}", slot.index(), inner.chunk_ext));
		inner.path.with_file_name(name)
	}

	/// Reads the sector's payload (`[1-byte method][compressed bytes]`,
	/// with the 4-byte sector-level length prefix already stripped) for
	/// `slot`, following spill if the sector table entry is empty but a
	/// spill sidecar exists. Returns `None` if truly empty (SPEC_FULL.md
	/// §4.3 step 4/5).
	pub fn read_framed(&self, slot: RegionCoord) -> RegionResult<Option<Vec<u8>>> {
		let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
		if (inner.map.len() as u64) < header_reserved_bytes(inner.header_version)? {
			return Ok(None);
		}
		let header = read_header(inner.header_version, inner.map.as_slice())?;
		let sector = header.sectors[slot];
		if sector.is_empty() {
			let spill = Self::spill_path(&inner, slot);
			if spill.exists() {
				return Ok(Some(std::fs::read(&spill)?));
			}
			return Ok(None);
		}
		let start = sector.offset() as usize;
		let end = sector.end_offset() as usize;
		let bytes = inner.map.as_slice();
		if end > bytes.len() || start + 4 > bytes.len() {
			return Err(RegionError::malformed("sector extent out of bounds"));
		}
		let payload_len = u32::from_be_bytes(bytes[start..start + 4].try_into().unwrap()) as usize;
		let body_start = start + 4;
		let body_end = body_start.checked_add(payload_len).ok_or_else(|| RegionError::malformed("payload length overflow"))?;
		if body_end > bytes.len() {
			return Err(RegionError::malformed("payload length exceeds sector extent"));
		}
		Ok(Some(bytes[body_start..body_end].to_vec()))
	}

	/// Writes `payload` (`[1-byte method][compressed bytes]`) for `slot`,
	/// prefixing it with the 4-byte sector-level length field on disk
	/// (together forming the vanilla chunk framing, SPEC_FULL.md §3.5).
	/// Reuses the existing sector extent when the new size fits, else
	/// reallocates. Spills to a sidecar file when the needed sector count
	/// exceeds `spill_threshold_sectors`.
	pub fn write_framed(&self, slot: RegionCoord, framed: &[u8]) -> RegionResult<()> {
		let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
		if !inner.writeable {
			return Err(RegionError::invalid_usage("region file opened read-only"));
		}
		Self::ensure_header(&mut inner)?;

		let needed_bytes = 4u64 + framed.len() as u64;
		let needed_sectors = needed_bytes.div_ceil(SECTOR_SIZE) as u64;

		let spill_path = Self::spill_path(&inner, slot);
		let mut header = read_header(inner.header_version, inner.map.as_slice())?;
		let existing = header.sectors[slot];

		if needed_sectors > inner.spill_threshold_sectors as u64 {
			// Spill: free any existing inline extent, zero the slot, write sidecar.
			if !existing.is_empty() {
				inner.sectors.free(existing);
			}
			header.sectors[slot] = super::sector::RegionSector::empty();
			header.timestamps[slot] = super::timestamp::Timestamp::now();
			Self::write_header(&mut inner, &header)?;
			std::fs::write(&spill_path, framed)?;
			return Ok(());
		}
		if spill_path.exists() {
			std::fs::remove_file(&spill_path)?;
		}

		let new_sector = if !existing.is_empty() && existing.sector_count() >= needed_sectors {
			super::sector::RegionSector::new(existing.sector_offset() as u32, needed_sectors as u8)
		} else {
			if !existing.is_empty() {
				inner.sectors.free(existing);
			}
			inner
				.sectors
				.allocate(needed_sectors as u8)
				.ok_or_else(|| RegionError::invalid_usage("sector allocation failure"))?
		};

		let end_byte = new_sector.end_offset();
		Self::ensure_capacity(&mut inner, end_byte)?;

		{
			let map = &mut inner.map;
			let bytes = match map {
				MapView::ReadWrite(m) => &mut m[..],
				_ => return Err(RegionError::invalid_usage("region file not mapped writeable")),
			};
			let start = new_sector.offset() as usize;
			bytes[start..start + 4].copy_from_slice(&(framed.len() as u32).to_be_bytes());
			bytes[start + 4..start + 4 + framed.len()].copy_from_slice(framed);
			let padded_end = new_sector.end_offset() as usize;
			for b in &mut bytes[start + 4 + framed.len()..padded_end] {
				*b = 0;
			}
		}

		header.sectors[slot] = new_sector;
		header.timestamps[slot] = super::timestamp::Timestamp::now();
		Self::write_header(&mut inner, &header)?;
		Ok(())
	}

	/// Deletes the slot: frees its extent (or removes the spill sidecar)
	/// and zeroes its metadata.
	pub fn delete(&self, slot: RegionCoord) -> RegionResult<()> {
		let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
		if (inner.map.len() as u64) < header_reserved_bytes(inner.header_version)? {
			return Ok(());
		}
		let mut header = read_header(inner.header_version, inner.map.as_slice())?;
		let sector = header.sectors[slot];
		if sector.is_empty() {
			let spill = Self::spill_path(&inner, slot);
			if spill.exists() {
				std::fs::remove_file(&spill)?;
			}
			return Ok(());
		}
		inner.sectors.free(sector);
		header.sectors[slot] = super::sector::RegionSector::empty();
		header.timestamps[slot] = super::timestamp::Timestamp::default();
		Self::write_header(&mut inner, &header)?;
		Ok(())
	}

	pub fn mtime(&self, slot: RegionCoord) -> RegionResult<Option<u32>> {
		let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
		if (inner.map.len() as u64) < header_reserved_bytes(inner.header_version)? {
			return Ok(None);
		}
		let header = read_header(inner.header_version, inner.map.as_slice())?;
		if header.sectors[slot].is_empty() {
			let spill = Self::spill_path(&inner, slot);
			if !spill.exists() {
				return Ok(None);
			}
		}
		Ok(Some(header.timestamps[slot].unix_epoch_secs()))
	}

	fn ensure_header(inner: &mut RegionFileInner) -> RegionResult<()> {
		let reserved = header_reserved_bytes(inner.header_version)?;
		if inner.map.len() as u64 >= reserved {
			return Ok(());
		}
		Self::ensure_capacity(inner, reserved)?;
		Self::write_header(inner, &RegionHeader::default())
	}

	fn write_header(inner: &mut RegionFileInner, header: &RegionHeader) -> RegionResult<()> {
		let buf = encode_header(inner.header_version, header)?;
		let bytes = match &mut inner.map {
			MapView::ReadWrite(m) => &mut m[..],
			_ => return Err(RegionError::invalid_usage("region file not mapped writeable")),
		};
		bytes[..buf.len()].copy_from_slice(&buf);
		Ok(())
	}

	/// Grows the backing file and remaps in place where supported; falls
	/// back to unmap-then-remap otherwise (SPEC_FULL.md §3.4/§5.7).
	fn ensure_capacity(inner: &mut RegionFileInner, min_len: u64) -> RegionResult<()> {
		let current_len = inner.file.metadata()?.len();
		if current_len >= min_len && inner.map.len() as u64 >= min_len {
			return Ok(());
		}
		inner.file.set_len(min_len)?;
		inner.map = MapView::None; // drop any existing mapping before remapping
		inner.map = MapView::ReadWrite(unsafe { MmapMut::map_mut(&inner.file)? });
		Ok(())
	}

	pub fn flush(&self) -> RegionResult<()> {
		let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
		if let MapView::ReadWrite(m) = &inner.map {
			m.flush()?;
		}
		Ok(())
	}
}
