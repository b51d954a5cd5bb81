use std::io::SeekFrom;

/// A slot index inside a region file's 1024-entry tables. The mapping
/// from an absolute D-dimensional chunk position to this index is
/// [`super::vmath::group`]; this type only knows about the resulting
/// ≤10-bit index, so the same header tables serve every dimensionality
/// (SPEC_FULL.md §3.1/§3.5 — cardinality per region is always ≤1024).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct RegionCoord(u16);

impl RegionCoord {
	/// `slot` must be < 1024; higher bits are masked off.
	pub fn new(slot: u16) -> Self {
		Self(slot & 0x3FF)
	}

	pub fn index(&self) -> usize {
		self.0 as usize
	}

	/// A [SeekFrom] value that can be used to seek to the location where
	/// this slot's sector offset is stored in the sector offset table.
	pub fn sector_table_offset(&self) -> SeekFrom {
		SeekFrom::Start(self.0 as u64 * 4)
	}

	/// A [SeekFrom] value that can be used to seek to the location where
	/// this slot's timestamp is stored in the timestamp table.
	pub fn timestamp_table_offset(&self) -> SeekFrom {
		SeekFrom::Start(self.0 as u64 * 4 + 4096)
	}
}

impl From<u16> for RegionCoord {
	fn from(value: u16) -> Self {
		Self::new(value)
	}
}

impl From<RegionCoord> for u16 {
	fn from(value: RegionCoord) -> Self {
		value.0
	}
}

impl std::fmt::Display for RegionCoord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "slot({})", self.0)
	}
}
