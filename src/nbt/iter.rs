//! The single iterator walking children of a COMPOUND, LIST, STRING, or
//! INT{8,32,64}_ARRAY payload, grounded on `clod_nbt_iter_next` in `nbt.c`.

use super::{payload_size, read_u32_be, tag_size, TagType};

#[derive(Debug, Clone, Copy)]
enum Kind {
	Compound,
	List { elem_type: TagType, remaining: u32 },
	FixedArray { elem_type: TagType, elem_size: usize, remaining: u32 },
}

/// One step of iteration: either a produced child, or the end-of-iteration
/// marker (`tag_offset` points past the last element; for COMPOUND this is
/// the ZERO sentinel position, splice-friendly per SPEC_FULL.md §4.2).
pub struct ChildRef<'a> {
	pub tag_offset: usize,
	pub payload: std::ops::Range<usize>,
	/// Size of this element; for COMPOUND children this includes the tag
	/// header (type + name-length + name), per the spec's iterator field.
	pub size: usize,
	pub ty: TagType,
	pub index: u64,
	pub name: Option<&'a [u8]>,
}

pub struct ChildIter<'a> {
	buf: &'a [u8],
	end: usize,
	kind: Kind,
	cursor: usize,
	index: u64,
	started: bool,
	malformed: bool,
}

impl<'a> ChildIter<'a> {
	pub fn compound(buf: &'a [u8], payload_offset: usize, end: usize) -> Self {
		ChildIter {
			buf,
			end,
			kind: Kind::Compound,
			cursor: payload_offset,
			index: 0,
			started: false,
			malformed: false,
		}
	}

	pub fn list(buf: &'a [u8], payload_offset: usize, end: usize) -> Option<Self> {
		let elem_type = TagType::from_u8(*buf.get(payload_offset)?)?;
		let remaining = read_u32_be(buf, payload_offset + 1, end)?;
		Some(ChildIter {
			buf,
			end,
			kind: Kind::List { elem_type, remaining },
			cursor: payload_offset + 5,
			index: 0,
			started: false,
			malformed: false,
		})
	}

	fn fixed_array(buf: &'a [u8], payload_offset: usize, end: usize, elem_type: TagType, elem_size: usize) -> Option<Self> {
		let remaining = read_u32_be(buf, payload_offset, end)?;
		Some(ChildIter {
			buf,
			end,
			kind: Kind::FixedArray { elem_type, elem_size, remaining },
			cursor: payload_offset + 4,
			index: 0,
			started: false,
			malformed: false,
		})
	}

	pub fn string(buf: &'a [u8], payload_offset: usize, end: usize) -> Option<Self> {
		Self::fixed_array(buf, payload_offset, end, TagType::Int8, 1)
	}

	pub fn int8_array(buf: &'a [u8], payload_offset: usize, end: usize) -> Option<Self> {
		Self::fixed_array(buf, payload_offset, end, TagType::Int8, 1)
	}

	pub fn int32_array(buf: &'a [u8], payload_offset: usize, end: usize) -> Option<Self> {
		Self::fixed_array(buf, payload_offset, end, TagType::Int32, 4)
	}

	pub fn int64_array(buf: &'a [u8], payload_offset: usize, end: usize) -> Option<Self> {
		Self::fixed_array(buf, payload_offset, end, TagType::Int64, 8)
	}

	/// True if iteration stopped early due to malformed data, as opposed to
	/// a normal end-of-container.
	pub fn is_malformed(&self) -> bool {
		self.malformed
	}

	fn fail(&mut self) -> Option<ChildRef<'a>> {
		self.malformed = true;
		self.cursor = self.end + 1; // force future calls to also stop
		None
	}
}

impl<'a> Iterator for ChildIter<'a> {
	type Item = ChildRef<'a>;

	fn next(&mut self) -> Option<ChildRef<'a>> {
		if self.malformed {
			return None;
		}
		self.started = true;
		match self.kind {
			Kind::Compound => {
				let tag_offset = self.cursor;
				if tag_offset >= self.end {
					return self.fail();
				}
				let type_byte = self.buf[tag_offset];
				if type_byte == 0 {
					return None; // normal end; cursor stays at the sentinel
				}
				let Some(ty) = TagType::from_u8(type_byte) else { return self.fail() };
				let Some(size) = tag_size(self.buf, tag_offset, self.end) else { return self.fail() };
				let name_len = u16::from_be_bytes([self.buf[tag_offset + 1], self.buf[tag_offset + 2]]) as usize;
				let name_start = tag_offset + 3;
				let name = &self.buf[name_start..name_start + name_len];
				let payload_offset = name_start + name_len;
				let Some(payload_len) = payload_size(self.buf, payload_offset, self.end, ty) else { return self.fail() };
				self.cursor = tag_offset + size;
				let index = self.index;
				self.index += 1;
				Some(ChildRef { tag_offset, payload: payload_offset..payload_offset + payload_len, size, ty, index, name: Some(name) })
			}
			Kind::List { elem_type, remaining } => {
				if remaining == 0 {
					return None;
				}
				let payload_offset = self.cursor;
				let Some(size) = payload_size(self.buf, payload_offset, self.end, elem_type) else { return self.fail() };
				self.cursor = payload_offset + size;
				let index = self.index;
				self.index += 1;
				self.kind = Kind::List { elem_type, remaining: remaining - 1 };
				Some(ChildRef { tag_offset: payload_offset, payload: payload_offset..payload_offset + size, size, ty: elem_type, index, name: None })
			}
			Kind::FixedArray { elem_type, elem_size, remaining } => {
				if remaining == 0 {
					return None;
				}
				let payload_offset = self.cursor;
				if payload_offset + elem_size > self.end {
					return self.fail();
				}
				self.cursor = payload_offset + elem_size;
				let index = self.index;
				self.index += 1;
				self.kind = Kind::FixedArray { elem_type, elem_size, remaining: remaining - 1 };
				Some(ChildRef { tag_offset: payload_offset, payload: payload_offset..payload_offset + elem_size, size: elem_size, ty: elem_type, index, name: None })
			}
		}
	}
}

/// `compound_get`: the first child whose name matches exactly.
pub fn compound_get<'a>(buf: &'a [u8], payload_offset: usize, end: usize, name: &[u8]) -> Option<ChildRef<'a>> {
	ChildIter::compound(buf, payload_offset, end).find(|child| child.name == Some(name))
}
