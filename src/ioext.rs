use std::io::{
	Write, Read,
	Seek, SeekFrom,
};

use crate::error::RegionError;

/// For types that can be written to a writer.
pub trait Writable {
	fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, RegionError>;
}

/// For types that can be read from a reader.
pub trait Readable: Sized {
	fn read_from<R: Read>(reader: &mut R) -> Result<Self, RegionError>;
}

/// For types that represent a seekable file offset.
pub trait Seekable: Sized {
	fn seek_to<S: Seek>(&self, seeker: &mut S) -> Result<u64, RegionError> {
		Ok(seeker.seek(self.seeker())?)
	}

	fn seeker(&self) -> SeekFrom;
}

pub trait WriteExt: Write + Sized {
	fn write_value<T: Writable>(&mut self, value: T) -> Result<usize, RegionError>;
}

pub trait ReadExt: Read + Sized {
	fn read_value<T: Readable>(&mut self) -> Result<T, RegionError>;
}

impl<W: Write + Sized> WriteExt for W {
	fn write_value<T: Writable>(&mut self, value: T) -> Result<usize, RegionError> {
		value.write_to(self)
	}
}

impl<R: Read + Sized> ReadExt for R {
	fn read_value<T: Readable>(&mut self) -> Result<T, RegionError> {
		T::read_from(self)
	}
}

pub trait SeekExt: Seek + Sized {
	fn seek_to<S: Seekable>(&mut self, seek_offset: &S) -> Result<u64, RegionError>;

	fn seek_return(&mut self) -> Result<SeekFrom, RegionError>;
}

impl<T: Seek + Sized> SeekExt for T {
	fn seek_to<S: Seekable>(&mut self, seek_offset: &S) -> Result<u64, RegionError> {
		seek_offset.seek_to(self)
	}

	fn seek_return(&mut self) -> Result<SeekFrom, RegionError> {
		Ok(SeekFrom::Start(self.stream_position()?))
	}
}

/// Blanket [`Readable`]/[`Writable`] for the integer primitives, always in
/// big-endian byte order. Every on-disk header field (`RegionSector`,
/// `Timestamp`, `RegionTable<T>`, ...) is ultimately built from these.
macro_rules! __primitive_io_impl {
	($type:ty) => {
		impl Readable for $type {
			fn read_from<R: Read>(reader: &mut R) -> Result<Self, RegionError> {
				let mut buf = [0u8; std::mem::size_of::<$type>()];
				reader.read_exact(&mut buf)?;
				Ok(Self::from_be_bytes(buf))
			}
		}

		impl Writable for $type {
			fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, RegionError> {
				let bytes = self.to_be_bytes();
				writer.write_all(&bytes)?;
				Ok(bytes.len())
			}
		}
	};
}

crate::for_each_int_type!(__primitive_io_impl);
