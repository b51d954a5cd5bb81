use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use crate::{
	error::RegionResult,
	for_each_int_type,
	ioext::*,
};

/// A 32-bit Unix timestamp, dropped from the teacher's `chrono`-backed
/// type since only unix-epoch seconds are needed, not calendar-aware
/// formatting (DESIGN.md dependency notes).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Timestamp(u32);

impl Timestamp {
	pub fn unix_epoch_secs(&self) -> u32 {
		self.0
	}

	/// A [Timestamp] for the current wall-clock time.
	pub fn now() -> Timestamp {
		let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
		Timestamp(secs as u32)
	}
}

macro_rules! __timestamp_impls {
	($type:ty) => {
		impl From<$type> for Timestamp {
			fn from(value: $type) -> Self {
				Self(value as u32)
			}
		}

		impl From<Timestamp> for $type {
			fn from(value: Timestamp) -> Self {
				value.0 as $type
			}
		}
	};
}

for_each_int_type!(__timestamp_impls);

impl<T: Into<Timestamp> + Copy> From<&T> for Timestamp {
	fn from(value: &T) -> Self {
		T::into(*value)
	}
}

impl Readable for Timestamp {
	fn read_from<R: Read>(reader: &mut R) -> RegionResult<Self> {
		Ok(Self(reader.read_value()?))
	}
}

impl Writable for Timestamp {
	fn write_to<W: Write>(&self, writer: &mut W) -> RegionResult<usize> {
		writer.write_value(self.0)
	}
}
