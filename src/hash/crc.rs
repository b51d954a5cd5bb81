//! The CRC8/16/24/32/64 parameterization family, grounded on
//! `include/clod/hash.h`'s `clod_crc{8,16,24,32,64}_add`/`_finalise`
//! constants (poly/init/xorout per variant, reflection per variant).
//!
//! Exposed as named [`crc::Algorithm`] constants rather than wrapped in
//! an enum: callers reach for exactly the width they need (e.g. a
//! compact 8-bit tag checksum vs. the 32/64-bit chunk checksum in
//! [`super::ChecksumAlgorithm`]).

use crc::Algorithm;

/// Poly 0x07, not reflected, init/xorout 0.
pub const CRC_8: Algorithm<u8> = Algorithm {
	width: 8,
	poly: 0x07,
	init: 0x00,
	refin: false,
	refout: false,
	xorout: 0x00,
	check: 0xf4,
	residue: 0x00,
};

/// Poly 0x1021, reflected, init/xorout 0.
pub const CRC_16: Algorithm<u16> = Algorithm {
	width: 16,
	poly: 0x1021,
	init: 0x0000,
	refin: true,
	refout: true,
	xorout: 0x0000,
	check: 0x2189,
	residue: 0x0000,
};

/// Poly 0x864CFB, not reflected, init 0xB704CE, xorout 0.
pub const CRC_24: Algorithm<u32> = Algorithm {
	width: 24,
	poly: 0x86_4cfb,
	init: 0xb7_04ce,
	refin: false,
	refout: false,
	xorout: 0x00_0000,
	check: 0x21_cf02,
	residue: 0x00_0000,
};

/// Poly 0x4C11DB7, reflected, init/xorout 0xFFFFFFFF.
pub const CRC_32: Algorithm<u32> = Algorithm {
	width: 32,
	poly: 0x04c1_1db7,
	init: 0xffff_ffff,
	refin: true,
	refout: true,
	xorout: 0xffff_ffff,
	check: 0xcbf4_3926,
	residue: 0xdebb_20e3,
};

/// Poly 0x42F0E1EBA9EA3693, not reflected, init/xorout 0.
pub const CRC_64_XZ: Algorithm<u64> = Algorithm {
	width: 64,
	poly: 0x42f0_e1eb_a9ea_3693,
	init: 0x0000_0000_0000_0000,
	refin: false,
	refout: false,
	xorout: 0x0000_0000_0000_0000,
	check: 0x995d_c9bb_df19_39fa,
	residue: 0x0000_0000_0000_0000,
};

/// The other CRC-64 parameterization seen across header versions
/// (init/xorout both all-ones, reflected).
pub const CRC_64_JONES: Algorithm<u64> = Algorithm {
	width: 64,
	poly: 0xad93_d235_94c9_35a9,
	init: 0xffff_ffff_ffff_ffff,
	refin: true,
	refout: true,
	xorout: 0xffff_ffff_ffff_ffff,
	check: 0xcaa7_17e6_2270_5c8f,
	residue: 0x0000_0000_0000_0000,
};

#[cfg(test)]
mod tests {
	use super::*;
	use crc::Crc;

	#[test]
	fn crc8_matches_check_value() {
		assert_eq!(Crc::<u8>::new(&CRC_8).checksum(b"123456789"), CRC_8.check);
	}

	#[test]
	fn crc16_matches_check_value() {
		assert_eq!(Crc::<u16>::new(&CRC_16).checksum(b"123456789"), CRC_16.check);
	}

	#[test]
	fn crc24_matches_check_value() {
		assert_eq!(Crc::<u32>::new(&CRC_24).checksum(b"123456789"), CRC_24.check);
	}

	#[test]
	fn crc32_matches_check_value() {
		assert_eq!(Crc::<u32>::new(&CRC_32).checksum(b"123456789"), CRC_32.check);
	}

	#[test]
	fn crc64_xz_matches_check_value() {
		assert_eq!(Crc::<u64>::new(&CRC_64_XZ).checksum(b"123456789"), CRC_64_XZ.check);
	}

	#[test]
	fn crc64_jones_matches_check_value() {
		assert_eq!(Crc::<u64>::new(&CRC_64_JONES).checksum(b"123456789"), CRC_64_JONES.check);
	}
}
