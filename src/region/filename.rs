//! Region filename grammar: `prefix "." (int64 ".")^D ext`, grounded on
//! `filename_make`/`filename_parse_pos` in `original_source/src/region/filename.c`.

pub const MAX_PREFIX_LEN: usize = 30;
pub const MAX_EXT_LEN: usize = 14;
pub const MAX_FILENAME_LEN: usize = 255;

/// Builds a region filename from its pieces. Caller-validated lengths
/// (§6): `prefix` ≤ 30 chars and contains no '.', `ext` ≤ 14 chars.
pub fn make(prefix: &str, coords: &[i64], ext: &str) -> String {
	let mut out = String::with_capacity(prefix.len() + coords.len() * 8 + ext.len() + 2);
	out.push_str(prefix);
	out.push('.');
	for c in coords {
		out.push_str(&c.to_string());
		out.push('.');
	}
	out.push_str(ext);
	out
}

/// Strict parse: every piece must match exactly or the whole name is
/// rejected, per `filename_parse_pos`'s discipline (SPEC_FULL.md §1).
pub fn parse<'a>(name: &'a str, prefix: &str, dims: usize, ext: &str) -> Option<Vec<i64>> {
	if name.len() > MAX_FILENAME_LEN {
		return None;
	}
	let rest = name.strip_prefix(prefix)?;
	let rest = rest.strip_prefix('.')?;
	let rest = rest.strip_suffix(ext)?;
	let rest = rest.strip_suffix('.')?;

	if dims == 0 {
		return if rest.is_empty() { Some(Vec::new()) } else { None };
	}

	// `dims - 1` separating dots remain between `dims` coordinates once the
	// prefix/ext and their own dots have been stripped; the last coordinate
	// is whatever's left, with no further dot to split on.
	let mut coords = Vec::with_capacity(dims);
	let mut remaining = rest;
	for _ in 0..dims - 1 {
		let (piece, tail) = remaining.split_once('.')?;
		if piece.is_empty() {
			return None;
		}
		coords.push(piece.parse::<i64>().ok()?);
		remaining = tail;
	}
	if remaining.is_empty() {
		return None;
	}
	coords.push(remaining.parse::<i64>().ok()?);
	Some(coords)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn make_then_parse_roundtrips() {
		let name = make("region", &[-3, 7], "mcr");
		assert_eq!(name, "region.-3.7.mcr");
		assert_eq!(parse(&name, "region", 2, "mcr"), Some(vec![-3, 7]));
	}

	#[test]
	fn parse_rejects_wrong_dimensionality() {
		let name = make("region", &[0, 0], "mcr");
		assert_eq!(parse(&name, "region", 3, "mcr"), None);
	}

	#[test]
	fn parse_rejects_mismatched_prefix_or_ext() {
		let name = make("region", &[0, 0], "mcr");
		assert_eq!(parse(&name, "other", 2, "mcr"), None);
		assert_eq!(parse(&name, "region", 2, "mca"), None);
	}

	#[test]
	fn parse_rejects_non_numeric_piece() {
		assert_eq!(parse("region.x.0.mcr", "region", 2, "mcr"), None);
	}

	#[test]
	fn parse_roundtrips_at_three_dimensions() {
		let name = make("region", &[-3, 7, 12], "clod");
		assert_eq!(parse(&name, "region", 3, "clod"), Some(vec![-3, 7, 12]));
	}

	#[test]
	fn parse_handles_negative_final_coordinate() {
		assert_eq!(parse("region.-3.7.mcr", "region", 2, "mcr"), Some(vec![-3, 7]));
	}
}
