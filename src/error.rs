use thiserror::Error;

/// The four public region results (SPEC_FULL.md §6).
///
/// Programmer errors and transient I/O errors both surface as
/// [`RegionError::InvalidUsage`]; on-disk corruption surfaces as
/// [`RegionError::Malformed`]. A missing slot is [`RegionError::NotFound`].
#[derive(Debug, Error)]
pub enum RegionError {
	#[error("invalid usage: {0}")]
	InvalidUsage(String),
	#[error("malformed region data: {0}")]
	Malformed(String),
	#[error("chunk not found")]
	NotFound,
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

pub type RegionResult<T> = Result<T, RegionError>;

impl RegionError {
	/// Reports a programmer error to the diagnostic sink before returning it,
	/// per SPEC_FULL.md §7 ("reported to a diagnostic sink with source
	/// location and a version tag").
	#[track_caller]
	pub fn invalid_usage<S: Into<String>>(msg: S) -> Self {
		let msg = msg.into();
		tracing::error!(
			target: "clodstore::region",
			version = env!("CARGO_PKG_VERSION"),
			location = %std::panic::Location::caller(),
			"{msg}"
		);
		RegionError::InvalidUsage(msg)
	}

	#[track_caller]
	pub fn malformed<S: Into<String>>(msg: S) -> Self {
		let msg = msg.into();
		tracing::warn!(
			target: "clodstore::region",
			version = env!("CARGO_PKG_VERSION"),
			location = %std::panic::Location::caller(),
			"{msg}"
		);
		RegionError::Malformed(msg)
	}
}

/// Result taxonomy for the compression façade (SPEC_FULL.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionResult {
	Success,
	Unsupported,
	Malformed,
	ShortBuffer,
	ShortOutput,
	AllocFailed,
}

#[derive(Debug, Error)]
pub enum CompressionError {
	#[error("compression method not supported")]
	Unsupported,
	#[error("malformed compressed data")]
	Malformed,
	#[error("destination buffer too small")]
	ShortBuffer,
	#[error("decoded output shorter than destination and no length was requested")]
	ShortOutput,
	#[error("allocation failed")]
	AllocFailed,
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

impl CompressionError {
	pub fn result(&self) -> CompressionResult {
		match self {
			CompressionError::Unsupported => CompressionResult::Unsupported,
			CompressionError::Malformed => CompressionResult::Malformed,
			CompressionError::ShortBuffer => CompressionResult::ShortBuffer,
			CompressionError::ShortOutput => CompressionResult::ShortOutput,
			CompressionError::AllocFailed => CompressionResult::AllocFailed,
			CompressionError::Io(_) => CompressionResult::Malformed,
		}
	}
}

pub type CompressionOpResult<T> = Result<T, CompressionError>;

#[cfg(test)]
mod tests {
	use super::*;

	/// Installs a test-scoped subscriber so the `tracing::error!`/`warn!`
	/// calls in [`RegionError::invalid_usage`]/[`RegionError::malformed`]
	/// go somewhere observable instead of being silently dropped, the way
	/// `examples/` binaries install one via `tracing_subscriber::fmt().init()`.
	#[test]
	fn invalid_usage_and_malformed_emit_through_the_installed_subscriber() {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();

		let invalid = RegionError::invalid_usage("example invalid usage");
		assert!(matches!(invalid, RegionError::InvalidUsage(msg) if msg == "example invalid usage"));

		let malformed = RegionError::malformed("example malformed data");
		assert!(matches!(malformed, RegionError::Malformed(msg) if msg == "example malformed data"));
	}
}
