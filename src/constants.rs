//! Global constants used throughout the aggcache codebase.

/// Version of the live-state file envelope.
///
/// Bump whenever the envelope or the payload layout changes. A state file
/// written with a different version is treated as a corrupt live cache.
pub const LIVE_STATE_VERSION: u32 = 1;

/// Default location of the live state, relative to the graph manifest.
pub const DEFAULT_LIVE_STATE_PATH: &str = ".aggcache/live-state.bin";

/// Name of the optional configuration file looked up next to the manifest.
pub const CONFIG_FILE_NAME: &str = "aggcache.toml";

/// Environment variable that enables live mode when set to `1` or `true`.
pub const ENV_LIVE: &str = "AGGCACHE_LIVE";

/// Environment variable that overrides the live-state path.
pub const ENV_LIVE_STATE: &str = "AGGCACHE_LIVE_STATE";

/// Display name of the synthetic package at index 0.
pub const HEAD_PACKAGE_NAME: &str = "<head>";

/// Display name of the synthetic package at the last index.
pub const TAIL_PACKAGE_NAME: &str = "<tail>";
