// Build-time version from Cargo.toml

/// Package version; stamped into checkpoints and result documents.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name, used in resume hints.
pub const NAME: &str = env!("CARGO_PKG_NAME");
