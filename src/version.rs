// Service identity reported by GET /version

/// Crate version, baked in at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name, baked in at build time.
pub const NAME: &str = env!("CARGO_PKG_NAME");
