/// What the `version` command reports, captured by `build.rs`.
#[derive(Debug, Clone, Copy)]
pub struct BuildMetadata {
    pub version: &'static str,
    /// Short git hash, suffixed `-dirty` for uncommitted changes.
    pub revision: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        revision: option_env!("POKER_LEDGER_REVISION").unwrap_or("unknown"),
        profile: option_env!("POKER_LEDGER_PROFILE").unwrap_or("unknown"),
        rustc: option_env!("POKER_LEDGER_RUSTC").unwrap_or("unknown"),
    }
}
