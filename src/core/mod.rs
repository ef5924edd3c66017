pub mod engine;
pub mod retention;
pub mod session;
pub mod utils;

pub use engine::LedgerEngine;
pub use retention::RetentionSweep;
pub use session::Session;
