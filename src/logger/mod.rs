//! Global `tracing` setup. Starts with a bootstrap filter and switches to the
//! configured one once settings are loaded.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
