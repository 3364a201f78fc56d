//! Settings are read from a TOML file and then overridden by `WARDEN__`
//! environment variables, e.g. `WARDEN__HTTP__ADDRESS=0.0.0.0:8443`.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
