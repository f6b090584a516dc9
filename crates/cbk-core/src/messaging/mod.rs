//! Platform-facing ports (Discord today; the pipeline only sees these traits).

pub mod port;
