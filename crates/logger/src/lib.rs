mod tracing;

pub use crate::tracing::init_tracing_with_level;
