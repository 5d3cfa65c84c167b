//! MapReduce applications runnable on the engine.
//!
//! Each module provides a map and a reduce function matching the engine's
//! function contracts; the engine knows nothing about what problem they
//! solve.

pub mod prefix;
