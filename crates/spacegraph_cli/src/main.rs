//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `spacegraph_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("spacegraph_core version={}", spacegraph_core::core_version());
}
