//! # Architecture-Specific HAL Modules
//!
//! This module re-exports the appropriate back-end based on the target
//! architecture. Only x86 machines have an ISA bus, so only x86 has one.

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
        pub mod x86;

        // Re-export the current architecture's back-end
        pub use x86 as current;
    }
}
