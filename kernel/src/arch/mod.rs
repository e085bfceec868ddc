//! Architecture layer.
//!
//! Everything above this module is portable; the bare-metal AArch64 build
//! gets the real implementation, hosted builds get inert stand-ins so the
//! kernel logic can be unit tested.

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
mod aarch64;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub use aarch64::*;

#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
mod host;
#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
pub use host::*;
