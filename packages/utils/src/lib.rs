//! Small helpers shared by the IBC Eureka packages.
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

pub mod serde;

/// Return early with the given error unless the condition holds.
///
/// ```
/// use ibc_eureka_utils::ensure;
///
/// fn check(n: u64) -> Result<u64, String> {
///     ensure!(n > 0, "zero".to_string());
///     Ok(n)
/// }
///
/// assert!(check(0).is_err());
/// assert_eq!(check(3), Ok(3));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
