//! Logging facade.
//!
//! Mirrors the original source's `DBG`/`DBGV` split (important vs. verbose
//! debug output) with the `log`/`defmt` optional-dependency convention this
//! crate family uses: when neither feature is enabled these macros compile
//! to nothing, so the multiplexer stays usable on targets with no logger at
//! all.

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        #[cfg(feature = "defmt")]
        defmt::debug!($s $(, $x)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        log::debug!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt")))]
        {
            $( let _ = &$x; )*
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        #[cfg(feature = "defmt")]
        defmt::warn!($s $(, $x)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        log::warn!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt")))]
        {
            $( let _ = &$x; )*
        }
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        #[cfg(feature = "defmt")]
        defmt::error!($s $(, $x)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        log::error!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt")))]
        {
            $( let _ = &$x; )*
        }
    };
}

pub(crate) use debug;
pub(crate) use error;
pub(crate) use warn;
