//! Logging macros
//!
//! Forward to defmt when the `defmt` feature is enabled, print to the
//! console in host unit tests, and compile to nothing otherwise.
//!
//! Arguments must implement `defmt::Format` as well as `Display`/`Debug`,
//! so pass `&str` rather than `String` and render values first.

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::println!("[INFO] {}", alloc::format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::println!("[WARN] {}", alloc::format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::eprintln!("[ERROR] {}", alloc::format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        std::println!("[DEBUG] {}", alloc::format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = core::format_args!($($arg)*);
    }};
}

pub(crate) use {log_debug, log_error, log_info, log_warn};
