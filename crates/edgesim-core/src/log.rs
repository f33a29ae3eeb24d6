//! Logging facilities.
//!
//! Component messages are prefixed with the simulation time, the level and the component name,
//! e.g. `[1520.347 DEBUG district-3] message processed`. The component name is also used as the log target,
//! so the output can be filtered per component with `RUST_LOG`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::trace;
use serde_json::json;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:ident, $tag:expr, $color:ident, $ctx:expr, $msg:expr) => (
        log::$level!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(), $crate::log::get_colored($tag, $crate::colored::Color::$color), $ctx.name(), $msg
        )
    );
    ($level:ident, $tag:expr, $color:ident, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::get_colored($tag, $crate::colored::Color::$color), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use edgesim_core::{log_info, Simulation, SimulationContext};
///
/// struct Unit {
///     ctx: SimulationContext,
/// }
///
/// impl Unit {
///     fn start(&self) {
///         log_info!(self.ctx, "started with {} cores", 4);
///     }
/// }
///
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
///
/// let mut sim = Simulation::new(123);
/// let unit = Unit { ctx: sim.create_context("district-0") };
/// unit.start();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(info, "INFO", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(warn, "WARN", Yellow, $ctx, $($arg)+));
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(error, "ERROR", Red, $ctx, $($arg)+));
}

/// Logs a fired timer.
pub(crate) fn log_timer_fired(time: f64, timer_id: u64, component: &str) {
    trace!(
        target: "simulation",
        "[{:.3} {} simulation] Timer fired: {}",
        time,
        get_colored("TRACE", Color::Cyan),
        json!({"id": timer_id, "component": component})
    );
}
