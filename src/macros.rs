/// Logs internal client diagnostics through the `log` facade.
///
/// Everything goes to the `yeller` target at debug level so applications can
/// silence or surface it with their normal logger configuration.
macro_rules! yeller_debug {
    ($($arg:tt)*) => {
        ::log::debug!(target: "yeller", $($arg)*)
    };
}
