pub fn set_panic_hook() {
    // When the `debug` feature is enabled, panics are forwarded to the
    // browser console with their message instead of an opaque `unreachable`.
    #[cfg(feature = "debug")]
    console_error_panic_hook::set_once();
}
