//! Panic hook that releases the reserved row before the panic message prints.

use std::{
    io::{self, Write},
    panic,
    sync::OnceLock,
};

static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Install a panic hook that tears the scroll region down before delegating.
///
/// Installed once per process, the first time an interrupt guard is armed.
/// The teardown only runs while a guard is armed, so panics after a normal
/// `destroy_scroll_area` leave the terminal alone.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let _ = io::stdout().flush();
            if crate::interrupt::emergency_teardown() {
                let location = info
                    .location()
                    .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::error!(%location, "panic while progress bar was active");
            }
            previous(info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_panic_hook_sets_once_flag() {
        install_panic_hook();
        install_panic_hook();
        assert!(PANIC_HOOK_INSTALLED.get().is_some());
    }
}
