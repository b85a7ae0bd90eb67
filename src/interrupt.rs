//! Interrupt guard so Ctrl-C never leaves the terminal with a shrunken
//! scroll region.
//!
//! Arming installs a SIGINT handler with `sigaction` and keeps the action it
//! replaced. When the signal arrives the handler releases the reserved row,
//! puts the previous action back and re-raises, so the default disposition
//! (or the caller's own handler) still observes the interrupt.
//!
//! The handler runs on whatever the program was doing when the signal hit,
//! so it only touches atomics and async-signal-safe syscalls: no locks, no
//! allocation, no re-entry into the renderer.

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU16, AtomicU8, AtomicUsize, Ordering};

use crate::sequences::{CURSOR_INTO_SCROLL_AREA, GROW_PADDING, RESTORE_CURSOR, SAVE_CURSOR};

const CLEAR_LINE_CAPACITY: usize = 32;
const TEARDOWN_CAPACITY: usize = 128;

static ARMED: AtomicBool = AtomicBool::new(false);
/// Set once the emergency teardown has released the region.
static TORN_DOWN: AtomicBool = AtomicBool::new(false);
static PREVIOUS_ACTION: AtomicPtr<libc::sigaction> = AtomicPtr::new(ptr::null_mut());
static ESTABLISHED_ROWS: AtomicU16 = AtomicU16::new(0);
static CLEAR_LINE_LEN: AtomicUsize = AtomicUsize::new(0);
static CLEAR_LINE: [AtomicU8; CLEAR_LINE_CAPACITY] =
    [const { AtomicU8::new(0) }; CLEAR_LINE_CAPACITY];

/// Handle to the process-wide SIGINT trap.
///
/// Only one guard can be armed at a time; the terminal's scroll region is a
/// single-owner resource.
#[derive(Debug, Default)]
pub struct InterruptGuard {
    armed: bool,
}

impl InterruptGuard {
    /// Install the SIGINT handler for a region established at `rows`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot be installed.
    pub fn arm(clear_line: &[u8], rows: u16) -> io::Result<Self> {
        if ARMED.load(Ordering::SeqCst) {
            tracing::warn!("interrupt guard already armed by another scroll area");
            return Ok(Self { armed: false });
        }
        store_clear_line(clear_line);
        ESTABLISHED_ROWS.store(rows, Ordering::SeqCst);
        TORN_DOWN.store(false, Ordering::SeqCst);
        crate::terminal_restore::install_panic_hook();

        // SAFETY: `sigaction` is called with a zero-initialised action whose
        // handler only performs async-signal-safe work, and with a valid
        // out-pointer for the previous action. Errors are checked before the
        // boxed previous action is published.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handle_sigint as *const () as usize;
            action.sa_flags = libc::SA_RESTART;
            if libc::sigemptyset(&mut action.sa_mask) != 0 {
                return Err(io::Error::last_os_error());
            }
            let previous = Box::into_raw(Box::new(std::mem::zeroed::<libc::sigaction>()));
            if libc::sigaction(libc::SIGINT, &action, previous) != 0 {
                let err = io::Error::last_os_error();
                drop(Box::from_raw(previous));
                return Err(err);
            }
            PREVIOUS_ACTION.store(previous, Ordering::SeqCst);
        }
        ARMED.store(true, Ordering::SeqCst);
        tracing::debug!(rows, "interrupt guard armed");
        Ok(Self { armed: true })
    }

    /// Track a re-established region so an interrupt releases the right rows.
    pub fn update_rows(&self, rows: u16) {
        if self.armed {
            ESTABLISHED_ROWS.store(rows, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Put the previous SIGINT action back. Safe to call repeatedly.
    pub fn disarm(&mut self) {
        if !std::mem::take(&mut self.armed) {
            return;
        }
        with_sigint_blocked(|| {
            let previous = PREVIOUS_ACTION.swap(ptr::null_mut(), Ordering::SeqCst);
            if previous.is_null() {
                return;
            }
            // The handler already restored the previous action if it fired.
            if ARMED.swap(false, Ordering::SeqCst) {
                // SAFETY: `previous` came from `Box::into_raw` in `arm` and was
                // filled by the kernel; SIGINT is blocked so the handler cannot
                // observe it while it is being restored and freed.
                unsafe {
                    if libc::sigaction(libc::SIGINT, previous, ptr::null_mut()) != 0 {
                        tracing::warn!(
                            error = %io::Error::last_os_error(),
                            "failed to restore previous SIGINT action"
                        );
                    }
                }
            }
            // SAFETY: ownership returns here exactly once; the pointer was
            // swapped out of the static above.
            unsafe { drop(Box::from_raw(previous)) };
        });
        tracing::debug!("interrupt guard disarmed");
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// True once if an interrupt already released the region since the last arm.
pub fn take_emergency_teardown() -> bool {
    TORN_DOWN.swap(false, Ordering::SeqCst)
}

extern "C" fn handle_sigint(signal: libc::c_int) {
    let _ = emergency_teardown();
    if restore_previous_action(signal) {
        // SAFETY: `raise` is async-signal-safe. The raised signal is held
        // until this handler returns, then delivered to the restored action.
        unsafe {
            libc::raise(signal);
        }
    }
}

/// Hand `signal` back to the action saved by `arm`. True if it was restored.
fn restore_previous_action(signal: libc::c_int) -> bool {
    let previous = PREVIOUS_ACTION.load(Ordering::SeqCst);
    if !ARMED.swap(false, Ordering::SeqCst) || previous.is_null() {
        return false;
    }
    // SAFETY: `sigaction` is async-signal-safe. `previous` stays alive until
    // `disarm` frees it with SIGINT blocked.
    unsafe { libc::sigaction(signal, previous, ptr::null_mut()) == 0 }
}

/// Release the reserved row on stdout using only async-signal-safe
/// operations.
pub(crate) fn emergency_teardown() -> bool {
    emergency_teardown_to(libc::STDOUT_FILENO)
}

/// Runs at most once per arm; a no-op when no guard is armed. Returns
/// whether anything was written to `fd`.
fn emergency_teardown_to(fd: libc::c_int) -> bool {
    if !ARMED.load(Ordering::SeqCst) || TORN_DOWN.swap(true, Ordering::SeqCst) {
        return false;
    }
    let rows = live_rows(fd).unwrap_or_else(|| ESTABLISHED_ROWS.load(Ordering::SeqCst));
    let mut clear_line = [0u8; CLEAR_LINE_CAPACITY];
    let clear_line = load_clear_line(&mut clear_line);
    let sequence = compose_teardown(rows, clear_line);
    write_all_raw(fd, sequence.as_bytes());
    true
}

/// The same bytes a regular teardown emits, built without allocating.
pub(crate) fn compose_teardown(rows: u16, clear_line: &[u8]) -> StackSequence {
    let mut sequence = StackSequence::new();
    sequence.push(SAVE_CURSOR);
    sequence.push(b"\x1b[0;");
    sequence.push_decimal(rows);
    sequence.push(b"r");
    sequence.push(RESTORE_CURSOR);
    sequence.push(CURSOR_INTO_SCROLL_AREA);

    sequence.push(SAVE_CURSOR);
    sequence.push(b"\x1b[");
    sequence.push_decimal(rows);
    sequence.push(b";0f");
    sequence.push(clear_line);
    sequence.push(RESTORE_CURSOR);

    sequence.push(GROW_PADDING);
    sequence
}

/// Fixed-capacity byte buffer; silently stops at capacity.
pub(crate) struct StackSequence {
    buf: [u8; TEARDOWN_CAPACITY],
    len: usize,
}

impl StackSequence {
    fn new() -> Self {
        Self {
            buf: [0; TEARDOWN_CAPACITY],
            len: 0,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        let take = bytes.len().min(TEARDOWN_CAPACITY - self.len);
        self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
    }

    fn push_decimal(&mut self, value: u16) {
        let mut digits = [0u8; 5];
        let mut remaining = value;
        let mut start = digits.len();
        loop {
            start -= 1;
            digits[start] = b'0' + (remaining % 10) as u8;
            remaining /= 10;
            if remaining == 0 {
                break;
            }
        }
        self.push(&digits[start..]);
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

fn store_clear_line(sequence: &[u8]) {
    let len = sequence.len().min(CLEAR_LINE_CAPACITY);
    if len < sequence.len() {
        tracing::warn!(len = sequence.len(), "clear-line sequence truncated for interrupt path");
    }
    for (slot, byte) in CLEAR_LINE.iter().zip(&sequence[..len]) {
        slot.store(*byte, Ordering::SeqCst);
    }
    CLEAR_LINE_LEN.store(len, Ordering::SeqCst);
}

fn load_clear_line(out: &mut [u8; CLEAR_LINE_CAPACITY]) -> &[u8] {
    let len = CLEAR_LINE_LEN.load(Ordering::SeqCst).min(CLEAR_LINE_CAPACITY);
    for (byte, slot) in out.iter_mut().zip(CLEAR_LINE.iter()).take(len) {
        *byte = slot.load(Ordering::SeqCst);
    }
    &out[..len]
}

fn live_rows(fd: libc::c_int) -> Option<u16> {
    // SAFETY: TIOCGWINSZ fills a plain `winsize` struct we own; `ioctl` is
    // async-signal-safe.
    unsafe {
        let mut size: libc::winsize = std::mem::zeroed();
        if libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) == 0 && size.ws_row > 0 {
            Some(size.ws_row)
        } else {
            None
        }
    }
}

fn write_all_raw(fd: libc::c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: `bytes` is a live slice; `write` is async-signal-safe.
        let written = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if written < 0 {
            if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return;
        }
        if written == 0 {
            return;
        }
        bytes = &bytes[written as usize..];
    }
}

fn with_sigint_blocked(f: impl FnOnce()) {
    // SAFETY: the signal sets are zero-initialised locals handed to
    // `sigemptyset`/`sigaddset` before use, and the previous mask is restored
    // with the value the kernel reported.
    unsafe {
        let mut block: libc::sigset_t = std::mem::zeroed();
        let mut previous: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut block);
        libc::sigaddset(&mut block, libc::SIGINT);
        let blocked = libc::pthread_sigmask(libc::SIG_BLOCK, &block, &mut previous) == 0;
        f();
        if blocked {
            libc::pthread_sigmask(libc::SIG_SETMASK, &previous, ptr::null_mut());
        }
    }
}

#[cfg(test)]
pub(crate) fn test_lock() -> &'static std::sync::Mutex<()> {
    static LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    LOCK.get_or_init(|| std::sync::Mutex::new(()))
}

/// What the handler does to the process state, minus the write and re-raise.
#[cfg(test)]
pub(crate) fn simulate_interrupt() {
    TORN_DOWN.store(true, Ordering::SeqCst);
    let _ = restore_previous_action(libc::SIGINT);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_sigint_handler() -> usize {
        // SAFETY: a null new-action only queries the current disposition.
        unsafe {
            let mut current: libc::sigaction = std::mem::zeroed();
            assert_eq!(libc::sigaction(libc::SIGINT, ptr::null(), &mut current), 0);
            current.sa_sigaction
        }
    }

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        test_lock()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn teardown_bytes_release_region_clear_row_and_scroll() {
        let sequence = compose_teardown(24, b"\x1b[K");
        assert_eq!(
            sequence.as_bytes(),
            b"\x1b[s\x1b[0;24r\x1b[u\x1b[1A\x1b[s\x1b[24;0f\x1b[K\x1b[u\n\n"
        );
    }

    #[test]
    fn decimal_rows_cover_edge_values() {
        let mut sequence = StackSequence::new();
        sequence.push_decimal(0);
        sequence.push(b",");
        sequence.push_decimal(7);
        sequence.push(b",");
        sequence.push_decimal(u16::MAX);
        assert_eq!(sequence.as_bytes(), b"0,7,65535");
    }

    #[test]
    fn stack_sequence_stops_at_capacity() {
        let mut sequence = StackSequence::new();
        sequence.push(&[b'x'; TEARDOWN_CAPACITY + 10]);
        sequence.push(b"more");
        assert_eq!(sequence.as_bytes().len(), TEARDOWN_CAPACITY);
    }

    #[test]
    fn clear_line_round_trips_through_atomics() {
        let _guard = lock();
        store_clear_line(b"\x1b[K");
        let mut out = [0u8; CLEAR_LINE_CAPACITY];
        assert_eq!(load_clear_line(&mut out), b"\x1b[K");
    }

    #[test]
    fn arm_installs_handler_and_disarm_restores_previous() {
        let _guard = lock();
        let before = current_sigint_handler();
        let mut guard = InterruptGuard::arm(b"\x1b[K", 24).expect("arm guard");
        assert!(guard.is_armed());
        assert_eq!(current_sigint_handler(), handle_sigint as *const () as usize);

        guard.disarm();
        assert!(!guard.is_armed());
        assert_eq!(current_sigint_handler(), before);
        assert!(PREVIOUS_ACTION.load(Ordering::SeqCst).is_null());

        // Second disarm is a no-op.
        guard.disarm();
        assert_eq!(current_sigint_handler(), before);
    }

    #[test]
    fn disarm_without_arm_is_a_no_op() {
        let _guard = lock();
        let before = current_sigint_handler();
        let mut guard = InterruptGuard::default();
        guard.disarm();
        drop(guard);
        assert_eq!(current_sigint_handler(), before);
    }

    #[test]
    fn only_one_guard_arms_at_a_time() {
        let _guard = lock();
        let first = InterruptGuard::arm(b"\x1b[K", 24).expect("arm first");
        let second = InterruptGuard::arm(b"\x1b[K", 24).expect("arm second");
        assert!(first.is_armed());
        assert!(!second.is_armed());
        drop(second);
        assert_eq!(current_sigint_handler(), handle_sigint as *const () as usize);
        drop(first);
        assert_ne!(current_sigint_handler(), handle_sigint as *const () as usize);
    }

    #[test]
    fn emergency_teardown_is_skipped_when_unarmed() {
        let _guard = lock();
        TORN_DOWN.store(false, Ordering::SeqCst);
        assert!(!emergency_teardown());
        assert!(!take_emergency_teardown());
    }

    fn pipe() -> (libc::c_int, libc::c_int) {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: `fds` is a valid two-element out-array.
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    fn read_available(fd: libc::c_int) -> Vec<u8> {
        let mut buf = [0u8; 256];
        // SAFETY: `buf` is a live, writable buffer of the given length.
        let read = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        assert!(read >= 0);
        buf[..read as usize].to_vec()
    }

    #[test]
    fn emergency_teardown_writes_release_once_per_arm() {
        let _guard = lock();
        let (read_fd, write_fd) = pipe();
        let mut guard = InterruptGuard::arm(b"\x1b[K", 24).expect("arm guard");
        guard.update_rows(31);

        assert!(emergency_teardown_to(write_fd));
        assert!(!emergency_teardown_to(write_fd));
        // SAFETY: closing our own pipe end so the read below cannot block.
        unsafe { libc::close(write_fd) };
        assert_eq!(
            read_available(read_fd),
            compose_teardown(31, b"\x1b[K").as_bytes()
        );
        assert!(take_emergency_teardown());
        assert!(!take_emergency_teardown());

        guard.disarm();
        // SAFETY: closing our own pipe end.
        unsafe { libc::close(read_fd) };
    }

    const SIGINT_CHILD_ENV: &str = "PINBAR_SIGINT_CHILD";

    #[test]
    fn sigint_child_entry() {
        // Only does work when re-executed by `sigint_releases_region_then_terminates`.
        if std::env::var_os(SIGINT_CHILD_ENV).is_none() {
            return;
        }
        // SAFETY: resetting our own disposition so an inherited ignore cannot
        // mask the re-raise.
        unsafe { libc::signal(libc::SIGINT, libc::SIG_DFL) };
        let _guard = InterruptGuard::arm(b"\x1b[K", 24).expect("arm guard");
        // SAFETY: raising a signal at ourselves; the armed handler tears
        // down and re-raises into the default disposition.
        unsafe { libc::raise(libc::SIGINT) };
        unreachable!("SIGINT should have terminated the process");
    }

    #[test]
    fn sigint_releases_region_then_terminates() {
        use std::os::unix::process::ExitStatusExt;

        let exe = std::env::current_exe().expect("test binary path");
        let output = std::process::Command::new(exe)
            .args([
                "--exact",
                "interrupt::tests::sigint_child_entry",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(SIGINT_CHILD_ENV, "1")
            .stdin(std::process::Stdio::null())
            .output()
            .expect("re-run test binary");

        assert_eq!(output.status.signal(), Some(libc::SIGINT));
        let release = compose_teardown(24, b"\x1b[K");
        assert!(
            output
                .stdout
                .windows(release.as_bytes().len())
                .any(|window| window == release.as_bytes()),
            "stdout: {:?}",
            String::from_utf8_lossy(&output.stdout)
        );
    }
}
