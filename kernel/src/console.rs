//! Console output over the PL011 UART.
//!
//! Hosted builds have no UART; output is collected in a buffer instead so
//! tests can look at what the kernel printed.

use core::fmt::{self, Write};

#[cfg(target_os = "none")]
mod backend {
    use lazy_static::lazy_static;

    use crate::config::UART_BASE;
    use crate::drivers::uart::Pl011;
    use crate::sync::IrqMutex;

    lazy_static! {
        static ref UART: IrqMutex<Pl011> = IrqMutex::new(unsafe { Pl011::new(UART_BASE) });
    }

    pub fn init() {
        UART.lock().init();
    }

    pub fn write_bytes(bytes: &[u8]) {
        UART.lock().write_bytes(bytes);
    }

    /// Bypasses the lock; the holder may be the code that panicked.
    pub fn emergency_write(bytes: &[u8]) {
        unsafe { Pl011::new(UART_BASE) }.write_bytes(bytes);
    }
}

#[cfg(not(target_os = "none"))]
mod backend {
    use alloc::vec::Vec;

    use spin::Mutex;

    static CAPTURE: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    pub fn init() {}

    pub fn write_bytes(bytes: &[u8]) {
        CAPTURE.lock().extend_from_slice(bytes);
    }

    pub fn emergency_write(bytes: &[u8]) {
        write_bytes(bytes);
    }

    pub fn take_output() -> Vec<u8> {
        core::mem::take(&mut *CAPTURE.lock())
    }
}

#[cfg(not(target_os = "none"))]
pub use backend::take_output;

struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        backend::write_bytes(s.as_bytes());
        Ok(())
    }
}

struct EmergencyStdout;

impl Write for EmergencyStdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        backend::emergency_write(s.as_bytes());
        Ok(())
    }
}

/// Initialize console
pub fn init() {
    backend::init();
}

pub fn write_bytes(bytes: &[u8]) {
    backend::write_bytes(bytes);
}

pub fn print(args: fmt::Arguments) {
    // Stdout never reports an error.
    let _ = Stdout.write_fmt(args);
}

pub fn emergency_print(args: fmt::Arguments) {
    let _ = EmergencyStdout.write_fmt(args);
}

/// Print to console
#[macro_export]
macro_rules! print {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!($fmt $(, $($arg)+)?))
    }
}

/// Print to console with newline
#[macro_export]
macro_rules! println {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!(concat!($fmt, "\n") $(, $($arg)+)?))
    };
    () => {
        $crate::console::print(format_args!("\n"))
    }
}
