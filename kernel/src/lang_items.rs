//! Language items and panic handler

use core::panic::PanicInfo;

use crate::arch;
use crate::console;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    arch::disable_irqs();
    // The console lock may be held by whatever panicked.
    match info.location() {
        Some(location) => console::emergency_print(format_args!(
            "\n[kernel panic] at {}:{} {}\n",
            location.file(),
            location.line(),
            info.message()
        )),
        None => console::emergency_print(format_args!("\n[kernel panic] {}\n", info.message())),
    }
    arch::halt()
}
