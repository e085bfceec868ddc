//! Interrupt-masking spin lock.
//!
//! The only source of re-entrancy on a single core is an interrupt
//! arriving while the lock is held, so the guard keeps IRQs masked for
//! its whole lifetime and restores the previous mask when dropped.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use crate::arch;

pub struct IrqMutex<T> {
    inner: Mutex<T>,
}

pub struct IrqMutexGuard<'a, T> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    flags: u64,
}

impl<T> IrqMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        let flags = arch::irq_save();
        IrqMutexGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            flags,
        }
    }

}

impl<T> Deref for IrqMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for IrqMutexGuard<'_, T> {
    fn drop(&mut self) {
        // Release the lock before interrupts can come back.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        arch::irq_restore(self.flags);
    }
}
