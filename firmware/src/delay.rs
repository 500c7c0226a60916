//! Busy-wait delay, calibrated for 16MHz.

use embedded_hal::delay::DelayNs;

/// Cycle-counting delay. No timer is used; interrupts are never enabled.
pub struct BusyDelay;

impl DelayNs for BusyDelay {
    fn delay_ns(&mut self, ns: u32) {
        // 4 cycles per iteration = 250ns
        for _ in 0..ns / 250 {
            unsafe { core::arch::asm!("nop") };
        }
    }

    fn delay_us(&mut self, us: u32) {
        for _ in 0..us {
            for _ in 0..4u8 {
                unsafe { core::arch::asm!("nop") };
            }
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            // ~1ms at 16MHz: 16000 cycles / 4 cycles per loop iteration
            for _ in 0..4000u16 {
                unsafe { core::arch::asm!("nop") };
            }
        }
    }
}
