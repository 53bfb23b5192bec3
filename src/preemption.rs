/// Masks preemption around the timing-critical part of a slot.
///
/// Whatever runs inside [`Preemption::free`] must not be interrupted: a
/// device samples the line 15µs into a slot, so a stalled release or a
/// late sample corrupts the bit. Implementations must restore the previous
/// state on every exit path of `f`, including early error returns.
pub trait Preemption {
    fn free<R>(&mut self, f: impl FnOnce() -> R) -> R;
}

/// Masks interrupts through the `critical-section` implementation linked into the firmware
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalPreemption;

impl Preemption for GlobalPreemption {
    #[inline(always)]
    fn free<R>(&mut self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_| f())
    }
}

/// Runs slots without masking anything.
///
/// Only sound when nothing can preempt the caller, e.g. the driver is
/// already called from the highest-priority context.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unmasked;

impl Preemption for Unmasked {
    #[inline(always)]
    fn free<R>(&mut self, f: impl FnOnce() -> R) -> R {
        f()
    }
}
