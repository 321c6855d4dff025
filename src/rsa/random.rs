// Callers pick the generator. Use a cryptographically secure one such as
// `rand::rngs::OsRng` for real keys.

use rand::RngCore;

pub trait RandomGenerator {
    /// Returns a value whose lowest 8 bits at least are random.
    fn next_bits(&mut self) -> u32;

    fn fill(&mut self, dest: &mut [u8]) {
        for b in dest.iter_mut() {
            *b = (self.next_bits() & 0xff) as u8;
        }
    }

    fn next_nonzero_byte(&mut self) -> u8 {
        loop {
            let b = (self.next_bits() & 0xff) as u8;
            if b != 0 { return b; }
        }
    }
}

impl<R: RngCore + ?Sized> RandomGenerator for R {
    fn next_bits(&mut self) -> u32 {
        self.next_u32()
    }

    fn fill(&mut self, dest: &mut [u8]) {
        self.fill_bytes(dest)
    }
}

/// Adapts a plain `FnMut() -> u32` into a generator, only the low byte of
/// each call is used.
pub struct FnGenerator<F: FnMut() -> u32>(pub F);

impl<F: FnMut() -> u32> RandomGenerator for FnGenerator<F> {
    fn next_bits(&mut self) -> u32 {
        (self.0)()
    }
}
