//! Two-slot scratch image pool.
//!
//! Every pipeline stage reads the current slot and writes the other one, then
//! the pool swaps. Slots are only reallocated when the requested shape changes,
//! so a steady stream of same-sized frames keeps the same two buffers. Stages
//! built on imageproc filters that return a new image still allocate that
//! temporary; its pixels are copied into the slot.
//! Swapping never clears memory: a stage that relies on an all-zero canvas has
//! to call [`BufferPool::clear_other`] first.

use image::{ImageBuffer, Pixel, Primitive};

/// Owned image stored in a pool slot.
pub type Slot<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

pub struct BufferPool<P: Pixel> {
    slots: [Slot<P>; 2],
    current: usize,
}

impl<P: Pixel> Default for BufferPool<P> {
    fn default() -> Self {
        Self {
            slots: [ImageBuffer::new(0, 0), ImageBuffer::new(0, 0)],
            current: 0,
        }
    }
}

impl<P: Pixel> BufferPool<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape of the current slot.
    pub fn dimensions(&self) -> (u32, u32) {
        self.slots[self.current].dimensions()
    }

    /// Returns `(current, other)`, reallocating both slots if `shape` differs
    /// from their present shape.
    pub fn acquire(&mut self, shape: (u32, u32)) -> (&Slot<P>, &mut Slot<P>) {
        for slot in &mut self.slots {
            if slot.dimensions() != shape {
                *slot = ImageBuffer::new(shape.0, shape.1);
            }
        }
        self.split()
    }

    /// Makes the other slot current.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    pub fn current(&self) -> &Slot<P> {
        &self.slots[self.current]
    }

    /// Runs one same-shape stage: `f(current, other)`, then swaps.
    pub fn stage(&mut self, f: impl FnOnce(&Slot<P>, &mut Slot<P>)) {
        let shape = self.dimensions();
        let (src, dst) = self.acquire(shape);
        f(src, dst);
        self.swap();
    }

    /// Copies `image` into the pool and makes it current.
    pub fn load(&mut self, image: &Slot<P>) {
        let (_, dst) = self.acquire(image.dimensions());
        dst.copy_from_slice(image);
        self.swap();
    }

    /// Zeroes the other slot.
    pub fn clear_other(&mut self) {
        let (_, dst) = self.split();
        dst.fill(<P::Subpixel as Primitive>::DEFAULT_MIN_VALUE);
    }

    #[cfg(test)]
    pub(crate) fn slot_addresses(&self) -> [usize; 2] {
        self.slots.each_ref().map(|slot| slot.as_raw().as_ptr() as usize)
    }

    fn split(&mut self) -> (&Slot<P>, &mut Slot<P>) {
        let current = self.current;
        let [first, second] = &mut self.slots;
        if current == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        }
    }
}
