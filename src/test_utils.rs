use core::cell::Cell;

pub const RNG_SEED: [u8; 32] = [
    0x3b, 0x9e, 0x51, 0x0c, 0x7d, 0x22, 0xe4, 0x86, 0x19, 0xa0, 0x5f, 0xc3, 0x44, 0x0b, 0xd8, 0x71,
    0x2e, 0x93, 0x6a, 0xf5, 0x08, 0xbc, 0x37, 0x4d, 0xe9, 0x12, 0x80, 0x6c, 0xa7, 0x55, 0xf0, 0x1e,
];

pub struct DropCounter {
    drop_count: Cell<usize>,
}

impl DropCounter {
    pub fn new() -> Self {
        DropCounter {
            drop_count: Cell::new(0),
        }
    }

    pub fn dropped(&self) -> usize {
        self.drop_count.get()
    }

    pub fn new_droppable<T>(&self, value: T) -> Droppable<'_, T> {
        Droppable {
            value,
            counter: self,
        }
    }
}

#[derive(Debug)]
pub struct Droppable<'a, T = ()> {
    pub value: T,
    counter: &'a DropCounter,
}

impl<T: Clone> Clone for Droppable<'_, T> {
    fn clone(&self) -> Self {
        self.counter.new_droppable(self.value.clone())
    }
}

impl<T: PartialEq> PartialEq for Droppable<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Drop for Droppable<'_, T> {
    fn drop(&mut self) {
        let count = self.counter.drop_count.get();
        self.counter.drop_count.set(count + 1);
    }
}

impl core::fmt::Debug for DropCounter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DropCounter({})", self.dropped())
    }
}
