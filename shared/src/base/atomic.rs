use std::sync::atomic::{
    fence, AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

/// Atomically replaces the current value with `new` if it equals `expected`.
///
/// All operations are sequentially consistent. Returns whether the swap
/// took place.
pub trait CompareAndSwap {
    type Value: Copy;

    fn compare_and_set(&self, expected: Self::Value, new: Self::Value) -> bool;
}

macro_rules! impl_compare_and_set {
    ($($atomic:ty => $value:ty),*) => {
        $(
            impl CompareAndSwap for $atomic {
                type Value = $value;

                fn compare_and_set(&self, expected: $value, new: $value) -> bool {
                    self.compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                }
            }
        )*
    };
}

impl_compare_and_set!(
    AtomicBool => bool,
    AtomicI32 => i32,
    AtomicI64 => i64,
    AtomicU32 => u32,
    AtomicU64 => u64,
    AtomicUsize => usize
);

/// Full memory fence. No load or store moves across it in either direction.
pub fn memory_barrier() {
    fence(Ordering::SeqCst);
}
