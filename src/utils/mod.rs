//! Helpers used across the crate: builder/getter macros, the recyclable
//! record pool and the statistics used by haplotype-level comparisons.

mod pool;
mod stats;

pub use pool::{
    PoolStats,
    Recycle,
    RecordPool,
    WorkerPool,
    LOCAL_CACHE_CEILING,
};
pub use stats::*;

#[macro_export]
macro_rules! getter_fn {
    ($field_name: ident, $field_type: ty) => {
        #[cfg_attr(coverage_nightly, coverage(off))]
        pub fn $field_name(&self) -> &$field_type {
            &self.$field_name
        }
    };
}

#[macro_export]
macro_rules! with_field_fn {
    ($field_name: ident, $field_type: ty) => {
        paste::paste! {
            #[cfg_attr(coverage_nightly, coverage(off))]
            pub fn [<with_$field_name>](mut self, value: $field_type) -> Self {
            self.$field_name = value;
            self
            }
        }
    };
}

/// Resolves a user thread count, `0` meaning all available cores.
pub fn resolve_threads(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
