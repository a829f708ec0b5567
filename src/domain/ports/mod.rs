mod pool_store;
mod prober;

pub use pool_store::PoolStore;
pub use prober::Prober;
