mod file_pool_store;
mod http_prober;
mod memory_pool_store;

pub use file_pool_store::FilePoolStore;
pub use http_prober::HttpProber;
pub use memory_pool_store::MemoryPoolStore;
