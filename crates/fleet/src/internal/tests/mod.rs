mod test_pool;
pub mod utils;
