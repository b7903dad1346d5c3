pub mod mock_source;
pub mod rate_limit;
pub mod reddit;
