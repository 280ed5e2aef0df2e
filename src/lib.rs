pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod format;
pub mod models;
pub mod nesten;
pub mod party;
pub mod stats;
pub mod storage;
pub mod sync;
