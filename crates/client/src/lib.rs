pub mod api;
pub mod models;
pub mod session;
pub mod storage;
