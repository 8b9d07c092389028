mod storage_config_handler;

pub use storage_config_handler::*;
