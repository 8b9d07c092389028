mod storage_config_dto;

pub use storage_config_dto::*;
