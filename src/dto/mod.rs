pub mod admin_dto;
pub mod auth_dto;
pub mod common;
pub mod public_dto;
