pub mod download;
pub mod health;
pub mod login;
pub mod upload;
