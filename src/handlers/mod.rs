pub mod admin;
pub mod auth;
pub mod auth_otp;
