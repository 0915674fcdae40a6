pub mod admin;
pub mod catalog;
pub mod configs;
pub mod files;
