pub mod capture;
pub mod commands;
pub mod config;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod link;
pub mod lock;
pub mod manifest;
pub mod paths;
pub mod probe;
pub mod profiles;
pub mod switch;
pub mod task;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
