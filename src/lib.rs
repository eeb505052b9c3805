pub mod app;
pub mod commands;
pub mod config;
pub mod convert;
pub mod error;
pub mod excel;
pub mod fallout;
pub mod limits;
pub mod locate;
pub mod pivot;
pub mod session;
pub mod status;
pub mod ui;
pub mod utils;
pub mod wafermap;
