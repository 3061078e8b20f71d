pub mod api;
pub mod app;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod notify;
pub mod output;
pub mod registry;
pub mod selection;
pub mod store;
pub mod tui;
