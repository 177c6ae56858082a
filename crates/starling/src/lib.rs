#![doc = include_str!("../README.md")]

pub mod analytics;
mod config;
pub mod content;
mod date;
pub mod html;
pub mod pagination;
pub mod permalink;
pub mod render;
pub mod routing;
pub mod serve;
mod site;
pub mod storage;

pub use config::*;
pub use site::*;
