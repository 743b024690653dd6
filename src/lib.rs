#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate lazy_static;

pub mod blur;
pub mod charts;
pub mod colormap;
pub mod export_data;
pub mod heatmap;
pub mod import_data;
pub mod kde;
pub mod logs;
pub mod movements;
pub mod pace;
pub mod track;
pub mod utils;
pub mod webserver;
