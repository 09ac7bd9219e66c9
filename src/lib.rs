#![forbid(unsafe_code)]

pub mod catalog;
pub mod check;
pub mod cli;
pub mod formats;
pub mod generate;
pub mod generator;
pub mod inject;
pub mod logging;
pub mod openai;
pub mod plan;
pub mod probe;
pub mod sections;
pub mod sitemap;
