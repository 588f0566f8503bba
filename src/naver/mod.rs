// src/naver/mod.rs
pub mod client;
pub mod encoding;
pub mod models;

pub use client::{CrawlerConfig, NaverClient};
