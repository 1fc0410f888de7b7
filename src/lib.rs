//! Helpers for preparing multimodal (text + image) product embeddings and for
//! displaying the search results they feed.
//!
//! Data preparation:
//! - [`store`]: fetch catalog images from an object store, base64 or decoded
//! - [`embedding`]: invoke a multimodal embedding model for a text/image pair
//! - [`attributes`]: pull clean values out of product attribute records
//! - [`catalog`]: normalize whole product listings
//!
//! Query display:
//! - [`display`]: text listing and image grid for scored search hits

pub mod attributes;
pub mod catalog;
pub mod config;
pub mod display;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod store;

pub use error::{Error, Result};
