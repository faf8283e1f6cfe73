//! ascii-stream library crate.
//!
//! Converts a live video feed into a grid of glyphs and captures the
//! styled output as PNG stills, WebM clips and GIF loops. The binary is a
//! thin CLI over these modules; they are public for integration testing.

pub mod ascii;
pub mod capture;
pub mod cli;
pub mod config;
pub mod convert;
pub mod display;
pub mod encode;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod share;
pub mod source;
pub mod styled;
