pub mod catalog;
pub mod collab;
pub mod config;
pub mod docs;
pub mod engine;
pub mod error;
pub mod flows;
pub mod io;
pub mod markers;
pub mod proposal;
pub mod section;
pub mod stepper;

pub use error::{Result, TillerError};
