//! Translation between IRC and Showdown.
//!
//! - `frontend`: IRC commands the gateway understands
//! - `backend`: Showdown events rendered as IRC lines
//! - `raw`: extractors for Showdown's HTML answer boxes

pub mod backend;
pub mod frontend;
pub mod raw;

pub use backend::Translator;
pub use frontend::FrontCommand;
