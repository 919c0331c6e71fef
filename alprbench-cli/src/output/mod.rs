//! Output formatting utilities for the CLI

pub mod progress;
pub mod table;

pub use progress::{SpinnerDownloader, spinner};
pub use table::TableBuilder;
