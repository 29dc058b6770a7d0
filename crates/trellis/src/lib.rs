//! Trellis - object lifecycle runtime and messaging core for desktop UI
//! toolkits.
//!
//! This is the umbrella crate: it re-exports everything from `trellis-core`
//! and adds snapshot file storage in [`file`].
//!
//! # Example
//!
//! ```no_run
//! use trellis::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runtime = Runtime::new();
//!     let document = trellis::file::load_snapshot("layout.json")?;
//!     if !document.is_empty() {
//!         runtime.restore_snapshot(&document, env!("CARGO_PKG_VERSION"))?;
//!     }
//!     // Create objects, run the application...
//!     trellis::file::save_snapshot("layout.json", &runtime.save_snapshot(env!("CARGO_PKG_VERSION")))?;
//!     Ok(())
//! }
//! ```

pub use trellis_core::*;

pub mod file;
pub mod prelude;
