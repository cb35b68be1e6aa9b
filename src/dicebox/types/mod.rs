//! Types module
//!
//! Plain data shared by the engine adapter, the session and the view:
//! dice types and notations, the fixed collections, resolved dice,
//! configuration and the cosmetic color palette.

pub mod collection;
pub mod config;
pub mod dice;
pub mod palette;

pub use collection::*;
pub use config::*;
pub use dice::*;
pub use palette::*;
