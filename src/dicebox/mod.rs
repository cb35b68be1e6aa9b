pub mod engine;
pub mod error;
pub mod game;
pub mod history;
pub mod session;
pub mod types;
pub mod view;

pub use engine::*;
pub use error::*;
pub use game::*;
pub use history::*;
pub use session::*;
pub use types::*;
pub use view::*;
