pub mod journal;
pub mod settings;
pub mod trade;

pub use journal::*;
pub use settings::*;
pub use trade::*;
