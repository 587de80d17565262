pub mod backup;
pub mod events;
pub mod journal;
pub mod settings;
pub mod stats;
pub mod trades;

pub use backup::*;
pub use events::*;
pub use journal::*;
pub use settings::*;
pub use stats::*;
pub use trades::*;
