pub mod bullet;
pub mod engine;
pub mod hash;
pub mod library;
pub mod scripted;
pub mod volley;

pub use bullet::{BulletInstance, BulletKind, BulletView};
pub use engine::{SimulationDriver, TickReport};
pub use hash::pool_state_hash;
pub use library::{LibraryError, PatternLibrary, ScriptedFactory, FROG_GO_TEXTURE, FROG_STOP_TEXTURE};
pub use scripted::{check_scripted_frame, BulletBody, ScriptedBehavior, SCRIPTED_FIELDS};
pub use volley::{volley_overrides, VolleyShape};

#[cfg(test)]
mod tests;
