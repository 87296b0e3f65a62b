pub mod autosave;
mod controller;

pub use controller::{AttemptController, SessionEvent, SessionPhase};
