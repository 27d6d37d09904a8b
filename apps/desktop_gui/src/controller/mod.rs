//! UI-side controller: event modeling and command dispatch.

pub mod events;
pub mod orchestration;
