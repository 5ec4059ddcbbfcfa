mod dispatcher;
mod types;

#[cfg(test)]
mod tests;

pub use dispatcher::{ActionDispatcher, Collaborators};
pub use types::{ActionError, ActionKind, ActionOutcome, DispatchSettings, FaceReport};
