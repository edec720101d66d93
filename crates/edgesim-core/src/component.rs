//! Entity identifiers.

/// Identifier of simulation entity, assigned sequentially on registration.
pub type Id = u32;
