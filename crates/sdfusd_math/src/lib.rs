// Re-export glam for convenience
pub use glam::*;

// Shared conversion math
mod inertia;
mod pose;

pub use inertia::{inertia_tensor, principal_moments};
pub use pose::Pose;

/// Tolerance used when deciding whether two poses or axes are "the same".
pub const EPSILON: f64 = 1e-9;
