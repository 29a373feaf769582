pub mod serve;

// Re-export command functions for convenience
pub use serve::{serve, ServeParams};
