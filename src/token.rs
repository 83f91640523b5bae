//! Token pair model, redacted secrets, and expiry introspection.

pub mod introspect;
pub mod pair;
pub mod secret;

pub use introspect::*;
pub use pair::*;
pub use secret::*;
