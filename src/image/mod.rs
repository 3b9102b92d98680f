//! Runtime image model: identity, layers, writer, runtime contract

mod identity;
mod layer;
mod runtime;
mod writer;

pub use identity::RuntimeIdentity;
pub use layer::{digest_bytes, validate_order, Layer, LayerKind, LayerSpec};
pub use runtime::{HealthcheckContract, PortContract, RuntimeContract};
pub use writer::{ImageManifest, ImageWriter};
