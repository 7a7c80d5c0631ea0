mod kube;
mod reconcile;
mod sync;

pub use kube::*;
pub use reconcile::*;
pub use sync::*;
