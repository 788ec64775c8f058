mod category;
mod error;
mod model;
mod payload;
mod source;

pub use category::{Category, CategoryVisibility};
pub use error::{FetchError, GraphError};
pub use model::{BuildOptions, GraphModel, LinkKind};
pub use payload::RawNode;
pub use source::{HierarchyQuery, HierarchySource, HttpHierarchySource};
