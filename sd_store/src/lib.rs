//! Entity Store (§4.1): atomic JSON persistence for the project directory
//! tree, plus the advisory project lock (§5).

pub mod lock;
pub mod paths;
pub mod store;

pub use lock::ProjectLock;
pub use paths::ProjectPaths;
pub use store::{diff_hash, union_merge_str_list, EntityStore};
