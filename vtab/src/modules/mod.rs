mod dominator_tree;
mod stmt_cache;

pub use dominator_tree::{DominatorTreeModule, DOMINATOR_TREE_MODULE_NAME};
pub use stmt_cache::{StmtCacheModule, STMT_CACHE_MODULE_NAME};
