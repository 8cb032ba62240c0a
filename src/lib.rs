//! Query expressions that survive schema changes.
//!
//! Build queries once against the model, then let rewriters rename fields,
//! move aliases, fold pre-fetched sub-queries and convert stored values.
//!
//! ```ignore
//! use qail_rewrite::prelude::*;
//!
//! let a = root("a", ValueType::record("Account"));
//! let redirect = PathRedirect::builder(&a.property("name", ValueType::String))
//!     .to_path(&a.property("label", ValueType::String))
//!     .build()?;
//! let chain = RewriterChain::new(vec![Arc::new(redirect)])?;
//! let filter = chain.apply_predicate(&eq(a.property("name", ValueType::String), constant("x")))?;
//! // a.label = 'x'
//! ```

pub mod ast;
pub mod clause;
pub mod config;
pub mod error;
pub mod registry;
pub mod rewrite;

pub use config::RewriteConfig;
pub use error::{RewriteError, RewriteResult};

pub mod prelude {
    pub use crate::ast::builders::*;
    pub use crate::ast::*;
    pub use crate::clause::*;
    pub use crate::error::*;
    pub use crate::registry::{CachedLookup, ClauseKind, ProviderLookup, Provision, StaticRegistry};
    pub use crate::rewrite::*;
    pub use crate::RewriteConfig;
    pub use std::sync::Arc;
}
