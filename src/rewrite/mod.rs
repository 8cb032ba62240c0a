//! Semantics-preserving expression rewriting.
//!
//! ## Architecture
//!
//! ```text
//! ExprRef → Rewriter (per-kind hooks, defaults in walk) → ExprRef
//!                 ↑
//!   RewriterChain: stage 1 → stage 2 → ... (fan-out for ORDER BY / stored values)
//! ```
//!
//! Stock rewriters: [`AliasRewriter`], [`PathRedirect`], [`PrefetchFolder`].

mod alias;
mod chain;
mod convert;
mod prefetch;
mod redirect;
mod traits;
pub mod walk;

pub use alias::*;
pub use chain::*;
pub use convert::*;
pub use prefetch::*;
pub use redirect::*;
pub use traits::*;
