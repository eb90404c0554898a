//! A kernel checker for mutually inductive type declarations.
//!
//! A candidate block is a [`MutualInductiveEntry`](inductive::MutualInductiveEntry): the
//! shared parameters, an arity and a list of constructor types for each inductive, and
//! the block's universes. [`check_inductive`](inductive::check_inductive) certifies it
//! against an [`Env`](env::Env), producing a [`MutIndBody`](inductive::MutIndBody)
//! that records, for each inductive, its universe arity, its elimination restriction,
//! the recursive structure of its constructors and, for records, its primitive
//! projections.
//! ```ignore
//! let mut ctx = TcCtx::new();
//! let mut env = Env::new(TypingFlags::default());
//! let body = check_inductive(&mut ctx, &env, mind, &entry)?;
//! env.add_inductive(&mut ctx, body)?;
//! ```
#![allow(clippy::too_many_arguments)]

pub mod debug_printer;
pub mod env;
pub mod expr;
pub mod inductive;
pub mod level;
pub mod log;
pub mod name;
pub mod parser;
pub mod tc;
#[cfg(test)]
mod tests;
pub mod union_find;
pub mod unique_hasher;
pub mod univ;
pub mod util;
