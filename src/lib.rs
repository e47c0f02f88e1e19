//! Write GitHub Actions workflows as typed Rust values and compile them to YAML whose actions are pinned to commits.
//!
//! A [`Workflow`](workflow::Workflow) is assembled with the builder of [`workflow`]. The [`resolver`] pins every
//! `owner/repo@tag` reference to the commit the tag points at, remembering each pin in a lock file. The
//! [`compiler`] turns the workflow and its pins into a canonical document and renders it. [`pipeline`] chains all
//! of it, and [`github`] looks tags up through GitHub REST API.

pub mod compiler;
pub mod env;
mod error;
pub mod framework;
pub mod github;
pub mod pipeline;
pub mod resolver;
pub mod workflow;

pub use error::Error;
pub use pipeline::{BatchOptions, CompileOptions, Output, compile_batch, compile_workflow};

/// A shorthand to define a statically allocated variable using a [`std::sync::LazyLock`].
///
/// # Examples
///
/// ```rust
/// # use gat::static_lazy_lock;
/// # use std::sync::LazyLock;
/// static_lazy_lock!{
///     pub VAR_1: String = String::from("a static variable");
/// }
/// // ...equals to...
/// pub static VAR_2: LazyLock<String> = LazyLock::new(|| String::from("a static variable"));
/// ```
#[macro_export]
macro_rules! static_lazy_lock {
    ($(#[$meta:meta])* $vis:vis $name:ident: $type:ty = $expr:expr $(;)?) => {
        $(#[$meta])*
        $vis static $name: $crate::__priv_macro_use::LazyLock<$type> =
            $crate::__priv_macro_use::LazyLock::new(|| $expr);
    };
}

#[doc(hidden)]
pub mod __priv_macro_use {
    pub use std::sync::LazyLock;
}
