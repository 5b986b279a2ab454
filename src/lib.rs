//! Release helpers for DancherLink.
//!
//! [`manifest`] backs the `update-version` tool and [`icons`] backs `update-icons`.

pub mod env;
pub mod icons;
pub mod manifest;
pub mod util;
