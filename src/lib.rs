// Copyright (c) 2024-present, Andrew Werner
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! This crate is an indexable ordered map built on a skip list.
//!
//! Besides the usual ordered-map operations it answers two positional
//! queries in O(log n) expected time:
//!     * Rank: the 1-based position of a key
//!     * Select: the entry stored at a 1-based position
//!
//! Every forward link carries a span (how many entries it skips over), which
//! is what makes the positional queries cheap.
//!
//! The structure is not internally synchronized. Mutation takes `&mut self`,
//! so sharing a map across threads needs an outer lock.
//! Nodes live in an index-based arena.
//!
//! ```
//! use rank_skiplist::SkipMap;
//!
//! let mut map = SkipMap::new();
//! for key in [10, 20, 30, 40, 50] {
//!     map.set(key, key);
//! }
//! assert_eq!(map.rank(&30), 3);
//! assert_eq!(map.select(3), Some((&30, &30)));
//! assert_eq!(map.rank(&25), 0);
//! ```

#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::needless_lifetimes)]

mod arena;
mod options;
mod skipmap;

pub use options::{Options, OptionsError, MAX_HEIGHT};
pub use skipmap::{Iter, SkipMap};
