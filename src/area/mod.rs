//! # Area tree
//!
//! The statistics feed is a tree of geographic units:
//!
//! ```text
//!     areaTree[0]  China
//!                  ├── Hubei
//!                  │   ├── Wuhan
//!                  │   └── Yichang
//!                  └── Guangdong
//!                      └── Shenzhen
//! ```
//!
//! `model` holds the records, `search` the name lookup.

mod model;
mod search;

pub use model::{AreaRecord, AreaTree, ExtendedStats, TodayStats, TotalStats};
pub use search::{find_area, find_area_path};

pub(crate) use model::null_as_default;
pub(crate) use search::take_area;
