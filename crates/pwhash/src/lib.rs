#![doc = include_str!("../README.md")]

mod digest;
mod dispatch;
mod error;
mod id;
mod service;
mod shutdown;
mod sleep;
mod stats;
mod store;

pub use crate::digest::*;
pub use crate::dispatch::*;
pub use crate::error::*;
pub use crate::id::*;
pub use crate::service::*;
pub use crate::shutdown::*;
pub use crate::sleep::*;
pub use crate::stats::*;
pub use crate::store::*;
