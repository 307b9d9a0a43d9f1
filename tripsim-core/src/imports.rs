pub use anyhow::{anyhow, bail, ensure, Context};
pub use itertools::{izip, Itertools};
pub use lazy_static::lazy_static;
pub use ndarray::{Array, Array1};
pub use serde::{Deserialize, Serialize};
pub use std::ffi::OsStr;
pub use std::fs::File;
pub use std::path::Path;
pub use validator::Validate;

pub use crate::params::*;
pub use crate::proc_macros::{ApproxEq, HistoryVec};
pub use crate::traits::*;
pub use crate::utils::*;
