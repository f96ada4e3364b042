// Copyright (c) 2023 The MobileCoin Foundation

//! Trust anchors for VOMS attribute certificates: local AA certificates and
//! LSC files

mod loader;
mod lsc;
mod refresh;
mod store;

pub use lsc::{ChainDescription, LscFile, LscInfo, LSC_EXTENSION};
pub use refresh::{RefreshingTrustStore, Updateable};
pub use store::{DefaultTrustStore, TrustSnapshot, VomsTrustStore};
