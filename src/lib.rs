// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

mod printer;

pub mod binder;
pub mod compressedset;
pub mod dedupset;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod symbol;

pub use binder::{Binder, GroupId, PendingUpdate, Span, TaggedPattern, TaggedState};
pub use compressedset::CompressedSet;
pub use dedupset::{DedupMap, DedupSet};
pub use error::PderivError;
pub use matcher::{Captures, Match, MatchOptions, Matcher, TaggedMatcher};
pub use pattern::Pattern;
pub use symbol::{symbols_from_str, Symbol, DOMAIN_SIZE};
