// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum PderivError {
    /// A numeric symbol outside `0..65536`.
    #[error("symbol {0:#x} is out of range, expected a value below 0x10000")]
    SymbolOutOfRange(u32),

    /// Only characters of the Basic Multilingual Plane can be matched.
    #[error("character {0:?} is outside the basic multilingual plane")]
    CharOutsideBmp(char),

    /// A packed interval whose start is greater than its end.
    #[error("packed interval {0:#018x} has its start after its end")]
    IntervalOverflow(u64),

    /// Input positions are tracked as `u32`.
    #[error("input position {0} exceeds the trackable range")]
    PositionOutOfRange(usize),
}
