// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::error::PderivError;

/// The number of symbols in the alphabet, i.e. the UTF-16 code units.
pub const DOMAIN_SIZE: u32 = 0x1_0000;

/// A single symbol of the alphabet `0..65536`.
///
/// Out-of-range values are rejected when converting into a `Symbol`,
/// so every operation that takes a `Symbol` is infallible.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Symbol(u16);

impl Symbol {
    pub const MIN: Symbol = Symbol(0);
    pub const MAX: Symbol = Symbol(u16::MAX);

    pub const fn new(value: u16) -> Self {
        Symbol(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Surrogate code units have no `char`, returns `None` for them.
    pub fn to_char(&self) -> Option<char> {
        char::from_u32(self.0 as u32)
    }
}

impl From<u16> for Symbol {
    fn from(value: u16) -> Self {
        Symbol(value)
    }
}

impl TryFrom<u32> for Symbol {
    type Error = PderivError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match u16::try_from(value) {
            Ok(v) => Ok(Symbol(v)),
            Err(_) => Err(PderivError::SymbolOutOfRange(value)),
        }
    }
}

impl TryFrom<char> for Symbol {
    type Error = PderivError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match u16::try_from(value as u32) {
            Ok(v) => Ok(Symbol(v)),
            Err(_) => Err(PderivError::CharOutsideBmp(value)),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_char() {
            Some(c) => write!(f, "{:?}", c),
            None => write!(f, "'\\u{{{:x}}}'", self.0),
        }
    }
}

/// Converts a string into symbols, failing on the first character
/// beyond the BMP.
pub fn symbols_from_str(s: &str) -> Result<Vec<Symbol>, PderivError> {
    s.chars().map(Symbol::try_from).collect()
}
