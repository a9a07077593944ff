// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::hash::{Hash, Hasher};

use crate::{
    error::PderivError,
    symbol::{symbols_from_str, Symbol, DOMAIN_SIZE},
};

// A bound past the end of the domain, used by exhausted operands
// and by an active open-ended tail during a merge sweep.
const VIRTUAL_END: u32 = DOMAIN_SIZE * 2;

/**
 * A set of symbols over the universe `0..65536`, encoded as alternating
 * run-lengths instead of one bit per symbol.
 *
 * e.g. the set `{'A', 'C', 'D', 'E', 'G'}` is stored as
 * `[65, 1, 1, 3, 1, 1]` with the first run "off":
 * 65 symbols off, 1 on ('A'), 1 off ('B'), 3 on ('C'..'E'), 1 off, 1 on ('G'),
 * and everything after the last run is off.
 *
 * The representation is canonical:
 * - the set is empty iff there are no runs,
 * - every run is non-empty except the last one, which may be `0`:
 *   a sentinel meaning "on until the end of the domain",
 * - the last run is always "on" (trailing "off" symbols are implicit).
 *
 * so two sets are equal iff their run sequences and cardinalities are.
 */
#[derive(Debug, Clone)]
pub struct CompressedSet {
    runs: Vec<u16>,

    // the polarity of `runs[0]`, i.e. whether symbol 0 is in the set.
    starts_on: bool,

    // the number of "on" symbols, in `0..=65536`.
    cardinality: u32,
}

impl CompressedSet {
    pub fn empty() -> Self {
        CompressedSet {
            runs: vec![],
            starts_on: false,
            cardinality: 0,
        }
    }

    pub fn full() -> Self {
        CompressedSet {
            runs: vec![0],
            starts_on: true,
            cardinality: DOMAIN_SIZE,
        }
    }

    /// Builds a set from a list of symbols in any order, duplicates
    /// are ignored, i.e. the cardinality counts distinct symbols.
    pub fn from_symbols<I>(symbols: I) -> Self
    where
        I: IntoIterator<Item = Symbol>,
    {
        let mut values: Vec<u32> = symbols
            .into_iter()
            .map(|symbol| symbol.value() as u32)
            .collect();

        values.sort_unstable();
        values.dedup();

        let mut builder = RunBuilder::new();
        let mut position: u32 = 0;
        let mut iter = values.into_iter().peekable();

        while let Some(start) = iter.next() {
            // coalesce consecutive values into one maximal run
            let mut end_included = start;
            while let Some(next) = iter.next_if(|v| *v == end_included + 1) {
                end_included = next;
            }

            builder.push(false, start - position);
            builder.push(true, end_included - start + 1);
            position = end_included + 1;
        }

        builder.finish()
    }

    pub fn from_str_chars(s: &str) -> Result<Self, PderivError> {
        let symbols = symbols_from_str(s)?;
        Ok(CompressedSet::from_symbols(symbols))
    }

    pub fn from_range(start: Symbol, end_included: Symbol) -> Self {
        if start > end_included {
            return CompressedSet::empty();
        }

        let start = start.value() as u32;
        let end_included = end_included.value() as u32;

        let mut builder = RunBuilder::new();
        builder.push(false, start);
        builder.push(true, end_included - start + 1);
        builder.finish()
    }

    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    pub fn is_full(&self) -> bool {
        self.cardinality == DOMAIN_SIZE
    }

    pub fn runs(&self) -> &[u16] {
        &self.runs
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn starts_on(&self) -> bool {
        self.starts_on
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        let value = symbol.value() as u32;
        let mut on = self.starts_on;
        let mut bound: u32 = 0;

        for &run in &self.runs {
            if run == 0 {
                // the open-ended tail
                return on;
            }

            bound += run as u32;
            if value < bound {
                return on;
            }

            on = !on;
        }

        false
    }

    /// Iterates the symbols of this set in ascending order.
    pub fn members(&self) -> Members<'_> {
        Members {
            runs: self.runs.iter(),
            on: self.starts_on,
            cursor: 0,
            run_end: 0,
            remaining: self.cardinality,
        }
    }

    /// The "on" runs as inclusive symbol ranges, in ascending order.
    pub fn ranges(&self) -> Vec<(Symbol, Symbol)> {
        let mut ranges = vec![];
        let mut on = self.starts_on;
        let mut position: u32 = 0;

        for &run in &self.runs {
            let length = if run == 0 {
                DOMAIN_SIZE - position
            } else {
                run as u32
            };

            if on {
                let start = Symbol::new(position as u16);
                let end_included = Symbol::new((position + length - 1) as u16);
                ranges.push((start, end_included));
            }

            position += length;
            on = !on;
        }

        ranges
    }

    /// Flips every symbol in place.
    pub fn negate(&mut self) -> &mut Self {
        match (self.starts_on, self.runs.last().copied()) {
            (_, None) => {
                // empty -> full
                self.starts_on = true;
                self.runs.push(0);
            }
            (_, Some(0)) if self.runs.len() == 1 => {
                // full -> empty
                self.starts_on = false;
                self.runs.clear();
            }
            (parity, Some(0)) => {
                // the open tail turns "off", which is implicit,
                // and the run before it becomes the last "on" run.
                self.runs.pop();
                self.starts_on = !parity;
            }
            (parity, Some(_)) => {
                // the last "on" run turns "off", and the implicit
                // "off" tail becomes an open "on" tail.
                self.runs.push(0);
                self.starts_on = !parity;
            }
        }

        self.cardinality = DOMAIN_SIZE - self.cardinality;
        self
    }

    pub fn negated(&self) -> Self {
        let mut set = self.clone();
        set.negate();
        set
    }

    pub fn union(left: &CompressedSet, right: &CompressedSet) -> CompressedSet {
        if left.is_empty() {
            return right.clone();
        }

        if right.is_empty() {
            return left.clone();
        }

        sweep(left, right, Combine::Union)
    }

    pub fn intersection(left: &CompressedSet, right: &CompressedSet) -> CompressedSet {
        if left.is_empty() || right.is_empty() {
            return CompressedSet::empty();
        }

        sweep(left, right, Combine::Intersection)
    }
}

impl Default for CompressedSet {
    fn default() -> Self {
        CompressedSet::empty()
    }
}

impl PartialEq for CompressedSet {
    fn eq(&self, other: &Self) -> bool {
        // compare from the tail, where sets built from
        // different sources usually diverge first.
        self.cardinality == other.cardinality
            && self.runs.len() == other.runs.len()
            && self.runs.iter().rev().eq(other.runs.iter().rev())
    }
}

impl Eq for CompressedSet {}

impl Hash for CompressedSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cardinality.hash(state);
        self.runs.hash(state);
    }
}

pub struct Members<'a> {
    runs: std::slice::Iter<'a, u16>,

    // the polarity of the next run to be read
    on: bool,

    cursor: u32,
    run_end: u32,
    remaining: u32,
}

impl Iterator for Members<'_> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cursor < self.run_end {
                let value = self.cursor;
                self.cursor += 1;
                self.remaining -= 1;
                return Some(Symbol::new(value as u16));
            }

            let run = *self.runs.next()?;
            let length = if run == 0 {
                DOMAIN_SIZE - self.cursor
            } else {
                run as u32
            };

            if self.on {
                self.run_end = self.cursor + length;
            } else {
                self.cursor += length;
                self.run_end = self.cursor;
            }

            self.on = !self.on;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Members<'_> {}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combine {
    Union,
    Intersection,
}

impl Combine {
    fn apply(&self, left: bool, right: bool) -> bool {
        match self {
            Combine::Union => left || right,
            Combine::Intersection => left && right,
        }
    }
}

/// Walks the absolute run boundaries of one operand.
struct RunCursor<'a> {
    runs: &'a [u16],
    index: usize,

    // the polarity of the current run, which covers `..bound`.
    on: bool,

    // the exclusive upper bound of the current run
    bound: u32,

    // the current run is the open-ended "on" tail.
    open: bool,
}

impl<'a> RunCursor<'a> {
    fn new(set: &'a CompressedSet) -> Self {
        let mut cursor = RunCursor {
            runs: &set.runs,
            index: 0,
            on: false,
            bound: 0,
            open: false,
        };
        cursor.load(set.starts_on);
        cursor
    }

    fn load(&mut self, on: bool) {
        match self.runs.get(self.index) {
            Some(0) => {
                self.on = on;
                self.open = true;
                self.bound = VIRTUAL_END;
            }
            Some(&run) => {
                self.on = on;
                self.bound += run as u32;
            }
            None => {
                // exhausted, everything after is "off"
                self.on = false;
                self.bound = VIRTUAL_END;
            }
        }
    }

    fn advance(&mut self) {
        self.index += 1;
        self.load(!self.on);
    }
}

/// Accumulates gaps of equal polarity and emits them as canonical runs.
struct RunBuilder {
    runs: Vec<u16>,
    starts_on: bool,

    // the polarity of the pending gap
    on: bool,
    pending: u32,

    // the total length of the emitted runs
    covered: u32,
    cardinality: u32,
}

impl RunBuilder {
    fn new() -> Self {
        RunBuilder {
            runs: vec![],
            starts_on: false,
            on: false,
            pending: 0,
            covered: 0,
            cardinality: 0,
        }
    }

    fn push(&mut self, on: bool, length: u32) {
        if length == 0 {
            return;
        }

        if on != self.on {
            self.flush();
            self.on = on;
        }

        self.pending += length;
    }

    fn flush(&mut self) {
        if self.pending == 0 {
            return;
        }

        if self.runs.is_empty() {
            self.starts_on = self.on;
        }

        debug_assert!(self.pending < DOMAIN_SIZE);
        self.runs.push(self.pending as u16);
        self.covered += self.pending;

        // the gap is counted by the state before the polarity flips
        if self.on {
            self.cardinality += self.pending;
        }

        self.pending = 0;
    }

    fn finish(mut self) -> CompressedSet {
        if self.on && self.pending > 0 {
            if self.covered + self.pending == DOMAIN_SIZE {
                if self.runs.is_empty() {
                    self.starts_on = true;
                }
                self.runs.push(0);
                self.cardinality += self.pending;
            } else {
                self.flush();
            }
        }

        CompressedSet {
            runs: self.runs,
            starts_on: self.starts_on,
            cardinality: self.cardinality,
        }
    }
}

fn sweep(left: &CompressedSet, right: &CompressedSet, combine: Combine) -> CompressedSet {
    let mut left_cursor = RunCursor::new(left);
    let mut right_cursor = RunCursor::new(right);
    let mut builder = RunBuilder::new();
    let mut position: u32 = 0;

    while position < DOMAIN_SIZE {
        match combine {
            Combine::Union if left_cursor.open || right_cursor.open => {
                builder.push(true, DOMAIN_SIZE - position);
                break;
            }
            Combine::Intersection if left_cursor.open => {
                drain(&mut builder, &mut right_cursor, position);
                break;
            }
            Combine::Intersection if right_cursor.open => {
                drain(&mut builder, &mut left_cursor, position);
                break;
            }
            _ => {}
        }

        let next = left_cursor.bound.min(right_cursor.bound).min(DOMAIN_SIZE);
        builder.push(combine.apply(left_cursor.on, right_cursor.on), next - position);
        position = next;

        // advance both on a tie
        if left_cursor.bound == position {
            left_cursor.advance();
        }
        if right_cursor.bound == position {
            right_cursor.advance();
        }
    }

    builder.finish()
}

// Copies the remaining extent of one operand into the result.
fn drain(builder: &mut RunBuilder, cursor: &mut RunCursor, mut position: u32) {
    while position < DOMAIN_SIZE {
        let next = cursor.bound.min(DOMAIN_SIZE);
        builder.push(cursor.on, next - position);
        position = next;
        cursor.advance();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::symbol::{Symbol, DOMAIN_SIZE};

    use super::CompressedSet;

    fn set_of(s: &str) -> CompressedSet {
        CompressedSet::from_str_chars(s).unwrap()
    }

    fn chars_of(set: &CompressedSet) -> String {
        set.members().map(|s| s.to_char().unwrap()).collect()
    }

    fn sym(c: char) -> Symbol {
        Symbol::try_from(c).unwrap()
    }

    #[test]
    fn test_from_symbols() {
        let set = set_of("ACDEGsDjmhk");
        assert_eq!(set.runs(), &[65, 1, 1, 3, 1, 1, 32, 1, 1, 2, 1, 1, 5, 1]);
        assert!(!set.starts_on());
        assert_eq!(set.cardinality(), 10);

        // duplicates are counted once
        assert_eq!(set_of("AAAA").cardinality(), 1);
        assert_eq!(set_of("AAAA"), set_of("A"));

        // order does not matter
        assert_eq!(set_of("cba"), set_of("abc"));
        assert_eq!(set_of("abc").run_count(), 2);

        // empty list
        assert_eq!(set_of(""), CompressedSet::empty());
    }

    #[test]
    fn test_from_symbols_domain_edges() {
        let first = CompressedSet::from_symbols([Symbol::MIN, Symbol::new(1)]);
        assert!(first.starts_on());
        assert_eq!(first.runs(), &[2]);
        assert_eq!(first.cardinality(), 2);

        let last = CompressedSet::from_symbols([Symbol::new(0xfffe), Symbol::MAX]);
        assert_eq!(last.runs(), &[0xfffe, 0]);
        assert_eq!(last.cardinality(), 2);
        assert!(last.contains(Symbol::MAX));
        assert!(!last.contains(Symbol::new(0xfffd)));

        let all = CompressedSet::from_range(Symbol::MIN, Symbol::MAX);
        assert_eq!(all, CompressedSet::full());
    }

    #[test]
    fn test_contains() {
        let set = set_of("ACDEGsDjmhk");
        for c in ['A', 'C', 'D', 'E', 'G'] {
            assert!(set.contains(sym(c)), "{}", c);
        }
        for c in ['B', 'F', 'H', 'I', 'J'] {
            assert!(!set.contains(sym(c)), "{}", c);
        }

        assert!(!CompressedSet::empty().contains(Symbol::MIN));
        assert!(CompressedSet::full().contains(Symbol::MIN));
        assert!(CompressedSet::full().contains(Symbol::MAX));
    }

    #[test]
    fn test_members() {
        let set = set_of("ACDEGsDjmhk");
        assert_eq!(chars_of(&set), "ACDEGhjkms");
        assert_eq!(set.members().len(), 10);

        // restartable
        assert_eq!(chars_of(&set), "ACDEGhjkms");

        let full = CompressedSet::full();
        assert_eq!(full.members().count(), DOMAIN_SIZE as usize);
        assert_eq!(full.members().last(), Some(Symbol::MAX));

        let mut negated = set_of("B");
        negated.negate();
        let head: Vec<u16> = negated.members().take(3).map(|s| s.value()).collect();
        assert_eq!(head, vec![0, 1, 2]);
        assert!(!negated.members().any(|s| s == sym('B')));
    }

    #[test]
    fn test_negate() {
        let mut set = set_of("ACDEGsDjmhk");
        set.negate();

        for c in ['A', 'C', 'D', 'E', 'G'] {
            assert!(!set.contains(sym(c)), "{}", c);
        }
        for c in ['B', 'F', 'H', 'I', 'J'] {
            assert!(set.contains(sym(c)), "{}", c);
        }

        assert_eq!(set.cardinality(), DOMAIN_SIZE - 10);
        assert!(set.contains(Symbol::MIN));
        assert!(set.contains(Symbol::MAX));

        set.negate();
        assert_eq!(set, set_of("ACDEGsDjmhk"));
    }

    #[test]
    fn test_negate_edge_cases() {
        // empty <-> full
        let mut set = CompressedSet::empty();
        set.negate();
        assert_eq!(set, CompressedSet::full());
        set.negate();
        assert_eq!(set, CompressedSet::empty());

        // starting at symbol 0
        let mut set = CompressedSet::from_symbols([Symbol::MIN]);
        set.negate();
        assert!(!set.contains(Symbol::MIN));
        assert!(set.contains(Symbol::new(1)));
        assert!(set.contains(Symbol::MAX));
        assert_eq!(set.runs(), &[1, 0]);
        set.negate();
        assert_eq!(set, CompressedSet::from_symbols([Symbol::MIN]));

        // ending at the last symbol
        let mut set = CompressedSet::from_symbols([Symbol::MAX]);
        set.negate();
        assert_eq!(set, CompressedSet::from_range(Symbol::MIN, Symbol::new(0xfffe)));
    }

    #[test]
    fn test_union() {
        let caps = set_of("ACDEGDAA");
        let lows = set_of("sgjmhk");
        assert_eq!(
            CompressedSet::union(&caps, &lows),
            set_of("ACDEGDAAsgjmhk")
        );

        // with the negated operand
        let negated_caps = caps.negated();
        assert_eq!(CompressedSet::union(&negated_caps, &lows), negated_caps);
        assert_eq!(
            CompressedSet::union(&negated_caps, &lows).negated(),
            caps
        );

        // overlapping runs
        assert_eq!(
            CompressedSet::union(&set_of("abcd"), &set_of("cdef")),
            set_of("abcdef")
        );

        // adjacent runs are coalesced
        let joined = CompressedSet::union(&set_of("ab"), &set_of("cd"));
        assert_eq!(joined.runs(), &[97, 4]);

        // identities
        assert_eq!(CompressedSet::union(&caps, &CompressedSet::empty()), caps);
        assert_eq!(
            CompressedSet::union(&caps, &CompressedSet::full()),
            CompressedSet::full()
        );
    }

    #[test]
    fn test_intersection() {
        let caps = set_of("ACDEGDAAzx");
        let lows = set_of("sgjmhkxyz");
        assert_eq!(CompressedSet::intersection(&caps, &lows), set_of("xz"));

        let negated_caps = caps.negated();
        let inter = CompressedSet::intersection(&negated_caps, &lows);
        assert_eq!(inter, set_of("sgjmhky"));
        assert_eq!(inter.negated(), set_of("sgjmhky").negated());

        // open tails on both sides
        let high = CompressedSet::from_range(Symbol::new(0x8000), Symbol::MAX);
        let upper = CompressedSet::from_range(Symbol::new(0xf000), Symbol::MAX);
        assert_eq!(CompressedSet::intersection(&high, &upper), upper);

        // identities
        assert_eq!(
            CompressedSet::intersection(&caps, &CompressedSet::empty()),
            CompressedSet::empty()
        );
        assert_eq!(
            CompressedSet::intersection(&caps, &CompressedSet::full()),
            caps
        );
        assert_eq!(
            CompressedSet::intersection(&set_of("ab"), &set_of("cd")),
            CompressedSet::empty()
        );
    }

    #[test]
    fn test_de_morgan() {
        let a = set_of("ACDEGDAAzx");
        let b = set_of("sgjmhkxyz");

        let left = CompressedSet::union(&a, &b).negated();
        let right = CompressedSet::intersection(&a.negated(), &b.negated());
        assert_eq!(left, right);
    }
}
