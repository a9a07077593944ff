// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::ops::Range;

use tracing::{debug, trace};

use crate::{
    binder::{Binder, GroupId, TaggedPattern, TaggedState},
    dedupset::{DedupMap, DedupSet},
    error::PderivError,
    pattern::Pattern,
    symbol::{symbols_from_str, Symbol},
};

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct MatchOptions {
    /// Simplify each successor before it is deduplicated.
    pub simplify_states: bool,

    /// Skip states whose first-symbol set excludes the current symbol.
    pub prune_by_sigma: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            simplify_states: true,
            prune_by_sigma: true,
        }
    }
}

impl MatchOptions {
    pub fn with_simplify_states(mut self, simplify_states: bool) -> Self {
        self.simplify_states = simplify_states;
        self
    }

    pub fn with_prune_by_sigma(mut self, prune_by_sigma: bool) -> Self {
        self.prune_by_sigma = prune_by_sigma;
        self
    }
}

/// Tests whether a whole input matches a pattern.
pub struct Matcher {
    pattern: Pattern,
    options: MatchOptions,
}

impl Matcher {
    pub fn new(pattern: Pattern) -> Self {
        Matcher::with_options(pattern, MatchOptions::default())
    }

    pub fn with_options(pattern: Pattern, options: MatchOptions) -> Self {
        Matcher { pattern, options }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> Result<bool, PderivError> {
        let symbols = symbols_from_str(text)?;
        let mut states = DedupSet::from_iter([self.pattern.clone()]);

        for (position, symbol) in symbols.into_iter().enumerate() {
            states = self.step(&states, symbol);

            trace!(position, symbol = %symbol, states = states.len(), "derive");

            if states.is_empty() {
                debug!(position, "no live state");
                return Ok(false);
            }
        }

        let matched = states.iter().any(|p| p.pos_epsilon());
        debug!(matched, states = states.len(), "input exhausted");
        Ok(matched)
    }

    fn step(&self, states: &DedupSet<Pattern>, symbol: Symbol) -> DedupSet<Pattern> {
        let mut next = DedupSet::default();

        for state in states.iter() {
            if self.options.prune_by_sigma && !state.sigma().contains(symbol) {
                continue;
            }

            for derived in state.partial_derive(symbol) {
                let derived = if self.options.simplify_states {
                    derived.simplify()
                } else {
                    derived
                };

                if !derived.is_phi() {
                    next.insert(derived);
                }
            }
        }

        next
    }
}

/**
 * Matches a whole input against a pattern with capture groups.
 *
 * The live states are kept in priority order, and when two paths reach the
 * same successor pattern only the one with the higher priority is kept,
 * so the result is the capture of the preferred (greedy or lazy) path.
 */
pub struct TaggedMatcher {
    pattern: TaggedPattern,
    options: MatchOptions,
}

impl TaggedMatcher {
    pub fn new(pattern: TaggedPattern) -> Self {
        TaggedMatcher::with_options(pattern, MatchOptions::default())
    }

    pub fn with_options(pattern: TaggedPattern, options: MatchOptions) -> Self {
        TaggedMatcher { pattern, options }
    }

    pub fn is_match(&self, text: &str) -> Result<bool, PderivError> {
        Ok(self.captures(text)?.is_some())
    }

    pub fn captures<'a>(&self, text: &'a str) -> Result<Option<Captures<'a>>, PderivError> {
        let symbols = symbols_from_str(text)?;
        let mut states = vec![TaggedState::new(self.pattern.clone())];

        for (idx, symbol) in symbols.into_iter().enumerate() {
            let position =
                u32::try_from(idx).map_err(|_| PderivError::PositionOutOfRange(idx))?;

            states = self.step(&states, symbol, position);

            trace!(position, symbol = %symbol, states = states.len(), "derive tagged");

            if states.is_empty() {
                debug!(position, "no live state");
                return Ok(None);
            }
        }

        let accepted = states.into_iter().find(|state| state.pos_epsilon());

        Ok(accepted.map(|state| {
            debug!(binder = %state.to_binder(), "accepted");
            Captures::new(text, state.into_binder())
        }))
    }

    fn step(&self, states: &[TaggedState], symbol: Symbol, position: u32) -> Vec<TaggedState> {
        let mut next: DedupMap<TaggedPattern, TaggedState> = DedupMap::default();

        for state in states {
            if self.options.prune_by_sigma && !state.pattern().sigma().contains(symbol) {
                continue;
            }

            for (successor, update) in state.partial_derive_tagged(symbol, position) {
                let successor = if self.options.simplify_states {
                    successor.simplify()
                } else {
                    successor
                };

                if successor.is_phi() || next.contains_key(&successor) {
                    continue;
                }

                let resolved = update.resolve(successor.clone());
                next.insert(successor, resolved);
            }
        }

        next.into_iter().map(|(_, state)| state).collect()
    }
}

/// The capture groups of an accepted input.
pub struct Captures<'a> {
    text: &'a str,

    // the byte offset of each symbol, plus the text length at the end
    offsets: Vec<usize>,
    binder: Binder,
}

impl<'a> Captures<'a> {
    fn new(text: &'a str, binder: Binder) -> Self {
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();

        Captures {
            text,
            offsets,
            binder,
        }
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// The most recent match of a group.
    pub fn get(&self, group: GroupId) -> Option<Match<'a>> {
        self.binder
            .last_span(group)
            .map(|span| self.new_match(span.start, span.end))
    }

    /// Every match of a group, in input order.
    pub fn get_all(&self, group: GroupId) -> Vec<Match<'a>> {
        match self.binder.get(group) {
            Some(spans) => spans
                .iter()
                .rev()
                .map(|span| self.new_match(span.start, span.end))
                .collect(),
            None => vec![],
        }
    }

    fn new_match(&self, start: u32, end_included: u32) -> Match<'a> {
        let start = start as usize;
        let end = end_included as usize + 1;
        let value = &self.text[self.offsets[start]..self.offsets[end]];
        Match::new(start, end, value)
    }
}

/// A captured range, in symbol positions.
#[derive(Debug, PartialEq)]
pub struct Match<'a> {
    start: usize,
    end: usize, // exclusive
    value: &'a str,
}

impl<'a> Match<'a> {
    pub fn new(start: usize, end: usize, value: &'a str) -> Self {
        Match { start, end, value }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn range(&self) -> Range<usize> {
        Range {
            start: self.start,
            end: self.end,
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        binder::TaggedPattern,
        compressedset::CompressedSet,
        error::PderivError,
        pattern::Pattern,
        symbol::Symbol,
    };

    use super::{Match, MatchOptions, Matcher, TaggedMatcher};

    fn ch(c: char) -> Pattern {
        Pattern::symbol(Symbol::try_from(c).unwrap())
    }

    fn tch(c: char) -> TaggedPattern {
        TaggedPattern::plain(ch(c))
    }

    fn all_options() -> Vec<MatchOptions> {
        let base = MatchOptions::default();
        vec![
            base,
            base.with_simplify_states(false),
            base.with_prune_by_sigma(false),
            base.with_simplify_states(false).with_prune_by_sigma(false),
        ]
    }

    #[test]
    fn test_match_literal() {
        for options in all_options() {
            let m = Matcher::with_options(Pattern::literal("abc").unwrap(), options);
            assert!(m.is_match("abc").unwrap());
            assert!(!m.is_match("ab").unwrap());
            assert!(!m.is_match("abcd").unwrap());
            assert!(!m.is_match("").unwrap());
        }
    }

    #[test]
    fn test_match_repetition_and_alternation() {
        // ('a' | 'b')*, 'c'
        let pattern = Pattern::sequence(
            Pattern::repetition(true, Pattern::alternation(true, ch('a'), [ch('b')])),
            [ch('c')],
        );

        for options in all_options() {
            let m = Matcher::with_options(pattern.clone(), options);
            assert!(m.is_match("c").unwrap());
            assert!(m.is_match("abbac").unwrap());
            assert!(!m.is_match("abba").unwrap());
            assert!(!m.is_match("abxc").unwrap());
        }
    }

    #[test]
    fn test_match_nullable_sequence() {
        // 'a', 'b'* matches "a" but not ""
        let pattern = Pattern::sequence(ch('a'), [Pattern::repetition(true, ch('b'))]);
        let m = Matcher::new(pattern);
        assert!(m.is_match("a").unwrap());
        assert!(m.is_match("abbb").unwrap());
        assert!(!m.is_match("").unwrap());

        // 'a'*, 'b'* matches ""
        let pattern = Pattern::sequence(
            Pattern::repetition(true, ch('a')),
            [Pattern::repetition(true, ch('b'))],
        );
        let m = Matcher::new(pattern);
        assert!(m.is_match("").unwrap());
        assert!(m.is_match("aab").unwrap());
        assert!(!m.is_match("ba").unwrap());
    }

    #[test]
    fn test_match_symbol_set_and_any() {
        let mut not_digit = CompressedSet::from_str_chars("0123456789").unwrap();
        not_digit.negate();

        // [^0-9], .
        let pattern = Pattern::sequence(Pattern::symbol_set(not_digit), [Pattern::any()]);
        let m = Matcher::new(pattern);
        assert!(m.is_match("x1").unwrap());
        assert!(m.is_match("文字").unwrap());
        assert!(!m.is_match("1x").unwrap());
    }

    #[test]
    fn test_match_rejects_non_bmp() {
        let m = Matcher::new(Pattern::repetition(true, Pattern::any()));
        assert_eq!(m.is_match("a😀"), Err(PderivError::CharOutsideBmp('😀')));

        // rejected even when the match fails before reaching it
        let m = Matcher::new(Pattern::literal("a").unwrap());
        assert_eq!(m.is_match("b😀"), Err(PderivError::CharOutsideBmp('😀')));
        assert_eq!(m.is_match("a😀"), Err(PderivError::CharOutsideBmp('😀')));

        let m = TaggedMatcher::new(TaggedPattern::variable(1, tch('a')));
        assert!(matches!(
            m.captures("b😀"),
            Err(PderivError::CharOutsideBmp('😀'))
        ));
    }

    #[test]
    fn test_captures() {
        // 'a', (1: 'b'*), 'c'
        let pattern = TaggedPattern::sequence(
            tch('a'),
            [
                TaggedPattern::variable(
                    1,
                    TaggedPattern::plain(Pattern::repetition(true, ch('b'))),
                ),
                tch('c'),
            ],
        );

        let m = TaggedMatcher::new(pattern);
        let captures = m.captures("abbbc").unwrap().unwrap();
        assert_eq!(captures.get(1), Some(Match::new(1, 4, "bbb")));

        // nothing consumed by the group
        let captures = m.captures("ac").unwrap().unwrap();
        assert_eq!(captures.get(1), None);

        assert!(m.captures("abx").unwrap().is_none());
    }

    #[test]
    fn test_captures_utf8() {
        // (1: .), (2: .)
        let pattern = TaggedPattern::sequence(
            TaggedPattern::variable(1, TaggedPattern::plain(Pattern::any())),
            [TaggedPattern::variable(2, TaggedPattern::plain(Pattern::any()))],
        );

        let captures = TaggedMatcher::new(pattern).captures("文字").unwrap().unwrap();
        assert_eq!(captures.get(1), Some(Match::new(0, 1, "文")));
        assert_eq!(captures.get(2), Some(Match::new(1, 2, "字")));
    }

    #[test]
    fn test_captures_greedy_and_lazy() {
        let x_star = |greedy| {
            TaggedPattern::repetition(greedy, TaggedPattern::variable(1, tch('a')))
        };
        let y_star = TaggedPattern::repetition(true, TaggedPattern::variable(2, tch('a')));

        // greedy, the first group takes everything
        let m = TaggedMatcher::new(TaggedPattern::sequence(x_star(true), [y_star.clone()]));
        let captures = m.captures("aaa").unwrap().unwrap();
        assert_eq!(captures.get(1).map(|m| m.as_str()), Some("aaa"));
        assert_eq!(captures.get(2), None);

        // lazy, the first group takes nothing
        let m = TaggedMatcher::new(TaggedPattern::sequence(x_star(false), [y_star]));
        let captures = m.captures("aaa").unwrap().unwrap();
        assert_eq!(captures.get(1), None);
        assert_eq!(captures.get(2).map(|m| m.as_str()), Some("aaa"));
    }

    #[test]
    fn test_captures_abandoned_branch() {
        // (1: 'a', 'b') | ('a', (2: 'c'))
        let pattern = TaggedPattern::alternation(
            true,
            TaggedPattern::variable(1, TaggedPattern::sequence(tch('a'), [tch('b')])),
            [TaggedPattern::sequence(
                tch('a'),
                [TaggedPattern::variable(2, tch('c'))],
            )],
        );

        let m = TaggedMatcher::new(pattern);
        let captures = m.captures("ac").unwrap().unwrap();
        assert_eq!(captures.get(1), None);
        assert_eq!(captures.get(2), Some(Match::new(1, 2, "c")));

        let captures = m.captures("ab").unwrap().unwrap();
        assert_eq!(captures.get(1), Some(Match::new(0, 2, "ab")));
        assert_eq!(captures.get(2), None);
    }

    #[test]
    fn test_captures_get_all() {
        // ((1: 'a') | 'b')*
        let pattern = TaggedPattern::repetition(
            true,
            TaggedPattern::alternation(
                true,
                TaggedPattern::variable(1, tch('a')),
                [tch('b')],
            ),
        );

        let captures = TaggedMatcher::new(pattern).captures("aabab").unwrap().unwrap();
        let all: Vec<&str> = captures.get_all(1).iter().map(|m| m.as_str()).collect();
        assert_eq!(all, vec!["aa", "a"]);
        assert_eq!(captures.get(1), Some(Match::new(3, 4, "a")));
    }
}
