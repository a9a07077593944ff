// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::sync::Arc;

use crate::{
    compressedset::CompressedSet,
    dedupset::DedupSet,
    error::PderivError,
    symbol::{symbols_from_str, Symbol},
};

/**
 * A regular expression as an immutable tree of combinators.
 *
 * Matching does not compile the tree into an automaton, instead each input
 * symbol maps a pattern to the set of patterns that match the rest of the
 * input (the partial derivatives), e.g.
 *
 * `('a', 'b').partial_derive('a') == {(ε, 'b')}`
 *
 * Subtrees are shared through `Arc`, so cloning is cheap and a pattern can be
 * used by many matching attempts at once.
 */
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Pattern {
    /// Matches nothing, the absorbing element (Phi).
    NoMatch,

    /// Matches only the zero-length string (Epsilon).
    EmptyMatch,

    Symbol(Symbol),
    SymbolSet(Arc<CompressedSet>),

    /// Matches any single symbol of the domain.
    Any,

    Alternation(Alternation),
    Sequence(Sequence),
    Repetition(Repetition),
}

/// A list of sub-patterns which always holds at least one item.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Children<T>(Arc<[T]>);

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Alternation {
    pub greedy: bool,
    pub children: Children<Pattern>,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Sequence {
    pub children: Children<Pattern>,
}

/// Zero or more repetitions (Kleene star).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Repetition {
    pub greedy: bool,
    pub child: Arc<Pattern>,
}

impl<T> Children<T> {
    pub fn new<I>(first: T, rest: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = std::iter::once(first).chain(rest).collect();
        Children(items.into())
    }

    /// Returns `None` for an empty list.
    pub fn from_vec(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Children(items.into()))
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn first(&self) -> &T {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl<'a, T> IntoIterator for &'a Children<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// Constructors
impl Pattern {
    pub fn no_match() -> Self {
        Pattern::NoMatch
    }

    pub fn empty_match() -> Self {
        Pattern::EmptyMatch
    }

    pub fn any() -> Self {
        Pattern::Any
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Pattern::Symbol(symbol)
    }

    pub fn symbol_set(set: CompressedSet) -> Self {
        Pattern::SymbolSet(Arc::new(set))
    }

    pub fn alternation<I>(greedy: bool, first: Pattern, rest: I) -> Self
    where
        I: IntoIterator<Item = Pattern>,
    {
        Pattern::Alternation(Alternation {
            greedy,
            children: Children::new(first, rest),
        })
    }

    pub fn sequence<I>(first: Pattern, rest: I) -> Self
    where
        I: IntoIterator<Item = Pattern>,
    {
        Pattern::Sequence(Sequence {
            children: Children::new(first, rest),
        })
    }

    pub fn repetition(greedy: bool, child: Pattern) -> Self {
        Pattern::Repetition(Repetition {
            greedy,
            child: Arc::new(child),
        })
    }

    /// `child?`, i.e. the alternation of `child` and the empty match.
    pub fn optional(greedy: bool, child: Pattern) -> Self {
        Pattern::alternation(greedy, child, [Pattern::EmptyMatch])
    }

    /// A sequence of the symbols of a string.
    pub fn literal(s: &str) -> Result<Self, PderivError> {
        let mut patterns = symbols_from_str(s)?.into_iter().map(Pattern::Symbol);

        let pattern = match patterns.next() {
            None => Pattern::EmptyMatch,
            Some(first) => {
                let rest: Vec<Pattern> = patterns.collect();
                if rest.is_empty() {
                    first
                } else {
                    Pattern::sequence(first, rest)
                }
            }
        };

        Ok(pattern)
    }
}

impl Pattern {
    /// The set of symbols that could be consumed first.
    pub fn sigma(&self) -> CompressedSet {
        match self {
            Pattern::NoMatch | Pattern::EmptyMatch => CompressedSet::empty(),
            Pattern::Symbol(symbol) => CompressedSet::from_symbols([*symbol]),
            Pattern::SymbolSet(set) => set.as_ref().clone(),
            Pattern::Any => CompressedSet::full(),
            Pattern::Alternation(Alternation { children, .. })
            | Pattern::Sequence(Sequence { children }) => {
                union_of_sigma(children, Pattern::sigma)
            }
            Pattern::Repetition(Repetition { child, .. }) => child.sigma(),
        }
    }

    pub fn is_greedy(&self) -> bool {
        match self {
            Pattern::Alternation(Alternation { greedy, .. })
            | Pattern::Repetition(Repetition { greedy, .. }) => *greedy,
            Pattern::Sequence(Sequence { children }) => children.iter().any(|p| p.is_greedy()),
            _ => false,
        }
    }

    /// True if nothing at all can match, not even the empty string.
    pub fn is_phi(&self) -> bool {
        match self {
            Pattern::NoMatch => true,
            Pattern::Alternation(Alternation { children, .. }) => {
                children.iter().all(|p| p.is_phi())
            }
            Pattern::Sequence(Sequence { children }) => children.iter().any(|p| p.is_phi()),
            _ => false,
        }
    }

    /**
     * True if the pattern is already reduced to "the empty string only".
     *
     * Note that this is a structural flag rather than a language property:
     * a sequence is epsilon if ANY child is, so `(ε, 'a')` reports `true`
     * until it is simplified to `'a'`. Use `pos_epsilon` to ask whether
     * the empty string can be matched.
     */
    pub fn is_epsilon(&self) -> bool {
        match self {
            Pattern::EmptyMatch => true,
            Pattern::Alternation(Alternation { children, .. }) => {
                children.iter().all(|p| p.is_epsilon())
            }
            Pattern::Sequence(Sequence { children }) => children.iter().any(|p| p.is_epsilon()),
            Pattern::Repetition(Repetition { child, .. }) => child.is_phi() || child.is_epsilon(),
            _ => false,
        }
    }

    /// True if the empty string can be matched along some path.
    pub fn pos_epsilon(&self) -> bool {
        match self {
            Pattern::EmptyMatch | Pattern::Repetition(_) => true,
            Pattern::Alternation(Alternation { children, .. }) => {
                children.iter().any(|p| p.pos_epsilon())
            }
            // every item has to be skipped
            Pattern::Sequence(Sequence { children }) => children.iter().all(|p| p.pos_epsilon()),
            _ => false,
        }
    }

    /**
     * Removes the parts that can not contribute to a match:
     *
     * - alternation drops phi children,
     * - sequence drops epsilon children, and becomes phi if any child is phi,
     * - repetition simplifies its child,
     * - an alternation or sequence left with a single child is replaced by it.
     *
     * Leaves are returned as they are.
     */
    pub fn simplify(&self) -> Pattern {
        match self {
            Pattern::Alternation(Alternation { greedy, children }) => {
                let kept: Vec<Pattern> = children
                    .iter()
                    .map(|p| p.simplify())
                    .filter(|p| !p.is_phi())
                    .collect();

                match Children::from_vec(kept) {
                    None => Pattern::NoMatch,
                    Some(children) if children.len() == 1 => children.first().clone(),
                    Some(children) => Pattern::Alternation(Alternation {
                        greedy: *greedy,
                        children,
                    }),
                }
            }
            Pattern::Sequence(Sequence { children }) => {
                let simplified: Vec<Pattern> = children.iter().map(|p| p.simplify()).collect();

                if simplified.iter().any(|p| p.is_phi()) {
                    return Pattern::NoMatch;
                }

                let kept: Vec<Pattern> = simplified
                    .into_iter()
                    .filter(|p| !p.is_epsilon())
                    .collect();

                match Children::from_vec(kept) {
                    None => Pattern::EmptyMatch,
                    Some(children) if children.len() == 1 => children.first().clone(),
                    Some(children) => Pattern::Sequence(Sequence { children }),
                }
            }
            Pattern::Repetition(Repetition { greedy, child }) => {
                Pattern::repetition(*greedy, child.simplify())
            }
            _ => self.clone(),
        }
    }

    /**
     * The residual patterns after consuming `symbol`, i.e. the patterns
     * that match the rest of any input this pattern matches starting
     * with `symbol`.
     *
     * Structurally equal results are merged, this keeps the number of
     * reachable patterns finite.
     */
    pub fn partial_derive(&self, symbol: Symbol) -> DedupSet<Pattern> {
        match self {
            Pattern::NoMatch | Pattern::EmptyMatch => DedupSet::default(),
            Pattern::Symbol(expected) => consume_if(*expected == symbol),
            Pattern::SymbolSet(set) => consume_if(set.contains(symbol)),
            Pattern::Any => consume_if(true),
            Pattern::Alternation(Alternation { children, .. }) => {
                let mut derived = DedupSet::default();
                for child in children {
                    derived.extend(child.partial_derive(symbol));
                }
                derived
            }
            Pattern::Sequence(Sequence { children }) => derive_sequence(children.as_slice(), symbol),
            Pattern::Repetition(Repetition { child, .. }) => child
                .partial_derive(symbol)
                .into_iter()
                .map(|derived| Pattern::sequence(derived, [self.clone()]))
                .collect(),
        }
    }
}

/// The union of the first-symbol sets of a list of sub-patterns.
pub(crate) fn union_of_sigma<T, F>(children: &Children<T>, sigma: F) -> CompressedSet
where
    F: Fn(&T) -> CompressedSet,
{
    children
        .iter()
        .skip(1)
        .fold(sigma(children.first()), |acc, p| {
            CompressedSet::union(&acc, &sigma(p))
        })
}

fn consume_if(matched: bool) -> DedupSet<Pattern> {
    if matched {
        DedupSet::from_iter([Pattern::EmptyMatch])
    } else {
        DedupSet::default()
    }
}

// (r0, r1, .., rn-1) derives through `ri` while the prefix `r0..ri-1` can
// match the empty string, the successor is `(d, ri+1, .., rn-1)`; when the
// whole prefix before the last item can be empty, the derivatives of the
// last item are added unwrapped.
fn derive_sequence(children: &[Pattern], symbol: Symbol) -> DedupSet<Pattern> {
    let (last, init) = match children.split_last() {
        Some(pair) => pair,
        None => return DedupSet::default(),
    };

    let mut derived = DedupSet::default();

    for (idx, child) in init.iter().enumerate() {
        let rest = &children[idx + 1..];
        for d in child.partial_derive(symbol) {
            derived.insert(Pattern::sequence(d, rest.iter().cloned()));
        }

        if !child.pos_epsilon() {
            return derived;
        }
    }

    derived.extend(last.partial_derive(symbol));
    derived
}
