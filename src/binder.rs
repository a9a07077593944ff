// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use crate::{
    compressedset::CompressedSet,
    dedupset::{collect_first, DedupMap},
    error::PderivError,
    pattern::{union_of_sigma, Alternation, Children, Pattern, Repetition, Sequence},
    symbol::Symbol,
};

pub type GroupId = u32;

/// A closed interval of input positions, `start..=end`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Result<Self, PderivError> {
        if start > end {
            let packed = ((start as u64) << 32) | (end as u64);
            return Err(PderivError::IntervalOverflow(packed));
        }

        Ok(Span { start, end })
    }

    pub fn single(position: u32) -> Self {
        Span {
            start: position,
            end: position,
        }
    }

    /// The start goes to the high 32 bits, the end to the low 32 bits.
    pub fn pack(&self) -> u64 {
        ((self.start as u64) << 32) | (self.end as u64)
    }

    pub fn unpack(value: u64) -> Result<Self, PderivError> {
        Span::new((value >> 32) as u32, (value & 0xffff_ffff) as u32)
    }

    /// The number of positions covered.
    pub fn len(&self) -> u64 {
        self.end as u64 - self.start as u64 + 1
    }
}

/**
 * The positions bound to each capture group so far.
 *
 * Every group holds a list of disjoint intervals with the most recent one
 * first. A binder is a plain value: each matching branch owns its own copy.
 */
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Binder {
    groups: BTreeMap<GroupId, VecDeque<Span>>,
}

impl Binder {
    pub fn new() -> Self {
        Binder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, group: GroupId) -> Option<&VecDeque<Span>> {
        self.groups.get(&group)
    }

    /// The most recent interval of a group.
    pub fn last_span(&self, group: GroupId) -> Option<Span> {
        self.groups.get(&group).and_then(|spans| spans.front().copied())
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &VecDeque<Span>)> {
        self.groups.iter().map(|(group, spans)| (*group, spans))
    }

    /// Records that the symbol at `position` belongs to `group`.
    pub fn bind(&mut self, group: GroupId, position: u32) {
        let spans = self.groups.entry(group).or_default();
        match spans.front_mut() {
            Some(recent) if recent.end.checked_add(1) == Some(position) => {
                // extend the current run
                recent.end = position;
            }
            Some(recent) if recent.end == position => {
                // already bound
            }
            _ => {
                spans.push_front(Span::single(position));
            }
        }
    }
}

/**
 * A binder mutation to apply before a successor pattern is used.
 *
 * `group_ids` lists every capture group enclosing the consumed symbol,
 * innermost first. `binder` is the successor's own copy of the parent
 * binder, or `None` when no capture can happen on this path.
 */
#[derive(Debug, PartialEq, Clone)]
pub struct PendingUpdate {
    pub group_ids: Vec<GroupId>,
    pub position: u32,
    pub binder: Option<Binder>,
}

impl PendingUpdate {
    pub fn new(group_ids: Vec<GroupId>, position: u32, binder: Option<Binder>) -> Self {
        PendingUpdate {
            group_ids,
            position,
            binder,
        }
    }

    pub fn apply(self) -> Option<Binder> {
        let mut binder = self.binder?;
        for group in self.group_ids {
            binder.bind(group, self.position);
        }
        Some(binder)
    }

    /// Applies the update and attaches the result to the successor.
    pub fn resolve(self, pattern: TaggedPattern) -> TaggedState {
        let binder = self.apply().unwrap_or_default();
        TaggedState::with_binder(pattern, binder)
    }
}

/**
 * A pattern which may contain capturing variables.
 *
 * Sub-trees without any variable are kept as `Plain` patterns, so their
 * derivatives come straight from `Pattern::partial_derive`.
 */
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum TaggedPattern {
    Plain(Pattern),
    Variable(Variable),
    Alternation(TaggedAlternation),
    Sequence(TaggedSequence),
    Repetition(TaggedRepetition),
}

/// Binds every symbol consumed by `child` to the capture group.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Variable {
    pub group: GroupId,
    pub child: Arc<TaggedPattern>,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TaggedAlternation {
    pub greedy: bool,
    pub children: Children<TaggedPattern>,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TaggedSequence {
    pub children: Children<TaggedPattern>,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TaggedRepetition {
    pub greedy: bool,
    pub child: Arc<TaggedPattern>,
}

// The derived successors, each with the groups enclosing the consumed symbol.
type Derived = DedupMap<TaggedPattern, Vec<GroupId>>;

impl TaggedPattern {
    pub fn plain(pattern: Pattern) -> Self {
        TaggedPattern::Plain(pattern)
    }

    pub fn variable(group: GroupId, child: TaggedPattern) -> Self {
        TaggedPattern::Variable(Variable {
            group,
            child: Arc::new(child),
        })
    }

    pub fn alternation<I>(greedy: bool, first: TaggedPattern, rest: I) -> Self
    where
        I: IntoIterator<Item = TaggedPattern>,
    {
        TaggedPattern::Alternation(TaggedAlternation {
            greedy,
            children: Children::new(first, rest),
        })
    }

    pub fn sequence<I>(first: TaggedPattern, rest: I) -> Self
    where
        I: IntoIterator<Item = TaggedPattern>,
    {
        TaggedPattern::Sequence(TaggedSequence {
            children: Children::new(first, rest),
        })
    }

    pub fn repetition(greedy: bool, child: TaggedPattern) -> Self {
        TaggedPattern::Repetition(TaggedRepetition {
            greedy,
            child: Arc::new(child),
        })
    }

    /// True if any sub-pattern is a capturing variable.
    pub fn has_binder(&self) -> bool {
        match self {
            TaggedPattern::Plain(_) => false,
            TaggedPattern::Variable(_) => true,
            TaggedPattern::Alternation(TaggedAlternation { children, .. })
            | TaggedPattern::Sequence(TaggedSequence { children }) => {
                children.iter().any(|p| p.has_binder())
            }
            TaggedPattern::Repetition(TaggedRepetition { child, .. }) => child.has_binder(),
        }
    }

    /// The underlying pattern with all variables removed.
    pub fn strip(&self) -> Pattern {
        match self {
            TaggedPattern::Plain(pattern) => pattern.clone(),
            TaggedPattern::Variable(Variable { child, .. }) => child.strip(),
            TaggedPattern::Alternation(TaggedAlternation { greedy, children }) => {
                Pattern::Alternation(Alternation {
                    greedy: *greedy,
                    children: strip_children(children),
                })
            }
            TaggedPattern::Sequence(TaggedSequence { children }) => Pattern::Sequence(Sequence {
                children: strip_children(children),
            }),
            TaggedPattern::Repetition(TaggedRepetition { greedy, child }) => {
                Pattern::Repetition(Repetition {
                    greedy: *greedy,
                    child: Arc::new(child.strip()),
                })
            }
        }
    }

    pub fn sigma(&self) -> CompressedSet {
        match self {
            TaggedPattern::Plain(pattern) => pattern.sigma(),
            TaggedPattern::Variable(Variable { child, .. })
            | TaggedPattern::Repetition(TaggedRepetition { child, .. }) => child.sigma(),
            TaggedPattern::Alternation(TaggedAlternation { children, .. })
            | TaggedPattern::Sequence(TaggedSequence { children }) => {
                union_of_sigma(children, TaggedPattern::sigma)
            }
        }
    }

    pub fn is_greedy(&self) -> bool {
        match self {
            TaggedPattern::Plain(pattern) => pattern.is_greedy(),
            TaggedPattern::Variable(Variable { child, .. }) => child.is_greedy(),
            TaggedPattern::Alternation(TaggedAlternation { greedy, .. })
            | TaggedPattern::Repetition(TaggedRepetition { greedy, .. }) => *greedy,
            TaggedPattern::Sequence(TaggedSequence { children }) => {
                children.iter().any(|p| p.is_greedy())
            }
        }
    }

    pub fn is_phi(&self) -> bool {
        match self {
            TaggedPattern::Plain(pattern) => pattern.is_phi(),
            TaggedPattern::Variable(Variable { child, .. }) => child.is_phi(),
            TaggedPattern::Alternation(TaggedAlternation { children, .. }) => {
                children.iter().all(|p| p.is_phi())
            }
            TaggedPattern::Sequence(TaggedSequence { children }) => {
                children.iter().any(|p| p.is_phi())
            }
            TaggedPattern::Repetition(_) => false,
        }
    }

    /// See `Pattern::is_epsilon`, the same structural rules apply.
    pub fn is_epsilon(&self) -> bool {
        match self {
            TaggedPattern::Plain(pattern) => pattern.is_epsilon(),
            TaggedPattern::Variable(Variable { child, .. }) => child.is_epsilon(),
            TaggedPattern::Alternation(TaggedAlternation { children, .. }) => {
                children.iter().all(|p| p.is_epsilon())
            }
            TaggedPattern::Sequence(TaggedSequence { children }) => {
                children.iter().any(|p| p.is_epsilon())
            }
            TaggedPattern::Repetition(TaggedRepetition { child, .. }) => {
                child.is_phi() || child.is_epsilon()
            }
        }
    }

    pub fn pos_epsilon(&self) -> bool {
        match self {
            TaggedPattern::Plain(pattern) => pattern.pos_epsilon(),
            TaggedPattern::Variable(Variable { child, .. }) => child.pos_epsilon(),
            TaggedPattern::Alternation(TaggedAlternation { children, .. }) => {
                children.iter().any(|p| p.pos_epsilon())
            }
            TaggedPattern::Sequence(TaggedSequence { children }) => {
                children.iter().all(|p| p.pos_epsilon())
            }
            TaggedPattern::Repetition(_) => true,
        }
    }

    // A nullable item which prefers to match as little as possible,
    // skipping it has a higher priority than entering it.
    fn is_lazy(&self) -> bool {
        self.pos_epsilon() && !self.is_greedy()
    }

    pub fn simplify(&self) -> TaggedPattern {
        match self {
            TaggedPattern::Plain(pattern) => TaggedPattern::Plain(pattern.simplify()),
            TaggedPattern::Variable(Variable { group, child }) => {
                TaggedPattern::variable(*group, child.simplify())
            }
            TaggedPattern::Alternation(TaggedAlternation { greedy, children }) => {
                let kept: Vec<TaggedPattern> = children
                    .iter()
                    .map(|p| p.simplify())
                    .filter(|p| !p.is_phi())
                    .collect();

                match Children::from_vec(kept) {
                    None => TaggedPattern::Plain(Pattern::NoMatch),
                    Some(children) if children.len() == 1 => children.first().clone(),
                    Some(children) => TaggedPattern::Alternation(TaggedAlternation {
                        greedy: *greedy,
                        children,
                    }),
                }
            }
            TaggedPattern::Sequence(TaggedSequence { children }) => {
                let simplified: Vec<TaggedPattern> =
                    children.iter().map(|p| p.simplify()).collect();

                if simplified.iter().any(|p| p.is_phi()) {
                    return TaggedPattern::Plain(Pattern::NoMatch);
                }

                let kept: Vec<TaggedPattern> = simplified
                    .into_iter()
                    .filter(|p| !p.is_epsilon())
                    .collect();

                match Children::from_vec(kept) {
                    None => TaggedPattern::Plain(Pattern::EmptyMatch),
                    Some(children) if children.len() == 1 => children.first().clone(),
                    Some(children) => TaggedPattern::Sequence(TaggedSequence { children }),
                }
            }
            TaggedPattern::Repetition(TaggedRepetition { greedy, child }) => {
                TaggedPattern::repetition(*greedy, child.simplify())
            }
        }
    }

    /**
     * The partial derivatives in priority order, each successor paired
     * with the capture groups which enclose the consumed symbol.
     *
     * Successors which are structurally equal are merged, and the one
     * produced first (i.e. with the higher priority) wins.
     */
    fn derive(&self, symbol: Symbol) -> Derived {
        match self {
            TaggedPattern::Plain(pattern) => pattern
                .partial_derive(symbol)
                .into_iter()
                .map(|d| (TaggedPattern::Plain(d), vec![]))
                .collect(),
            TaggedPattern::Variable(Variable { group, child }) => child
                .derive(symbol)
                .into_iter()
                .map(|(d, mut group_ids)| {
                    if !group_ids.contains(group) {
                        group_ids.push(*group);
                    }
                    (TaggedPattern::variable(*group, d), group_ids)
                })
                .collect(),
            TaggedPattern::Alternation(TaggedAlternation { children, .. }) => {
                collect_first(children.iter().flat_map(|child| child.derive(symbol)))
            }
            TaggedPattern::Sequence(TaggedSequence { children }) => {
                derive_sequence(children.as_slice(), symbol)
            }
            TaggedPattern::Repetition(TaggedRepetition { child, .. }) => child
                .derive(symbol)
                .into_iter()
                .map(|(d, group_ids)| (TaggedPattern::sequence(d, [self.clone()]), group_ids))
                .collect(),
        }
    }
}

fn strip_children(children: &Children<TaggedPattern>) -> Children<Pattern> {
    Children::new(
        children.first().strip(),
        children.iter().skip(1).map(|p| p.strip()),
    )
}

// Same successors as `Pattern::partial_derive` on a sequence, ordered so
// that continuing a greedy item comes before skipping it, and skipping a
// lazy item comes before entering it.
fn derive_sequence(children: &[TaggedPattern], symbol: Symbol) -> Derived {
    let (last, init) = match children.split_last() {
        Some(pair) => pair,
        None => return Derived::default(),
    };

    let mut layers: Vec<(bool, Vec<(TaggedPattern, Vec<GroupId>)>)> = vec![];
    let mut reaches_last = true;

    for (idx, child) in init.iter().enumerate() {
        let rest = &children[idx + 1..];
        let wrapped = child
            .derive(symbol)
            .into_iter()
            .map(|(d, group_ids)| (TaggedPattern::sequence(d, rest.iter().cloned()), group_ids))
            .collect();

        layers.push((child.is_lazy(), wrapped));

        if !child.pos_epsilon() {
            reaches_last = false;
            break;
        }
    }

    let mut ordered: Vec<(TaggedPattern, Vec<GroupId>)> = if reaches_last {
        last.derive(symbol).into_iter().collect()
    } else {
        vec![]
    };

    for (lazy, mut wrapped) in layers.into_iter().rev() {
        if lazy {
            ordered.extend(wrapped);
        } else {
            wrapped.extend(ordered);
            ordered = wrapped;
        }
    }

    collect_first(ordered)
}

/// A tagged pattern together with the binder of the path that led to it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TaggedState {
    pattern: TaggedPattern,
    binder: Binder,
}

impl TaggedState {
    pub fn new(pattern: TaggedPattern) -> Self {
        TaggedState {
            pattern,
            binder: Binder::new(),
        }
    }

    pub fn with_binder(pattern: TaggedPattern, binder: Binder) -> Self {
        TaggedState { pattern, binder }
    }

    pub fn pattern(&self) -> &TaggedPattern {
        &self.pattern
    }

    pub fn to_binder(&self) -> &Binder {
        &self.binder
    }

    pub fn into_binder(self) -> Binder {
        self.binder
    }

    pub fn strip(&self) -> Pattern {
        self.pattern.strip()
    }

    pub fn has_binder(&self) -> bool {
        self.pattern.has_binder()
    }

    pub fn is_greedy(&self) -> bool {
        self.pattern.is_greedy()
    }

    pub fn is_phi(&self) -> bool {
        self.pattern.is_phi()
    }

    pub fn is_epsilon(&self) -> bool {
        self.pattern.is_epsilon()
    }

    pub fn pos_epsilon(&self) -> bool {
        self.pattern.pos_epsilon()
    }

    pub fn simplify(&self) -> TaggedState {
        TaggedState {
            pattern: self.pattern.simplify(),
            binder: self.binder.clone(),
        }
    }

    /**
     * The successors after consuming `symbol` at `position`, in priority
     * order, each with the binder update it needs.
     *
     * Every update owns a separate copy of this state's binder, so applying
     * one never affects the other branches.
     */
    pub fn partial_derive_tagged(
        &self,
        symbol: Symbol,
        position: u32,
    ) -> DedupMap<TaggedPattern, PendingUpdate> {
        let tracks_binder = self.pattern.has_binder() || !self.binder.is_empty();

        self.pattern
            .derive(symbol)
            .into_iter()
            .map(|(successor, group_ids)| {
                let binder = if tracks_binder {
                    Some(self.binder.clone())
                } else {
                    None
                };
                (successor, PendingUpdate::new(group_ids, position, binder))
            })
            .collect()
    }
}
