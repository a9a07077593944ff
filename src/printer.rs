// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::{
    binder::{
        Binder, Span, TaggedAlternation, TaggedPattern, TaggedRepetition, TaggedSequence,
        Variable,
    },
    compressedset::CompressedSet,
    pattern::{Alternation, Pattern, Repetition, Sequence},
};

impl Display for CompressedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let runs: Vec<String> = self.runs().iter().map(|r| r.to_string()).collect();
        write!(
            f,
            "CompressedSet{{cardinality={},compressed=[{}]}}",
            self.cardinality(),
            runs.join(",")
        )
    }
}

// e.g. `['0'..'9', '_']`
fn format_ranges(set: &CompressedSet) -> String {
    let items: Vec<String> = set
        .ranges()
        .iter()
        .map(|(start, end_included)| {
            if start == end_included {
                start.to_string()
            } else {
                format!("{}..{}", start, end_included)
            }
        })
        .collect();

    format!("[{}]", items.join(", "))
}

fn lazy_mark(greedy: bool) -> &'static str {
    if greedy {
        ""
    } else {
        "?"
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::NoMatch => f.write_str("∅"),
            Pattern::EmptyMatch => f.write_str("ε"),
            Pattern::Symbol(symbol) => write!(f, "{}", symbol),
            Pattern::SymbolSet(set) => f.write_str(&format_ranges(set)),
            Pattern::Any => f.write_str("."),
            Pattern::Alternation(Alternation { greedy, children }) => {
                let s: Vec<String> = children.iter().map(|p| p.to_string()).collect();
                write!(f, "({}){}", s.join(" | "), lazy_mark(*greedy))
            }
            Pattern::Sequence(Sequence { children }) => {
                let s: Vec<String> = children.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", s.join(", "))
            }
            Pattern::Repetition(Repetition { greedy, child }) => {
                write!(f, "{}*{}", child, lazy_mark(*greedy))
            }
        }
    }
}

impl Display for TaggedPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaggedPattern::Plain(pattern) => write!(f, "{}", pattern),
            TaggedPattern::Variable(Variable { group, child }) => {
                write!(f, "{{{}: {}}}", group, child)
            }
            TaggedPattern::Alternation(TaggedAlternation { greedy, children }) => {
                let s: Vec<String> = children.iter().map(|p| p.to_string()).collect();
                write!(f, "({}){}", s.join(" | "), lazy_mark(*greedy))
            }
            TaggedPattern::Sequence(TaggedSequence { children }) => {
                let s: Vec<String> = children.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", s.join(", "))
            }
            TaggedPattern::Repetition(TaggedRepetition { greedy, child }) => {
                write!(f, "{}*{}", child, lazy_mark(*greedy))
            }
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

impl Display for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let groups: Vec<String> = self
            .groups()
            .map(|(group, spans)| {
                let s: Vec<String> = spans.iter().map(|span| span.to_string()).collect();
                format!("{}: [{}]", group, s.join(", "))
            })
            .collect();

        write!(f, "{{{}}}", groups.join(", "))
    }
}
