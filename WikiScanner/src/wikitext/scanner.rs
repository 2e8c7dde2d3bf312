//! Depth-aware delimiter scanning.
//!
//! `|` separates template parameters, link segments and table cells, but the
//! same character is legal inside any nested template, link or table. The
//! functions here walk the text once, keep track of which constructs are
//! currently open, and only report a delimiter when nothing is open.
//!
//! There are two distinct questions callers ask, and two entry points:
//!
//! - `find_unshadowed`: where is the next `target` that is not inside a nested
//!   construct? Depth starts at zero.
//! - `find_matching_close`: the caller has already consumed the opening token
//!   of a construct; where is its closing token? Depth starts at one for that
//!   grammar.
//!
//! A scan that starts at top level and reaches the end of the text with a
//! construct still open has found broken markup, and everything after that
//! opening token was hidden from it. `find_first_recovering` reports such an
//! opening token and scans again from just after it.
//!
//! All tokens are ASCII, so the scan walks bytes; an ASCII byte never occurs
//! inside a multi-byte UTF-8 sequence, and every returned offset is a char
//! boundary.

use crate::wikitext::enums::Grammar;

/// Flags that change what the scanner treats as structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Treat single `[` / `]` as external link brackets. Off by default since
    /// a lone bracket is usually just text.
    pub external_links: bool,
    /// Test the target before the opening tokens, so a target that is itself
    /// an opening token (`{{`, `[[`) can be found at top level.
    pub target_is_structural: bool,
}

impl ScanOptions {
    pub fn external_links() -> Self {
        Self {
            external_links: true,
            ..Self::default()
        }
    }

    pub fn structural_target() -> Self {
        Self {
            target_is_structural: true,
            ..Self::default()
        }
    }
}

/// Opening tokens in the order they are tested. `[[` must come before `[`.
const OPEN_ORDER: [Grammar; 4] = [
    Grammar::Template,
    Grammar::Table,
    Grammar::InternalLink,
    Grammar::ExternalLink,
];

/// Constructs open at the current scan position, innermost last.
///
/// Per-grammar depth is the number of entries of that grammar. Keeping the
/// order lets a close token be matched against the innermost construct
/// first: in `{|\n| {{T|}} |}` the `|}` of `|}}` belongs to nothing, the
/// `}}` closes the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nesting {
    open: Vec<Grammar>,
}

/// One structural token consumed by `Nesting::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    grammar: Grammar,
    opened: bool,
    len: usize,
}

impl Nesting {
    /// State of a scan that starts just after `grammar`'s opening token.
    pub fn seeded(grammar: Grammar) -> Self {
        Self {
            open: vec![grammar],
        }
    }

    pub fn depth(&self, grammar: Grammar) -> usize {
        self.open.iter().filter(|g| **g == grammar).count()
    }

    pub fn is_top_level(&self) -> bool {
        self.open.is_empty()
    }

    fn innermost(&self) -> Option<Grammar> {
        self.open.last().copied()
    }

    fn outermost(&self) -> Option<Grammar> {
        self.open.first().copied()
    }

    /// Drop everything opened after the innermost `grammar`, and that entry.
    fn unwind_to(&mut self, grammar: Grammar) {
        if let Some(pos) = self.open.iter().rposition(|g| *g == grammar) {
            self.open.truncate(pos);
        }
    }

    /// Consume the structural token starting at `i`, if there is one.
    ///
    /// Openings win over closings. A closing token only counts for a grammar
    /// that is open; links (the most often unbalanced construct) give way to
    /// the close of an enclosing template or table.
    fn step(&mut self, bytes: &[u8], i: usize, options: ScanOptions) -> Option<Step> {
        let rest = &bytes[i..];
        for grammar in OPEN_ORDER {
            if grammar == Grammar::ExternalLink && !options.external_links {
                continue;
            }
            let token = grammar.open();
            if rest.starts_with(token.as_bytes()) {
                self.open.push(grammar);
                return Some(Step {
                    grammar,
                    opened: true,
                    len: token.len(),
                });
            }
        }

        let innermost = self.innermost()?;
        let close = innermost.close();
        if rest.starts_with(close.as_bytes()) {
            self.open.pop();
            return Some(Step {
                grammar: innermost,
                opened: false,
                len: close.len(),
            });
        }

        if matches!(innermost, Grammar::InternalLink | Grammar::ExternalLink) {
            for grammar in OPEN_ORDER {
                if grammar == innermost || self.depth(grammar) == 0 {
                    continue;
                }
                let close = grammar.close();
                if rest.starts_with(close.as_bytes()) {
                    self.unwind_to(grammar);
                    return Some(Step {
                        grammar,
                        opened: false,
                        len: close.len(),
                    });
                }
            }
        }
        None
    }
}

fn check_offset(text: &str, from: usize) {
    assert!(
        text.is_char_boundary(from),
        "scan offset {} is not a char boundary of a {}-byte text",
        from,
        text.len()
    );
}

/// Offset of the next `target` at or after `from` that is not inside a
/// nested template, table or internal link.
pub fn find_unshadowed(text: &str, from: usize, target: &str) -> Option<usize> {
    find_unshadowed_with(text, from, target, ScanOptions::default())
}

pub fn find_unshadowed_with(
    text: &str,
    from: usize,
    target: &str,
    options: ScanOptions,
) -> Option<usize> {
    find_first_unshadowed(text, from, &[target], options).map(|(at, _)| at)
}

/// Where a top-level scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStop {
    /// Offset of the match and the index of the target found there.
    Found(usize, usize),
    /// The text ended inside a construct whose opening token is at `at`.
    Unclosed { grammar: Grammar, at: usize },
    /// The text ended at top level without a match.
    Exhausted,
}

/// Scan for the first unshadowed target and say why the scan stopped.
pub fn scan_unshadowed(text: &str, from: usize, targets: &[&str], options: ScanOptions) -> ScanStop {
    check_offset(text, from);
    assert!(
        targets.iter().all(|t| !t.is_empty()),
        "scan targets must be non-empty"
    );

    let bytes = text.as_bytes();
    let matches_at = |i: usize| {
        targets
            .iter()
            .position(|t| bytes[i..].starts_with(t.as_bytes()))
    };

    let mut nesting = Nesting::default();
    let mut outer_at = from;
    let mut i = from;
    while i < bytes.len() {
        if options.target_is_structural
            && nesting.is_top_level()
            && let Some(which) = matches_at(i)
        {
            return ScanStop::Found(i, which);
        }
        let was_top_level = nesting.is_top_level();
        if let Some(step) = nesting.step(bytes, i, options) {
            if was_top_level && step.opened {
                outer_at = i;
            }
            i += step.len;
            continue;
        }
        if nesting.is_top_level()
            && let Some(which) = matches_at(i)
        {
            return ScanStop::Found(i, which);
        }
        i += 1;
    }
    match nesting.outermost() {
        Some(grammar) => ScanStop::Unclosed {
            grammar,
            at: outer_at,
        },
        None => ScanStop::Exhausted,
    }
}

/// Like `find_unshadowed_with`, for several candidate targets at once.
///
/// Returns the offset of the earliest match and the index into `targets` of
/// the target found there (the first listed wins on a tie).
pub fn find_first_unshadowed(
    text: &str,
    from: usize,
    targets: &[&str],
    options: ScanOptions,
) -> Option<(usize, usize)> {
    match scan_unshadowed(text, from, targets, options) {
        ScanStop::Found(at, which) => Some((at, which)),
        ScanStop::Unclosed { .. } | ScanStop::Exhausted => None,
    }
}

/// Like `find_first_unshadowed`, but an opening token that is never closed
/// does not hide the rest of the text: it is passed to `on_unclosed` and the
/// scan goes on just after it.
pub fn find_first_recovering<F>(
    text: &str,
    from: usize,
    targets: &[&str],
    options: ScanOptions,
    mut on_unclosed: F,
) -> Option<(usize, usize)>
where
    F: FnMut(Grammar, usize),
{
    let mut cur = from;
    loop {
        match scan_unshadowed(text, cur, targets, options) {
            ScanStop::Found(at, which) => return Some((at, which)),
            ScanStop::Unclosed { grammar, at } => {
                on_unclosed(grammar, at);
                cur = at + grammar.open().len();
            }
            ScanStop::Exhausted => return None,
        }
    }
}

/// Offset of the closing token matching an already-consumed `grammar`
/// opening token. `from` is the offset just past that opening token.
///
/// Returns the offset where the closing token starts, or `None` when the
/// construct is never closed.
pub fn find_matching_close(text: &str, from: usize, grammar: Grammar) -> Option<usize> {
    let options = ScanOptions {
        external_links: grammar == Grammar::ExternalLink,
        ..ScanOptions::default()
    };
    find_matching_close_with(text, from, grammar, options)
}

pub fn find_matching_close_with(
    text: &str,
    from: usize,
    grammar: Grammar,
    options: ScanOptions,
) -> Option<usize> {
    check_offset(text, from);
    let bytes = text.as_bytes();
    let mut nesting = Nesting::seeded(grammar);
    let mut i = from;
    while i < bytes.len() {
        match nesting.step(bytes, i, options) {
            Some(step) if !step.opened && step.grammar == grammar && nesting.is_top_level() => {
                return Some(i);
            }
            Some(step) => i += step.len,
            None => i += 1,
        }
    }
    None
}
