//! Loose ordering for the free-form version strings nodes report.
//!
//! Node software reports things like `v3.8.4`, `3.8.0-rc1` or `Unknown`, so a
//! strict semver parse would reject most of the network. Versions are split
//! into runs of digits and runs of letters; digits compare numerically, letters
//! lexicographically, and a digit run facing a letter run at the same position
//! makes the two versions incomparable.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Component<'a> {
    Number(u64),
    Word(&'a str),
}

fn components(version: &str) -> Vec<Component<'_>> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let mut parts = Vec::new();
    // (start of the current run, whether it is a digit run)
    let mut run: Option<(usize, bool)> = None;

    for (index, c) in version.char_indices() {
        let kind = if c.is_ascii_digit() {
            Some(true)
        } else if c.is_alphabetic() {
            Some(false)
        } else {
            None
        };
        match (run, kind) {
            (Some((_, numeric)), Some(digit)) if numeric == digit => {}
            (Some((begin, numeric)), _) => {
                parts.push(component(&version[begin..index], numeric));
                run = kind.map(|digit| (index, digit));
            }
            (None, _) => run = kind.map(|digit| (index, digit)),
        }
    }
    if let Some((begin, numeric)) = run {
        parts.push(component(&version[begin..], numeric));
    }
    parts
}

fn component(text: &str, numeric: bool) -> Component<'_> {
    if numeric {
        // digit runs too long for u64 saturate rather than fail
        Component::Number(text.parse().unwrap_or(u64::MAX))
    } else {
        Component::Word(text)
    }
}

/// Compares two versions, `None` when they can't be ordered.
pub fn compare(left: &str, right: &str) -> Option<Ordering> {
    let left = components(left);
    let right = components(right);
    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = match (l, r) {
            (Component::Number(a), Component::Number(b)) => a.cmp(b),
            (Component::Word(a), Component::Word(b)) => a.cmp(b),
            _ => return None,
        };
        if ordering != Ordering::Equal {
            return Some(ordering);
        }
    }
    Some(left.len().cmp(&right.len()))
}

/// Whether `version` is at least `minimum`. Empty and incomparable versions
/// never pass.
pub fn is_at_least(version: &str, minimum: &str) -> bool {
    if version.trim().is_empty() {
        return false;
    }
    matches!(
        compare(version, minimum),
        Some(Ordering::Greater | Ordering::Equal)
    )
}
