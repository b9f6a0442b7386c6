//! Add-on version ordering
//!
//! Versions follow the toolkit version format: dot-separated parts, each part
//! parsed as `<number-a><string-b><number-c><string-d>`.
//!
//! - A missing part compares as `0`.
//! - A `*` part is greater than any number.
//! - A string-b of `+` means "number-a + 1, pre" (`1.0+` == `1.1pre`).
//! - A missing string sorts after any present string, so `2.0b1 < 2.0`.

use std::cmp::Ordering;
use std::fmt;

/// Lower-bound sentinel: no lower bound.
pub const MIN_VERSION_ANY: &str = "0";
/// Upper-bound sentinel: no upper bound.
pub const MAX_VERSION_ANY: &str = "*";

/// Value of a `*` part; parsed numbers stop one below it.
const STAR: u64 = u64::MAX;
const NUMBER_CEILING: u64 = STAR - 1;

#[derive(Clone, Debug, PartialEq, Eq)]
struct VersionPart {
    a: u64,
    b: Option<String>,
    c: u64,
    d: Option<String>,
}

/// A parsed add-on version, comparable under toolkit ordering
#[derive(Clone, Debug)]
pub struct AddonVersion {
    raw: String,
    parts: Vec<VersionPart>,
}

/// Split the leading run of ASCII digits off `s`, saturating below `*`.
fn take_number(s: &str) -> (u64, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let n = s[..end]
        .bytes()
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as u64));
    (n.min(NUMBER_CEILING), &s[end..])
}

/// Split the leading run of non-digits off `s`.
fn take_string(s: &str) -> (Option<String>, &str) {
    let end = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let head = &s[..end];
    ((!head.is_empty()).then(|| head.to_string()), &s[end..])
}

impl VersionPart {
    fn parse(part: &str) -> Self {
        if part == "*" {
            return Self {
                a: STAR,
                b: None,
                c: 0,
                d: None,
            };
        }
        let (mut a, rest) = take_number(part);
        let (mut b, rest) = take_string(rest);
        if b.as_deref() == Some("+") {
            a = a.saturating_add(1).min(NUMBER_CEILING);
            b = Some("pre".to_string());
            return Self { a, b, c: 0, d: None };
        }
        let (c, rest) = take_number(rest);
        let d = (!rest.is_empty()).then(|| rest.to_string());
        Self { a, b, c, d }
    }

    fn zero() -> Self {
        Self {
            a: 0,
            b: None,
            c: 0,
            d: None,
        }
    }
}

/// Present strings sort before an absent one.
fn cmp_opt_str(x: &Option<String>, y: &Option<String>) -> Ordering {
    match (x, y) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.a
            .cmp(&other.a)
            .then_with(|| cmp_opt_str(&self.b, &other.b))
            .then_with(|| self.c.cmp(&other.c))
            .then_with(|| cmp_opt_str(&self.d, &other.d))
    }
}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AddonVersion {
    pub fn parse(raw: &str) -> Self {
        let parts = raw.split('.').map(VersionPart::parse).collect();
        Self {
            raw: raw.to_string(),
            parts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AddonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for AddonVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = VersionPart::zero();
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let x = self.parts.get(i).unwrap_or(&zero);
            let y = other.parts.get(i).unwrap_or(&zero);
            match x.cmp(y) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for AddonVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AddonVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AddonVersion {}

/// Compare two version strings under toolkit ordering
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    AddonVersion::parse(a).cmp(&AddonVersion::parse(b))
}

/// Inclusive version range with `"0"` / `"*"` sentinels for open ends
#[derive(Clone, Debug)]
pub struct VersionRange {
    min: Option<AddonVersion>,
    max: Option<AddonVersion>,
}

impl VersionRange {
    pub fn new(min_version: &str, max_version: &str) -> Self {
        Self {
            min: (min_version != MIN_VERSION_ANY).then(|| AddonVersion::parse(min_version)),
            max: (max_version != MAX_VERSION_ANY).then(|| AddonVersion::parse(max_version)),
        }
    }

    pub fn contains(&self, version: &str) -> bool {
        let v = AddonVersion::parse(version);
        self.min.as_ref().map_or(true, |min| &v >= min)
            && self.max.as_ref().map_or(true, |max| &v <= max)
    }
}
