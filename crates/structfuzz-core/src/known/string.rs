//! String values and regex-constrained string values.
//!
//! A [`StringValue`] may carry the [`RegexPattern`] it was generated from.
//! Pattern-bearing strings mutate by drawing a new witness from the pattern
//! instead of editing characters, so they keep matching it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use regex_syntax::hir::{Class, Hir, HirKind, Literal, Look};

use crate::error::FuzzError;

/// Upper bound on extra repetitions drawn for `*`, `+` and `{n,}`.
const UNBOUNDED_REPEAT_EXTRA: u32 = 8;

/// Attempts made to draw a witness different from the current one.
const REGENERATE_ATTEMPTS: usize = 16;

/// A parsed pattern that supports witness generation.
pub struct RegexPattern {
    source: String,
    hir: Hir,
    matcher: regex::Regex,
}

impl RegexPattern {
    /// Parse `pattern`, rejecting constructs a generator cannot satisfy.
    pub fn parse(pattern: &str) -> Result<Self, FuzzError> {
        let hir = regex_syntax::ParserBuilder::new()
            .build()
            .parse(pattern)
            .map_err(|e| FuzzError::UnsupportedPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(reason) = unsupported(&hir) {
            return Err(FuzzError::UnsupportedPattern {
                pattern: pattern.to_string(),
                reason: reason.to_string(),
            });
        }
        let matcher = regex::Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            FuzzError::UnsupportedPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            hir,
            matcher,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the whole of `value` matches.
    pub fn is_match(&self, value: &str) -> bool {
        self.matcher.is_match(value)
    }

    /// Draw one string the pattern matches in full.
    pub fn witness(&self, rng: &mut dyn RngCore) -> Result<String, FuzzError> {
        let mut out = String::new();
        generate(&self.hir, rng, &mut out).map_err(|reason| FuzzError::UnsupportedPattern {
            pattern: self.source.clone(),
            reason: reason.to_string(),
        })?;
        Ok(out)
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexPattern").field(&self.source).finish()
    }
}

/// Whether witnesses can be generated for `pattern`.
pub fn is_supported_pattern(pattern: &str) -> bool {
    RegexPattern::parse(pattern).is_ok()
}

#[derive(Clone)]
pub struct StringValue {
    value: String,
    pattern: Option<Arc<RegexPattern>>,
    mutated_from: Option<Arc<StringValue>>,
    last_mutation: Option<StringMutation>,
}

impl StringValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pattern: None,
            mutated_from: None,
            last_mutation: None,
        }
    }

    /// A witness of `pattern` that remembers the pattern for later mutation.
    pub fn from_pattern(
        pattern: Arc<RegexPattern>,
        rng: &mut dyn RngCore,
    ) -> Result<Self, FuzzError> {
        let value = pattern.witness(rng)?;
        Ok(Self {
            value,
            pattern: Some(pattern),
            mutated_from: None,
            last_mutation: None,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn pattern(&self) -> Option<&RegexPattern> {
        self.pattern.as_deref()
    }

    pub fn is_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn mutated_from(&self) -> Option<&StringValue> {
        self.mutated_from.as_deref()
    }

    pub fn last_mutation(&self) -> Option<StringMutation> {
        self.last_mutation
    }

    pub fn mutations(&self) -> &'static [StringMutation] {
        if self.is_pattern() {
            &[StringMutation::Regenerate]
        } else {
            &[
                StringMutation::AddCharacter,
                StringMutation::RemoveCharacter,
                StringMutation::ShuffleCharacters,
            ]
        }
    }

    /// Apply one mutation. Strings never grow past `max_length` characters.
    pub fn mutate(
        &self,
        mutation: StringMutation,
        rng: &mut dyn RngCore,
        max_length: usize,
    ) -> Self {
        let mut chars: Vec<char> = self.value.chars().collect();
        match mutation {
            StringMutation::AddCharacter => {
                if chars.len() < max_length {
                    let position = rng.gen_range(0..=chars.len());
                    if let Some(c) = nearby_character(&chars, rng) {
                        chars.insert(position, c);
                    }
                }
            }
            StringMutation::RemoveCharacter => {
                if !chars.is_empty() {
                    let position = rng.gen_range(0..chars.len());
                    chars.remove(position);
                }
            }
            StringMutation::ShuffleCharacters => chars.shuffle(rng),
            StringMutation::Regenerate => {
                if let Some(pattern) = &self.pattern {
                    for _ in 0..REGENERATE_ATTEMPTS {
                        match pattern.witness(rng) {
                            Ok(next) if next != self.value => {
                                chars = next.chars().collect();
                                break;
                            }
                            Ok(_) => continue,
                            Err(_) => break,
                        }
                    }
                }
            }
        }
        Self {
            value: chars.into_iter().collect(),
            pattern: self.pattern.clone(),
            mutated_from: Some(Arc::new(self.clone())),
            last_mutation: Some(mutation),
        }
    }
}

impl PartialEq for StringValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.pattern.as_ref().map(|p| p.source()) == other.pattern.as_ref().map(|p| p.source())
    }
}

impl Eq for StringValue {}

impl Hash for StringValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.pattern.as_ref().map(|p| p.source().to_string()).hash(state);
    }
}

impl fmt::Debug for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Some(p) => write!(f, "StringValue({:?} ~ /{}/)", self.value, p.source()),
            None => write!(f, "StringValue({:?})", self.value),
        }
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringMutation {
    AddCharacter,
    RemoveCharacter,
    ShuffleCharacters,
    /// Draw a fresh witness of the carried pattern.
    Regenerate,
}

/// A character whose code point lies 1..64 away from an existing one.
pub(crate) fn nearby_character(chars: &[char], rng: &mut dyn RngCore) -> Option<char> {
    let base = match chars.choose(rng) {
        Some(c) => *c as i64,
        None => rng.gen_range(0x21..0x7F),
    };
    let offset = rng.gen_range(1..64i64);
    let code = if rng.gen_bool(0.5) { base + offset } else { base - offset };
    u32::try_from(code).ok().and_then(char::from_u32)
}

fn unsupported(hir: &Hir) -> Option<&'static str> {
    match hir.kind() {
        HirKind::Empty | HirKind::Literal(_) => None,
        HirKind::Class(class) => {
            let empty = match class {
                Class::Unicode(c) => c.ranges().is_empty(),
                Class::Bytes(c) => c.ranges().is_empty(),
            };
            empty.then_some("character class matches nothing")
        }
        HirKind::Look(look) => match look {
            Look::Start | Look::End => None,
            _ => Some("only ^ and $ assertions are supported"),
        },
        HirKind::Repetition(rep) => unsupported(&rep.sub),
        HirKind::Capture(cap) => unsupported(&cap.sub),
        HirKind::Concat(subs) | HirKind::Alternation(subs) => subs.iter().find_map(unsupported),
    }
}

fn generate(hir: &Hir, rng: &mut dyn RngCore, out: &mut String) -> Result<(), &'static str> {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => Ok(()),
        HirKind::Literal(Literal(bytes)) => {
            out.push_str(&String::from_utf8_lossy(bytes));
            Ok(())
        }
        HirKind::Class(Class::Unicode(class)) => {
            let c = pick_char(class.ranges().iter().map(|r| (r.start(), r.end())), rng)
                .ok_or("character class matches nothing")?;
            out.push(c);
            Ok(())
        }
        HirKind::Class(Class::Bytes(class)) => {
            let c = pick_char(
                class
                    .ranges()
                    .iter()
                    .filter(|r| r.start().is_ascii())
                    .map(|r| (r.start() as char, r.end().min(0x7F) as char)),
                rng,
            )
            .ok_or("byte class has no ASCII members")?;
            out.push(c);
            Ok(())
        }
        HirKind::Repetition(rep) => {
            let max = rep.max.unwrap_or(rep.min + UNBOUNDED_REPEAT_EXTRA);
            let count = rng.gen_range(rep.min..=max.max(rep.min));
            for _ in 0..count {
                generate(&rep.sub, rng, out)?;
            }
            Ok(())
        }
        HirKind::Capture(cap) => generate(&cap.sub, rng, out),
        HirKind::Concat(subs) => {
            for sub in subs {
                generate(sub, rng, out)?;
            }
            Ok(())
        }
        HirKind::Alternation(alts) => match alts.choose(rng) {
            Some(alt) => generate(alt, rng, out),
            None => Ok(()),
        },
    }
}

/// Pick from printable ASCII most of the time when the class allows it.
fn pick_char(
    ranges: impl Iterator<Item = (char, char)>,
    rng: &mut dyn RngCore,
) -> Option<char> {
    let ranges: Vec<(u32, u32)> = ranges.map(|(s, e)| (s as u32, e as u32)).collect();
    let printable: Vec<(u32, u32)> = ranges
        .iter()
        .filter_map(|&(s, e)| {
            let (s, e) = (s.max(0x20), e.min(0x7E));
            (s <= e).then_some((s, e))
        })
        .collect();
    let pool = if !printable.is_empty() && rng.gen_bool(0.9) {
        &printable
    } else {
        &ranges
    };
    let &(start, end) = pool.choose(rng)?;
    let code = rng.gen_range(start..=end);
    // ranges may straddle the surrogate gap
    char::from_u32(code).or_else(|| char::from_u32(start))
}
