//! Host-neutral values built by the default providers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum FuzzedValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
    Enum {
        type_name: String,
        variant: String,
    },
    /// Arrays, lists and sets.
    Sequence {
        type_name: String,
        elements: Vec<FuzzedValue>,
    },
    Map {
        type_name: String,
        entries: Vec<(FuzzedValue, FuzzedValue)>,
    },
    Object {
        id: u64,
        type_name: String,
        constructor: String,
        args: Vec<FuzzedValue>,
        calls: Vec<MethodCall>,
    },
    /// A stand-in for an abstract type with stubbed method answers.
    Mock {
        id: u64,
        type_name: String,
        stubs: Vec<MethodCall>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub args: Vec<FuzzedValue>,
}

impl FuzzedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FuzzedValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FuzzedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FuzzedValue::I8(v) => Some(v as i64),
            FuzzedValue::I16(v) => Some(v as i64),
            FuzzedValue::I32(v) => Some(v as i64),
            FuzzedValue::I64(v) => Some(v),
            FuzzedValue::U8(v) => Some(v as i64),
            FuzzedValue::U16(v) => Some(v as i64),
            FuzzedValue::U32(v) => Some(v as i64),
            FuzzedValue::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Nesting depth of objects, sequences and maps; scalars are 0.
    pub fn depth(&self) -> usize {
        match self {
            FuzzedValue::Sequence { elements, .. } => {
                1 + elements.iter().map(FuzzedValue::depth).max().unwrap_or(0)
            }
            FuzzedValue::Map { entries, .. } => {
                1 + entries
                    .iter()
                    .map(|(k, v)| k.depth().max(v.depth()))
                    .max()
                    .unwrap_or(0)
            }
            FuzzedValue::Object { args, calls, .. } => {
                let from_args = args.iter().map(FuzzedValue::depth).max().unwrap_or(0);
                let from_calls = calls
                    .iter()
                    .flat_map(|c| c.args.iter().map(FuzzedValue::depth))
                    .max()
                    .unwrap_or(0);
                1 + from_args.max(from_calls)
            }
            FuzzedValue::Mock { stubs, .. } => {
                1 + stubs
                    .iter()
                    .flat_map(|c| c.args.iter().map(FuzzedValue::depth))
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl fmt::Display for FuzzedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuzzedValue::Null => f.write_str("null"),
            FuzzedValue::Bool(v) => write!(f, "{v}"),
            FuzzedValue::I8(v) => write!(f, "{v}i8"),
            FuzzedValue::I16(v) => write!(f, "{v}i16"),
            FuzzedValue::I32(v) => write!(f, "{v}"),
            FuzzedValue::I64(v) => write!(f, "{v}i64"),
            FuzzedValue::U8(v) => write!(f, "{v}u8"),
            FuzzedValue::U16(v) => write!(f, "{v}u16"),
            FuzzedValue::U32(v) => write!(f, "{v}u32"),
            FuzzedValue::U64(v) => write!(f, "{v}u64"),
            FuzzedValue::F32(v) => write!(f, "{v}f32"),
            FuzzedValue::F64(v) => write!(f, "{v}"),
            FuzzedValue::Char(v) => write!(f, "{v:?}"),
            FuzzedValue::Str(v) => write!(f, "{v:?}"),
            FuzzedValue::Enum { type_name, variant } => write!(f, "{type_name}::{variant}"),
            FuzzedValue::Sequence { elements, .. } => {
                f.write_str("[")?;
                write_joined(f, elements)?;
                f.write_str("]")
            }
            FuzzedValue::Map { entries, .. } => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            FuzzedValue::Object {
                id,
                type_name,
                constructor,
                args,
                calls,
            } => {
                write!(f, "{type_name}#{id}::{constructor}(")?;
                write_joined(f, args)?;
                f.write_str(")")?;
                for call in calls {
                    write!(f, ".{}(", call.name)?;
                    write_joined(f, &call.args)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            FuzzedValue::Mock {
                id,
                type_name,
                stubs,
            } => {
                write!(f, "mock {type_name}#{id}")?;
                for stub in stubs {
                    write!(f, ".{}(", stub.name)?;
                    write_joined(f, &stub.args)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, values: &[FuzzedValue]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

/// Monotonic ids for constructed objects, safe to share across threads.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ids_are_unique_across_threads() {
        let ids = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..100).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn test_display_and_depth() {
        let leaf = FuzzedValue::Object {
            id: 2,
            type_name: "Node".into(),
            constructor: "new".into(),
            args: vec![FuzzedValue::Null],
            calls: vec![MethodCall {
                name: "set_value".into(),
                args: vec![FuzzedValue::I32(5)],
            }],
        };
        assert_eq!(leaf.to_string(), "Node#2::new(null).set_value(5)");
        let list = FuzzedValue::Sequence {
            type_name: "List".into(),
            elements: vec![leaf.clone(), FuzzedValue::Null],
        };
        assert_eq!(list.depth(), 2);
        assert_eq!(FuzzedValue::Str("a".into()).depth(), 0);
    }
}
