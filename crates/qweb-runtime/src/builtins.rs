//! Builtin functions and methods of builtin types.

use crate::error::{RuntimeError, RuntimeResult};
use crate::interp::call_value;
use crate::object::Args;
use crate::ops::{self, format_spec, iterate, markup_text};
use crate::value::{escape, Dict, Range, Value};
use qweb_expr::CmpOp;
use std::cmp::Ordering;

macro_rules! builtins {
    ($($variant:ident => $name:literal,)*) => {
        /// Functions available to generated code without a `values` lookup.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $($variant,)*
        }

        impl Builtin {
            /// Every builtin.
            pub const ALL: &'static [Builtin] = &[$(Builtin::$variant,)*];

            /// Name as seen by generated code.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

builtins! {
    Len => "len",
    Str => "str",
    Int => "int",
    Float => "float",
    Bool => "bool",
    List => "list",
    Tuple => "tuple",
    Dict => "dict",
    Range => "range",
    Enumerate => "enumerate",
    Zip => "zip",
    Sorted => "sorted",
    Reversed => "reversed",
    Min => "min",
    Max => "max",
    Sum => "sum",
    Abs => "abs",
    Round => "round",
    Any => "any",
    All => "all",
    Repr => "repr",
    Markup => "Markup",
    Escape => "escape",
    ToText => "to_text",
    IsSized => "is_sized",
    IsMapping => "is_mapping",
    IsInteger => "is_integer",
    IsString => "is_string",
}

impl Builtin {
    /// Call the builtin.
    pub fn call(&self, args: Args) -> RuntimeResult<Value> {
        let name = self.name();
        let first = || args.require(0, "x", name);
        match self {
            Self::Len => match first()? {
                Value::Range(range) => i64::try_from(range.len())
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::overflow()),
                value => value.len().map(|n| Value::Int(n as i64)).ok_or_else(|| {
                    RuntimeError::type_error(format!(
                        "object of type '{}' has no len()",
                        value.type_name()
                    ))
                }),
            },
            Self::Str => Ok(Value::str(args.get(0, "object").map(Value::py_str).unwrap_or_default())),
            Self::Int => to_int(args.get(0, "x").unwrap_or(&Value::Int(0))),
            Self::Float => to_float(args.get(0, "x").unwrap_or(&Value::Float(0.0))),
            Self::Bool => Ok(Value::Bool(args.get(0, "x").is_some_and(Value::truthy))),
            Self::List => Ok(Value::list(match args.get(0, "iterable") {
                Some(value) => iterate(value)?,
                None => Vec::new(),
            })),
            Self::Tuple => Ok(Value::tuple(match args.get(0, "iterable") {
                Some(value) => iterate(value)?,
                None => Vec::new(),
            })),
            Self::Dict => make_dict(&args).map(Value::Dict),
            Self::Range => range(&args),
            Self::Enumerate => {
                let start = args.get(1, "start").and_then(Value::as_int).unwrap_or(0);
                let items = iterate(args.require(0, "iterable", name)?)?;
                let pairs = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let index = i64::try_from(i)
                            .ok()
                            .and_then(|i| start.checked_add(i))
                            .ok_or_else(RuntimeError::overflow)?;
                        Ok(Value::tuple(vec![Value::Int(index), item]))
                    })
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::list(pairs))
            }
            Self::Zip => {
                let columns = args
                    .positional
                    .iter()
                    .map(iterate)
                    .collect::<RuntimeResult<Vec<_>>>()?;
                let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
                Ok(Value::list(
                    (0..rows)
                        .map(|row| Value::tuple(columns.iter().map(|col| col[row].clone()).collect()))
                        .collect(),
                ))
            }
            Self::Sorted => {
                let items = iterate(args.require(0, "iterable", name)?)?;
                let key = args.keyword("key").filter(|k| !k.is_none());
                let reverse = args.keyword("reverse").is_some_and(Value::truthy);
                sorted(items, key, reverse).map(Value::list)
            }
            Self::Reversed => {
                let mut items = iterate(first()?)?;
                items.reverse();
                Ok(Value::list(items))
            }
            Self::Min => extreme(&args, Ordering::Less, name),
            Self::Max => extreme(&args, Ordering::Greater, name),
            Self::Sum => {
                let mut total = args.get(1, "start").cloned().unwrap_or(Value::Int(0));
                for item in iterate(args.require(0, "iterable", name)?)? {
                    total = ops::binary(qweb_expr::BinOp::Add, &total, &item)?;
                }
                Ok(total)
            }
            Self::Abs => match first()? {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => other
                    .as_int()
                    .map(|n| n.checked_abs().map(Value::Int).ok_or_else(RuntimeError::overflow))
                    .unwrap_or_else(|| {
                        Err(RuntimeError::type_error(format!(
                            "bad operand type for abs(): '{}'",
                            other.type_name()
                        )))
                    }),
            },
            Self::Round => round(first()?, args.get(1, "ndigits")),
            Self::Any => Ok(Value::Bool(iterate(first()?)?.iter().any(Value::truthy))),
            Self::All => Ok(Value::Bool(iterate(first()?)?.iter().all(Value::truthy))),
            Self::Repr => Ok(Value::str(first()?.repr())),
            Self::Markup => Ok(match args.get(0, "base") {
                None => Value::markup(""),
                Some(Value::Markup(text)) => Value::Markup(text.clone()),
                Some(other) => Value::markup(other.py_str()),
            }),
            Self::Escape => Ok(escape(first()?)),
            Self::ToText => Ok(Value::str(first()?.to_text())),
            Self::IsSized => Ok(Value::Bool(first()?.len().is_some())),
            Self::IsMapping => Ok(Value::Bool(matches!(first()?, Value::Dict(_)))),
            Self::IsInteger => Ok(Value::Bool(matches!(first()?, Value::Int(_)))),
            Self::IsString => Ok(Value::Bool(first()?.is_string())),
        }
    }
}

fn to_int(value: &Value) -> RuntimeResult<Value> {
    match value {
        Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Value::Str(s) | Value::Markup(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            RuntimeError::value_error(format!(
                "invalid literal for int() with base 10: {}",
                value.repr()
            ))
        }),
        other => other.as_int().map(Value::Int).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_float(value: &Value) -> RuntimeResult<Value> {
    match value {
        Value::Str(s) | Value::Markup(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            RuntimeError::value_error(format!(
                "could not convert string to float: {}",
                value.repr()
            ))
        }),
        other => other.as_float().map(Value::Float).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn make_dict(args: &Args) -> RuntimeResult<Dict> {
    let dict = Dict::new();
    match args.positional.first() {
        Some(Value::Dict(source)) => dict.update(source)?,
        Some(other) => {
            for pair in iterate(other)? {
                let items = iterate(&pair)?;
                let [key, value] = <[Value; 2]>::try_from(items).map_err(|_| {
                    RuntimeError::value_error("dictionary update sequence element has wrong length")
                })?;
                dict.insert(key, value)?;
            }
        }
        None => {}
    }
    for (key, value) in &args.keywords {
        dict.set(key, value.clone());
    }
    Ok(dict)
}

fn range(args: &Args) -> RuntimeResult<Value> {
    let ints = args
        .positional
        .iter()
        .map(|value| {
            value.as_int().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    value.type_name()
                ))
            })
        })
        .collect::<RuntimeResult<Vec<_>>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(RuntimeError::type_error("range expected 1 to 3 arguments")),
    };
    Range::new(start, stop, step)
        .map(Value::Range)
        .ok_or_else(|| RuntimeError::value_error("range() arg 3 must not be zero"))
}

/// Stable sort with fallible comparisons.
fn sorted(items: Vec<Value>, key: Option<&Value>, reverse: bool) -> RuntimeResult<Vec<Value>> {
    let keys = match key {
        Some(key) => items
            .iter()
            .map(|item| call_value(key, Args::new(vec![item.clone()])))
            .collect::<RuntimeResult<Vec<_>>>()?,
        None => items.clone(),
    };
    let mut indexed: Vec<usize> = (0..items.len()).collect();
    let mut failure = None;
    indexed.sort_by(|&a, &b| match ops::order(CmpOp::Lt, &keys[a], &keys[b]) {
        Ok(ordering) if reverse => ordering.reverse(),
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    Ok(indexed.into_iter().map(|i| items[i].clone()).collect())
}

fn extreme(args: &Args, wanted: Ordering, name: &str) -> RuntimeResult<Value> {
    let items = match args.positional.as_slice() {
        [single] => iterate(single)?,
        many => many.to_vec(),
    };
    let key = args.keyword("key").filter(|k| !k.is_none());
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let rank = match key {
            Some(key) => call_value(key, Args::new(vec![item.clone()]))?,
            None => item.clone(),
        };
        best = match best {
            Some((best_rank, best_item))
                if ops::order(CmpOp::Lt, &rank, &best_rank)? != wanted =>
            {
                Some((best_rank, best_item))
            }
            _ => Some((rank, item)),
        };
    }
    match (best, args.keyword("default")) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(RuntimeError::value_error(format!(
            "{}() arg is an empty sequence",
            name
        ))),
    }
}

/// Round half to even, like Python.
fn round(value: &Value, ndigits: Option<&Value>) -> RuntimeResult<Value> {
    let digits = ndigits.and_then(Value::as_int);
    if let (Some(n), None) = (value.as_int(), digits) {
        return Ok(Value::Int(n));
    }
    let f = value.as_float().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "type {} doesn't define __round__ method",
            value.type_name()
        ))
    })?;
    match digits {
        None => Ok(Value::Int(round_half_even(f) as i64)),
        Some(d) => {
            let factor = 10f64.powi(d as i32);
            let rounded = round_half_even(f * factor) / factor;
            Ok(match value {
                Value::Int(_) | Value::Bool(_) => Value::Int(rounded as i64),
                _ => Value::Float(rounded),
            })
        }
    }
}

fn round_half_even(x: f64) -> f64 {
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        x.round()
    }
}

/// Call a method of a builtin type, or of a host object.
pub fn call_method(receiver: &Value, name: &str, args: Args) -> RuntimeResult<Value> {
    match receiver {
        Value::Str(text) | Value::Markup(text) => {
            string_method(text, matches!(receiver, Value::Markup(_)), name, &args)
                .unwrap_or_else(|| Err(RuntimeError::attribute(receiver.type_name(), name)))
        }
        Value::Dict(dict) => dict_method(dict, name, &args)
            .unwrap_or_else(|| Err(RuntimeError::attribute("dict", name))),
        Value::List(list) => {
            let result = match name {
                "append" => {
                    list.push(args.require(0, "object", name)?.clone());
                    Value::None
                }
                "extend" => {
                    list.extend(iterate(args.require(0, "iterable", name)?)?);
                    Value::None
                }
                "copy" => Value::list(list.to_vec()),
                "count" => {
                    let needle = args.require(0, "value", name)?;
                    Value::Int(list.borrow().iter().filter(|v| *v == needle).count() as i64)
                }
                "index" => {
                    let needle = args.require(0, "value", name)?;
                    let position = list.borrow().iter().position(|v| v == needle);
                    match position {
                        Some(i) => Value::Int(i as i64),
                        None => {
                            return Err(RuntimeError::value_error(format!(
                                "{} is not in list",
                                needle.repr()
                            )))
                        }
                    }
                }
                _ => return Err(RuntimeError::attribute("list", name)),
            };
            Ok(result)
        }
        Value::Object(object) => object.call_method(name, args),
        other => Err(RuntimeError::attribute(other.type_name(), name)),
    }
}

fn string_method(text: &str, markup: bool, name: &str, args: &Args) -> Option<RuntimeResult<Value>> {
    let wrap = |s: String| {
        if markup {
            Value::markup(s)
        } else {
            Value::str(s)
        }
    };
    let strip_chars = || args.get(0, "chars").and_then(Value::as_str).map(str::to_owned);
    let result = match name {
        "format" => format_string(text, args, markup).map(wrap),
        "join" => args.require(0, "iterable", name).and_then(|iterable| {
            let parts = iterate(iterable)?
                .iter()
                .map(|item| match item {
                    Value::Str(_) | Value::Markup(_) if markup => Ok(markup_text(item)),
                    Value::Str(s) | Value::Markup(s) => Ok(s.to_string()),
                    other => Err(RuntimeError::type_error(format!(
                        "sequence item: expected str instance, {} found",
                        other.type_name()
                    ))),
                })
                .collect::<RuntimeResult<Vec<_>>>()?;
            Ok(wrap(parts.join(text)))
        }),
        "upper" => Ok(wrap(text.to_uppercase())),
        "lower" => Ok(wrap(text.to_lowercase())),
        "strip" => Ok(wrap(match strip_chars() {
            Some(chars) => text.trim_matches(|c| chars.contains(c)).to_owned(),
            None => text.trim().to_owned(),
        })),
        "lstrip" => Ok(wrap(match strip_chars() {
            Some(chars) => text.trim_start_matches(|c| chars.contains(c)).to_owned(),
            None => text.trim_start().to_owned(),
        })),
        "rstrip" => Ok(wrap(match strip_chars() {
            Some(chars) => text.trim_end_matches(|c| chars.contains(c)).to_owned(),
            None => text.trim_end().to_owned(),
        })),
        "title" => Ok(wrap(title_case(text))),
        "capitalize" => Ok(wrap({
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })),
        "replace" => (|| -> RuntimeResult<Value> {
            let old = string_arg(args, 0, "old")?;
            let new = string_arg(args, 1, "new")?;
            Ok(wrap(match args.get(2, "count").and_then(Value::as_int) {
                Some(count) if count >= 0 => text.replacen(&old, &new, count as usize),
                _ => text.replace(&old, &new),
            }))
        })(),
        "split" => {
            let sep = args.get(0, "sep").and_then(Value::as_str);
            let parts: Vec<Value> = match sep {
                Some(sep) if !sep.is_empty() => text.split(sep).map(|s| wrap(s.to_owned())).collect(),
                Some(_) => return Some(Err(RuntimeError::value_error("empty separator"))),
                None => text.split_whitespace().map(|s| wrap(s.to_owned())).collect(),
            };
            Ok(Value::list(parts))
        }
        "startswith" | "endswith" => args.require(0, "prefix", name).map(|prefix| {
            let candidates = match prefix {
                Value::Tuple(items) => items.to_vec(),
                other => vec![other.clone()],
            };
            Value::Bool(candidates.iter().filter_map(Value::as_str).any(|p| {
                if name == "startswith" {
                    text.starts_with(p)
                } else {
                    text.ends_with(p)
                }
            }))
        }),
        _ => return None,
    };
    Some(result)
}

fn string_arg(args: &Args, index: usize, name: &str) -> RuntimeResult<String> {
    args.get(index, name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RuntimeError::type_error(format!("expected a string for '{}'", name)))
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for c in text.chars() {
        if previous_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_alpha = c.is_alphabetic();
    }
    out
}

fn dict_method(dict: &Dict, name: &str, args: &Args) -> Option<RuntimeResult<Value>> {
    let result = match name {
        "get" => args
            .require(0, "key", name)
            .map(|key| dict.get(key).unwrap_or_else(|| args.get(1, "default").cloned().unwrap_or_default())),
        "items" => Ok(Value::list(
            dict.items()
                .into_iter()
                .map(|(k, v)| Value::tuple(vec![k, v]))
                .collect(),
        )),
        "keys" => Ok(Value::list(dict.keys())),
        "values" => Ok(Value::list(dict.values())),
        "copy" => Ok(Value::Dict(dict.copy())),
        "update" => (|| -> RuntimeResult<Value> {
            if let Some(other) = args.positional.first() {
                dict.update(&make_dict(&Args::new(vec![other.clone()]))?)?;
            }
            for (key, value) in &args.keywords {
                dict.insert(Value::str(key.as_str()), value.clone())?;
            }
            Ok(Value::None)
        })(),
        "setdefault" => (|| -> RuntimeResult<Value> {
            let key = args.require(0, "key", name)?;
            if let Some(existing) = dict.get(key) {
                return Ok(existing);
            }
            let default = args.get(1, "default").cloned().unwrap_or_default();
            dict.insert(key.clone(), default.clone())?;
            Ok(default)
        })(),
        "pop" => (|| -> RuntimeResult<Value> {
            let key = args.require(0, "key", name)?;
            match (dict.remove(key)?, args.get(1, "default")) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(RuntimeError::key(key.repr())),
            }
        })(),
        _ => return None,
    };
    Some(result)
}

/// `str.format` with positional, indexed and keyword fields.
fn format_string(template: &str, args: &Args, markup: bool) -> RuntimeResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut auto_index = 0;
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(RuntimeError::value_error("Single '}' encountered in format string")),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => {
                            return Err(RuntimeError::value_error(
                                "expected '}' before end of string",
                            ))
                        }
                    }
                }
                let (field, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let (field, conversion) = field.split_once('!').unwrap_or((field, ""));
                let value = if field.is_empty() {
                    auto_index += 1;
                    args.positional.get(auto_index - 1)
                } else if let Ok(index) = field.parse::<usize>() {
                    args.positional.get(index)
                } else {
                    args.keyword(field)
                };
                let value = value.ok_or_else(|| {
                    if field.is_empty() || field.parse::<usize>().is_ok() {
                        RuntimeError::index("Replacement index out of range for positional args tuple")
                    } else {
                        RuntimeError::key(format!("'{}'", field))
                    }
                })?;
                let value = match conversion {
                    "r" => Value::str(value.repr()),
                    _ => value.clone(),
                };
                let text = format_spec(&value, spec)?;
                if markup && !matches!(value, Value::Markup(_)) {
                    out.push_str(&crate::value::html_escape(&text));
                } else {
                    out.push_str(&text);
                }
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(builtin: Builtin, args: Vec<Value>) -> RuntimeResult<Value> {
        builtin.call(Args::new(args))
    }

    #[test]
    fn test_builtin_names_match_globals() {
        let names: Vec<&str> = Builtin::ALL.iter().map(Builtin::name).collect();
        assert_eq!(names, qweb_expr::GLOBAL_NAMES);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call(Builtin::Int, vec![" 42 ".into()]).unwrap(), Value::Int(42));
        assert!(call(Builtin::Int, vec!["x".into()]).is_err());
        assert_eq!(call(Builtin::Str, vec![Value::None]).unwrap(), Value::from("None"));
        assert_eq!(call(Builtin::Float, vec![3.into()]).unwrap(), Value::Float(3.0));
        assert_eq!(call(Builtin::Len, vec!["héllo".into()]).unwrap(), Value::Int(5));
        assert!(call(Builtin::Len, vec![3.into()]).is_err());
    }

    #[test]
    fn test_sequences() {
        let odd = call(Builtin::Range, vec![1.into(), 7.into(), 2.into()]).unwrap();
        assert_eq!(
            call(Builtin::List, vec![odd]).unwrap(),
            Value::list(vec![1.into(), 3.into(), 5.into()])
        );
        assert_eq!(
            call(Builtin::Sorted, vec![Value::list(vec![3.into(), 1.into(), 2.into()])]).unwrap(),
            Value::list(vec![1.into(), 2.into(), 3.into()])
        );
        assert_eq!(
            call(Builtin::Max, vec![1.into(), 5.into(), 3.into()]).unwrap(),
            Value::Int(5)
        );
        assert!(call(Builtin::Min, vec![Value::list(vec![])]).is_err());
        assert_eq!(
            call(Builtin::Sum, vec![Value::list(vec![1.into(), 2.5.into()])]).unwrap(),
            Value::Float(3.5)
        );
        assert!(call(Builtin::Sorted, vec![Value::list(vec![1.into(), "a".into()])]).is_err());
    }

    #[test]
    fn test_range_bounds() {
        let tail = call(Builtin::Range, vec![(i64::MAX - 1).into(), i64::MAX.into(), 2.into()]).unwrap();
        assert_eq!(
            call(Builtin::List, vec![tail]).unwrap(),
            Value::list(vec![(i64::MAX - 1).into()])
        );
        let huge = call(Builtin::Range, vec![i64::MAX.into()]).unwrap();
        assert_eq!(call(Builtin::Len, vec![huge]).unwrap(), Value::Int(i64::MAX));
        let wider = call(Builtin::Range, vec![i64::MIN.into(), i64::MAX.into()]).unwrap();
        assert!(call(Builtin::Len, vec![wider]).is_err());
        assert!(call(Builtin::Range, vec![0.into(), 1.into(), 0.into()]).is_err());
        assert!(call(
            Builtin::Enumerate,
            vec![Value::list(vec![1.into(), 2.into()]), i64::MAX.into()]
        )
        .is_err());
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(call(Builtin::Round, vec![2.5.into()]).unwrap(), Value::Int(2));
        assert_eq!(call(Builtin::Round, vec![3.5.into()]).unwrap(), Value::Int(4));
        assert_eq!(call(Builtin::Round, vec![1.234.into(), 2.into()]).unwrap(), Value::Float(1.23));
    }

    #[test]
    fn test_markup_builtins() {
        assert_eq!(call(Builtin::Markup, vec!["<b>".into()]).unwrap(), Value::markup("<b>"));
        assert_eq!(call(Builtin::Escape, vec!["<b>".into()]).unwrap().as_str(), Some("&lt;b&gt;"));
        assert_eq!(call(Builtin::ToText, vec![Value::None]).unwrap(), Value::from(""));
    }

    #[test]
    fn test_string_methods() {
        let args = Args::new(vec![1.into(), "<x>".into()]);
        assert_eq!(
            call_method(&"{} and {}".into(), "format", args.clone()).unwrap(),
            Value::from("1 and <x>")
        );
        assert_eq!(
            call_method(&Value::markup("<p>{}</p>"), "format", Args::new(vec!["<x>".into()]))
                .unwrap()
                .as_str(),
            Some("<p>&lt;x&gt;</p>")
        );
        assert_eq!(
            call_method(&"{{{0}}}".into(), "format", Args::new(vec!["a".into()])).unwrap(),
            Value::from("{a}")
        );
        assert_eq!(
            call_method(&"".into(), "join", Args::new(vec![Value::list(vec!["a".into(), "b".into()])]))
                .unwrap(),
            Value::from("ab")
        );
        assert_eq!(
            call_method(&"a,b".into(), "split", Args::new(vec![",".into()])).unwrap(),
            Value::list(vec!["a".into(), "b".into()])
        );
        assert!(call_method(&"x".into(), "nope", Args::default()).is_err());
    }

    #[test]
    fn test_dict_methods() {
        let dict = Dict::new();
        dict.set("a", 1.into());
        let value = Value::Dict(dict.clone());
        assert_eq!(
            call_method(&value, "get", Args::new(vec!["b".into(), 2.into()])).unwrap(),
            Value::Int(2)
        );
        call_method(&value, "update", Args::new(vec![Value::Dict(dict.copy())])).unwrap();
        assert_eq!(
            call_method(&value, "items", Args::default()).unwrap(),
            Value::list(vec![Value::tuple(vec!["a".into(), 1.into()])])
        );
        assert!(call_method(&value, "pop", Args::new(vec!["zz".into()])).is_err());
    }
}
