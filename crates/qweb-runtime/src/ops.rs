//! Operators on values.

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{escape, format_float, html_escape, Range, Value};
use qweb_expr::{BinOp, CmpOp};
use std::cmp::Ordering;

/// Apply an arithmetic operator.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        BinOp::Mul => multiply(left, right),
        BinOp::Div => {
            let (a, b) = floats(op, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::zero_division());
            }
            Ok(Value::Float(a / b))
        }
        BinOp::FloorDiv => {
            if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                if b == 0 {
                    return Err(RuntimeError::zero_division());
                }
                return floor_div(a, b).map(Value::Int).ok_or_else(RuntimeError::overflow);
            }
            let (a, b) = floats(op, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::zero_division());
            }
            Ok(Value::Float((a / b).floor()))
        }
        BinOp::Mod => {
            if let Some(format) = left.as_str() {
                let text = percent_format(format, right)?;
                return Ok(match left {
                    Value::Markup(_) => Value::markup(text),
                    _ => Value::str(text),
                });
            }
            if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                if b == 0 {
                    return Err(RuntimeError::zero_division());
                }
                return floor_div(a, b)
                    .and_then(|q| b.checked_mul(q))
                    .and_then(|m| a.checked_sub(m))
                    .map(Value::Int)
                    .ok_or_else(RuntimeError::overflow);
            }
            let (a, b) = floats(op, left, right)?;
            if b == 0.0 {
                return Err(RuntimeError::zero_division());
            }
            Ok(Value::Float(a - b * (a / b).floor()))
        }
        BinOp::Pow => {
            if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                if b >= 0 {
                    let exp = u32::try_from(b).map_err(|_| RuntimeError::overflow())?;
                    return a.checked_pow(exp).map(Value::Int).ok_or_else(RuntimeError::overflow);
                }
            }
            let (a, b) = floats(op, left, right)?;
            Ok(Value::Float(a.powf(b)))
        }
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a.checked_rem(b)? != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn unsupported(op: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn floats(op: BinOp, left: &Value, right: &Value) -> RuntimeResult<(f64, f64)> {
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(unsupported(op.as_str(), left, right)),
    }
}

fn arithmetic(
    op: BinOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> RuntimeResult<Value> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_op(a, b).map(Value::Int).ok_or_else(RuntimeError::overflow);
    }
    let (a, b) = floats(op, left, right)?;
    Ok(Value::Float(float_op(a, b)))
}

fn add(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
        (Value::Markup(_), Value::Str(_) | Value::Markup(_))
        | (Value::Str(_), Value::Markup(_)) => {
            let a = escape(left);
            let b = escape(right);
            Ok(Value::markup(format!(
                "{}{}",
                a.as_str().unwrap_or_default(),
                b.as_str().unwrap_or_default()
            )))
        }
        (Value::List(a), Value::List(b)) => {
            let mut items = a.to_vec();
            items.extend(b.to_vec());
            Ok(Value::list(items))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => arithmetic(BinOp::Add, left, right, i64::checked_add, |a, b| a + b),
    }
}

fn multiply(left: &Value, right: &Value) -> RuntimeResult<Value> {
    let repeat = |count: i64| usize::try_from(count).unwrap_or(0);
    match (left, right) {
        (Value::Str(s) | Value::Markup(s), n) | (n, Value::Str(s) | Value::Markup(s))
            if n.as_int().is_some() =>
        {
            let text = s.repeat(repeat(n.as_int().unwrap_or(0)));
            Ok(if matches!(left, Value::Markup(_)) || matches!(right, Value::Markup(_)) {
                Value::markup(text)
            } else {
                Value::str(text)
            })
        }
        (Value::List(list), n) | (n, Value::List(list)) if n.as_int().is_some() => {
            let items = list.to_vec();
            let count = repeat(n.as_int().unwrap_or(0));
            Ok(Value::list(
                std::iter::repeat(items).take(count).flatten().collect(),
            ))
        }
        _ => arithmetic(BinOp::Mul, left, right, i64::checked_mul, |a, b| a * b),
    }
}

/// Old-style `%` formatting with `%s`, `%r`, `%d`, `%i`, `%f` and `%%`.
fn percent_format(format: &str, args: &Value) -> RuntimeResult<String> {
    let args: Vec<Value> = match args {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    let mut args = args.into_iter();
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(*d);
                chars.next();
            }
            precision = digits.parse::<usize>().ok();
        }
        let conversion = chars
            .next()
            .ok_or_else(|| RuntimeError::value_error("incomplete format"))?;
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let arg = args.next().ok_or_else(|| {
            RuntimeError::type_error("not enough arguments for format string")
        })?;
        match conversion {
            's' => out.push_str(&arg.py_str()),
            'r' => out.push_str(&arg.repr()),
            'd' | 'i' => match (arg.as_int(), arg.as_float()) {
                (Some(n), _) => out.push_str(&n.to_string()),
                (None, Some(f)) => out.push_str(&(f.trunc() as i64).to_string()),
                _ => {
                    return Err(RuntimeError::type_error(format!(
                        "%d format: a number is required, not {}",
                        arg.type_name()
                    )))
                }
            },
            'f' => {
                let f = arg.as_float().ok_or_else(|| {
                    RuntimeError::type_error(format!("must be real number, not {}", arg.type_name()))
                })?;
                out.push_str(&format!("{:.*}", precision.unwrap_or(6), f));
            }
            other => {
                return Err(RuntimeError::value_error(format!(
                    "unsupported format character '{}'",
                    other
                )))
            }
        }
    }
    if args.next().is_some() {
        return Err(RuntimeError::type_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(out)
}

/// Apply a comparison operator.
pub fn compare(op: CmpOp, left: &Value, right: &Value) -> RuntimeResult<bool> {
    Ok(match op {
        CmpOp::Eq => left == right,
        CmpOp::NotEq => left != right,
        CmpOp::Lt => order(op, left, right)? == Ordering::Less,
        CmpOp::LtE => order(op, left, right)? != Ordering::Greater,
        CmpOp::Gt => order(op, left, right)? == Ordering::Greater,
        CmpOp::GtE => order(op, left, right)? != Ordering::Less,
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
        CmpOp::Is => left.is_same(right),
        CmpOp::IsNot => !left.is_same(right),
    })
}

/// Python ordering between two values.
pub fn order(op: CmpOp, left: &Value, right: &Value) -> RuntimeResult<Ordering> {
    match (left, right) {
        (Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) => order_seq(op, &a.to_vec(), &b.to_vec()),
        (Value::Tuple(a), Value::Tuple(b)) => order_seq(op, a, b),
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => {
                if let (Some(x), Some(y)) = (left.as_int(), right.as_int()) {
                    return Ok(x.cmp(&y));
                }
                a.partial_cmp(&b)
                    .ok_or_else(|| RuntimeError::value_error("cannot order NaN"))
            }
            _ => Err(RuntimeError::type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.as_str(),
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn order_seq(op: CmpOp, a: &[Value], b: &[Value]) -> RuntimeResult<Ordering> {
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return order(op, x, y);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

/// Membership test `item in container`.
pub fn contains(container: &Value, item: &Value) -> RuntimeResult<bool> {
    match container {
        Value::Str(s) | Value::Markup(s) => match item.as_str() {
            Some(needle) => Ok(s.contains(needle)),
            None => Err(RuntimeError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                item.type_name()
            ))),
        },
        Value::Dict(dict) => Ok(dict.contains(item)),
        Value::Range(range) => Ok(match item {
            Value::Float(f) if f.fract() != 0.0 => false,
            Value::Float(f) => f.abs() < 9.2e18 && range.contains(*f as i64),
            other => other.as_int().is_some_and(|n| range.contains(n)),
        }),
        other => Ok(items(other)?.any(|value| &value == item)),
    }
}

/// Iterate without materializing ranges.
pub fn items(value: &Value) -> RuntimeResult<Box<dyn Iterator<Item = Value>>> {
    match value {
        Value::Range(range) => Ok(Box::new(range.iter().map(Value::Int))),
        other => Ok(Box::new(iterate(other)?.into_iter())),
    }
}

/// Materialize the items of an iterable.
pub fn iterate(value: &Value) -> RuntimeResult<Vec<Value>> {
    match value {
        Value::List(list) => Ok(list.to_vec()),
        Value::Tuple(items) => Ok(items.to_vec()),
        Value::Range(range) => Ok(range.iter().map(Value::Int).collect()),
        Value::Dict(dict) => Ok(dict.keys()),
        Value::Str(s) | Value::Markup(s) => {
            Ok(s.chars().map(|c| Value::str(c.to_string())).collect())
        }
        Value::Object(object) => object.iter().ok_or_else(|| not_iterable(value)),
        other => Err(not_iterable(other)),
    }
}

fn not_iterable(value: &Value) -> RuntimeError {
    RuntimeError::type_error(format!("'{}' object is not iterable", value.type_name()))
}

/// Subscript read `value[index]`.
pub fn subscript(value: &Value, index: &Value) -> RuntimeResult<Value> {
    match value {
        Value::Dict(dict) => dict
            .get(index)
            .ok_or_else(|| RuntimeError::key(index.repr())),
        Value::List(list) => sequence_item(&list.borrow(), index, "list"),
        Value::Tuple(items) => sequence_item(items, index, "tuple"),
        Value::Range(range) => {
            let n = index.as_int().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "range indices must be integers or slices, not {}",
                    index.type_name()
                ))
            })?;
            range
                .get(n)
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::index("range object index out of range"))
        }
        Value::Str(s) | Value::Markup(s) => {
            let chars: Vec<Value> = s.chars().map(|c| Value::str(c.to_string())).collect();
            let item = sequence_item(&chars, index, "string")?;
            Ok(match (value, item) {
                (Value::Markup(_), Value::Str(text)) => Value::Markup(text),
                (_, item) => item,
            })
        }
        Value::Object(object) => object
            .get_item(index)
            .ok_or_else(|| RuntimeError::key(index.repr())),
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn sequence_item(items: &[Value], index: &Value, kind: &str) -> RuntimeResult<Value> {
    let n = index.as_int().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{} indices must be integers or slices, not {}",
            kind,
            index.type_name()
        ))
    })?;
    let len = items.len() as i64;
    let position = if n < 0 { n + len } else { n };
    if position < 0 || position >= len {
        return Err(RuntimeError::index(format!("{} index out of range", kind)));
    }
    Ok(items[position as usize].clone())
}

/// Slice read `value[lower:upper:step]`.
pub fn slice(value: &Value, lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> RuntimeResult<Value> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(RuntimeError::value_error("slice step cannot be zero"));
    }
    if let Value::Range(range) = value {
        return slice_range(range, lower, upper, step);
    }
    let items = match value {
        Value::List(list) => list.to_vec(),
        Value::Tuple(items) => items.to_vec(),
        Value::Str(s) | Value::Markup(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            )))
        }
    };
    let (start, stop) = slice_bounds(items.len() as i128, lower, upper, step);
    let picked: Vec<Value> = std::iter::successors(Some(start), |i| Some(i + step as i128))
        .take_while(|i| if step > 0 { *i < stop } else { *i > stop })
        .map(|i| items[i as usize].clone())
        .collect();
    Ok(match value {
        Value::List(_) => Value::list(picked),
        Value::Tuple(_) => Value::tuple(picked),
        Value::Markup(_) => Value::markup(picked.iter().map(Value::py_str).collect::<String>()),
        _ => Value::str(picked.iter().map(Value::py_str).collect::<String>()),
    })
}

/// Clamped `(start, stop)` indices of a slice over `len` items.
fn slice_bounds(len: i128, lower: Option<i64>, upper: Option<i64>, step: i64) -> (i128, i128) {
    let clamp = |bound: i64, low: i128, high: i128| {
        let bound = bound as i128;
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };
    if step > 0 {
        (
            lower.map_or(0, |b| clamp(b, 0, len)),
            upper.map_or(len, |b| clamp(b, 0, len)),
        )
    } else {
        (
            lower.map_or(len - 1, |b| clamp(b, -1, len - 1)),
            upper.map_or(-1, |b| clamp(b, -1, len - 1)),
        )
    }
}

/// Slicing a range yields another range.
fn slice_range(range: &Range, lower: Option<i64>, upper: Option<i64>, step: i64) -> RuntimeResult<Value> {
    let (start, stop) = slice_bounds(range.len() as i128, lower, upper, step);
    if (step > 0 && start >= stop) || (step < 0 && start <= stop) {
        return Ok(Value::Range(Range { start: 0, stop: 0, step: 1 }));
    }
    let at = |index: i128| range.start as i128 + index * range.step as i128;
    let bound = |value: i128| i64::try_from(value).map_err(|_| RuntimeError::overflow());
    let sliced = Range::new(
        bound(at(start))?,
        bound(at(stop))?,
        bound(range.step as i128 * step as i128)?,
    )
    .ok_or_else(|| RuntimeError::value_error("slice step cannot be zero"))?;
    Ok(Value::Range(sliced))
}

/// Unary minus and plus.
pub fn negate(value: &Value, negative: bool) -> RuntimeResult<Value> {
    match value {
        Value::Float(f) => Ok(Value::Float(if negative { -f } else { *f })),
        other => match other.as_int() {
            Some(n) if negative => n.checked_neg().map(Value::Int).ok_or_else(RuntimeError::overflow),
            Some(n) => Ok(Value::Int(n)),
            None => Err(RuntimeError::type_error(format!(
                "bad operand type for unary {}: '{}'",
                if negative { "-" } else { "+" },
                other.type_name()
            ))),
        },
    }
}

/// Text form of a number for `str.format` specs such as `.2f`.
pub fn format_spec(value: &Value, spec: &str) -> RuntimeResult<String> {
    if spec.is_empty() {
        return Ok(value.py_str());
    }
    let (precision, kind) = match spec.strip_prefix('.') {
        Some(rest) => {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            (digits.parse::<usize>().ok(), &rest[digits.len()..])
        }
        None => (None, spec),
    };
    match kind {
        "f" | "" if value.as_float().is_some() => {
            let f = value.as_float().unwrap_or_default();
            Ok(match precision {
                Some(p) => format!("{:.*}", p, f),
                None if kind == "f" => format!("{:.6}", f),
                None => format_float(f),
            })
        }
        "d" if value.as_int().is_some() => Ok(value.as_int().unwrap_or_default().to_string()),
        "s" => Ok(value.py_str()),
        _ => Err(RuntimeError::value_error(format!(
            "Unknown format code '{}' for object of type '{}'",
            spec,
            value.type_name()
        ))),
    }
}

/// Escape a value for markup-aware formatting.
pub fn markup_text(value: &Value) -> String {
    match value {
        Value::Markup(text) => text.to_string(),
        other => html_escape(&other.py_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(binary(BinOp::Add, &2.into(), &3.into()).unwrap(), Value::Int(5));
        assert_eq!(binary(BinOp::FloorDiv, &(-7).into(), &2.into()).unwrap(), Value::Int(-4));
        assert_eq!(binary(BinOp::Mod, &(-7).into(), &2.into()).unwrap(), Value::Int(1));
        assert_eq!(binary(BinOp::Div, &7.into(), &2.into()).unwrap(), Value::Float(3.5));
        assert_eq!(binary(BinOp::Pow, &2.into(), &10.into()).unwrap(), Value::Int(1024));
        assert!(binary(BinOp::Div, &1.into(), &0.into()).is_err());
        assert!(binary(BinOp::Mul, &i64::MAX.into(), &2.into()).is_err());
    }

    #[test]
    fn test_string_operations() {
        assert_eq!(binary(BinOp::Add, &"a".into(), &"b".into()).unwrap(), Value::from("ab"));
        assert_eq!(binary(BinOp::Mul, &"ab".into(), &2.into()).unwrap(), Value::from("abab"));
        let joined = binary(BinOp::Add, &Value::markup("<b>"), &"<i>".into()).unwrap();
        assert!(matches!(joined, Value::Markup(_)));
        assert_eq!(joined.as_str(), Some("<b>&lt;i&gt;"));
        assert!(binary(BinOp::Add, &"a".into(), &1.into()).is_err());
    }

    #[test]
    fn test_percent_format() {
        let args = Value::tuple(vec!["x".into(), 2.into(), 1.5.into()]);
        assert_eq!(
            binary(BinOp::Mod, &"%s-%d-%.2f %%".into(), &args).unwrap(),
            Value::from("x-2-1.50 %")
        );
        assert!(binary(BinOp::Mod, &"%s %s".into(), &"a".into()).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert!(compare(CmpOp::Lt, &1.into(), &1.5.into()).unwrap());
        assert!(compare(CmpOp::Eq, &1.into(), &1.0.into()).unwrap());
        assert!(compare(CmpOp::In, &"b".into(), &"abc".into()).unwrap());
        assert!(compare(CmpOp::NotIn, &4.into(), &Value::list(vec![1.into()])).unwrap());
        assert!(compare(CmpOp::Is, &Value::None, &Value::None).unwrap());
        assert!(compare(CmpOp::Lt, &"a".into(), &1.into()).is_err());
        assert!(compare(
            CmpOp::Lt,
            &Value::tuple(vec![1.into(), 2.into()]),
            &Value::tuple(vec![1.into(), 3.into()])
        )
        .unwrap());
    }

    #[test]
    fn test_subscript_and_slice() {
        let list = Value::list(vec![1.into(), 2.into(), 3.into()]);
        assert_eq!(subscript(&list, &(-1).into()).unwrap(), Value::Int(3));
        assert!(subscript(&list, &3.into()).is_err());
        assert_eq!(
            slice(&list, Some(1), None, None).unwrap(),
            Value::list(vec![2.into(), 3.into()])
        );
        assert_eq!(slice(&"hello".into(), None, None, Some(-1)).unwrap(), Value::from("olleh"));
        assert_eq!(slice(&"hello".into(), Some(-3), Some(-1), None).unwrap(), Value::from("ll"));
        assert_eq!(slice(&"abc".into(), Some(1), None, Some(i64::MAX)).unwrap(), Value::from("b"));
        assert_eq!(slice(&"abc".into(), None, None, Some(i64::MIN)).unwrap(), Value::from("c"));
    }

    #[test]
    fn test_range_operations() {
        let range = Value::Range(Range::new(0, i64::MAX, 1).unwrap());
        assert_eq!(subscript(&range, &(-1).into()).unwrap(), Value::Int(i64::MAX - 1));
        assert!(contains(&range, &Value::Int(7)).unwrap());
        assert!(!contains(&range, &Value::Float(0.5)).unwrap());
        assert!(!contains(&range, &Value::from("7")).unwrap());

        let odd = Value::Range(Range::new(1, 10, 2).unwrap());
        assert_eq!(
            slice(&odd, Some(1), None, Some(2)).unwrap(),
            Value::Range(Range::new(3, 11, 4).unwrap())
        );
        assert_eq!(
            iterate(&slice(&odd, None, None, Some(-1)).unwrap()).unwrap(),
            vec![9.into(), 7.into(), 5.into(), 3.into(), 1.into()]
        );
        assert!(!slice(&odd, Some(4), Some(2), None).unwrap().truthy());
        assert_eq!(items(&range).unwrap().nth(2), Some(Value::Int(2)));
    }

    #[test]
    fn test_format_spec() {
        assert_eq!(format_spec(&Value::Float(3.14159), ".2f").unwrap(), "3.14");
        assert_eq!(format_spec(&Value::Int(3), "").unwrap(), "3");
        assert!(format_spec(&"x".into(), ".2f").is_err());
    }
}
