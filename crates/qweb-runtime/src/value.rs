//! Dynamic values manipulated by generated code.

use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{Callable, Object};
use indexmap::IndexMap;
use qweb_expr::string_literal;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Text that is already safe for HTML output.
    Markup(Rc<str>),
    List(List),
    Tuple(Rc<[Value]>),
    /// An arithmetic progression, produced lazily.
    Range(Range),
    Dict(Dict),
    /// A runtime builtin function.
    Builtin(crate::builtins::Builtin),
    /// A lambda closed over its defining locals.
    Lambda(Rc<crate::interp::Lambda>),
    /// Something that streams output when called.
    Callable(Rc<dyn Callable>),
    /// A host object exposing attributes and methods.
    Object(Rc<dyn Object>),
}

impl Value {
    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Self::Str(text.into())
    }

    pub fn markup(text: impl Into<Rc<str>>) -> Self {
        Self::Markup(text.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self::List(List::new(items))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Self::Tuple(items.into())
    }

    /// Python type name, used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Markup(_) => "Markup",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Range(_) => "range",
            Self::Dict(_) => "dict",
            Self::Builtin(_) => "builtin_function_or_method",
            Self::Lambda(_) => "function",
            Self::Callable(_) => "function",
            Self::Object(object) => object.type_name(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// `True` for `str` and `Markup`.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Str(_) | Self::Markup(_))
    }

    /// Borrow the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) | Self::Markup(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Integer view of `bool` and `int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(*b as i64),
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float view of any number.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(*b as i64 as f64),
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Python truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) | Self::Markup(s) => !s.is_empty(),
            Self::List(list) => !list.borrow().is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::Range(range) => !range.is_empty(),
            Self::Dict(dict) => !dict.is_empty(),
            Self::Object(object) => object.truthy(),
            Self::Builtin(_) | Self::Lambda(_) | Self::Callable(_) => true,
        }
    }

    /// Check if the value can be used as a dict key.
    pub fn is_hashable(&self) -> bool {
        match self {
            Self::List(_) | Self::Dict(_) => false,
            Self::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Length of sized values.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Str(s) | Self::Markup(s) => Some(s.chars().count()),
            Self::List(list) => Some(list.borrow().len()),
            Self::Tuple(items) => Some(items.len()),
            Self::Range(range) => usize::try_from(range.len()).ok(),
            Self::Dict(dict) => Some(dict.len()),
            Self::Object(object) => object.len(),
            _ => None,
        }
    }

    /// Text used when the value is written to the output.
    ///
    /// `None` and `False` render as nothing.
    pub fn to_text(&self) -> String {
        match self {
            Self::None | Self::Bool(false) => String::new(),
            other => other.py_str(),
        }
    }

    /// Python `str()`.
    pub fn py_str(&self) -> String {
        match self {
            Self::Str(s) | Self::Markup(s) => s.to_string(),
            Self::Object(object) => object.to_text(),
            other => other.repr(),
        }
    }

    /// Python `repr()`.
    pub fn repr(&self) -> String {
        match self {
            Self::None => "None".into(),
            Self::Bool(true) => "True".into(),
            Self::Bool(false) => "False".into(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Str(s) => string_literal(s),
            Self::Markup(s) => format!("Markup({})", string_literal(s)),
            Self::List(list) => format!("[{}]", join_repr(list.borrow().iter())),
            Self::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Self::Tuple(items) => format!("({})", join_repr(items.iter())),
            Self::Range(range) if range.step == 1 => format!("range({}, {})", range.start, range.stop),
            Self::Range(range) => format!("range({}, {}, {})", range.start, range.stop, range.step),
            Self::Dict(dict) => {
                let items: Vec<String> = dict
                    .items()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Self::Builtin(builtin) => format!("<built-in function {}>", builtin.name()),
            Self::Lambda(_) => "<function <lambda>>".into(),
            Self::Callable(callable) => format!("<function {}>", callable.name()),
            Self::Object(object) => format!("<{}>", object.type_name()),
        }
    }

    /// Identity comparison (`is`).
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            (Self::Dict(a), Self::Dict(b)) => a.ptr_eq(b),
            (Self::Tuple(a), Self::Tuple(b)) => Rc::ptr_eq(a, b),
            (Self::Range(a), Self::Range(b)) => a == b,
            (Self::Lambda(a), Self::Lambda(b)) => Rc::ptr_eq(a, b),
            (Self::Callable(a), Self::Callable(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::None, Self::None) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) | (Self::Markup(a), Self::Markup(b)) => a == b,
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

fn join_repr<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items.map(Value::repr).collect::<Vec<_>>().join(", ")
}

/// Format a float the way Python's `repr` does.
///
/// Shortest round-trip digits, in positional notation for decimal
/// exponents from -4 up to 15 and in `1e+20` style otherwise.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".into();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let scientific = format!("{:e}", f);
    let exponent = scientific
        .split_once('e')
        .and_then(|(_, exponent)| exponent.parse::<i32>().ok())
        .unwrap_or(0);
    if (-4..16).contains(&exponent) {
        let positional = f.to_string();
        if positional.contains('.') {
            positional
        } else {
            format!("{}.0", positional)
        }
    } else {
        let mantissa = scientific.split('e').next().unwrap_or_default();
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a) | Self::Markup(a), Self::Str(b) | Self::Markup(b)) => a == b,
            (Self::List(a), Self::List(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Range(a), Self::Range(b)) => a.normalized() == b.normalized(),
            (Self::Dict(a), Self::Dict(b)) => a.ptr_eq(b) || a.items() == b.items(),
            (Self::Float(_), _) | (_, Self::Float(_)) => match (self.as_float(), other.as_float()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            (Self::Bool(_) | Self::Int(_), Self::Bool(_) | Self::Int(_)) => {
                self.as_int() == other.as_int()
            }
            _ => self.is_same(other),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::None => 0u8.hash(state),
            Self::Bool(_) | Self::Int(_) => self.as_int().hash(state),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => Some(*f as i64).hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Str(s) | Self::Markup(s) => s.hash(state),
            Self::Tuple(items) => items.hash(state),
            Self::Range(range) => range.normalized().hash(state),
            Self::List(list) => Rc::as_ptr(&list.0).hash(state),
            Self::Dict(dict) => Rc::as_ptr(&dict.0).hash(state),
            Self::Builtin(builtin) => builtin.hash(state),
            Self::Lambda(lambda) => Rc::as_ptr(lambda).hash(state),
            Self::Callable(callable) => (Rc::as_ptr(callable) as *const ()).hash(state),
            Self::Object(object) => (Rc::as_ptr(object) as *const ()).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.py_str())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::list(value)
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Self::Dict(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

#[cfg(feature = "json")]
impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::str(s.as_str()),
            serde_json::Value::Array(items) => Self::list(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                let dict = Dict::new();
                for (key, value) in map {
                    dict.set(key, value.into());
                }
                Self::Dict(dict)
            }
        }
    }
}

/// A shared mutable list.
#[derive(Debug, Clone, Default)]
pub struct List(Rc<RefCell<Vec<Value>>>);

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    pub fn extend(&self, values: Vec<Value>) {
        self.0.borrow_mut().extend(values);
    }

    /// Replace an item; negative indices count from the end.
    pub fn set(&self, index: i64, value: Value) -> RuntimeResult<()> {
        let mut items = self.0.borrow_mut();
        let len = items.len() as i64;
        let position = if index < 0 { index + len } else { index };
        if position < 0 || position >= len {
            return Err(RuntimeError::index("list assignment index out of range"));
        }
        items[position as usize] = value;
        Ok(())
    }

    /// Snapshot of the items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Python's `range`: `start`, `stop` and a non-zero `step`.
///
/// Items are computed on demand, so a range never holds its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    /// Create a range; `None` when `step` is zero.
    pub fn new(start: i64, stop: i64, step: i64) -> Option<Self> {
        (step != 0).then_some(Self { start, stop, step })
    }

    /// Number of items. Wider than `i64` because `range(i64::MIN, i64::MAX)` is valid.
    pub fn len(&self) -> u64 {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let len = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / -step + 1
        } else {
            0
        };
        len as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`; negative indices count from the end.
    pub fn get(&self, index: i64) -> Option<i64> {
        let len = self.len() as i128;
        let index = index as i128;
        let position = if index < 0 { index + len } else { index };
        if position < 0 || position >= len {
            return None;
        }
        i64::try_from(self.start as i128 + position * self.step as i128).ok()
    }

    pub fn contains(&self, value: i64) -> bool {
        let offset = value as i128 - self.start as i128;
        let in_bounds = if self.step > 0 {
            value >= self.start && value < self.stop
        } else {
            value <= self.start && value > self.stop
        };
        in_bounds && offset % self.step as i128 == 0
    }

    /// Items in order. Stops instead of overflowing past `i64::MAX`.
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let Range { start, stop, step } = *self;
        std::iter::successors(Some(start), move |i| i.checked_add(step))
            .take_while(move |i| if step > 0 { *i < stop } else { *i > stop })
    }

    /// Ranges with the same items compare equal regardless of bounds.
    fn normalized(&self) -> (u64, i64, i64) {
        match self.len() {
            0 => (0, 0, 0),
            1 => (1, self.start, 0),
            len => (len, self.start, self.step),
        }
    }
}

#[derive(Debug, Default)]
struct DictInner {
    map: RefCell<IndexMap<Value, Value>>,
    frozen: bool,
}

/// A shared, insertion-ordered mapping.
///
/// A frozen dict rejects every mutation.
#[derive(Debug, Clone, Default)]
pub struct Dict(Rc<DictInner>);

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a read-only dict.
    pub fn frozen(map: IndexMap<Value, Value>) -> Self {
        Self(Rc::new(DictInner {
            map: RefCell::new(map),
            frozen: true,
        }))
    }

    pub fn from_map(map: IndexMap<Value, Value>) -> Self {
        Self(Rc::new(DictInner {
            map: RefCell::new(map),
            frozen: false,
        }))
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen
    }

    pub fn len(&self) -> usize {
        self.0.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.map.borrow().get(key).cloned()
    }

    /// Look up a string key.
    pub fn get_str(&self, key: &str) -> Option<Value> {
        self.get(&Value::str(key))
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.0.map.borrow().contains_key(key)
    }

    /// Insert, checking that the dict is mutable and the key hashable.
    pub fn insert(&self, key: Value, value: Value) -> RuntimeResult<()> {
        self.check_mutable()?;
        if !key.is_hashable() {
            return Err(RuntimeError::type_error(format!(
                "unhashable type: '{}'",
                key.type_name()
            )));
        }
        self.0.map.borrow_mut().insert(key, value);
        Ok(())
    }

    /// Insert under a string key. Ignored on a frozen dict.
    pub fn set(&self, key: &str, value: Value) {
        if !self.0.frozen {
            self.0.map.borrow_mut().insert(Value::str(key), value);
        }
    }

    pub fn remove(&self, key: &Value) -> RuntimeResult<Option<Value>> {
        self.check_mutable()?;
        Ok(self.0.map.borrow_mut().shift_remove(key))
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.map.borrow().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.map.borrow().values().cloned().collect()
    }

    pub fn items(&self) -> Vec<(Value, Value)> {
        self.0
            .map
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Shallow, mutable copy.
    pub fn copy(&self) -> Dict {
        Dict::from_map(self.0.map.borrow().clone())
    }

    /// Merge `other` into this dict.
    pub fn update(&self, other: &Dict) -> RuntimeResult<()> {
        self.check_mutable()?;
        let items = other.items();
        self.0.map.borrow_mut().extend(items);
        Ok(())
    }

    pub fn ptr_eq(&self, other: &Dict) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn check_mutable(&self) -> RuntimeResult<()> {
        if self.0.frozen {
            Err(RuntimeError::type_error(
                "'frozendict' object does not support item assignment",
            ))
        } else {
            Ok(())
        }
    }
}

impl FromIterator<(Value, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Dict::from_map(iter.into_iter().collect())
    }
}

/// Escape text for HTML the way `markupsafe` does.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Convert to safe markup, escaping anything that is not markup already.
pub fn escape(value: &Value) -> Value {
    match value {
        Value::Markup(_) => value.clone(),
        other => Value::markup(html_escape(&other.to_text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::Int(-1).truthy());
        assert!(!Value::list(vec![]).truthy());
        assert!(Value::tuple(vec![Value::None]).truthy());
    }

    #[test]
    fn test_numeric_equality_and_hash() {
        let dict = Dict::new();
        dict.insert(Value::Int(1), "one".into()).unwrap();
        assert_eq!(dict.get(&Value::Float(1.0)), Some(Value::from("one")));
        assert_eq!(dict.get(&Value::Bool(true)), Some(Value::from("one")));
        assert_eq!(Value::str("a"), Value::markup("a"));
    }

    #[test]
    fn test_unhashable_key() {
        let err = Dict::new().insert(Value::list(vec![]), Value::None).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
    }

    #[test]
    fn test_frozen_dict() {
        let dict = Dict::frozen(IndexMap::new());
        assert!(dict.insert("a".into(), Value::None).is_err());
        dict.set("a", Value::None);
        assert!(dict.is_empty());
        assert!(!dict.copy().is_frozen());
    }

    #[test]
    fn test_text_conversions() {
        assert_eq!(Value::None.to_text(), "");
        assert_eq!(Value::Bool(false).to_text(), "");
        assert_eq!(Value::Bool(true).to_text(), "True");
        assert_eq!(Value::Float(2.0).to_text(), "2.0");
        assert_eq!(Value::Float(0.5).to_text(), "0.5");
        assert_eq!(Value::Float(1e20).to_text(), "1e+20");
        assert_eq!(Value::Float(1e-5).to_text(), "1e-05");
        assert_eq!(Value::Float(-1.5e-7).to_text(), "-1.5e-07");
        assert_eq!(Value::Float(1.2345e16).to_text(), "1.2345e+16");
        assert_eq!(Value::Float(1e15).to_text(), "1000000000000000.0");
        assert_eq!(Value::Float(0.0001).to_text(), "0.0001");
        assert_eq!(Value::Float(-0.0).to_text(), "-0.0");
        assert_eq!(
            Value::list(vec![1.into(), "a".into(), Value::None]).to_text(),
            "[1, 'a', None]"
        );
        assert_eq!(Value::tuple(vec![1.into()]).repr(), "(1,)");
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(&Value::str("<a href=\"x\">&'")).as_str(),
            Some("&lt;a href=&#34;x&#34;&gt;&amp;&#39;")
        );
        assert_eq!(escape(&Value::markup("<b>")).as_str(), Some("<b>"));
        assert_eq!(escape(&Value::None).as_str(), Some(""));
    }

    #[test]
    fn test_range_is_lazy() {
        let huge = Range::new(0, i64::MAX, 1).unwrap();
        assert_eq!(huge.len(), i64::MAX as u64);
        assert_eq!(huge.get(-1), Some(i64::MAX - 1));
        assert!(huge.contains(42));

        let tail = Range::new(i64::MAX - 1, i64::MAX, 2).unwrap();
        assert_eq!(tail.iter().collect::<Vec<_>>(), vec![i64::MAX - 1]);
        assert_eq!(Range::new(5, 0, -2).unwrap().iter().collect::<Vec<_>>(), vec![5, 3, 1]);
        assert!(Range::new(0, 1, 0).is_none());
    }

    #[test]
    fn test_range_equality_and_repr() {
        let a = Value::Range(Range::new(0, 3, 1).unwrap());
        let b = Value::Range(Range::new(0, 4, 3).unwrap());
        let c = Value::Range(Range::new(0, 3, 3).unwrap());
        assert_eq!(b, Value::Range(Range::new(0, 6, 3).unwrap()));
        assert_eq!(c, Value::Range(Range::new(0, 1, 5).unwrap()));
        assert!(a != b);
        assert_eq!(a.repr(), "range(0, 3)");
        assert_eq!(b.repr(), "range(0, 4, 3)");
        assert!(!Value::Range(Range::new(3, 3, 1).unwrap()).truthy());
    }

    #[test]
    fn test_dict_preserves_order() {
        let dict = Dict::new();
        dict.set("b", 1.into());
        dict.set("a", 2.into());
        dict.set("b", 3.into());
        assert_eq!(dict.keys(), vec![Value::from("b"), Value::from("a")]);
        assert_eq!(Value::Dict(dict).repr(), "{'b': 3, 'a': 2}");
    }
}
