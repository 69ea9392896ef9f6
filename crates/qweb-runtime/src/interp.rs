//! Tree-walking interpreter for generated programs.

use crate::builtins::{self, Builtin};
use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{Args, Callable, Chunks, Output};
use crate::ops;
use crate::program::{AssignTarget, FunctionDef, Program, Stmt, StmtKind};
use crate::value::{Dict, Value};
use qweb_expr::{BoolOp, Comprehension, Expr, Literal, Target, UnaryOp};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::ops::ControlFlow;
use std::rc::Rc;

/// Names visible to every function of a module.
#[derive(Debug, Clone)]
pub struct Globals {
    vars: FxHashMap<SmolStr, Value>,
}

impl Default for Globals {
    fn default() -> Self {
        Self::new()
    }
}

impl Globals {
    /// Globals holding the builtins.
    pub fn new() -> Self {
        let vars = Builtin::ALL
            .iter()
            .map(|builtin| (SmolStr::new(builtin.name()), Value::Builtin(*builtin)))
            .collect();
        Self { vars }
    }

    pub fn insert(&mut self, name: impl Into<SmolStr>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

/// A parsed program bound to its globals.
#[derive(Debug)]
pub struct Module {
    program: Program,
    globals: Rc<Globals>,
}

impl Module {
    pub fn new(program: Program, globals: Globals) -> Self {
        Self {
            program,
            globals: Rc::new(globals),
        }
    }

    /// A top-level function, ready to call.
    pub fn function(&self, name: &str) -> Option<Rc<Function>> {
        self.program.function(name).map(|def| {
            Rc::new(Function {
                def,
                globals: self.globals.clone(),
            })
        })
    }
}

/// A generated function.
#[derive(Debug)]
pub struct Function {
    def: Rc<FunctionDef>,
    globals: Rc<Globals>,
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn call(&self, args: Args, out: &mut dyn Output) -> RuntimeResult<ControlFlow<()>> {
        let def = &self.def;
        if !args.keywords.is_empty() || args.positional.len() != def.params.len() {
            return Err(RuntimeError::type_error(format!(
                "{}() takes {} positional arguments but {} were given",
                def.name,
                def.params.len(),
                args.len()
            )));
        }
        tracing::trace!(function = %def.name, "call");
        let locals = def.params.iter().cloned().zip(args.positional).collect();
        let mut frame = Interpreter::new(self.globals.clone(), locals);
        frame.line = def.line;
        match frame.exec_block(&def.body, out) {
            Ok(Flow::Stop) => Ok(ControlFlow::Break(())),
            Ok(_) => Ok(ControlFlow::Continue(())),
            Err(err) => Err(err.push_frame(&def.name, frame.line)),
        }
    }
}

/// A `lambda` value.
#[derive(Debug)]
pub struct Lambda {
    params: Vec<SmolStr>,
    defaults: Vec<Option<Value>>,
    body: Expr,
    captured: FxHashMap<SmolStr, Value>,
    globals: Rc<Globals>,
}

impl Lambda {
    pub fn call(&self, args: Args) -> RuntimeResult<Value> {
        if args.positional.len() > self.params.len() {
            return Err(RuntimeError::type_error(format!(
                "<lambda>() takes {} positional arguments but {} were given",
                self.params.len(),
                args.positional.len()
            )));
        }
        let mut locals = self.captured.clone();
        for (index, (name, default)) in self.params.iter().zip(&self.defaults).enumerate() {
            let value = args
                .get(index, name)
                .or(default.as_ref())
                .cloned()
                .ok_or_else(|| {
                    RuntimeError::type_error(format!(
                        "<lambda>() missing required positional argument: '{}'",
                        name
                    ))
                })?;
            locals.insert(name.clone(), value);
        }
        Interpreter::new(self.globals.clone(), locals).eval(&self.body)
    }
}

/// Call any callable value, collecting streamed output into a list.
pub fn call_value(callee: &Value, args: Args) -> RuntimeResult<Value> {
    match callee {
        Value::Builtin(builtin) => builtin.call(args),
        Value::Lambda(lambda) => lambda.call(args),
        Value::Callable(callable) => {
            let mut chunks = Chunks::default();
            callable.call(args, &mut chunks)?;
            Ok(Value::list(chunks.0))
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

/// How a block finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Continue,
    Break,
    /// The output asked to stop.
    Stop,
}

/// One executing frame.
struct Interpreter {
    globals: Rc<Globals>,
    locals: FxHashMap<SmolStr, Value>,
    line: u32,
}

impl Interpreter {
    fn new(globals: Rc<Globals>, locals: FxHashMap<SmolStr, Value>) -> Self {
        Self {
            globals,
            locals,
            line: 0,
        }
    }

    fn exec_block(&mut self, body: &[Stmt], out: &mut dyn Output) -> RuntimeResult<Flow> {
        for stmt in body {
            match self.exec(stmt, out)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, out: &mut dyn Output) -> RuntimeResult<Flow> {
        self.line = stmt.line;
        match &stmt.kind {
            StmtKind::Def(def) => {
                let function = Rc::new(Function {
                    def: def.clone(),
                    globals: self.globals.clone(),
                });
                self.locals.insert(def.name.clone(), Value::Callable(function));
            }
            StmtKind::If { branches, orelse } => {
                for (test, body) in branches {
                    if self.eval(test)?.truthy() {
                        return self.exec_block(body, out);
                    }
                    self.line = stmt.line;
                }
                return self.exec_block(orelse, out);
            }
            StmtKind::For { target, iter, body } => {
                let items = ops::items(&self.eval(iter)?)?;
                for item in items {
                    self.line = stmt.line;
                    self.bind(target, item)?;
                    match self.exec_block(body, out)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        Flow::Stop => return Ok(Flow::Stop),
                    }
                }
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            StmtKind::Yield(expr) => {
                let text = self.eval(expr)?.to_text();
                if !text.is_empty() && out.write(&text).is_break() {
                    return Ok(Flow::Stop);
                }
            }
            StmtKind::YieldFrom(expr) => return self.yield_from(expr, out),
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Pass => {}
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Break => return Ok(Flow::Break),
        }
        Ok(Flow::Normal)
    }

    /// Stream a callable's output straight into `out`.
    fn yield_from(&mut self, expr: &Expr, out: &mut dyn Output) -> RuntimeResult<Flow> {
        let value = match expr {
            Expr::Call { func, args, kwargs } if !matches!(**func, Expr::Attribute { .. }) => {
                let callee = self.eval(func)?;
                let args = self.eval_args(args, kwargs)?;
                if let Value::Callable(callable) = &callee {
                    return Ok(match callable.call(args, out)? {
                        ControlFlow::Break(()) => Flow::Stop,
                        ControlFlow::Continue(()) => Flow::Normal,
                    });
                }
                call_value(&callee, args)?
            }
            other => self.eval(other)?,
        };
        for item in ops::items(&value)? {
            let text = item.to_text();
            if !text.is_empty() && out.write(&text).is_break() {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &AssignTarget, value: Value) -> RuntimeResult<()> {
        match target {
            AssignTarget::Name(name) => {
                self.locals.insert(name.clone(), value);
            }
            AssignTarget::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                match &container {
                    Value::Dict(dict) => dict.insert(index, value)?,
                    Value::List(list) => {
                        let position = index.as_int().ok_or_else(|| {
                            RuntimeError::type_error("list indices must be integers")
                        })?;
                        list.set(position, value)?;
                    }
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "'{}' object does not support item assignment",
                            other.type_name()
                        )))
                    }
                }
            }
            AssignTarget::Tuple(targets) => {
                let items = unpack(&value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
            }
        }
        Ok(())
    }

    fn bind(&mut self, target: &Target, value: Value) -> RuntimeResult<()> {
        match target {
            Target::Name(name) => {
                self.locals.insert(name.id.clone(), value);
            }
            Target::Tuple(targets) => {
                let items = unpack(&value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.bind(target, item)?;
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        self.locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| RuntimeError::name(name))
    }

    fn eval_args(&mut self, args: &[Expr], kwargs: &[(SmolStr, Expr)]) -> RuntimeResult<Args> {
        let positional = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<RuntimeResult<Vec<_>>>()?;
        let keywords = kwargs
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.eval(value)?)))
            .collect::<RuntimeResult<Vec<_>>>()?;
        Ok(Args {
            positional,
            keywords,
        })
    }

    fn eval(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::str(s.as_str()),
            }),
            Expr::Name(name) => self.lookup(&name.id),
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items)?)),
            Expr::Dict(items) => {
                let dict = Dict::new();
                for (key, value) in items {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    dict.insert(key, value)?;
                }
                Ok(Value::Dict(dict))
            }
            Expr::Attribute { value, attr } => {
                let value = self.eval(value)?;
                match &value {
                    Value::Object(object) => object
                        .get_attr(attr)
                        .ok_or_else(|| RuntimeError::attribute(object.type_name(), attr)),
                    other => Err(RuntimeError::attribute(other.type_name(), attr)),
                }
            }
            Expr::Subscript { value, index } => {
                let value = self.eval(value)?;
                if let Expr::Slice { lower, upper, step } = index.as_ref() {
                    let lower = self.slice_bound(lower.as_deref())?;
                    let upper = self.slice_bound(upper.as_deref())?;
                    let step = self.slice_bound(step.as_deref())?;
                    return ops::slice(&value, lower, upper, step);
                }
                let index = self.eval(index)?;
                ops::subscript(&value, &index)
            }
            Expr::Slice { .. } => Err(RuntimeError::type_error("slice outside of a subscript")),
            Expr::Call { func, args, kwargs } => {
                if let Expr::Attribute { value, attr } = func.as_ref() {
                    let receiver = self.eval(value)?;
                    let args = self.eval_args(args, kwargs)?;
                    return builtins::call_method(&receiver, attr, args);
                }
                let callee = self.eval(func)?;
                let args = self.eval_args(args, kwargs)?;
                call_value(&callee, args)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => ops::negate(&value, true),
                    UnaryOp::Pos => ops::negate(&value, false),
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right)
            }
            Expr::BoolOp { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { left, ops: chain } => {
                let mut left = self.eval(left)?;
                for (op, right) in chain {
                    let right = self.eval(right)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp { test, body, orelse } => {
                if self.eval(test)?.truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Lambda { params, body } => {
                let defaults = params
                    .iter()
                    .map(|param| param.default.as_ref().map(|d| self.eval(d)).transpose())
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::Lambda(Rc::new(Lambda {
                    params: params.iter().map(|param| param.name.id.clone()).collect(),
                    defaults,
                    body: (**body).clone(),
                    captured: self.locals.clone(),
                    globals: self.globals.clone(),
                })))
            }
            Expr::ListComp {
                element,
                generators,
            } => {
                let mut items = Vec::new();
                self.comprehension(generators, &mut |frame| {
                    items.push(frame.eval(element)?);
                    Ok(())
                })?;
                Ok(Value::list(items))
            }
            Expr::DictComp {
                key,
                value,
                generators,
            } => {
                let dict = Dict::new();
                self.comprehension(generators, &mut |frame| {
                    let key = frame.eval(key)?;
                    let value = frame.eval(value)?;
                    dict.insert(key, value)
                })?;
                Ok(Value::Dict(dict))
            }
        }
    }

    fn eval_all(&mut self, items: &[Expr]) -> RuntimeResult<Vec<Value>> {
        items.iter().map(|item| self.eval(item)).collect()
    }

    fn slice_bound(&mut self, expr: Option<&Expr>) -> RuntimeResult<Option<i64>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match self.eval(expr)? {
            Value::None => Ok(None),
            value => value.as_int().map(Some).ok_or_else(|| {
                RuntimeError::type_error("slice indices must be integers or None")
            }),
        }
    }

    /// Run comprehension clauses; bound targets do not leak out.
    fn comprehension(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Interpreter) -> RuntimeResult<()>,
    ) -> RuntimeResult<()> {
        let saved = self.locals.clone();
        let result = self.run_clauses(generators, emit);
        self.locals = saved;
        result
    }

    fn run_clauses(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Interpreter) -> RuntimeResult<()>,
    ) -> RuntimeResult<()> {
        let Some((clause, rest)) = generators.split_first() else {
            return emit(self);
        };
        for item in ops::items(&self.eval(&clause.iter)?)? {
            self.bind(&clause.target, item)?;
            let mut keep = true;
            for condition in &clause.ifs {
                if !self.eval(condition)?.truthy() {
                    keep = false;
                    break;
                }
            }
            if keep {
                self.run_clauses(rest, emit)?;
            }
        }
        Ok(())
    }
}

fn unpack(value: &Value, expected: usize) -> RuntimeResult<Vec<Value>> {
    let items = ops::iterate(value)?;
    if items.len() != expected {
        return Err(RuntimeError::value_error(format!(
            "expected {} values to unpack, got {}",
            expected,
            items.len()
        )));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn run(source: &str, values: &Dict) -> RuntimeResult<String> {
        let program = Program::parse(source).unwrap();
        let module = Module::new(program, Globals::new());
        let function = module.function("main").unwrap();
        let mut out = String::new();
        function.call(Args::new(vec![Value::Dict(values.clone())]), &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_loops_and_conditions() {
        let source = "\
def main(values):
    for i, item in enumerate(values['items']):
        if i == 1:
            continue
        elif item == 'stop':
            break
        yield '{}:{} '.format(i, item)
";
        let values = Dict::new();
        values.set(
            "items",
            Value::list(vec!["a".into(), "b".into(), "c".into(), "stop".into(), "d".into()]),
        );
        assert_eq!(run(source, &values).unwrap(), "0:a 2:c ");
    }

    #[test]
    fn test_nested_function_in_expression_materializes() {
        let source = "\
def main(values):
    def inner(values):
        yield '<b>'
        yield values.get('x')
    values['out'] = Markup(''.join(inner(values)))
    yield escape(values['out'])
";
        let values = Dict::new();
        values.set("x", "<i>".into());
        assert_eq!(run(source, &values).unwrap(), "<b><i>");
    }

    #[test]
    fn test_lambda_and_comprehensions() {
        let source = "\
def main(values):
    f = lambda x, y=10: x + y + values['base']
    yield str(f(1))
    yield str([n * 2 for n in range(4) if n % 2])
    yield str({k: v for k, v in [('a', 1)]})
    yield str(sorted(['bb', 'a', 'ccc'], key=lambda s: len(s), reverse=True))
";
        let values = Dict::new();
        values.set("base", 100.into());
        assert_eq!(
            run(source, &values).unwrap(),
            "111[2, 6]{'a': 1}['ccc', 'bb', 'a']"
        );
    }

    #[test]
    fn test_huge_ranges_are_not_materialized() {
        let source = "\
def main(values):
    yield str(range(9223372036854775807)[-1])
    yield ' '
    yield str(list(range(9223372036854775806, 9223372036854775807, 2)))
    yield ' '
    for n in range(9223372036854775807):
        if n == 3:
            break
        yield str(n)
";
        assert_eq!(
            run(source, &Dict::new()).unwrap(),
            "9223372036854775806 [9223372036854775806] 012"
        );
    }

    #[test]
    fn test_comprehension_targets_do_not_leak() {
        let source = "\
def main(values):
    x = 'outer'
    y = [x for x in range(3)]
    yield x
";
        assert_eq!(run(source, &Dict::new()).unwrap(), "outer");
    }

    #[test]
    fn test_error_carries_frames() {
        let source = "\
def main(values):
    def inner(values):
        yield 'a'
        yield 1 / 0
    yield from inner(values)
";
        let err = run(source, &Dict::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ZeroDivision(_)));
        assert_eq!(
            err.trace
                .iter()
                .map(|f| (f.function.as_str(), f.line))
                .collect::<Vec<_>>(),
            vec![("inner", 4), ("main", 5)]
        );
    }

    #[test]
    fn test_missing_key_and_name() {
        let err = run("def main(values):\n    yield values['nope']\n", &Dict::new()).unwrap_err();
        assert_eq!(err.to_string(), "KeyError: 'nope'");
        let err = run("def main(values):\n    yield nope\n", &Dict::new()).unwrap_err();
        assert_eq!(err.to_string(), "NameError: name 'nope' is not defined");
    }

    #[test]
    fn test_output_can_stop_early() {
        let source = "\
def main(values):
    def inner(values):
        yield 'a'
        yield 'b'
    yield from inner(values)
    values['after'] = True
";
        let program = Program::parse(source).unwrap();
        let module = Module::new(program, Globals::new());
        let function = module.function("main").unwrap();
        let values = Dict::new();
        let mut seen = Vec::new();
        let mut sink = |chunk: &str| {
            seen.push(chunk.to_owned());
            ControlFlow::Break(())
        };
        let flow = function
            .call(Args::new(vec![Value::Dict(values.clone())]), &mut sink)
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, vec!["a"]);
        assert!(values.get_str("after").is_none());
    }

    #[test]
    fn test_tuple_unpacking_and_item_assignment() {
        let source = "\
def main(values):
    a, (b, c) = 1, (2, 3)
    d = {}
    d['k'] = [a, b, c]
    d['k'][0] = 9
    yield str(d)
";
        assert_eq!(run(source, &Dict::new()).unwrap(), "{'k': [9, 2, 3]}");
    }
}
