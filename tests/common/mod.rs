//! Shared integration test support.
//!
//! [`Vm`] runs the bytecode subset the compiler emits, directly from class
//! file bytes. It knows nothing of the JDK beyond `Object.<init>` and the
//! string constructors of the throwable classes, which is all the compiled
//! code touches unless a test calls into host classes.
//!
//! Unlike the JVM, a method must leave its operand stack empty apart from
//! the returned value; leftovers are reported as [`Trap::Leftover`].

#![allow(dead_code)]

use std::rc::Rc;
use std::sync::Once;

use rustc_hash::FxHashMap;
use sylect::compiler::CompiledClass;
use sylect::classfile::{Constant, ConstantPool, ParsedClass};
use sylect::model::parse_method_descriptor;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber filtered by `SYLECT_LOG`, once.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if let Ok(filter) = EnvFilter::try_from_env("SYLECT_LOG") {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_test_writer()
                .try_init();
        }
    });
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    Str(String),
    Ref(usize),
    /// Unset local, or the upper half of a long or double local.
    Top,
}

impl Value {
    fn is_wide(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    fn int(&self) -> Result<i32, Trap> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(Trap::Unsupported(format!("expected int, found {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trap {
    /// An exception left the invoked method.
    Thrown { class: String, message: Option<String> },
    /// The method returned with values left on its operand stack.
    Leftover { method: String, values: Vec<Value> },
    /// Something outside the interpreted subset.
    Unsupported(String),
}

struct Object {
    class: String,
    fields: FxHashMap<String, Value>,
}

const THROWABLES: [&str; 4] = [
    "java/lang/Throwable",
    "java/lang/Exception",
    "java/lang/RuntimeException",
    "java/lang/ArithmeticException",
];

pub struct Vm {
    classes: FxHashMap<String, Rc<ParsedClass>>,
    heap: Vec<Object>,
    statics: FxHashMap<(String, String), Value>,
}

impl Vm {
    pub fn new(classes: &[CompiledClass]) -> Self {
        let classes = classes
            .iter()
            .map(|class| {
                let parsed = ParsedClass::parse(&class.bytes)
                    .unwrap_or_else(|e| panic!("{} does not parse: {e}", class.name));
                (class.name.clone(), Rc::new(parsed))
            })
            .collect();
        Self {
            classes,
            heap: Vec::new(),
            statics: FxHashMap::default(),
        }
    }

    /// `new class()` through the no-argument constructor.
    pub fn instantiate(&mut self, class: &str) -> Result<Value, Trap> {
        self.construct(class, "()V", Vec::new())
    }

    /// `new class(args...)` through the constructor with `descriptor`.
    pub fn construct(
        &mut self,
        class: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<Value, Trap> {
        let object = self.alloc(class);
        let mut full = vec![object.clone()];
        full.extend(args);
        self.invoke(class, "<init>", descriptor, full)?;
        Ok(object)
    }

    /// Instance field value, if the object has been assigned one.
    pub fn field(&self, object: &Value, name: &str) -> Option<&Value> {
        match object {
            Value::Ref(index) => self.heap[*index].fields.get(name),
            _ => None,
        }
    }

    /// Invoke `class.name` with explicit arguments (receiver first for
    /// instance methods). Virtual dispatch starts at `class`.
    pub fn invoke(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Trap> {
        let Some((owner, index)) = self.find_method(class, name, descriptor) else {
            return self.invoke_host(class, name, descriptor, args);
        };
        let parsed = self.classes[&owner].clone();
        let method = &parsed.methods[index];
        let Some(code) = &method.code else {
            return Err(Trap::Unsupported(format!("{owner}.{name}{descriptor} has no code")));
        };

        let mut locals = vec![Value::Top; usize::from(code.max_locals)];
        let mut slot = 0;
        for arg in args {
            let wide = arg.is_wide();
            locals[slot] = arg;
            slot += if wide { 2 } else { 1 };
        }
        let frame = Frame {
            method: format!("{owner}.{name}{descriptor}"),
            pool: &parsed.pool,
            code: &code.code,
            locals,
            stack: Vec::new(),
        };
        frame.run(self)
    }

    fn find_method(&self, class: &str, name: &str, descriptor: &str) -> Option<(String, usize)> {
        let mut current = Some(class.to_string());
        while let Some(name_of) = current {
            let parsed = self.classes.get(&name_of)?;
            if let Some(index) = parsed
                .methods
                .iter()
                .position(|m| m.name == name && m.descriptor == descriptor)
            {
                return Some((name_of, index));
            }
            current = parsed.super_name.clone();
        }
        None
    }

    fn invoke_host(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Trap> {
        match (class, name, descriptor) {
            ("java/lang/Object", "<init>", "()V") => Ok(None),
            (class, "<init>", "(Ljava/lang/String;)V") if THROWABLES.contains(&class) => {
                if let [Value::Ref(index), message] = args.as_slice() {
                    self.heap[*index]
                        .fields
                        .insert("message".into(), message.clone());
                }
                Ok(None)
            }
            _ => Err(Trap::Unsupported(format!("host call {class}.{name}{descriptor}"))),
        }
    }

    fn alloc(&mut self, class: &str) -> Value {
        self.heap.push(Object {
            class: class.to_string(),
            fields: FxHashMap::default(),
        });
        Value::Ref(self.heap.len() - 1)
    }

    fn class_of(&self, value: &Value) -> Result<String, Trap> {
        match value {
            Value::Ref(index) => Ok(self.heap[*index].class.clone()),
            Value::Str(_) => Ok("java/lang/String".into()),
            other => Err(Trap::Unsupported(format!("no class for {other:?}"))),
        }
    }

    fn thrown(&self, value: &Value) -> Trap {
        match value {
            Value::Ref(index) => {
                let object = &self.heap[*index];
                let message = match object.fields.get("message") {
                    Some(Value::Str(s)) => Some(s.clone()),
                    _ => None,
                };
                Trap::Thrown {
                    class: object.class.clone(),
                    message,
                }
            }
            other => Trap::Unsupported(format!("athrow of {other:?}")),
        }
    }
}

fn default_value(descriptor: &str) -> Value {
    match descriptor {
        "I" | "Z" | "B" | "C" | "S" => Value::Int(0),
        "J" => Value::Long(0),
        "F" => Value::Float(0.0),
        "D" => Value::Double(0.0),
        _ => Value::Null,
    }
}

fn arithmetic_exception() -> Trap {
    Trap::Thrown {
        class: "java/lang/ArithmeticException".into(),
        message: Some("/ by zero".into()),
    }
}

/// `(owner, name, descriptor)` of a field or method reference.
fn member(pool: &ConstantPool, index: u16) -> Result<(String, String, String), Trap> {
    let bad = || Trap::Unsupported(format!("bad member reference #{index}"));
    let (class, name_and_type) = match pool.get(index) {
        Some(
            Constant::Fieldref { class, name_and_type }
            | Constant::Methodref { class, name_and_type }
            | Constant::InterfaceMethodref { class, name_and_type },
        ) => (*class, *name_and_type),
        _ => return Err(bad()),
    };
    let Some(Constant::NameAndType { name, descriptor }) = pool.get(name_and_type) else {
        return Err(bad());
    };
    Ok((
        pool.class_name_at(class).map_err(|_| bad())?.to_string(),
        pool.utf8_at(*name).map_err(|_| bad())?.to_string(),
        pool.utf8_at(*descriptor).map_err(|_| bad())?.to_string(),
    ))
}

struct Frame<'p> {
    method: String,
    pool: &'p ConstantPool,
    code: &'p [u8],
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame<'_> {
    fn pop(&mut self) -> Result<Value, Trap> {
        self.stack
            .pop()
            .ok_or_else(|| Trap::Unsupported(format!("stack underflow in {}", self.method)))
    }

    fn u1(&self, at: usize) -> u8 {
        self.code[at]
    }

    fn u2(&self, at: usize) -> u16 {
        u16::from_be_bytes([self.code[at], self.code[at + 1]])
    }

    fn branch(&self, pc: usize) -> usize {
        let offset = i16::from_be_bytes([self.code[pc + 1], self.code[pc + 2]]);
        (pc as isize + offset as isize) as usize
    }

    fn constant(&self, index: u16) -> Result<Value, Trap> {
        Ok(match self.pool.get(index) {
            Some(Constant::Integer(v)) => Value::Int(*v),
            Some(Constant::Float(v)) => Value::Float(*v),
            Some(Constant::Long(v)) => Value::Long(*v),
            Some(Constant::Double(v)) => Value::Double(*v),
            Some(Constant::String { value }) => Value::Str(
                self.pool
                    .utf8_at(*value)
                    .map_err(|e| Trap::Unsupported(e.to_string()))?
                    .to_string(),
            ),
            other => return Err(Trap::Unsupported(format!("ldc of {other:?}"))),
        })
    }

    fn finish(self, value: Option<Value>) -> Result<Option<Value>, Trap> {
        if self.stack.is_empty() {
            Ok(value)
        } else {
            Err(Trap::Leftover {
                method: self.method,
                values: self.stack,
            })
        }
    }

    fn run(mut self, vm: &mut Vm) -> Result<Option<Value>, Trap> {
        let mut pc = 0usize;
        loop {
            let op = self.u1(pc);
            let mut next = pc + 1;
            match op {
                0x01 => self.stack.push(Value::Null),
                0x02..=0x08 => self.stack.push(Value::Int(i32::from(op) - 0x03)),
                0x09 | 0x0a => self.stack.push(Value::Long(i64::from(op - 0x09))),
                0x0b..=0x0d => self.stack.push(Value::Float(f32::from(op - 0x0b))),
                0x0e | 0x0f => self.stack.push(Value::Double(f64::from(op - 0x0e))),
                0x10 => {
                    let value = i32::from(self.u1(pc + 1) as i8);
                    self.stack.push(Value::Int(value));
                    next = pc + 2;
                }
                0x11 => {
                    let value = i32::from(self.u2(pc + 1) as i16);
                    self.stack.push(Value::Int(value));
                    next = pc + 3;
                }
                0x12 => {
                    let value = self.constant(u16::from(self.u1(pc + 1)))?;
                    self.stack.push(value);
                    next = pc + 2;
                }
                0x13 | 0x14 => {
                    let value = self.constant(self.u2(pc + 1))?;
                    self.stack.push(value);
                    next = pc + 3;
                }

                // loads and stores
                0x15..=0x19 => {
                    let slot = usize::from(self.u1(pc + 1));
                    self.stack.push(self.locals[slot].clone());
                    next = pc + 2;
                }
                0x1a..=0x2d => {
                    let slot = usize::from((op - 0x1a) % 4);
                    self.stack.push(self.locals[slot].clone());
                }
                0x36..=0x3a => {
                    let slot = usize::from(self.u1(pc + 1));
                    self.store(slot)?;
                    next = pc + 2;
                }
                0x3b..=0x4e => {
                    let slot = usize::from((op - 0x3b) % 4);
                    self.store(slot)?;
                }
                0xc4 => {
                    let inner = self.u1(pc + 1);
                    let slot = usize::from(self.u2(pc + 2));
                    match inner {
                        0x15..=0x19 => self.stack.push(self.locals[slot].clone()),
                        0x36..=0x3a => self.store(slot)?,
                        other => return Err(Trap::Unsupported(format!("wide {other:#x}"))),
                    }
                    next = pc + 4;
                }

                // stack
                0x57 => {
                    self.pop()?;
                }
                0x58 => {
                    if !self.pop()?.is_wide() {
                        self.pop()?;
                    }
                }
                0x59 => {
                    let top = self.pop()?;
                    self.stack.push(top.clone());
                    self.stack.push(top);
                }
                0x5a => {
                    let v1 = self.pop()?;
                    let v2 = self.pop()?;
                    self.stack.extend([v1.clone(), v2, v1]);
                }
                0x5c => {
                    let v1 = self.pop()?;
                    if v1.is_wide() {
                        self.stack.extend([v1.clone(), v1]);
                    } else {
                        let v2 = self.pop()?;
                        self.stack.extend([v2.clone(), v1.clone(), v2, v1]);
                    }
                }
                0x5d => {
                    let v1 = self.pop()?;
                    if v1.is_wide() {
                        let v2 = self.pop()?;
                        self.stack.extend([v1.clone(), v2, v1]);
                    } else {
                        let v2 = self.pop()?;
                        let v3 = self.pop()?;
                        self.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                    }
                }
                0x5f => {
                    let v1 = self.pop()?;
                    let v2 = self.pop()?;
                    self.stack.extend([v1, v2]);
                }

                // arithmetic
                0x60..=0x73 => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(arithmetic(op, a, b)?);
                }
                0x74..=0x77 => {
                    let value = match self.pop()? {
                        Value::Int(v) => Value::Int(v.wrapping_neg()),
                        Value::Long(v) => Value::Long(v.wrapping_neg()),
                        Value::Float(v) => Value::Float(-v),
                        Value::Double(v) => Value::Double(-v),
                        other => return Err(Trap::Unsupported(format!("neg of {other:?}"))),
                    };
                    self.stack.push(value);
                }
                0x78..=0x7d => {
                    let shift = self.pop()?.int()? as u32;
                    let value = match (op, self.pop()?) {
                        (0x78, Value::Int(v)) => Value::Int(v.wrapping_shl(shift)),
                        (0x79, Value::Long(v)) => Value::Long(v.wrapping_shl(shift)),
                        (0x7a, Value::Int(v)) => Value::Int(v.wrapping_shr(shift)),
                        (0x7b, Value::Long(v)) => Value::Long(v.wrapping_shr(shift)),
                        (0x7c, Value::Int(v)) => Value::Int((v as u32).wrapping_shr(shift) as i32),
                        (0x7d, Value::Long(v)) => {
                            Value::Long((v as u64).wrapping_shr(shift) as i64)
                        }
                        (_, other) => return Err(Trap::Unsupported(format!("shift of {other:?}"))),
                    };
                    self.stack.push(value);
                }
                0x7e..=0x83 => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let which = (op - 0x7e) / 2;
                    let value = match (a, b) {
                        (Value::Int(a), Value::Int(b)) => Value::Int(match which {
                            0 => a & b,
                            1 => a | b,
                            _ => a ^ b,
                        }),
                        (Value::Long(a), Value::Long(b)) => Value::Long(match which {
                            0 => a & b,
                            1 => a | b,
                            _ => a ^ b,
                        }),
                        (a, b) => return Err(Trap::Unsupported(format!("bitwise {a:?} {b:?}"))),
                    };
                    self.stack.push(value);
                }

                // conversions
                0x85..=0x93 => {
                    let value = convert(op, self.pop()?)?;
                    self.stack.push(value);
                }

                // comparisons
                0x94..=0x98 => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let nan = if op == 0x95 || op == 0x97 { -1 } else { 1 };
                    let ordering = match (a, b) {
                        (Value::Long(a), Value::Long(b)) => Some(a.cmp(&b)),
                        (Value::Float(a), Value::Float(b)) => a.partial_cmp(&b),
                        (Value::Double(a), Value::Double(b)) => a.partial_cmp(&b),
                        (a, b) => return Err(Trap::Unsupported(format!("compare {a:?} {b:?}"))),
                    };
                    self.stack
                        .push(Value::Int(ordering.map_or(nan, |o| o as i32)));
                }
                0x99..=0x9e => {
                    let v = self.pop()?.int()?;
                    if compare(op - 0x99, v, 0) {
                        next = self.branch(pc);
                    } else {
                        next = pc + 3;
                    }
                }
                0x9f..=0xa4 => {
                    let b = self.pop()?.int()?;
                    let a = self.pop()?.int()?;
                    if compare(op - 0x9f, a, b) {
                        next = self.branch(pc);
                    } else {
                        next = pc + 3;
                    }
                }
                0xa5 | 0xa6 => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    if (a == b) == (op == 0xa5) {
                        next = self.branch(pc);
                    } else {
                        next = pc + 3;
                    }
                }
                0xc6 | 0xc7 => {
                    let is_null = self.pop()? == Value::Null;
                    if is_null == (op == 0xc6) {
                        next = self.branch(pc);
                    } else {
                        next = pc + 3;
                    }
                }
                0xa7 => next = self.branch(pc),

                // returns
                0xac..=0xb0 => {
                    let value = self.pop()?;
                    return self.finish(Some(value));
                }
                0xb1 => return self.finish(None),

                // fields
                0xb2..=0xb5 => {
                    let (owner, name, descriptor) = member(self.pool, self.u2(pc + 1))?;
                    match op {
                        0xb2 => {
                            let value = vm
                                .statics
                                .get(&(owner, name))
                                .cloned()
                                .unwrap_or_else(|| default_value(&descriptor));
                            self.stack.push(value);
                        }
                        0xb3 => {
                            let value = self.pop()?;
                            vm.statics.insert((owner, name), value);
                        }
                        0xb4 => {
                            let Value::Ref(index) = self.pop()? else {
                                return Err(Trap::Unsupported("getfield on non-object".into()));
                            };
                            let value = vm.heap[index]
                                .fields
                                .get(&name)
                                .cloned()
                                .unwrap_or_else(|| default_value(&descriptor));
                            self.stack.push(value);
                        }
                        _ => {
                            let value = self.pop()?;
                            let Value::Ref(index) = self.pop()? else {
                                return Err(Trap::Unsupported("putfield on non-object".into()));
                            };
                            vm.heap[index].fields.insert(name, value);
                        }
                    }
                    next = pc + 3;
                }

                // invocation
                0xb6..=0xb9 => {
                    let (owner, name, descriptor) = member(self.pool, self.u2(pc + 1))?;
                    let (params, return_type) = parse_method_descriptor(&descriptor)
                        .ok_or_else(|| Trap::Unsupported(format!("descriptor {descriptor}")))?;
                    let count = params.len() + usize::from(op != 0xb8);
                    if self.stack.len() < count {
                        return Err(Trap::Unsupported(format!("stack underflow calling {name}")));
                    }
                    let args = self.stack.split_off(self.stack.len() - count);
                    let target = if op == 0xb6 || op == 0xb9 {
                        vm.class_of(&args[0])?
                    } else {
                        owner
                    };
                    let result = vm.invoke(&target, &name, &descriptor, args)?;
                    if !return_type.is_void() {
                        let value = result.ok_or_else(|| {
                            Trap::Unsupported(format!("{name} returned nothing"))
                        })?;
                        self.stack.push(value);
                    }
                    next = pc + if op == 0xb9 { 5 } else { 3 };
                }

                // objects
                0xbb => {
                    let class = self
                        .pool
                        .class_name_at(self.u2(pc + 1))
                        .map_err(|e| Trap::Unsupported(e.to_string()))?
                        .to_string();
                    let object = vm.alloc(&class);
                    self.stack.push(object);
                    next = pc + 3;
                }
                0xbf => {
                    let value = self.pop()?;
                    return Err(vm.thrown(&value));
                }
                0xc0 => next = pc + 3,

                other => {
                    return Err(Trap::Unsupported(format!(
                        "opcode {other:#x} at {pc} in {}",
                        self.method
                    )));
                }
            }
            pc = next;
        }
    }

    fn store(&mut self, slot: usize) -> Result<(), Trap> {
        let value = self.pop()?;
        if value.is_wide() {
            self.locals[slot + 1] = Value::Top;
        }
        self.locals[slot] = value;
        Ok(())
    }
}

/// `eq ne lt ge gt le`, in opcode order.
fn compare(condition: u8, a: i32, b: i32) -> bool {
    match condition {
        0 => a == b,
        1 => a != b,
        2 => a < b,
        3 => a >= b,
        4 => a > b,
        _ => a <= b,
    }
}

/// `add sub mul div rem` over `int long float double`, in opcode order.
fn arithmetic(op: u8, a: Value, b: Value) -> Result<Value, Trap> {
    let which = (op - 0x60) / 4;
    Ok(match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            if which >= 3 && b == 0 {
                return Err(arithmetic_exception());
            }
            Value::Int(match which {
                0 => a.wrapping_add(b),
                1 => a.wrapping_sub(b),
                2 => a.wrapping_mul(b),
                3 => a.wrapping_div(b),
                _ => a.wrapping_rem(b),
            })
        }
        (Value::Long(a), Value::Long(b)) => {
            if which >= 3 && b == 0 {
                return Err(arithmetic_exception());
            }
            Value::Long(match which {
                0 => a.wrapping_add(b),
                1 => a.wrapping_sub(b),
                2 => a.wrapping_mul(b),
                3 => a.wrapping_div(b),
                _ => a.wrapping_rem(b),
            })
        }
        (Value::Float(a), Value::Float(b)) => Value::Float(match which {
            0 => a + b,
            1 => a - b,
            2 => a * b,
            3 => a / b,
            _ => a % b,
        }),
        (Value::Double(a), Value::Double(b)) => Value::Double(match which {
            0 => a + b,
            1 => a - b,
            2 => a * b,
            3 => a / b,
            _ => a % b,
        }),
        (a, b) => {
            return Err(Trap::Unsupported(format!(
                "arithmetic {op:#x} on {a:?} and {b:?}"
            )));
        }
    })
}

fn convert(op: u8, value: Value) -> Result<Value, Trap> {
    Ok(match (op, value) {
        (0x85, Value::Int(v)) => Value::Long(i64::from(v)),
        (0x86, Value::Int(v)) => Value::Float(v as f32),
        (0x87, Value::Int(v)) => Value::Double(f64::from(v)),
        (0x88, Value::Long(v)) => Value::Int(v as i32),
        (0x89, Value::Long(v)) => Value::Float(v as f32),
        (0x8a, Value::Long(v)) => Value::Double(v as f64),
        (0x8b, Value::Float(v)) => Value::Int(v as i32),
        (0x8c, Value::Float(v)) => Value::Long(v as i64),
        (0x8d, Value::Float(v)) => Value::Double(f64::from(v)),
        (0x8e, Value::Double(v)) => Value::Int(v as i32),
        (0x8f, Value::Double(v)) => Value::Long(v as i64),
        (0x90, Value::Double(v)) => Value::Float(v as f32),
        (0x91, Value::Int(v)) => Value::Int(i32::from(v as i8)),
        (0x92, Value::Int(v)) => Value::Int(i32::from(v as u16)),
        (0x93, Value::Int(v)) => Value::Int(i32::from(v as i16)),
        (op, other) => return Err(Trap::Unsupported(format!("conversion {op:#x} of {other:?}"))),
    })
}
