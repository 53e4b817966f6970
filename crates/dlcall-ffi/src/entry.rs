//! Typed bindings for the three entry points a conforming library exports.
//!
//! ```c
//! void   say_hello(void);
//! double compute(double first, double second, const char *op);
//! void   transform(double *data, size_t len);
//! ```

use libloading::Symbol;
use log::debug;
use std::ffi::{c_char, c_double, CString};
use std::fmt;
use std::str::FromStr;

use crate::error::{FfiError, Result};
use crate::library::NativeLibrary;
use crate::parser::SignatureFile;
use crate::types::{FfiSignature, FfiType};

pub const SAY_HELLO: &str = "say_hello";
pub const COMPUTE: &str = "compute";
pub const TRANSFORM: &str = "transform";

type SayHelloFn = unsafe extern "C" fn();
type ComputeFn = unsafe extern "C" fn(c_double, c_double, *const c_char) -> c_double;
type TransformFn = unsafe extern "C" fn(*mut c_double, usize);

/// Arithmetic opcode understood by `compute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Sub,
        Operation::Mul,
        Operation::Div,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Sub => "sub",
            Operation::Mul => "mul",
            Operation::Div => "div",
        }
    }

    /// Host-side evaluation, used to check what the library returned.
    pub fn apply(self, first: f64, second: f64) -> f64 {
        match self {
            Operation::Add => first + second,
            Operation::Sub => first - second,
            Operation::Mul => first * second,
            Operation::Div => first / second,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "add" => Ok(Operation::Add),
            "sub" => Ok(Operation::Sub),
            "mul" => Ok(Operation::Mul),
            "div" => Ok(Operation::Div),
            _ => Err(format!(
                "unknown operation '{s}'. Expected: add, sub, mul, div"
            )),
        }
    }
}

/// `void say_hello(void)`
pub struct SayHello<'lib>(Symbol<'lib, SayHelloFn>);

impl<'lib> SayHello<'lib> {
    pub fn resolve(library: &'lib NativeLibrary) -> Result<Self> {
        // SAFETY: matches the `say_hello` declaration in `EntryPoints::signatures`.
        unsafe { library.get_function(SAY_HELLO).map(Self) }
    }

    pub fn call(&self) {
        unsafe { (self.0)() }
    }
}

/// `double compute(double, double, const char *op)`
pub struct Compute<'lib>(Symbol<'lib, ComputeFn>);

impl<'lib> Compute<'lib> {
    pub fn resolve(library: &'lib NativeLibrary) -> Result<Self> {
        // SAFETY: matches the `compute` declaration in `EntryPoints::signatures`.
        unsafe { library.get_function(COMPUTE).map(Self) }
    }

    pub fn call(&self, first: f64, second: f64, op: Operation) -> f64 {
        let c_op = CString::new(op.as_str()).unwrap_or_default();
        unsafe { (self.0)(first, second, c_op.as_ptr()) }
    }

    /// Call with an arbitrary opcode string.
    pub fn call_raw(&self, first: f64, second: f64, op: &str) -> Result<f64> {
        let c_op = CString::new(op).map_err(|_| FfiError::InvalidArgument {
            function: COMPUTE.to_string(),
            message: format!("opcode {op:?} contains a NUL byte"),
        })?;
        Ok(unsafe { (self.0)(first, second, c_op.as_ptr()) })
    }
}

/// `void transform(double *data, size_t len)`
pub struct Transform<'lib>(Symbol<'lib, TransformFn>);

impl<'lib> Transform<'lib> {
    pub fn resolve(library: &'lib NativeLibrary) -> Result<Self> {
        // SAFETY: matches the `transform` declaration in `EntryPoints::signatures`.
        unsafe { library.get_function(TRANSFORM).map(Self) }
    }

    /// Hand `values` to the library, which rewrites it in place.
    pub fn call(&self, values: &mut [f64]) {
        debug!("transform over {} values", values.len());
        unsafe { (self.0)(values.as_mut_ptr(), values.len()) }
    }
}

/// The three resolved entry points, borrowed from a [`NativeLibrary`].
pub struct EntryPoints<'lib> {
    pub say_hello: SayHello<'lib>,
    pub compute: Compute<'lib>,
    pub transform: Transform<'lib>,
}

impl<'lib> EntryPoints<'lib> {
    /// Declared calling conventions of the entry points.
    pub fn signatures() -> SignatureFile {
        let mut file = SignatureFile::new();
        file.insert(FfiSignature::new(SAY_HELLO, vec![], FfiType::Void));
        file.insert(FfiSignature::new(
            COMPUTE,
            vec![FfiType::F64, FfiType::F64, FfiType::CStr],
            FfiType::F64,
        ));
        file.insert(FfiSignature::new(
            TRANSFORM,
            vec![FfiType::PtrMut(Box::new(FfiType::F64)), FfiType::Usize],
            FfiType::Void,
        ));
        file
    }

    /// Resolve all entry points, trusting the built-in declarations.
    pub fn bind(library: &'lib NativeLibrary) -> Result<Self> {
        Ok(Self {
            say_hello: SayHello::resolve(library)?,
            compute: Compute::resolve(library)?,
            transform: Transform::resolve(library)?,
        })
    }

    /// Resolve all entry points after checking the library's declared
    /// signatures against the built-in ones.
    pub fn bind_checked(library: &'lib NativeLibrary, declared: &SignatureFile) -> Result<Self> {
        check_signatures(declared)?;
        Self::bind(library)
    }

    pub fn say_hello(&self) {
        self.say_hello.call()
    }

    pub fn compute(&self, first: f64, second: f64, op: Operation) -> f64 {
        self.compute.call(first, second, op)
    }

    pub fn compute_raw(&self, first: f64, second: f64, op: &str) -> Result<f64> {
        self.compute.call_raw(first, second, op)
    }

    pub fn transform(&self, values: &mut [f64]) {
        self.transform.call(values)
    }
}

/// Every entry point must be declared, and declared as `signatures()` says.
pub fn check_signatures(declared: &SignatureFile) -> Result<()> {
    for expected in EntryPoints::signatures().iter() {
        let found = declared
            .get(&expected.name)
            .ok_or_else(|| FfiError::MissingSignature(expected.name.clone()))?;
        if !expected.matches(found) {
            return Err(FfiError::SignatureMismatch {
                name: expected.name.clone(),
                expected: expected.to_string(),
                declared: found.to_string(),
            });
        }
    }
    Ok(())
}
