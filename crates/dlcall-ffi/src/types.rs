//! Calling-convention metadata for native functions.

use std::fmt;

/// Supported FFI types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfiType {
    /// 64-bit floating point (double)
    F64,
    /// 32-bit floating point (float)
    F32,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit unsigned integer
    U32,
    /// Pointer-sized unsigned integer (size_t)
    Usize,
    /// NUL-terminated byte string (const char*)
    CStr,
    /// Immutable pointer to T
    Ptr(Box<FfiType>),
    /// Mutable pointer to T
    PtrMut(Box<FfiType>),
    /// Void (for return type only)
    Void,
}

impl FfiType {
    /// Parse a type from its textual spelling.
    ///
    /// Scalar names are case-insensitive; `ptr<T>` and `ptr_mut<T>` nest.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();

        if let Some(inner) = generic_arg(&lower, "ptr_mut") {
            return Self::parse(inner).map(|t| FfiType::PtrMut(Box::new(t)));
        }
        if let Some(inner) = generic_arg(&lower, "ptr") {
            return Self::parse(inner).map(|t| FfiType::Ptr(Box::new(t)));
        }

        match lower.as_str() {
            "f64" | "double" => Some(FfiType::F64),
            "f32" | "float" => Some(FfiType::F32),
            "i32" | "int" | "int32" => Some(FfiType::I32),
            "i64" | "int64" => Some(FfiType::I64),
            "u32" | "uint32" => Some(FfiType::U32),
            "usize" | "size_t" => Some(FfiType::Usize),
            "cstr" | "char*" | "c_char_p" => Some(FfiType::CStr),
            "void" => Some(FfiType::Void),
            _ => None,
        }
    }
}

fn generic_arg<'a>(s: &'a str, head: &str) -> Option<&'a str> {
    s.strip_prefix(head)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FfiType::F64 => write!(f, "f64"),
            FfiType::F32 => write!(f, "f32"),
            FfiType::I32 => write!(f, "i32"),
            FfiType::I64 => write!(f, "i64"),
            FfiType::U32 => write!(f, "u32"),
            FfiType::Usize => write!(f, "usize"),
            FfiType::CStr => write!(f, "cstr"),
            FfiType::Ptr(inner) => write!(f, "ptr<{inner}>"),
            FfiType::PtrMut(inner) => write!(f, "ptr_mut<{inner}>"),
            FfiType::Void => write!(f, "void"),
        }
    }
}

/// A function signature for FFI calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfiSignature {
    /// Function name in the native library
    pub name: String,
    /// Argument types
    pub args: Vec<FfiType>,
    /// Return type
    pub ret: FfiType,
}

impl FfiSignature {
    /// Create a new FFI signature.
    pub fn new(name: impl Into<String>, args: Vec<FfiType>, ret: FfiType) -> Self {
        Self {
            name: name.into(),
            args,
            ret,
        }
    }

    /// Same argument and return types, regardless of name.
    pub fn matches(&self, other: &FfiSignature) -> bool {
        self.args == other.args && self.ret == other.ret
    }
}

impl fmt::Display for FfiSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: (", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
