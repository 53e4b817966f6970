//! Dynamic loading of native shared libraries and typed calls into them.
//!
//! A library is opened with [`NativeLibrary::load`], and its three entry
//! points are resolved into an [`EntryPoints`] that borrows the handle:
//!
//! ```no_run
//! use dlcall_ffi::{EntryPoints, NativeLibrary, Operation};
//!
//! let lib = NativeLibrary::load("target/debug/libdlcall_demo.so")?;
//! let entry = EntryPoints::bind(&lib)?;
//! entry.say_hello();
//! let q = entry.compute(2.0, 3.0, Operation::Div);
//! let mut values = vec![1.0, 2.0, 3.0];
//! entry.transform(&mut values);
//! # let _ = q;
//! # Ok::<(), dlcall_ffi::FfiError>(())
//! ```
//!
//! # Signature Files
//!
//! The calling conventions a library promises can be written down in a
//! `.ffi` file and checked before any call is made:
//!
//! ```text
//! # demo.ffi
//! say_hello: () -> void
//! compute: (f64, f64, cstr) -> f64
//! transform: (ptr_mut<f64>, usize) -> void
//! ```
//!
//! Load with [`SignatureFile::parse_file`] and bind with
//! [`EntryPoints::bind_checked`].

mod entry;
mod error;
mod library;
mod parser;
mod types;

pub use entry::{
    check_signatures, Compute, EntryPoints, Operation, SayHello, Transform, COMPUTE, SAY_HELLO,
    TRANSFORM,
};
pub use error::{FfiError, Result};
pub use library::NativeLibrary;
pub use parser::{ParseError, SignatureFile};
pub use types::{FfiSignature, FfiType};
