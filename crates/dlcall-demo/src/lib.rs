//! Native library exporting the entry points `dlcall` drives.
//!
//! Built as a `cdylib`; the exports use the C ABI and unmangled names.

use std::ffi::{c_char, c_double, CStr};

#[no_mangle]
pub extern "C" fn say_hello() {
    println!("Hello from Rust!");
}

/// # Safety
///
/// `op` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn compute(first: c_double, second: c_double, op: *const c_char) -> c_double {
    if op.is_null() {
        return 0.0;
    }
    let operation = CStr::from_ptr(op).to_string_lossy();

    match operation.as_ref() {
        "add" => first + second,
        "sub" => first - second,
        "mul" => first * second,
        "div" => first / second,
        _ => 0.0,
    }
}

/// Reverse the buffer, then add 10 to every element.
///
/// # Safety
///
/// `data` must be null or valid for reads and writes of `len` doubles.
#[no_mangle]
pub unsafe extern "C" fn transform(data: *mut c_double, len: usize) {
    if data.is_null() || len == 0 {
        return;
    }
    let values = std::slice::from_raw_parts_mut(data, len);
    values.reverse();
    values.iter_mut().for_each(|x| *x += 10.0);
}
