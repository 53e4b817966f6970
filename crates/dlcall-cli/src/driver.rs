//! The sequential driver: load, then access and call each entry point in turn.

use anyhow::{Context, Result};
use dlcall_ffi::{
    check_signatures, Compute, NativeLibrary, Operation, SayHello, SignatureFile, Transform,
    COMPUTE, SAY_HELLO, TRANSFORM,
};
use log::{debug, info, warn};
use std::io::Write;
use std::path::PathBuf;

use crate::config::CallConfig;

/// Buffer handed to `transform`: element `i` is `i + 0.1 * i + 1.2`.
pub fn initial_values(len: usize) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .with_context(|| format!("cannot allocate {len} values for {TRANSFORM}"))?;
    values.extend((0..len).map(|i| {
        let i = i as f64;
        i + 0.1 * i + 1.2
    }));
    Ok(values)
}

/// Shortest round-trip spelling of a double in Python `repr` style:
/// `42.0`, `0.6666666666666666`, `1e+16`, `1e-05`, `nan`, `inf`.
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let debug = format!("{x:?}");
    match debug.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => debug,
    }
}

// Bitwise equality, with any NaN matching any NaN.
fn results_agree(actual: f64, expected: f64) -> bool {
    actual.to_bits() == expected.to_bits() || (actual.is_nan() && expected.is_nan())
}

fn list_repr(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().copied().map(float_repr).collect();
    format!("[{}]", items.join(", "))
}

pub struct Driver {
    library_path: PathBuf,
    call: CallConfig,
    signatures: Option<SignatureFile>,
}

impl Driver {
    pub fn new(library_path: PathBuf, call: CallConfig, signatures: Option<SignatureFile>) -> Self {
        Self {
            library_path,
            call,
            signatures,
        }
    }

    /// Run every step, writing progress to `out`.
    ///
    /// Output from the native library itself goes straight to the process
    /// stdout, so `out` is flushed before each native call.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<()> {
        if let Some(declared) = &self.signatures {
            check_signatures(declared).context("library contract check failed")?;
            debug!("declared signatures match the built-in entry points");
        }

        writeln!(out)?;
        writeln!(out, "• loading {}", self.library_path.display())?;
        let library = NativeLibrary::load(&self.library_path)?;
        info!("loaded {}", library.path());

        self.say_hello(&library, out)?;
        self.compute(&library, out)?;
        self.transform(&library, out)?;

        out.flush()?;
        Ok(())
    }

    fn say_hello<W: Write>(&self, library: &NativeLibrary, out: &mut W) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "• accessing {SAY_HELLO}")?;
        let say_hello = SayHello::resolve(library)?;
        writeln!(out, "• calling {SAY_HELLO}")?;
        out.flush()?;
        say_hello.call();
        Ok(())
    }

    fn compute<W: Write>(&self, library: &NativeLibrary, out: &mut W) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "• accessing {COMPUTE}")?;
        let compute = Compute::resolve(library)?;
        writeln!(out, "• calling {COMPUTE}")?;

        let CallConfig {
            first, second, op, ..
        } = &self.call;
        writeln!(
            out,
            "• args : first = {first} , second = {second} , op = {op}"
        )?;
        out.flush()?;

        let result = match op.parse::<Operation>() {
            Ok(operation) => {
                let result = compute.call(*first, *second, operation);
                let expected = operation.apply(*first, *second);
                if !results_agree(result, expected) {
                    warn!("{COMPUTE} returned {result:?} for {operation}, expected {expected:?}");
                }
                result
            }
            Err(reason) => {
                debug!("passing raw opcode: {reason}");
                compute.call_raw(*first, *second, op)?
            }
        };
        writeln!(out, "• result = {} ", float_repr(result))?;
        Ok(())
    }

    fn transform<W: Write>(&self, library: &NativeLibrary, out: &mut W) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "• accessing {TRANSFORM}")?;
        let transform = Transform::resolve(library)?;
        writeln!(out, "• calling {TRANSFORM}")?;

        let len = self.call.len;
        let mut values = initial_values(len)?;
        writeln!(out, "• args :  values= {} , len={len}", list_repr(&values))?;
        out.flush()?;

        transform.call(&mut values);
        writeln!(out, "• after transform : values = {} ", list_repr(&values))?;
        Ok(())
    }
}
