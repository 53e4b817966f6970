use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn platform_lib_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{name}.dylib")
    } else {
        format!("lib{name}.so")
    }
}

// The demo cdylib is a dev-dependency, so it lands next to the test binaries.
fn demo_library() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DLCALL_TEST_LIBRARY") {
        return Some(PathBuf::from(path));
    }
    let file_name = platform_lib_name("dlcall_demo");
    let mut dir = std::env::current_exe().ok()?;
    dir.pop();
    let candidates = [dir.join(&file_name), dir.parent()?.join(&file_name)];
    candidates.into_iter().find(|p| p.exists())
}

fn run_dlcall(args: &[&str]) -> Output {
    let work_dir = TempDir::new().unwrap();
    run_dlcall_in(work_dir.path(), args)
}

// Runs with a clean DLCALL_* environment and a scratch home, so no stray
// config file on the host leaks into the run.
fn run_dlcall_in(dir: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dlcall"));
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("DLCALL_") {
            cmd.env_remove(&key);
        }
    }
    cmd.args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("DLCALL_LOG_LEVEL", "error")
        .output()
        .expect("Failed to execute dlcall binary")
}

#[test]
fn test_help_command() {
    let output = run_dlcall(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("say_hello"));
    assert!(stdout.contains("--signatures"));
    assert!(stdout.contains("DLCALL_LOG_LEVEL"));
}

#[test]
fn test_version_command() {
    let output = run_dlcall(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("dlcall"));
}

#[test]
fn test_missing_argument() {
    let output = run_dlcall(&[]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_library_fails_cleanly() {
    let output = run_dlcall(&["/nonexistent/libnothing.so"]);
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("• loading /nonexistent/libnothing.so"));
    assert!(stderr.contains("failed to load library"));
}

#[test]
fn test_print_signatures() {
    let output = run_dlcall(&["--print-signatures"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("say_hello: () -> void"));
    assert!(stdout.contains("compute: (f64, f64, cstr) -> f64"));
    assert!(stdout.contains("transform: (ptr_mut<f64>, usize) -> void"));
}

#[test]
fn test_generate_config() {
    let output = run_dlcall(&["--generate-config"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[call]"));
    assert!(stdout.contains("op = \"div\""));
}

#[test]
fn test_full_run_against_demo_library() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let lib = lib.to_string_lossy().into_owned();
    let output = run_dlcall(&[&lib]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected_lines = [
        format!("• loading {lib}"),
        "• accessing say_hello".to_string(),
        "• calling say_hello".to_string(),
        "Hello from Rust!".to_string(),
        "• accessing compute".to_string(),
        "• args : first = 2 , second = 3 , op = div".to_string(),
        "• result = 0.6666666666666666 ".to_string(),
        "• accessing transform".to_string(),
        "• args :  values= [1.2, 2.3, 3.4000000000000004, 4.5, 5.6000000000000005, 6.7, 7.8, 8.9, 10.0, 11.1] , len=10".to_string(),
    ];
    for line in &expected_lines {
        assert!(stdout.contains(line.as_str()), "missing {line:?} in:\n{stdout}");
    }
    assert!(stdout.contains("• after transform : values = [21.1, 20.0, 18.9, 17.8, 16.7, 15.600000000000001, 14.5, 13.4, 12.3, 11.2] "));

    let hello = stdout.find("Hello from Rust!").unwrap();
    let calling = stdout.find("• calling say_hello").unwrap();
    let computing = stdout.find("• accessing compute").unwrap();
    assert!(calling < hello && hello < computing);
}

#[test]
fn test_run_with_flags_and_signature_file() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let sig_path = temp_dir.path().join("demo.ffi");
    fs::write(
        &sig_path,
        "# demo library\nsay_hello: () -> void\ncompute: (double, double, char*) -> double\ntransform: (ptr_mut<f64>, size_t) -> void\n",
    )
    .unwrap();

    let lib = lib.to_string_lossy().into_owned();
    let sig = sig_path.to_string_lossy().into_owned();
    let output = run_dlcall(&[
        "--signatures",
        &sig,
        "--op",
        "mul",
        "--first",
        "6",
        "--second",
        "7",
        "--len",
        "2",
        &lib,
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("• result = 42.0 "));
    assert!(stdout.contains("• args :  values= [1.2, 2.3] , len=2"));
    assert!(stdout.contains("• after transform : values = [12.3, 11.2] "));
}

#[test]
fn test_unknown_opcode_passes_through() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let lib = lib.to_string_lossy().into_owned();
    let output = run_dlcall(&["--op", "pow", &lib]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("• result = 0.0 "));
}

#[test]
fn test_mismatched_signature_file_refuses_to_call() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let sig_path = temp_dir.path().join("bad.ffi");
    fs::write(
        &sig_path,
        "say_hello: () -> void\ncompute: (f64, f64) -> f64\ntransform: (ptr_mut<f64>, usize) -> void\n",
    )
    .unwrap();

    let lib = lib.to_string_lossy().into_owned();
    let sig = sig_path.to_string_lossy().into_owned();
    let output = run_dlcall(&["--signatures", &sig, &lib]);
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stdout.contains("Hello from Rust!"));
    assert!(stderr.contains("signature mismatch for 'compute'"));
}

#[test]
fn test_config_file_supplies_arguments() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("dlcall.yaml");
    fs::write(&config_path, "call:\n  op: sub\n  first: 10\n  second: 4\n").unwrap();

    let lib = lib.to_string_lossy().into_owned();
    let config = config_path.to_string_lossy().into_owned();
    let output = run_dlcall(&["--config", &config, &lib]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("• result = 6.0 "));
}

#[test]
fn test_nan_result_prints_as_nan() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let lib = lib.to_string_lossy().into_owned();
    let output = run_dlcall(&["--first", "0", "--second", "0", &lib]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("• args : first = 0 , second = 0 , op = div"));
    assert!(stdout.contains("• result = nan "), "stdout: {stdout}");
}

#[test]
fn test_oversized_len_is_an_error_not_a_panic() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let lib = lib.to_string_lossy().into_owned();
    let output = run_dlcall(&["--len", "18446744073709551615", &lib]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot allocate"), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
}

#[test]
fn test_config_source_is_logged() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("dlcall.toml");
    fs::write(&config_path, "[call]\nop = \"add\"\n").unwrap();

    let config = config_path.to_string_lossy().into_owned();
    let output = run_dlcall(&[
        "--log-level",
        "info",
        "--config",
        &config,
        "/nonexistent/libnothing.so",
    ]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(&format!("Loaded configuration from: {config}")),
        "stderr: {stderr}"
    );
}

#[test]
fn test_config_in_working_directory_is_used() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let work_dir = TempDir::new().unwrap();
    fs::write(
        work_dir.path().join(".dlcall"),
        "[call]\nop = \"add\"\nfirst = 1.5\nsecond = 2.5\n",
    )
    .unwrap();

    let lib = lib.to_string_lossy().into_owned();
    let output = run_dlcall_in(work_dir.path(), &[&lib]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("• result = 4.0 "));

    let clean = run_dlcall(&[&lib]);
    assert!(String::from_utf8_lossy(&clean.stdout).contains("• result = 0.6666666666666666 "));
}

#[test]
fn test_relative_signatures_in_config_file() {
    let Some(lib) = demo_library() else {
        eprintln!("dlcall_demo library not built, skipping test");
        return;
    };
    let config_dir = TempDir::new().unwrap();
    fs::write(
        config_dir.path().join("demo.ffi"),
        "say_hello: () -> void\ncompute: (f64, f64, cstr) -> f64\ntransform: (ptr_mut<f64>, usize) -> void\n",
    )
    .unwrap();
    let config_path = config_dir.path().join("dlcall.toml");
    fs::write(&config_path, "[library]\nsignatures = \"demo.ffi\"\n").unwrap();

    let lib = lib.to_string_lossy().into_owned();
    let config = config_path.to_string_lossy().into_owned();
    // The child runs in a different scratch directory than the config file.
    let output = run_dlcall(&["--config", &config, &lib]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Hello from Rust!"));
}
