#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_dashpad") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "dashpad.exe" } else { "dashpad" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve dashpad binary path for integration test"),
    }
}

/// Run the binary with `home` as `$HOME` so no user config or log leaks in.
pub fn run_cli_case_in(case_name: &str, home: &Path, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, home, &[], args)
}

pub fn run_cli_case_with_env(
    case_name: &str,
    home: &Path,
    envs: &[(&str, &str)],
    args: &[&str],
) -> CmdResult {
    let root = std::env::temp_dir().join("dashpad-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    for (key, _) in std::env::vars() {
        if key.starts_with("DASHPAD_") {
            command.env_remove(key);
        }
    }
    let output = command
        .args(args)
        .env("HOME", home)
        .env("DASHPAD_LOG_ENABLED", "false")
        .env("RUST_BACKTRACE", "1")
        .envs(envs.iter().copied())
        .output()
        .expect("execute dashpad command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let home = tempfile::tempdir().expect("create temp home");
    run_cli_case_in(case_name, home.path(), args)
}

/// One list tab with a linked button and an unlinked one.
pub const SAMPLE_STATE: &str = r#"{
  "tabs": [
    {
      "color": { "type": "solid", "paletteColor": 5 },
      "tabType": "list",
      "buttons": [
        { "color": { "type": "solid", "paletteColor": 10 }, "link": "http://x" },
        { "color": { "type": "rgb", "r": 127, "g": 0, "b": 0 } }
      ]
    },
    {
      "color": { "type": "pulse", "paletteColor": 21 },
      "selectedColor": { "type": "flash", "paletteColor": 21 },
      "tabType": "list",
      "buttons": []
    }
  ]
}"#;
