//! Integration Tests

#[macro_use]
extern crate lazy_static;

use std::collections::HashMap;
use std::fs::{self, DirEntry};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::workdir::WorkDir;


struct ScriptData<'a> {
    pub stdout: &'a str,
    pub exit_status: i32,
}

lazy_static! {
    static ref SMALLSH_SCRIPTS_MAP: HashMap<&'static str, ScriptData<'static>> = {
        let mut map = HashMap::new();
        map.insert("simple_echo.smallsh", ScriptData { stdout: "test\n", exit_status: 0 });
        map.insert("simple_redirects.smallsh", ScriptData {
            stdout: "test output\n",
            exit_status: 0
        });
        map.insert("simple_comments.smallsh", ScriptData { stdout: "shown\n", exit_status: 0 });
        map.insert("simple_status.smallsh", ScriptData {
            stdout: "exited with 1\nexited with 0\n",
            exit_status: 0
        });
        map.insert("simple_exit_error.smallsh", ScriptData { stdout: "", exit_status: 85 });
        map.insert("simple_missing_input.smallsh", ScriptData {
            stdout: "exited with 1\n",
            exit_status: 1
        });
        map.insert("simple_exec_failure.smallsh", ScriptData {
            stdout: "exited with 2\n",
            exit_status: 2
        });
        map.insert("simple_exit_bad_argument.smallsh", ScriptData {
            stdout: "still here\n",
            exit_status: 0
        });
        map
    };
}

fn get_path_to_test_scripts() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scripts")
}

/// Does filename have an entry in SMALLSH_SCRIPTS_MAP?
fn is_simple_smallsh_script(entry: &DirEntry) -> bool {
    let filename = entry.file_name();
    let unicode_filename = filename.to_str().expect("filename should be valid Unicode");
    SMALLSH_SCRIPTS_MAP.contains_key(unicode_filename)
}

fn lines_starting_with<'a>(stdout: &'a str, prefix: &'a str) -> Vec<&'a str> {
    stdout.lines().filter(|line| line.starts_with(prefix)).collect()
}

#[test]
fn test_all_simple_smallsh_scripts() {
    let simple_scripts = get_path_to_test_scripts()
        .read_dir()
        .expect("read_dir failed")
        .map(|entry| entry.expect("directory entry"))
        .filter(is_simple_smallsh_script);

    let mut count = 0;
    for entry in simple_scripts {
        let wd = WorkDir::new("script");
        let filename = entry.file_name();
        let expected_data = &SMALLSH_SCRIPTS_MAP[filename.to_str().unwrap()];

        let o = wd.output_with_status(&mut wd.command(&[entry.path()]), expected_data.exit_status);
        assert_eq!(
            String::from_utf8_lossy(&o.stdout),
            expected_data.stdout,
            "script: {:?}",
            filename
        );
        count += 1;
    }
    assert_eq!(count, SMALLSH_SCRIPTS_MAP.len());
}

#[test]
fn test_pid_expansion() {
    let wd = WorkDir::new("pid");
    let child = wd
        .command(&["-c", "echo foo$$ $$bar"])
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let pid = child.id();
    let o = child.wait_with_output().unwrap();
    assert!(o.status.success());
    assert_eq!(
        String::from_utf8_lossy(&o.stdout),
        format!("foo{} {}bar\n", pid, pid)
    );
}

#[test]
fn test_output_redirect_creates_file() {
    let wd = WorkDir::new("redirect");
    wd.create("listed", "");
    wd.stdout(&mut wd.command(&["-c", "ls > junk.txt"]));

    let junk = wd.path().join("junk.txt");
    assert!(fs::read_to_string(&junk).unwrap().contains("listed"));
    let mode = fs::metadata(&junk).unwrap().permissions().mode() & 0o777;
    // the umask can only take bits away
    assert_eq!(mode & !0o640, 0);
    assert_eq!(mode & 0o600, 0o600);
}

#[test]
fn test_cd_builtin() {
    let wd = WorkDir::new("cd");
    let stdout = wd.stdout(&mut wd.command(&[get_path_to_test_scripts().join("simple_cd.smallsh")]));
    assert!(stdout.trim_end().ends_with("/sub"), "stdout: {}", stdout);

    wd.create("home.smallsh", "cd\npwd\n");
    let stdout = wd.stdout(wd.command(&["home.smallsh"]).env("HOME", "/"));
    assert_eq!(stdout, "/\n");
}

#[test]
fn test_background_job_is_reported_once() {
    let wd = WorkDir::new("background");
    wd.create("background.smallsh", "sleep 0 &\nsleep 1\nstatus\n");
    let stdout = wd.stdout(&mut wd.command(&["background.smallsh"]));

    let started = lines_starting_with(&stdout, "background pid is ");
    assert_eq!(started.len(), 1);
    let pid = &started[0]["background pid is ".len()..];
    assert_eq!(
        lines_starting_with(&stdout, "background pid ")
            .into_iter()
            .filter(|line| line.ends_with("is done: exit value 0"))
            .collect::<Vec<_>>(),
        vec![format!("background pid {} is done: exit value 0", pid)]
    );
    assert!(stdout.ends_with("exited with 0\n"));
}

#[test]
fn test_background_signal_termination_is_reported() {
    let wd = WorkDir::new("background-signal");
    wd.create("term.sh", "kill -TERM $$\n");
    wd.create("killed.smallsh", "sh term.sh &\nsleep 1\n");
    let o = wd.output_with_status(&mut wd.command(&["killed.smallsh"]), 0);
    let stdout = String::from_utf8_lossy(&o.stdout);

    let started = lines_starting_with(&stdout, "background pid is ");
    assert_eq!(started.len(), 1);
    let pid = &started[0]["background pid is ".len()..];
    assert!(
        stdout.contains(&format!("background pid {} is done: terminated by signal 15", pid)),
        "stdout: {}",
        stdout
    );
}

#[test]
fn test_background_streams() {
    let wd = WorkDir::new("background-streams");
    wd.create("in.txt", "from file\n");
    wd.create(
        "streams.smallsh",
        "echo leaked &\ncat < in.txt > copy.txt &\ncat &\nsleep 1\n",
    );
    let stdout = wd.stdout(&mut wd.command(&["streams.smallsh"]));

    assert!(!stdout.contains("leaked"), "stdout: {}", stdout);
    assert_eq!(lines_starting_with(&stdout, "background pid is ").len(), 3);
    // a bare cat reads /dev/null and finishes instead of waiting on the shell's stdin
    assert_eq!(
        stdout
            .lines()
            .filter(|line| line.ends_with("is done: exit value 0"))
            .count(),
        3
    );
    assert_eq!(
        fs::read_to_string(wd.path().join("copy.txt")).unwrap(),
        "from file\n"
    );
}

/// Parses the `SigIgn` mask a child reports in `/proc/self/status`.
#[cfg(target_os = "linux")]
fn ignored_signals(stdout: &str) -> u64 {
    let mask = stdout
        .lines()
        .find(|line| line.starts_with("SigIgn:"))
        .expect("SigIgn line")["SigIgn:".len()..]
        .trim();
    u64::from_str_radix(mask, 16).unwrap()
}

#[cfg(target_os = "linux")]
#[test]
fn test_children_get_default_broken_pipe_action() {
    let sigpipe = 1 << (Signal::SIGPIPE as u64 - 1);

    let wd = WorkDir::new("sigpipe");
    let stdout = wd.stdout(&mut wd.command(&["-c", "grep SigIgn /proc/self/status"]));
    assert_eq!(ignored_signals(&stdout) & sigpipe, 0);

    wd.create("background.smallsh", "grep SigIgn /proc/self/status > bg.txt &\nsleep 1\n");
    wd.stdout(&mut wd.command(&["background.smallsh"]));
    let stdout = fs::read_to_string(wd.path().join("bg.txt")).unwrap();
    assert_eq!(ignored_signals(&stdout) & sigpipe, 0);
}

#[test]
fn test_history_size_option() {
    let wd = WorkDir::new("history-size");
    let stdout = wd.stdout(&mut wd.command(&["--history-size=5", "-c", "echo ok"]));
    assert_eq!(stdout, "ok\n");

    wd.output_with_status(&mut wd.command(&["--history-size=lots", "-c", "echo ok"]), 1);
}

#[test]
fn test_job_table_full() {
    let wd = WorkDir::new("full");
    wd.create("full.smallsh", "sleep 2 &\nsleep 2 &\nsleep 2 &\n");
    let stdout = wd.stdout(&mut wd.command(&["--max-jobs=2", "full.smallsh"]));

    assert_eq!(lines_starting_with(&stdout, "background pid is ").len(), 3);
    assert_eq!(
        lines_starting_with(&stdout, "Error: "),
        vec!["Error: background array is full"]
    );
}

#[test]
fn test_interactive_prompt_and_exit() {
    let wd = WorkDir::new("interactive");
    let o = wd.interactive("echo hi\n# nothing\n\nstatus\nexit 3\necho unreachable\n");
    assert_eq!(o.status.code(), Some(3));
    assert_eq!(
        String::from_utf8_lossy(&o.stdout),
        ": hi\n: : : exited with 0\n: "
    );
}

#[test]
fn test_interactive_eof_exits() {
    let wd = WorkDir::new("eof");
    let o = wd.interactive("true\n");
    assert_eq!(o.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&o.stdout).ends_with("exit\n"));
}

#[test]
fn test_foreground_signal_is_reported_immediately() {
    let wd = WorkDir::new("signal");
    wd.create("term.sh", "kill -TERM $$\n");
    let o = wd.interactive("sh term.sh\nstatus\nexit\n");
    let stdout = String::from_utf8_lossy(&o.stdout);
    assert_eq!(
        lines_starting_with(&stdout, ": terminated by signal 15"),
        vec![": terminated by signal 15", ": terminated by signal 15"]
    );
}

#[test]
fn test_toggle_foreground_only_mode() {
    let wd = WorkDir::new("toggle");
    let mut child = wd
        .command(Vec::<&str>::new())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let shell = Pid::from_raw(child.id() as i32);
    let mut stdin = child.stdin.take().unwrap();

    // the handler has to be installed before the first delivery
    thread::sleep(Duration::from_millis(500));
    signal::kill(shell, Signal::SIGTSTP).unwrap();
    thread::sleep(Duration::from_millis(200));
    stdin.write_all(b"true &\nstatus\n").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(200));
    signal::kill(shell, Signal::SIGTSTP).unwrap();
    thread::sleep(Duration::from_millis(200));
    stdin.write_all(b"exit\n").unwrap();
    drop(stdin);

    let o = child.wait_with_output().unwrap();
    assert!(o.status.success());
    let stdout = String::from_utf8_lossy(&o.stdout);
    let entered = stdout
        .find("Entering foreground-only mode (& is now ignored)")
        .expect("enter advisory");
    let exited = stdout.find("Exiting foreground-only mode").expect("exit advisory");
    assert!(entered < exited);
    assert!(!stdout.contains("background pid is"), "stdout: {}", stdout);
    assert!(stdout.contains("exited with 0"));
}
