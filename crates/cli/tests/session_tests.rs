use std::io::Write;
use std::time::Duration;

use clap::Parser;
use quill_cli::cli_args::Args;
use quill_cli::error::Error;
use quill_cli::session::{describe_output, Session};
use quill_core::status::Status;
use tempfile::{NamedTempFile, TempDir};

const COMMANDS: &str = r#"
- name: deploy
  description: Deploy a service
  command: ["echo", "deploying", "{service}", "to", "{env}", "x{replicas}"]
  params:
    - name: service
    - name: env
      type: { name: selection, data: [dev, staging, prod] }
      default: dev
    - group: Options
      params:
        - name: replicas
          type: { name: number, min: 1, max: 9 }
          default: "1"
- name: git
  description: Git helpers
- name: git log
  command: ["git", "log", "-n", "{count}"]
  params:
    - name: count
      type: number
      default: "10"
- name: stamp
  command: ["echo", "$STAMP"]
  environment:
    STAMP: "42"
  background: true
"#;

struct Fixture {
    config: NamedTempFile,
    dir: TempDir,
}

impl Fixture {
    fn new(yaml: &str) -> Self {
        let mut config = NamedTempFile::new().unwrap();
        write!(config, "{yaml}").unwrap();
        Self {
            config,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn history_path(&self) -> String {
        self.dir.path().join("history.yml").to_str().unwrap().to_string()
    }

    fn session(&self, extra: &[&str]) -> quill_cli::error::Result<Session> {
        let config = self.config.path().to_str().unwrap().to_string();
        let history = self.history_path();
        let mut argv = vec!["ql", "-c", config.as_str(), "-l", history.as_str()];
        argv.extend_from_slice(extra);
        Session::from_args(&Args::parse_from(argv))
    }
}

fn run(session: &mut Session, line: &str) -> (bool, Option<String>) {
    let record = session
        .execute(Some(line))
        .wait_timeout(Duration::from_secs(10))
        .unwrap();
    (!record.error, describe_output(&record))
}

#[test]
fn test_defaults_fill_the_template() {
    let fixture = Fixture::new(COMMANDS);
    let mut session = fixture.session(&["--dry-run"]).unwrap();

    let (ok, text) = run(&mut session, "deploy api");
    assert!(ok);
    assert_eq!(
        text.as_deref(),
        Some("Dry run: echo deploying api to dev x1")
    );

    let (_, text) = run(&mut session, "deploy api prod --replicas 3");
    assert_eq!(
        text.as_deref(),
        Some("Dry run: echo deploying api to prod x3")
    );
}

#[test]
fn test_invalid_values_do_not_run() {
    let fixture = Fixture::new(COMMANDS);
    let mut session = fixture.session(&["--dry-run"]).unwrap();

    let (status, message) = session.check("deploy api qa");
    assert_eq!(status, Status::Error);
    assert!(message.is_some());

    let (ok, _) = run(&mut session, "deploy api --replicas 12");
    assert!(!ok);
    assert_eq!(session.check("deploy api --repl").0, Status::Incomplete);
}

#[test]
fn test_sub_commands() {
    let fixture = Fixture::new(COMMANDS);
    let mut session = fixture.session(&["--dry-run"]).unwrap();

    let (_, text) = run(&mut session, "git log 3");
    assert_eq!(text.as_deref(), Some("Dry run: git log -n 3"));

    let (ok, _) = run(&mut session, "git");
    assert!(!ok);
}

#[test]
fn test_history_is_saved_between_sessions() {
    let fixture = Fixture::new(COMMANDS);
    {
        let mut session = fixture.session(&["--dry-run"]).unwrap();
        run(&mut session, "deploy   api");
        run(&mut session, "deploy api nowhere");
    }

    let session = fixture.session(&[]).unwrap();
    assert_eq!(session.state().history_entries(), ["deploy api"]);
    assert_eq!(session.state().recall(1).as_deref(), Some("deploy api"));
}

#[test]
fn test_history_can_be_skipped() {
    let fixture = Fixture::new(COMMANDS);
    {
        let mut session = fixture.session(&["--dry-run", "--skip-history-save"]).unwrap();
        run(&mut session, "git log");
        assert_eq!(session.state().history_entries(), ["git log"]);
    }

    assert!(!std::path::Path::new(&fixture.history_path()).exists());
}

#[test]
fn test_background_command_with_environment() {
    let fixture = Fixture::new(COMMANDS);
    let mut session = fixture.session(&[]).unwrap();
    assert!(run(&mut session, "set shell /bin/sh").0);

    let (ok, text) = run(&mut session, "stamp");
    assert!(ok);
    assert_eq!(text.as_deref(), Some("42"));
}

#[test]
fn test_bad_definitions_are_reported() {
    let fixture = Fixture::new(
        r#"
- name: log
  command: ["git", "log", "-n", "{count}"]
  params:
    - name: count
      type: number
      default: lots
"#,
    );
    assert!(matches!(
        fixture.session(&[]),
        Err(Error::InvalidDefault { .. })
    ));

    let fixture = Fixture::new(
        r#"
- name: log
  command: ["git", "log", "{since}"]
"#,
    );
    assert!(matches!(
        fixture.session(&[]),
        Err(Error::NotFoundParameter(_, _))
    ));
}

#[test]
fn test_missing_config_leaves_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.yml");
    let history = dir.path().join("history.yml");
    let args = Args::parse_from([
        "ql",
        "-c",
        config.to_str().unwrap(),
        "-l",
        history.to_str().unwrap(),
    ]);
    let mut session = Session::from_args(&args).unwrap();

    let (ok, text) = run(&mut session, "help");
    assert!(ok);
    let listing = text.unwrap();
    assert!(listing.contains("help"));
    assert!(!listing.contains("deploy"));
}
