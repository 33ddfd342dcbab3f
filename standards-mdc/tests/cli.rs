use assert_cmd::Command;
use predicates::prelude::*;
use standards_mdc::cli::{run, Cli, Commands, SyncArgs};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::{tempdir, TempDir};

const STANDARDS_PAGE: &str = r#"<html><body>
<h1>Coding standards</h1>
<h2 id="indenting">Indentation</h2>
<p>Use 2 spaces.</p>
<h2>Casting</h2>
<p>Put a space between the (type) and the $variable in a cast.</p>
<pre><code class="language-php">(int) $mynumber;</code></pre>
</body></html>"#;

/// Serves `status` and `body` to every request on a local port. Returns the page URL.
fn serve(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let reason = if status == 200 { "OK" } else { "Not Found" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}/docs/standards")
}

/// Config pointing at `url` without crawling.
fn write_config(dir: &Path, url: &str) -> PathBuf {
    let path = dir.join("standards-mdc.yaml");
    fs::write(
        &path,
        format!("source:\n  urls:\n    - {url}\n  crawl: false\n  timeout_secs: 5\n"),
    )
    .unwrap();
    path
}

fn command(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("standards-mdc").expect("Binary exists");
    cmd.current_dir(workdir.path())
        .env_remove("STANDARDS_MDC_OUTPUT_DIR")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("HTTPS_PROXY")
        .env_remove("https_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn help_lists_sync_options() {
    let workdir = tempdir().unwrap();
    command(&workdir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync").and(predicate::str::contains("--output-dir")));
}

#[test]
fn missing_config_file_fails_with_error() {
    let workdir = tempdir().unwrap();
    command(&workdir)
        .args(["sync", "--config", "missing.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[ERROR]").and(predicate::str::contains("missing.yaml")));
}

#[test]
fn unreachable_standards_page_fails_without_writing() {
    let workdir = tempdir().unwrap();
    let url = serve(404, "not here");
    let config = write_config(workdir.path(), &url);
    let output_dir = workdir.path().join("rules");

    command(&workdir)
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .arg("--output-dir")
        .arg(&output_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("[ERROR]").and(predicate::str::contains("404")));

    assert!(!output_dir.exists());
}

#[test]
fn sync_writes_rule_files_and_is_idempotent() {
    let workdir = tempdir().unwrap();
    let url = serve(200, STANDARDS_PAGE);
    let config = write_config(workdir.path(), &url);
    let output_dir = workdir.path().join(".cursor").join("rules");

    command(&workdir)
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("created  indentation.mdc")
                .and(predicate::str::contains("created  casting.mdc"))
                .and(predicate::str::contains("Fetched 1 page(s); 2 rule file(s)")),
        );

    let indentation = fs::read_to_string(output_dir.join("indentation.mdc")).unwrap();
    assert!(indentation.lines().any(|l| l == "Use 2 spaces."));
    let casting = fs::read(output_dir.join("casting.mdc")).unwrap();

    // Same markup, no subcommand: the default action is sync.
    command(&workdir)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date  casting.mdc").and(
            predicate::str::contains("(0 created, 0 updated, 2 up to date)"),
        ));

    assert_eq!(fs::read(output_dir.join("casting.mdc")).unwrap(), casting);
}

#[test]
fn sync_json_report_lists_every_rule() {
    let workdir = tempdir().unwrap();
    let url = serve(200, STANDARDS_PAGE);
    let config = write_config(workdir.path(), &url);
    let output_dir = workdir.path().join("out");

    let output = command(&workdir)
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .arg("--output-dir")
        .arg(&output_dir)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON report");
    assert_eq!(report["pages"][0], serde_json::json!(url));
    assert_eq!(report["warnings"], 0);
    let rules = report["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["title"], "Indentation");
    assert_eq!(rules[0]["filename"], "indentation.mdc");
    assert_eq!(rules[0]["outcome"], "created");
    assert!(output_dir.join("indentation.mdc").is_file());
}

#[tokio::test]
async fn run_fails_on_missing_config() {
    let cli = Cli {
        command: Some(Commands::Sync(SyncArgs {
            config: Some(PathBuf::from("definitely-missing.yaml")),
            ..SyncArgs::default()
        })),
        sync: SyncArgs::default(),
    };

    let err = run(cli).await.unwrap_err();

    assert!(err.to_string().contains("Failed to read config file"), "{err}");
}
