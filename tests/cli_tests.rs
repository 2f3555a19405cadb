use std::io::Write;
use std::process::{Command, Output, Stdio};

fn eventcontent(args: &[&str]) -> Output {
    run(args, None)
}

fn run(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_eventcontent"))
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("RUST_LOG")
        .env_remove("EVENTCONTENT__CONTENT__DEFAULT_TIER")
        .env_remove("EVENTCONTENT__CONTENT__DEFINITIONS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start eventcontent");

    if let Some(input) = stdin {
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
    } else {
        drop(child.stdin.take());
    }
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_tiers_lists_shipped_tiers() {
    let output = eventcontent(&["tiers"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    let names: Vec<&str> = text
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(names.len(), 13);
    assert_eq!(names[0], "RAW");
    assert_eq!(names[12], "HLTDEBUG");
    assert!(text.contains("RAWSIM"));
}

#[test]
fn test_decide_reports_deciding_rule() {
    let output = eventcontent(&[
        "decide",
        "--tier",
        "RECO",
        "recoTracks_generalTracks__RECO",
        "FEDRawDataCollection_rawDataCollector__HLT",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("keep recoTracks_generalTracks__RECO"));
    assert!(lines[0].contains("keep recoTracks_generalTracks_*_*"));
    assert!(lines[1].starts_with("drop FEDRawDataCollection_rawDataCollector__HLT"));
    assert!(lines[1].contains("(rule 0: drop *)"));
}

#[test]
fn test_select_reads_stdin() {
    let input = "recoTracks_generalTracks__RECO 1200\nSimTracks_g4SimHits__SIM 500\n";
    let output = run(&["select", "--tier", "RECOSIM"], Some(input));
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("RECOSIM: 2 kept, 0 dropped\n"));
    assert!(text.contains("1200 bytes : recoTracks_generalTracks__RECO"));
    assert!(text.contains("total kept size: 1700 bytes"));
}

#[test]
fn test_select_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "recoTracks_generalTracks__RECO 1200").unwrap();
    writeln!(file, "SimTracks_g4SimHits__SIM 500").unwrap();

    let path = file.path().to_str().unwrap();
    let output = eventcontent(&["select", "--tier", "RECO", "--input", path, "--json"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tier"], "RECO");
    assert_eq!(report["kept"].as_array().unwrap().len(), 1);
    assert_eq!(report["dropped"][0]["product"], "SimTracks_g4SimHits__SIM");
}

#[test]
fn test_describe_json_traces_origins() {
    let output = eventcontent(&["describe", "HLTDEBUG", "--json"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let traced: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let traced = traced.as_array().unwrap();
    assert_eq!(traced.len(), 5);
    assert_eq!(traced[0]["rule"], "drop *");
    assert_eq!(traced[0]["origin"]["kind"], "block");
    assert_eq!(traced[0]["origin"]["name"], "LogErrorHarvesterHead");
    assert_eq!(traced[2]["origin"]["name"], "HLTDebugOutput");
}

#[test]
fn test_validate_warns_about_resets() {
    let output = eventcontent(&["validate"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("78 blocks, 13 tiers, 1 blanket resets"));
    assert!(stderr(&output).contains("Tier 'HLTDEBUG': rule 2 from HLTDebugOutput"));
}

#[test]
fn test_unknown_tier_fails_with_cause_chain() {
    let output = eventcontent(&["decide", "--tier", "NOPE", "A_b_c_d"]);
    assert_eq!(output.status.code(), Some(1));

    let err = stderr(&output);
    assert!(err.contains("Error: Cannot select with tier 'NOPE'"));
    assert!(err.contains("caused by: Tier 'NOPE' is not defined"));
}

#[test]
fn test_missing_tier_argument() {
    let output = eventcontent(&["decide", "A_b_c_d"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No tier given"));
}

#[test]
fn test_config_file_sets_default_tier() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[content]").unwrap();
    writeln!(file, "default_tier = \"RAW\"").unwrap();

    let path = file.path().to_str().unwrap();
    let output = eventcontent(&[
        "--config",
        path,
        "decide",
        "FEDRawDataCollection_rawDataCollector__HLT",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("keep FEDRawDataCollection_rawDataCollector__HLT"));

    let output = eventcontent(&["--config", path, "config", "--json"]);
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["content"]["default_tier"], "RAW");
    assert_eq!(config["logging"]["level"], "info");
}
