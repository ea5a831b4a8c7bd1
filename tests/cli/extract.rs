use anyhow::Result;
use serde_json::{Value, json};

use crate::CliTest;

fn stdout_json(output: &std::process::Output) -> Result<Value> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

fn keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn test_text_outline() -> Result<()> {
    let test = CliTest::with_file(
        "app.py",
        r#"# Entry point.
def main():
    pass
"#,
    )?;

    let output = test.extract_command().arg("app.py").output()?;
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "app.py\n  2-3  def main\n\u{2713} Extracted 1 feature from 1 file\n"
    );

    Ok(())
}

#[test]
fn test_features_format_keeps_argument_order() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("b.py", "def b():\n    pass\n")?;
    test.write_file(
        "a.py",
        r#"class Shape:
    """A shape."""

    def area(self):
        return 0
"#,
    )?;

    let output = test
        .extract_command()
        .args(["b.py", "a.py", "b.py", "--format", "features"])
        .output()?;
    assert!(output.status.success());

    let value = stdout_json(&output)?;
    assert_eq!(keys(&value), vec!["b.py", "a.py"]);
    assert_eq!(
        value["a.py"],
        json!([
            {
                "kind": "class",
                "name": "Shape",
                "start_line": 1,
                "end_line": 5,
                "doc_text": "A shape.",
                "parent": null,
                "signature": "class Shape"
            },
            {
                "kind": "function",
                "name": "area",
                "start_line": 4,
                "end_line": 5,
                "doc_text": "",
                "parent": "Shape",
                "signature": "def area(self)"
            }
        ])
    );

    Ok(())
}

#[test]
fn test_scans_source_root_when_no_paths() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("pkg/util.py", "def helper():\n    pass\n")?;
    test.write_file("pkg/__pycache__/util.py", "def cached():\n    pass\n")?;
    test.write_file("main.py", "import pkg\n")?;
    test.write_file("README.md", "# not python\n")?;

    let output = test
        .extract_command()
        .args(["--format", "features"])
        .output()?;
    assert!(output.status.success());

    let value = stdout_json(&output)?;
    assert_eq!(keys(&value), vec!["./main.py", "./pkg/util.py"]);
    assert_eq!(value["./main.py"], json!([]));

    Ok(())
}

#[test]
fn test_source_root_and_no_recursive() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("src/top.py", "def top():\n    pass\n")?;
    test.write_file("src/nested/deep.py", "def deep():\n    pass\n")?;

    let output = test
        .extract_command()
        .args(["--source-root", "src", "--no-recursive", "--format", "features"])
        .output()?;
    assert!(output.status.success());

    let value = stdout_json(&output)?;
    let paths = keys(&value);
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with("top.py"));

    Ok(())
}

#[test]
fn test_config_ignores_test_files() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file(".featmaprc.json", r#"{ "ignoreTestFiles": true }"#)?;
    test.write_file("app.py", "def run():\n    pass\n")?;
    test.write_file("test_app.py", "def test_run():\n    pass\n")?;
    test.write_file("tests/helpers.py", "def fixture():\n    pass\n")?;

    let output = test
        .extract_command()
        .args(["--format", "features"])
        .output()?;
    assert!(output.status.success());
    assert_eq!(keys(&stdout_json(&output)?), vec!["./app.py"]);

    Ok(())
}

#[test]
fn test_unreadable_file_is_recorded() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("good.py", "def ok():\n    pass\n")?;
    test.write_bytes("bad.py", b"# caf\xe9\ndef f():\n    pass\n")?;

    let output = test
        .extract_command()
        .args(["good.py", "bad.py", "--format", "json"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let value = stdout_json(&output)?;
    assert_eq!(value["cancelled"], false);
    assert_eq!(keys(&value["files"]), vec!["good.py", "bad.py"]);
    assert_eq!(value["files"]["good.py"]["failure"], Value::Null);
    assert_eq!(value["files"]["bad.py"]["features"], json!([]));
    assert!(
        value["files"]["bad.py"]["failure"]
            .as_str()
            .unwrap()
            .contains("UTF-8")
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 file(s) could not be read"));

    Ok(())
}

#[test]
fn test_missing_explicit_path_is_recorded() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.extract_command().arg("gone.py").output()?;
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error: failed to read file"));
    assert!(stdout.contains("--> gone.py"));
    assert!(stdout.contains("(1 error, 0 warnings)"));

    Ok(())
}

#[test]
fn test_json_reports_diagnostics() -> Result<()> {
    let test = CliTest::with_file(
        "shaky.py",
        r#"class A:
    def m(self):
        pass
  def n(self):
      pass

def broken(a,
"#,
    )?;

    let output = test
        .extract_command()
        .args(["shaky.py", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let value = stdout_json(&output)?;
    let entry = &value["files"]["shaky.py"];
    let rules: Vec<&str> = entry["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["rule"].as_str().unwrap())
        .collect();
    assert_eq!(rules, vec!["ambiguous-nesting", "malformed-definition"]);

    let features = entry["features"].as_array().unwrap();
    let n = features.iter().find(|f| f["name"] == "n").unwrap();
    assert_eq!(n["flags"], json!(["ambiguous-nesting"]));
    assert_eq!(n["parent"], 0);
    let broken = features.iter().find(|f| f["name"] == "broken").unwrap();
    assert_eq!(broken["flags"], json!(["malformed-definition"]));
    assert_eq!(broken["end_line"], 7);

    Ok(())
}

#[test]
fn test_empty_source_root_is_an_error() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("notes.txt", "nothing here\n")?;

    let output = test.extract_command().output()?;
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no source files to extract"));

    Ok(())
}

#[test]
fn test_output_is_deterministic() -> Result<()> {
    let test = CliTest::new()?;
    for i in 0..8 {
        test.write_file(
            &format!("mod_{}.py", i),
            &format!("# Module {}\n\nclass C{}:\n    def run(self):\n        pass\n", i, i),
        )?;
    }

    let first = test.extract_command().args(["--format", "json"]).output()?;
    let second = test.extract_command().args(["--format", "json"]).output()?;
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    Ok(())
}

#[test]
fn test_invalid_config_is_an_error() -> Result<()> {
    let test = CliTest::with_file(".featmaprc.json", r#"{ "ignores": ["[oops"] }"#)?;
    test.write_file("app.py", "x = 1\n")?;

    let output = test.extract_command().output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ignores"));
    assert!(test.root().join("app.py").exists());

    Ok(())
}
