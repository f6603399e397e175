#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use stratus_core::{StackName, TemplateStore};
use stratus_synth::ProjectKind;

// Stands in for `npx cdk synth`: writes one template into `--output`,
// resolved against the directory it was started in.
const FAKE_NPX: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift ;;
  esac
  shift
done
mkdir -p "$out"
echo '{"Resources":{}}' > "$out/Net.template.json"
"#;

fn install_fake(bin: &Path, name: &str, script: &str) {
    fs::create_dir_all(bin).unwrap();
    let path = bin.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

// Changes PATH and the working directory, so it stays the only test in
// this binary.
#[tokio::test]
async fn relative_project_synthesizes_into_its_own_cdk_out() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    install_fake(&bin, "npx", FAKE_NPX);

    let work = tmp.path().join("work");
    let project = work.join("infra");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("cdk.json"), r#"{"app":"go mod download && go run ."}"#).unwrap();

    let path = std::env::var("PATH").unwrap_or_default();
    // SAFETY: no other test in this binary reads or writes the environment.
    unsafe { std::env::set_var("PATH", format!("{}:{path}", bin.display())) };
    std::env::set_current_dir(&work).unwrap();

    let assembly = stratus_synth::synthesize(Path::new("infra"), ProjectKind::Go)
        .await
        .unwrap();

    let cwd = std::env::current_dir().unwrap();
    assert_eq!(assembly.dir(), cwd.join("infra").join("cdk.out"));
    assert_eq!(
        assembly.stack_names().unwrap(),
        vec!["Net".parse::<StackName>().unwrap()]
    );
    assert!(!project.join("infra").exists());
}
