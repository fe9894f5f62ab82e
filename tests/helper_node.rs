//! Runs the injected helper under Node when it is installed.

use std::process::Command;

use lazy_import_transform::{helper::helper_source, transform, TransformOptions};

fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_node(script: &str) -> Option<String> {
    if !node_available() {
        eprintln!("node not found, skipping");
        return None;
    }
    let out = Command::new("node").arg("-e").arg(script).output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

#[test]
fn helper_retries_and_reports_each_failure() {
    let script = format!(
        r#"{helper}
let calls = 0;
const errors = [];
const load = __lazyImport(() => {{
  calls += 1;
  if (calls <= 2) return Promise.reject(new Error("fail " + calls));
  return Promise.resolve({{ default: "ok" }});
}}, {{ retries: 3, retryDelay: 0, onError: (e, n) => errors.push(n) }});
load().then((m) => console.log(JSON.stringify([m.default, calls, errors, load.isCached()])));
"#,
        helper = helper_source("__lazyImport")
    );
    let Some(out) = run_node(&script) else { return };
    assert_eq!(out, r#"["ok",3,[1,2],true]"#);
}

#[test]
fn helper_caches_per_call_site() {
    let script = format!(
        r#"{helper}
let a = 0, b = 0;
const A = __lazyImport(() => Promise.resolve(++a), {{}});
const B = __lazyImport(() => Promise.resolve(++b), {{ cache: false }});
(async () => {{
  await A(); await A(); await B(); await B();
  A.clearCache();
  const cleared = A.isCached();
  await A.preload();
  console.log(JSON.stringify([a, b, cleared, A.isCached(), B.isCached()]));
}})();
"#,
        helper = helper_source("__lazyImport")
    );
    let Some(out) = run_node(&script) else { return };
    assert_eq!(out, "[2,2,false,true,false]");
}

#[test]
fn transformed_output_is_valid_javascript() {
    let src = "import lazy from 'lazy-import';\nexport const A = lazy('./A', { retries: 1 });\nexport const B = lazy('./B');\n";
    let code = transform(src, &TransformOptions::default()).unwrap().code;
    // Drop the loader import so the unit stands alone as a script.
    let body = code
        .replace("import lazy from 'lazy-import';\n", "")
        .replace("export ", "");
    let script = format!("{body}\nconsole.log(typeof A, typeof A.preload, typeof B);\n");
    let Some(out) = run_node(&script) else { return };
    assert_eq!(out, "function function function");
}
