use super::RefreshPass;
use crate::ci::CiUpdate;
use crate::config::RefreshConfig;
use crate::error::PassError;
use crate::paths::RepoPaths;
use crate::registry::{VersionResolver, VersionSource};
use crate::toolchain::Toolchain;
use crate::vcs::{ChangedPath, VersionControl};
use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

struct StaticSource {
    version: Option<&'static str>,
    calls: Rc<Cell<u32>>,
}

impl VersionSource for StaticSource {
    fn latest_version(&self, _package: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.version
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no latest tag"))
    }
}

fn resolver(version: Option<&'static str>) -> (VersionResolver, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let source = StaticSource {
        version,
        calls: Rc::clone(&calls),
    };
    (VersionResolver::new("dts-buddy", Box::new(source)), calls)
}

#[derive(Default)]
struct FakeToolchain {
    calls: RefCell<Vec<String>>,
    lock_present_at_install: Cell<bool>,
    fail_install: bool,
}

impl Toolchain for FakeToolchain {
    fn install(&self, repo: &Path) -> Result<()> {
        self.calls.borrow_mut().push("install".to_string());
        self.lock_present_at_install
            .set(repo.join("package-lock.json").exists());
        if self.fail_install {
            return Err(anyhow!("npm install failed with status 1"));
        }
        Ok(())
    }

    fn run_script(&self, _repo: &Path, script: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("run {script}"));
        Ok(())
    }
}

#[derive(Default)]
struct FakeVcs {
    changed: Vec<ChangedPath>,
    status_calls: Cell<u32>,
    commits: RefCell<Vec<(Vec<String>, String)>>,
}

impl FakeVcs {
    fn with_changes(paths: &[&str]) -> Self {
        Self {
            changed: paths.iter().map(|path| ChangedPath::from(*path)).collect(),
            ..Self::default()
        }
    }
}

impl VersionControl for FakeVcs {
    fn changed_files(&self, _repo: &Path) -> Result<Vec<ChangedPath>> {
        self.status_calls.set(self.status_calls.get() + 1);
        Ok(self.changed.clone())
    }

    fn commit(&self, _repo: &Path, files: &[String], message: &str) -> Result<()> {
        self.commits
            .borrow_mut()
            .push((files.to_vec(), message.to_string()));
        Ok(())
    }
}

const UP_TO_DATE_MANIFEST: &str = r#"{
  "name": "demo",
  "scripts": { "generate:types": "dts-buddy" },
  "devDependencies": { "dts-buddy": "^0.5.0", "typescript": "^5.4.0" }
}"#;

fn repo_with(manifest: Option<&str>, travis: Option<&str>) -> (tempfile::TempDir, RepoPaths) {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("demo");
    std::fs::create_dir(&root).expect("create repo dir");
    if let Some(manifest) = manifest {
        std::fs::write(root.join("package.json"), manifest).expect("write manifest");
    }
    if let Some(travis) = travis {
        std::fs::write(root.join(".travis.yml"), travis).expect("write CI config");
    }
    (temp, RepoPaths::new(root))
}

#[test]
fn regenerated_types_and_ci_are_committed_together() {
    let (_temp, repo) = repo_with(
        Some(r#"{"name": "demo"}"#),
        Some("language: node_js\nbefore_script:\n  - npm run lint\n"),
    );
    std::fs::write(repo.root().join("package-lock.json"), "{}").expect("write lock");
    let config = RefreshConfig::default();
    let (resolver, _) = resolver(Some("0.5.4"));
    let toolchain = FakeToolchain::default();
    let vcs = FakeVcs::with_changes(&["a.d.ts", ".travis.yml", "package.json"]);

    let outcome = RefreshPass::new(&config, &resolver, &toolchain, &vcs)
        .run(&repo)
        .expect("pass succeeds");

    assert_eq!(outcome.repo, "demo");
    assert_eq!(outcome.latest_version, "0.5.4");
    assert!(outcome.manifest.major_bump);
    assert!(outcome.changes.types_updated);
    assert!(outcome.changes.ci_updated);
    assert!(outcome.committed);
    assert!(outcome.lock_removed);
    assert!(!toolchain.lock_present_at_install.get());
    assert_eq!(
        *toolchain.calls.borrow(),
        vec!["install".to_string(), "run generate:types".to_string()]
    );
    let commits = vcs.commits.borrow();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].0, vec!["a.d.ts", ".travis.yml", "package.json"]);
    assert_eq!(commits[0].1, config.commit_message);

    let manifest = std::fs::read_to_string(repo.root().join("package.json")).expect("read");
    assert!(manifest.contains("\"dts-buddy\": \"^0.5.4\""));
}

#[test]
fn manifest_only_change_without_flags_is_not_committed() {
    let (_temp, repo) = repo_with(Some(UP_TO_DATE_MANIFEST), None);
    let config = RefreshConfig::default();
    let (resolver, _) = resolver(Some("0.5.4"));
    let toolchain = FakeToolchain::default();
    let vcs = FakeVcs::with_changes(&["package.json"]);

    let outcome = RefreshPass::new(&config, &resolver, &toolchain, &vcs)
        .run(&repo)
        .expect("pass succeeds");

    assert!(!outcome.wants_commit());
    assert!(!outcome.committed);
    assert!(vcs.commits.borrow().is_empty());
    assert_eq!(outcome.ci, CiUpdate::Missing);
    assert!(!repo.root().join(".travis.yml").exists());
    assert_eq!(toolchain.calls.borrow().len(), 2);
}

#[test]
fn unexpected_files_are_logged_and_dropped() {
    let (_temp, repo) = repo_with(Some(UP_TO_DATE_MANIFEST), None);
    let config = RefreshConfig::default();
    let (resolver, _) = resolver(Some("0.5.4"));
    let toolchain = FakeToolchain::default();
    let vcs = FakeVcs::with_changes(&["types/index.d.ts", "dist/bundle.js"]);

    let outcome = RefreshPass::new(&config, &resolver, &toolchain, &vcs)
        .run(&repo)
        .expect("pass succeeds");

    assert!(outcome.committed);
    assert_eq!(outcome.changes.unexpected, vec!["dist/bundle.js"]);
    assert_eq!(vcs.commits.borrow()[0].0, vec!["types/index.d.ts"]);
}

#[test]
fn invalid_manifest_fails_before_anything_else() {
    let travis = "before_script:\n  - npm run lint\n";
    for manifest in [None, Some("{ not json")] {
        let (_temp, repo) = repo_with(manifest, Some(travis));
        let config = RefreshConfig::default();
        let (resolver, calls) = resolver(Some("0.5.4"));
        let toolchain = FakeToolchain::default();
        let vcs = FakeVcs::default();

        let err = RefreshPass::new(&config, &resolver, &toolchain, &vcs)
            .run(&repo)
            .expect_err("manifest must be valid");

        assert!(matches!(
            err.downcast_ref::<PassError>(),
            Some(PassError::InvalidManifest { .. })
        ));
        assert!(err.to_string().contains("demo"));
        assert_eq!(calls.get(), 0);
        assert!(toolchain.calls.borrow().is_empty());
        assert_eq!(vcs.status_calls.get(), 0);
        let ci = std::fs::read_to_string(repo.root().join(".travis.yml")).expect("read");
        assert_eq!(ci, travis);
    }
}

#[test]
fn unresolvable_version_leaves_manifest_untouched() {
    let original = r#"{"name":"demo"}"#;
    let (_temp, repo) = repo_with(Some(original), None);
    let config = RefreshConfig::default();
    let (resolver, _) = resolver(None);
    let toolchain = FakeToolchain::default();
    let vcs = FakeVcs::default();

    let err = RefreshPass::new(&config, &resolver, &toolchain, &vcs)
        .run(&repo)
        .expect_err("version lookup fails");

    assert!(matches!(
        err.downcast_ref::<PassError>(),
        Some(PassError::GeneratorVersionNotFound { .. })
    ));
    let manifest = std::fs::read_to_string(repo.root().join("package.json")).expect("read");
    assert_eq!(manifest, original);
    assert!(toolchain.calls.borrow().is_empty());
}

#[test]
fn install_failure_aborts_the_pass() {
    let (_temp, repo) = repo_with(Some(UP_TO_DATE_MANIFEST), None);
    let config = RefreshConfig::default();
    let (resolver, _) = resolver(Some("0.5.4"));
    let toolchain = FakeToolchain {
        fail_install: true,
        ..FakeToolchain::default()
    };
    let vcs = FakeVcs::with_changes(&["a.d.ts"]);

    let err = RefreshPass::new(&config, &resolver, &toolchain, &vcs)
        .run(&repo)
        .expect_err("install fails");

    assert!(err.to_string().contains("npm install failed"));
    assert_eq!(*toolchain.calls.borrow(), vec!["install".to_string()]);
    assert_eq!(vcs.status_calls.get(), 0);
}

#[test]
fn one_resolver_serves_every_repository() {
    let (_first_temp, first) = repo_with(Some(UP_TO_DATE_MANIFEST), None);
    let (_second_temp, second) = repo_with(Some(r#"{"name": "other"}"#), None);
    let config = RefreshConfig::default();
    let (resolver, calls) = resolver(Some("0.5.4"));
    let toolchain = FakeToolchain::default();
    let vcs = FakeVcs::default();
    let pass = RefreshPass::new(&config, &resolver, &toolchain, &vcs);

    pass.run(&first).expect("first repo");
    pass.run(&second).expect("second repo");

    assert_eq!(calls.get(), 1);
}

#[test]
fn renamed_declarations_commit_their_source_too() {
    let (_temp, repo) = repo_with(Some(UP_TO_DATE_MANIFEST), None);
    let config = RefreshConfig::default();
    let (resolver, _) = resolver(Some("0.5.4"));
    let toolchain = FakeToolchain::default();
    let vcs = FakeVcs {
        changed: vec![ChangedPath::renamed("types/index.d.ts", "index.d.ts")],
        ..FakeVcs::default()
    };

    let outcome = RefreshPass::new(&config, &resolver, &toolchain, &vcs)
        .run(&repo)
        .expect("pass succeeds");

    assert!(outcome.committed);
    assert_eq!(
        vcs.commits.borrow()[0].0,
        vec!["types/index.d.ts", "index.d.ts"]
    );
}
