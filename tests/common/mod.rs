#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_fs::TempDir;
use git2::{Commit, Repository, Signature, Sort};

/// A source repository whose `step.sh` changes with every commit.
///
/// Stage commands call `sh step.sh <stage>` from the repository root, so each
/// revision decides for itself which stages succeed and what it produces.
pub struct SourceFixture {
    pub temp: TempDir,
    pub revisions: Vec<String>,
}

impl SourceFixture {
    pub fn new(scripts: &[String]) -> Self {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir(&src).unwrap();
        let repo = Repository::init(&src).unwrap();

        let revisions = scripts
            .iter()
            .enumerate()
            .map(|(i, script)| commit_step(&repo, script, &format!("step {i}")))
            .collect();

        Self { temp, revisions }
    }

    pub fn src(&self) -> PathBuf {
        self.temp.path().join("src")
    }

    pub fn dest(&self) -> PathBuf {
        self.temp.path().join("archive")
    }

    /// Adds one more revision on top of the current branch.
    pub fn push(&mut self, script: &str) -> String {
        let repo = Repository::open(self.src()).unwrap();
        let revision = commit_step(&repo, script, "follow-up");
        self.revisions.push(revision.clone());
        revision
    }

    /// Full ref name of HEAD, or the detached id.
    pub fn head(&self) -> String {
        let repo = Repository::open(self.src()).unwrap();
        let head = repo.head().unwrap();
        if head.is_branch() {
            head.name().unwrap().to_string()
        } else {
            head.target().unwrap().to_string()
        }
    }
}

/// Script that writes `content` to out.bin during the build stage.
pub fn produces(content: &str) -> String {
    format!("case \"$1\" in build) printf '%s' '{content}' > out.bin ;; esac\n")
}

/// Script whose build stage fails.
pub fn build_fails() -> String {
    "case \"$1\" in build) exit 1 ;; esac\n".to_string()
}

fn commit_step(repo: &Repository, script: &str, message: &str) -> String {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join("step.sh"), script).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("step.sh")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let signature = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
        .to_string()
}

/// Subjects of the archive log, oldest first.
pub fn archive_subjects(dest: &Path) -> Vec<String> {
    let repo = Repository::open(dest).unwrap();
    let mut walk = repo.revwalk().unwrap();
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE).unwrap();
    walk.push_head().unwrap();
    walk.map(|oid| {
        repo.find_commit(oid.unwrap())
            .unwrap()
            .summary()
            .unwrap()
            .to_string()
    })
    .collect()
}

/// File names and contents in the archive commit for `revision`.
pub fn archived_files(dest: &Path, revision: &str) -> Vec<(String, String)> {
    let repo = Repository::open(dest).unwrap();
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    let subject = format!("build_{revision}");

    for oid in walk {
        let commit = repo.find_commit(oid.unwrap()).unwrap();
        if commit.summary() != Some(subject.as_str()) {
            continue;
        }
        let tree = commit.tree().unwrap();
        return tree
            .iter()
            .map(|entry| {
                let blob = repo.find_blob(entry.id()).unwrap();
                (
                    entry.name().unwrap().to_string(),
                    String::from_utf8_lossy(blob.content()).into_owned(),
                )
            })
            .collect();
    }
    panic!("no archive commit for {revision}");
}
