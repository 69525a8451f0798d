//! Test fixtures: local bare remotes built directly with libgit2.

use std::path::Path;

use git2::{Commit, Oid, Repository, Signature};

const MASTER: &str = "refs/heads/master";

/// Create a bare repository at `dir` whose `master` holds `files`.
pub(crate) fn seed_remote(dir: &Path, files: &[(&str, &str)]) -> Repository {
    let repo = Repository::init_bare(dir).expect("Failed to init bare remote");
    commit_files(&repo, files, "initial commit");
    repo.set_head(MASTER).expect("Failed to point HEAD at master");
    repo
}

/// Commit top-level `files` onto `master` of a bare repository, keeping the
/// rest of the parent tree.
pub(crate) fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
    let parent = repo
        .refname_to_id(MASTER)
        .ok()
        .map(|id| repo.find_commit(id).unwrap());
    let base_tree = parent.as_ref().map(|commit| commit.tree().unwrap());

    let mut builder = repo.treebuilder(base_tree.as_ref()).unwrap();
    for (name, content) in files {
        let blob = repo.blob(content.as_bytes()).unwrap();
        builder.insert(*name, blob, 0o100644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let signature = Signature::now("test", "test@example.com").unwrap();
    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    repo.commit(Some(MASTER), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

/// Read a file from the tip of `master`, if it exists.
pub(crate) fn read_remote_file(repo: &Repository, path: &str) -> Option<String> {
    let commit = repo.find_reference(MASTER).ok()?.peel_to_commit().ok()?;
    let entry = commit.tree().ok()?.get_path(Path::new(path)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}
