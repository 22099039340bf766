// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Version control and try server access through `git` and `git cl`.

use crate::{
    build::Build,
    collab::{BuildSource, ChangeSource},
    errors::CollaboratorError,
};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::NamedUtf8TempFile;
use rebaseline_metadata::TryJobJson;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// A `git` or `git cl` invocation, run in a repository checkout.
#[derive(Clone, Debug)]
struct GitCommand<'a> {
    repo_root: &'a Utf8Path,
    args: Vec<String>,
}

impl<'a> GitCommand<'a> {
    fn new(repo_root: &'a Utf8Path, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            repo_root,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn command_line(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once("git").chain(self.args.iter().map(String::as_str))
    }

    fn to_expression(&self) -> duct::Expression {
        duct::cmd("git", &self.args).dir(self.repo_root.as_std_path())
    }

    /// Runs the command and returns its standard output.
    fn read(&self) -> Result<Vec<u8>, CollaboratorError> {
        let expression = self.to_expression();
        trace!("executing command: {:?}", expression);
        let output = expression
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|err| CollaboratorError::exec(self.command_line(), err))?;
        if !output.status.success() {
            debug!("execution failed with {}", output.status);
            return Err(CollaboratorError::command_failed(
                self.command_line(),
                output.status.code(),
                &output.stderr,
            ));
        }
        Ok(output.stdout)
    }

    fn read_string(&self) -> Result<String, CollaboratorError> {
        self.read()
            .map(|stdout| String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Reads change state from a git checkout.
#[derive(Clone, Debug)]
pub struct GitCli {
    repo_root: Utf8PathBuf,
    upstream: String,
}

impl GitCli {
    /// Creates a new `GitCli` for the checkout at `repo_root`, computing changed files relative to
    /// the merge base with `upstream`.
    pub fn new(repo_root: impl Into<Utf8PathBuf>, upstream: impl Into<String>) -> Self {
        Self {
            repo_root: repo_root.into(),
            upstream: upstream.into(),
        }
    }
}

impl ChangeSource for GitCli {
    fn current_change_id(&self) -> Result<Option<u64>, CollaboratorError> {
        let output = GitCommand::new(&self.repo_root, ["cl", "issue"]).read_string()?;
        Ok(parse_issue_number(&output))
    }

    fn changed_file_paths(&self, diff_filter: &str) -> Result<Vec<String>, CollaboratorError> {
        let merge_base = GitCommand::new(&self.repo_root, ["merge-base", "HEAD", self.upstream.as_str()])
            .read_string()?;
        let filter = format!("--diff-filter={diff_filter}");
        let output = GitCommand::new(
            &self.repo_root,
            [
                "diff",
                "--name-only",
                "--no-renames",
                filter.as_str(),
                merge_base.trim(),
            ],
        )
        .read_string()?;
        Ok(output
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn unstaged_files(&self) -> Result<Vec<String>, CollaboratorError> {
        let output = GitCommand::new(
            &self.repo_root,
            ["status", "-z", "--untracked-files=all"],
        )
        .read_string()?;
        Ok(parse_unstaged_files(&output))
    }
}

/// Discovers and schedules try jobs through `git cl`.
#[derive(Clone, Debug)]
pub struct GitClTryJobs {
    repo_root: Utf8PathBuf,
    try_master: Option<String>,
}

impl GitClTryJobs {
    /// Creates a new `GitClTryJobs` for the checkout at `repo_root`.
    ///
    /// If `try_master` is set, it is passed to `git cl try` as the try server master.
    pub fn new(repo_root: impl Into<Utf8PathBuf>, try_master: Option<String>) -> Self {
        Self {
            repo_root: repo_root.into(),
            try_master,
        }
    }
}

impl BuildSource for GitClTryJobs {
    fn latest_builds(&self, builders: &BTreeSet<String>) -> Result<Vec<Build>, CollaboratorError> {
        // git cl writes the JSON to a file rather than standard output.
        let json_file = NamedUtf8TempFile::new().map_err(|err| {
            CollaboratorError::temp_file(["git", "cl", "try-results", "--json"], err)
        })?;
        let command = GitCommand::new(
            &self.repo_root,
            ["cl", "try-results", "--json", json_file.path().as_str()],
        );
        command.read()?;

        let contents = std::fs::read_to_string(json_file.path())
            .map_err(|err| CollaboratorError::temp_file(command.command_line(), err))?;
        let jobs = parse_try_jobs(&contents)
            .map_err(|err| CollaboratorError::output_parse(command.command_line(), err))?;
        Ok(latest_builds_from_jobs(&jobs, builders))
    }

    fn trigger_builds(&self, builders: &BTreeSet<String>) -> Result<(), CollaboratorError> {
        let mut args = vec!["cl".to_owned(), "try".to_owned()];
        if let Some(master) = &self.try_master {
            args.push("-m".to_owned());
            args.push(master.clone());
        }
        for builder in builders {
            args.push("-b".to_owned());
            args.push(builder.clone());
        }
        GitCommand::new(&self.repo_root, args).read()?;
        Ok(())
    }
}

/// Parses the output of `git cl issue`, which looks like `Issue number: 12345 (https://...)`.
///
/// Returns `None` if the branch has no issue (`Issue number: None (None)`).
pub fn parse_issue_number(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Issue number:")?;
        let number = rest.split_whitespace().next()?;
        number.parse().ok()
    })
}

/// Parses the output of `git status -z` into the paths of files with unstaged changes, including
/// untracked files.
///
/// Files whose changes are all staged are skipped. For renames and copies, only the new path is
/// reported.
pub fn parse_unstaged_files(output: &str) -> Vec<String> {
    let mut files = Vec::new();
    let mut records = output.split('\0').filter(|record| !record.is_empty());
    while let Some(record) = records.next() {
        let Some((status, path)) = record.split_at_checked(3) else {
            continue;
        };
        let mut status = status.chars();
        let (index, worktree) = (status.next(), status.next());
        if matches!(index, Some('R' | 'C')) {
            // The original path follows as a separate record.
            records.next();
        }
        if worktree != Some(' ') {
            files.push(path.to_owned());
        }
    }
    files
}

/// Parses the JSON written by `git cl try-results --json`.
pub fn parse_try_jobs(contents: &str) -> Result<Vec<TryJobJson>, serde_json::Error> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(contents)
}

/// Returns the latest build for each builder in `builders` that has a try job.
///
/// Finished builds are preferred over pending ones, and higher build numbers over lower ones.
/// Jobs on builders outside `builders` are ignored.
pub fn latest_builds_from_jobs(jobs: &[TryJobJson], builders: &BTreeSet<String>) -> Vec<Build> {
    let mut latest: BTreeMap<&str, Build> = BTreeMap::new();
    for job in jobs {
        if !builders.contains(&job.builder_name) {
            continue;
        }
        let build = Build::new(job.builder_name.clone(), job.build_number());
        latest
            .entry(job.builder_name.as_str())
            .and_modify(|existing| {
                // Build orders pending builds before finished ones.
                if build > *existing {
                    *existing = build.clone();
                }
            })
            .or_insert(build);
    }
    latest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("Issue number: 2758923003 (https://codereview.chromium.org/2758923003)\n", Some(2758923003); "with url")]
    #[test_case("Issue number: 42\n", Some(42); "bare")]
    #[test_case("Issue number: None (None)\n", None; "no issue")]
    #[test_case("", None; "empty")]
    fn issue_number(output: &str, expected: Option<u64>) {
        assert_eq!(parse_issue_number(output), expected);
    }

    #[test]
    fn unstaged_files() {
        let output = concat!(
            " M third_party/WebKit/LayoutTests/fast/a-expected.txt\0",
            "M  staged-only.txt\0",
            "MM staged-and-modified.txt\0",
            "?? third_party/WebKit/LayoutTests/fast/b-expected.png\0",
            "R  new-name.txt\0old-name.txt\0",
            "RM renamed-then-modified.txt\0previous.txt\0",
        );
        assert_eq!(
            parse_unstaged_files(output),
            vec![
                "third_party/WebKit/LayoutTests/fast/a-expected.txt",
                "staged-and-modified.txt",
                "third_party/WebKit/LayoutTests/fast/b-expected.png",
                "renamed-then-modified.txt",
            ]
        );
    }

    #[test]
    fn latest_builds() {
        let contents = indoc! {r#"
            [
                {
                    "builder_name": "linux_trusty_blink_rel",
                    "status": "COMPLETED",
                    "result": "FAILURE",
                    "url": "https://ci.example/builders/linux_trusty_blink_rel/builds/100"
                },
                {
                    "builder_name": "linux_trusty_blink_rel",
                    "status": "COMPLETED",
                    "result": "SUCCESS",
                    "url": "https://ci.example/builders/linux_trusty_blink_rel/builds/102"
                },
                {
                    "builder_name": "linux_trusty_blink_rel",
                    "status": "SCHEDULED",
                    "url": null
                },
                {
                    "builder_name": "win7_blink_rel",
                    "status": "STARTED",
                    "url": null
                },
                {
                    "builder_name": "android_rel",
                    "status": "COMPLETED",
                    "url": "https://ci.example/builders/android_rel/builds/3"
                }
            ]
        "#};
        let jobs = parse_try_jobs(contents).expect("valid try job JSON");
        let builders = BTreeSet::from([
            "linux_trusty_blink_rel".to_owned(),
            "mac10.12_blink_rel".to_owned(),
            "win7_blink_rel".to_owned(),
        ]);
        assert_eq!(
            latest_builds_from_jobs(&jobs, &builders),
            vec![
                Build::new("linux_trusty_blink_rel", 102),
                Build::pending("win7_blink_rel"),
            ]
        );
    }

    #[test]
    fn no_try_jobs() {
        assert!(parse_try_jobs("").expect("empty is valid").is_empty());
        assert!(parse_try_jobs("[]").expect("valid").is_empty());
        parse_try_jobs("{").expect_err("truncated JSON is invalid");
    }
}
