//! Subcommands, one per repository operation.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use repo_ops::{FileSet, RepoOperations, RepoRequest};
use serde::Serialize;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a branch from the base branch
    CreateBranch(BranchArgs),
    /// Show a branch
    GetBranch(BranchArgs),
    /// Delete a branch
    DeleteBranch(BranchArgs),
    /// Print a file's raw content
    GetFile(GetFileArgs),
    /// Show project metadata
    GetProject(ProjectArgs),
    /// Show the project this project was forked from
    ForkParent(ProjectArgs),
    /// Commit local files to a branch, creating the branch if needed
    Commit(CommitArgs),
    /// Open a merge request into the fork parent's base branch
    MergeRequest(MergeRequestArgs),
    /// Register the configured pull mirror on a project
    Mirror(ProjectArgs),
}

#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project ID or full path (group/project)
    #[arg(short, long)]
    pub project: String,
}

#[derive(Debug, Args)]
pub struct BranchArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
    /// Branch name
    #[arg(short, long)]
    pub branch: String,
}

#[derive(Debug, Args)]
pub struct GetFileArgs {
    #[command(flatten)]
    pub target: BranchArgs,
    /// Repository-relative file path
    #[arg(long)]
    pub path: String,
    /// Write the content here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CommitArgs {
    #[command(flatten)]
    pub target: BranchArgs,
    /// Commit message
    #[arg(short, long)]
    pub message: String,
    /// File to commit, as REMOTE_PATH=LOCAL_FILE (repeatable)
    #[arg(long = "file", value_name = "REMOTE=LOCAL", required = true, value_parser = parse_file_mapping)]
    pub files: Vec<FileMapping>,
}

#[derive(Debug, Args)]
pub struct MergeRequestArgs {
    #[command(flatten)]
    pub target: BranchArgs,
    /// Merge request title
    #[arg(short, long)]
    pub message: String,
}

/// A repository path and the local file whose content it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    pub remote: String,
    pub local: PathBuf,
}

fn parse_file_mapping(value: &str) -> Result<FileMapping, String> {
    match value.split_once('=') {
        Some((remote, local)) if !remote.is_empty() && !local.is_empty() => Ok(FileMapping {
            remote: remote.to_string(),
            local: PathBuf::from(local),
        }),
        _ => Err(format!("expected REMOTE_PATH=LOCAL_FILE, got '{value}'")),
    }
}

/// Reads every mapped local file as UTF-8 text.
pub fn load_file_set(mappings: &[FileMapping]) -> Result<FileSet> {
    let mut files = FileSet::new();
    for mapping in mappings {
        let content = fs::read_to_string(&mapping.local)
            .with_context(|| format!("failed to read {}", mapping.local.display()))?;
        files.insert(mapping.remote.as_str(), content);
    }
    Ok(files)
}

impl BranchArgs {
    fn request(&self, host: &str) -> RepoRequest {
        RepoRequest::new(host, self.project.project.as_str(), self.branch.as_str())
    }
}

impl ProjectArgs {
    fn request(&self, host: &str) -> RepoRequest {
        RepoRequest::new(host, self.project.as_str(), "")
    }
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Runs `command` and writes its result to `out`.
pub async fn execute(
    ops: &RepoOperations,
    host: &str,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::CreateBranch(args) => {
            print_json(out, &ops.create_branch(&args.request(host)).await?)
        }
        Command::GetBranch(args) => print_json(out, &ops.get_branch(&args.request(host)).await?),
        Command::DeleteBranch(args) => {
            print_json(out, &ops.delete_branch(&args.request(host)).await?)
        }
        Command::GetFile(args) => {
            let request = args.target.request(host).with_path(args.path.as_str());
            let bytes = ops.get_file(&request).await?;
            match args.output {
                Some(path) => fs::write(&path, &bytes)
                    .with_context(|| format!("failed to write {}", path.display())),
                None => Ok(out.write_all(&bytes)?),
            }
        }
        Command::GetProject(args) => print_json(out, &ops.get_project(&args.request(host)).await?),
        Command::ForkParent(args) => {
            print_json(out, &ops.get_fork_parent(&args.request(host)).await?)
        }
        Command::Commit(args) => {
            let files = load_file_set(&args.files)?;
            let request = args.target.request(host).with_message(args.message.as_str());
            print_json(out, &ops.create_commit(&request, &files).await?)
        }
        Command::MergeRequest(args) => {
            let request = args.target.request(host).with_message(args.message.as_str());
            print_json(out, &ops.create_merge_request(&request).await?)
        }
        Command::Mirror(args) => {
            print_json(out, &ops.create_pull_mirror(&args.request(host)).await?)
        }
    }
}
