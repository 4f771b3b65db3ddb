//! Typed shapes of the GitHub API responses the tools return. Nullable
//! fields are `Option`; unexpected extra fields are ignored, but a missing
//! required field is a deserialization error the gateway surfaces as a
//! ParseFailure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Present on fork responses: the repository this was forked from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Repository>>,
}

/// A git reference as returned by the git data API (`refs/heads/...`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "ref")]
    pub reference: String,
    pub url: String,
    pub object: GitObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// The contents API returns either a single file object or a directory
/// listing, depending on what the path points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileContents {
    Directory(Vec<DirectoryEntry>),
    File(FileEntry),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
    /// Base64 on the wire; the gateway replaces this with decoded text
    /// before returning the entry to the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Response of a contents-API file create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCommitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FileEntry>,
    pub commit: FileCommit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCommit {
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Account>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub assignees: Vec<Account>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    pub html_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub reference: String,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitListItem {
    pub sha: String,
    pub commit: CommitDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Account>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<GitActor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitActor {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Envelope every search endpoint shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults<T> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSearchItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    pub repository: Repository,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSearchItem {
    pub login: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contents_response_splits_file_and_directory() {
        let file = json!({
            "name": "README.md",
            "path": "README.md",
            "sha": "abc123",
            "size": 42,
            "type": "file",
            "content": "aGVsbG8=",
            "encoding": "base64"
        });
        let parsed: FileContents = serde_json::from_value(file).expect("file");
        assert!(matches!(parsed, FileContents::File(_)));

        let dir = json!([
            { "name": "src", "path": "src", "sha": "def456", "size": 0, "type": "dir" }
        ]);
        let parsed: FileContents = serde_json::from_value(dir).expect("dir");
        match parsed {
            FileContents::Directory(entries) => assert_eq!(entries[0].kind, "dir"),
            FileContents::File(_) => panic!("expected a directory listing"),
        }
    }

    #[test]
    fn issue_tolerates_extra_and_null_fields() {
        let raw = json!({
            "id": 1,
            "number": 1347,
            "title": "Found a bug",
            "state": "open",
            "html_url": "https://github.com/octocat/Hello-World/issues/1347",
            "body": null,
            "locked": false,
            "reactions": { "+1": 3 }
        });
        let issue: Issue = serde_json::from_value(raw).expect("issue");
        assert_eq!(issue.number, 1347);
        assert!(issue.body.is_none());
        assert!(issue.labels.is_empty());
    }

    #[test]
    fn missing_required_field_is_a_hard_error() {
        // No `state`: must fail rather than produce a partial Issue.
        let raw = json!({
            "id": 1,
            "number": 2,
            "title": "t",
            "html_url": "https://example.invalid"
        });
        assert!(serde_json::from_value::<Issue>(raw).is_err());
    }

    #[test]
    fn search_envelope_is_generic_over_items() {
        let raw = json!({
            "total_count": 1,
            "incomplete_results": false,
            "items": [{
                "login": "octocat",
                "id": 583231,
                "score": 1.0
            }]
        });
        let results: SearchResults<UserSearchItem> = serde_json::from_value(raw).expect("results");
        assert_eq!(results.total_count, 1);
        assert_eq!(results.items[0].login, "octocat");
    }
}
