//! Typed forms of each tool's arguments, produced after schema validation.
//! Field names follow the wire contract of the tool schemas, including the
//! mixed page/perPage vs page/per_page naming the API grew historically.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateOrUpdateFileArgs {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetFileContentsArgs {
    pub owner: String,
    pub repo: String,
    pub path: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRepositoriesArgs {
    pub query: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, rename = "perPage")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryArgs {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default, rename = "autoInit")]
    pub auto_init: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIssueArgs {
    pub owner: String,
    pub repo: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assignees: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub milestone: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ListIssuesArgs {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIssueArgs {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub assignees: Option<Vec<String>>,
    #[serde(default)]
    pub milestone: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AddIssueCommentArgs {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePullRequestArgs {
    pub owner: String,
    pub repo: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub head: String,
    pub base: String,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub maintainer_can_modify: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ForkRepositoryArgs {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchArgs {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCommitsArgs {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, rename = "perPage")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub q: String,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_fields_default_to_none() {
        let args: CreateIssueArgs = serde_json::from_value(json!({
            "owner": "octocat",
            "repo": "hello-world",
            "title": "Something broke"
        }))
        .expect("deserialize");
        assert!(args.body.is_none());
        assert!(args.labels.is_none());
        assert!(args.milestone.is_none());
    }

    #[test]
    fn camel_case_pagination_names_are_honored() {
        let args: SearchRepositoriesArgs = serde_json::from_value(json!({
            "query": "language:rust stars:>500",
            "perPage": 10
        }))
        .expect("deserialize");
        assert_eq!(args.per_page, Some(10));
    }
}
