use crate::args::{
    AddIssueCommentArgs, CreateBranchArgs, CreateIssueArgs, CreateOrUpdateFileArgs,
    CreatePullRequestArgs, CreateRepositoryArgs, ForkRepositoryArgs, GetFileContentsArgs,
    ListCommitsArgs, ListIssuesArgs, SearchArgs, SearchRepositoriesArgs, UpdateIssueArgs,
};
use crate::models::{
    CodeSearchItem, CommitListItem, FileCommitResponse, FileContents, Issue, IssueComment,
    PullRequest, Reference, Repository, SearchResults, UserSearchItem,
};
use crate::normalize::normalize;
use crate::registry::{validate, FieldIssue, IssueReason, ToolKind, ToolRegistry, ValidationError};
use crate::transport::{ApiRequest, Method, Transport};
use crate::GatewayError;
use octogate_core::codec;
use octogate_core::error::{ApiError, ApiErrorKind};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Orchestrates one tool call end to end: lookup, validation, request
/// construction, the single transport call, and response mapping.
///
/// Holds no mutable state, so it is freely shareable across concurrent
/// dispatches.
pub struct Gateway {
    registry: ToolRegistry,
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(registry: ToolRegistry, transport: Arc<dyn Transport>) -> Self {
        Self { registry, transport }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one tool call. Validation failures and unknown tools return
    /// before any network traffic; each successful validation issues
    /// exactly one outbound request, with no retry.
    pub async fn dispatch(&self, name: &str, raw_args: Value) -> Result<Value, GatewayError> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;

        validate(descriptor, &raw_args)?;
        debug!("dispatching tool '{}'", name);

        match descriptor.kind {
            ToolKind::CreateOrUpdateFile => {
                let args: CreateOrUpdateFileArgs = parse_args(name, raw_args)?;
                result_value(self.create_or_update_file(args).await?)
            }
            ToolKind::GetFileContents => {
                let args: GetFileContentsArgs = parse_args(name, raw_args)?;
                result_value(self.get_file_contents(args).await?)
            }
            ToolKind::SearchRepositories => {
                let args: SearchRepositoriesArgs = parse_args(name, raw_args)?;
                result_value(self.search_repositories(args).await?)
            }
            ToolKind::CreateRepository => {
                let args: CreateRepositoryArgs = parse_args(name, raw_args)?;
                result_value(self.create_repository(args).await?)
            }
            ToolKind::CreateIssue => {
                let args: CreateIssueArgs = parse_args(name, raw_args)?;
                result_value(self.create_issue(args).await?)
            }
            ToolKind::ListIssues => {
                let args: ListIssuesArgs = parse_args(name, raw_args)?;
                result_value(self.list_issues(args).await?)
            }
            ToolKind::UpdateIssue => {
                let args: UpdateIssueArgs = parse_args(name, raw_args)?;
                result_value(self.update_issue(args).await?)
            }
            ToolKind::AddIssueComment => {
                let args: AddIssueCommentArgs = parse_args(name, raw_args)?;
                result_value(self.add_issue_comment(args).await?)
            }
            ToolKind::CreatePullRequest => {
                let args: CreatePullRequestArgs = parse_args(name, raw_args)?;
                result_value(self.create_pull_request(args).await?)
            }
            ToolKind::ForkRepository => {
                let args: ForkRepositoryArgs = parse_args(name, raw_args)?;
                result_value(self.fork_repository(args).await?)
            }
            ToolKind::CreateBranch => {
                let args: CreateBranchArgs = parse_args(name, raw_args)?;
                result_value(self.create_branch(args).await?)
            }
            ToolKind::ListCommits => {
                let args: ListCommitsArgs = parse_args(name, raw_args)?;
                result_value(self.list_commits(args).await?)
            }
            ToolKind::SearchCode => {
                let args: SearchArgs = parse_args(name, raw_args)?;
                result_value(self.search_code(args).await?)
            }
            ToolKind::SearchIssues => {
                let args: SearchArgs = parse_args(name, raw_args)?;
                result_value(self.search_issues(args).await?)
            }
            ToolKind::SearchUsers => {
                let args: SearchArgs = parse_args(name, raw_args)?;
                result_value(self.search_users(args).await?)
            }
        }
    }

    /// Issue the request and map the raw response: non-2xx goes through
    /// the normalizer, a 2xx body must match `T` or it is a ParseFailure.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: Option<Value>,
        context: &str,
    ) -> Result<T, GatewayError> {
        let method_name = method.as_str();
        let request = ApiRequest {
            method,
            path: path.clone(),
            body,
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ApiError::network(context, e))?;

        if !(200..300).contains(&response.status) {
            return Err(normalize(
                response.status,
                &response.body,
                Some(method_name),
                Some(&path),
                context,
            )
            .into());
        }

        serde_json::from_slice::<T>(&response.body).map_err(|e| {
            ApiError::parse_failure(
                context,
                e,
                response.status,
                Some(method_name.to_string()),
                Some(path),
            )
            .into()
        })
    }

    async fn create_or_update_file(
        &self,
        args: CreateOrUpdateFileArgs,
    ) -> Result<FileCommitResponse, GatewayError> {
        // The codec is the single point of file transcoding.
        let encoded = codec::encode(&args.content);
        let mut body = json!({
            "message": args.message,
            "content": encoded,
            "branch": args.branch,
        });
        if let Some(sha) = &args.sha {
            body["sha"] = json!(sha);
        }
        let path = format!(
            "/repos/{}/{}/contents/{}",
            args.owner,
            args.repo,
            encode_path(&args.path)
        );
        self.call(Method::Put, path, Some(body), "creating or updating a file")
            .await
    }

    async fn get_file_contents(
        &self,
        args: GetFileContentsArgs,
    ) -> Result<FileContents, GatewayError> {
        let context = "getting file contents";
        let query = query_string(&[("ref", args.branch.clone())]);
        let path = format!(
            "/repos/{}/{}/contents/{}{}",
            args.owner,
            args.repo,
            encode_path(&args.path),
            query
        );
        let mut contents: FileContents = self.call(Method::Get, path, None, context).await?;
        // File payloads arrive base64-encoded; hand decoded text back.
        if let FileContents::File(entry) = &mut contents {
            if let Some(encoded) = entry.content.take() {
                entry.content = Some(codec::decode(&encoded)?);
            }
        }
        Ok(contents)
    }

    async fn search_repositories(
        &self,
        args: SearchRepositoriesArgs,
    ) -> Result<SearchResults<Repository>, GatewayError> {
        let query = query_string(&[
            ("q", Some(args.query)),
            ("page", args.page.map(|p| p.to_string())),
            ("per_page", args.per_page.map(|p| p.to_string())),
        ]);
        self.call(
            Method::Get,
            format!("/search/repositories{}", query),
            None,
            "searching repositories",
        )
        .await
    }

    async fn create_repository(
        &self,
        args: CreateRepositoryArgs,
    ) -> Result<Repository, GatewayError> {
        let mut body = json!({ "name": args.name });
        if let Some(description) = &args.description {
            body["description"] = json!(description);
        }
        if let Some(private) = args.private {
            body["private"] = json!(private);
        }
        if let Some(auto_init) = args.auto_init {
            body["auto_init"] = json!(auto_init);
        }
        self.call(
            Method::Post,
            "/user/repos".to_string(),
            Some(body),
            "creating a repository",
        )
        .await
    }

    async fn create_issue(&self, args: CreateIssueArgs) -> Result<Issue, GatewayError> {
        let mut body = json!({ "title": args.title });
        if let Some(text) = &args.body {
            body["body"] = json!(text);
        }
        if let Some(assignees) = &args.assignees {
            body["assignees"] = json!(assignees);
        }
        if let Some(labels) = &args.labels {
            body["labels"] = json!(labels);
        }
        if let Some(milestone) = args.milestone {
            body["milestone"] = json!(milestone);
        }
        let path = format!("/repos/{}/{}/issues", args.owner, args.repo);
        self.call(Method::Post, path, Some(body), "creating an issue")
            .await
    }

    async fn list_issues(&self, args: ListIssuesArgs) -> Result<Vec<Issue>, GatewayError> {
        let query = query_string(&[
            ("state", args.state),
            ("labels", args.labels.map(|l| l.join(","))),
            ("sort", args.sort),
            ("direction", args.direction),
            ("since", args.since),
            ("page", args.page.map(|p| p.to_string())),
            ("per_page", args.per_page.map(|p| p.to_string())),
        ]);
        let path = format!("/repos/{}/{}/issues{}", args.owner, args.repo, query);
        self.call(Method::Get, path, None, "listing issues").await
    }

    async fn update_issue(&self, args: UpdateIssueArgs) -> Result<Issue, GatewayError> {
        let mut body = json!({});
        if let Some(title) = &args.title {
            body["title"] = json!(title);
        }
        if let Some(text) = &args.body {
            body["body"] = json!(text);
        }
        if let Some(state) = &args.state {
            body["state"] = json!(state);
        }
        if let Some(labels) = &args.labels {
            body["labels"] = json!(labels);
        }
        if let Some(assignees) = &args.assignees {
            body["assignees"] = json!(assignees);
        }
        if let Some(milestone) = args.milestone {
            body["milestone"] = json!(milestone);
        }
        let path = format!(
            "/repos/{}/{}/issues/{}",
            args.owner, args.repo, args.issue_number
        );
        self.call(Method::Patch, path, Some(body), "updating an issue")
            .await
    }

    async fn add_issue_comment(
        &self,
        args: AddIssueCommentArgs,
    ) -> Result<IssueComment, GatewayError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            args.owner, args.repo, args.issue_number
        );
        let body = json!({ "body": args.body });
        self.call(
            Method::Post,
            path,
            Some(body),
            "adding a comment to an issue",
        )
        .await
    }

    async fn create_pull_request(
        &self,
        args: CreatePullRequestArgs,
    ) -> Result<PullRequest, GatewayError> {
        let mut body = json!({
            "title": args.title,
            "head": args.head,
            "base": args.base,
        });
        if let Some(text) = &args.body {
            body["body"] = json!(text);
        }
        if let Some(draft) = args.draft {
            body["draft"] = json!(draft);
        }
        if let Some(maintainer_can_modify) = args.maintainer_can_modify {
            body["maintainer_can_modify"] = json!(maintainer_can_modify);
        }
        let path = format!("/repos/{}/{}/pulls", args.owner, args.repo);
        self.call(Method::Post, path, Some(body), "creating a pull request")
            .await
    }

    async fn fork_repository(&self, args: ForkRepositoryArgs) -> Result<Repository, GatewayError> {
        let query = query_string(&[("organization", args.organization)]);
        let path = format!("/repos/{}/{}/forks{}", args.owner, args.repo, query);
        self.call(Method::Post, path, None, "forking a repository")
            .await
    }

    async fn create_branch(&self, args: CreateBranchArgs) -> Result<Reference, GatewayError> {
        let body = json!({
            "ref": format!("refs/heads/{}", args.branch),
            "sha": args.sha,
        });
        let path = format!("/repos/{}/{}/git/refs", args.owner, args.repo);
        self.call(Method::Post, path, Some(body), "creating a branch")
            .await
    }

    async fn list_commits(
        &self,
        args: ListCommitsArgs,
    ) -> Result<Vec<CommitListItem>, GatewayError> {
        let query = query_string(&[
            ("sha", args.sha),
            ("page", args.page.map(|p| p.to_string())),
            ("per_page", args.per_page.map(|p| p.to_string())),
        ]);
        let path = format!("/repos/{}/{}/commits{}", args.owner, args.repo, query);
        self.call(Method::Get, path, None, "listing commits").await
    }

    async fn search_code(
        &self,
        args: SearchArgs,
    ) -> Result<SearchResults<CodeSearchItem>, GatewayError> {
        let query = search_query(&args);
        self.call(
            Method::Get,
            format!("/search/code{}", query),
            None,
            "searching code",
        )
        .await
    }

    async fn search_issues(&self, args: SearchArgs) -> Result<SearchResults<Issue>, GatewayError> {
        let query = search_query(&args);
        self.call(
            Method::Get,
            format!("/search/issues{}", query),
            None,
            "searching issues",
        )
        .await
    }

    async fn search_users(
        &self,
        args: SearchArgs,
    ) -> Result<SearchResults<UserSearchItem>, GatewayError> {
        let query = search_query(&args);
        self.call(
            Method::Get,
            format!("/search/users{}", query),
            None,
            "searching users",
        )
        .await
    }
}

/// Typed deserialization of already schema-validated arguments. A failure
/// here still surfaces as a validation error rather than a panic.
fn parse_args<T: DeserializeOwned>(tool: &str, raw: Value) -> Result<T, GatewayError> {
    serde_json::from_value(raw).map_err(|e| {
        ValidationError {
            tool: tool.to_string(),
            issues: vec![FieldIssue {
                field: "$".to_string(),
                reason: IssueReason::Invalid {
                    detail: e.to_string(),
                },
            }],
        }
        .into()
    })
}

fn result_value<T: Serialize>(value: T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| {
        GatewayError::Api(ApiError {
            kind: ApiErrorKind::ParseFailure,
            message: format!("Failed to serialize tool result: {}", e),
            status: None,
            method: None,
            path: None,
            body: None,
        })
    })
}

/// Bytes that must not appear raw in a repository path. '/' stays literal:
/// it separates path segments the API expects to see.
const PATH_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'|')
    .add(b'\\');

fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_COMPONENT).to_string()
}

/// Renders present pairs as a percent-encoded "?k=v&..." query string.
/// Values pass through form encoding, so '#', '&' and '=' inside a value
/// cannot truncate or split the query.
fn query_string(pairs: &[(&str, Option<String>)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in pairs {
        if let Some(value) = value {
            serializer.append_pair(key, value);
            any = true;
        }
    }
    if any {
        format!("?{}", serializer.finish())
    } else {
        String::new()
    }
}

fn search_query(args: &SearchArgs) -> String {
    query_string(&[
        ("q", Some(args.q.clone())),
        ("sort", args.sort.clone()),
        ("order", args.order.clone()),
        ("page", args.page.map(|p| p.to_string())),
        ("per_page", args.per_page.map(|p| p.to_string())),
    ])
}
