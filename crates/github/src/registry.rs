use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Closed set of operations the gateway exposes. Dispatch matches on this
/// exhaustively, so adding a tool without wiring it is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CreateOrUpdateFile,
    GetFileContents,
    SearchRepositories,
    CreateRepository,
    CreateIssue,
    ListIssues,
    UpdateIssue,
    AddIssueComment,
    CreatePullRequest,
    ForkRepository,
    CreateBranch,
    ListCommits,
    SearchCode,
    SearchIssues,
    SearchUsers,
}

/// One registered tool: its kind, protocol name, human description and
/// JSON Schema for the input arguments.
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Read-only registry populated once at startup. No locks: nothing is
/// mutated after construction, so concurrent lookups are safe.
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolDescriptor>,
}

/// Why a single field failed validation, in machine-inspectable form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum IssueReason {
    NotAnObject,
    MissingRequired,
    WrongType { expected: String },
    NotInEnum { allowed: Vec<String> },
    Invalid { detail: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: IssueReason,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            IssueReason::NotAnObject => write!(f, "arguments must be a JSON object"),
            IssueReason::MissingRequired => write!(f, "{}: missing required field", self.field),
            IssueReason::WrongType { expected } => {
                write!(f, "{}: expected {}", self.field, expected)
            }
            IssueReason::NotInEnum { allowed } => {
                write!(f, "{}: must be one of [{}]", self.field, allowed.join(", "))
            }
            IssueReason::Invalid { detail } => write!(f, "{}: {}", self.field, detail),
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid arguments for '{tool}': {}", format_issues(.issues))]
pub struct ValidationError {
    pub tool: String,
    pub issues: Vec<FieldIssue>,
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check raw arguments against a descriptor's declared schema.
///
/// Pure and total: no I/O, always terminates, and reports every failing
/// field instead of stopping at the first one.
pub fn validate(descriptor: &ToolDescriptor, args: &Value) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    let Some(supplied) = args.as_object() else {
        return Err(ValidationError {
            tool: descriptor.name.to_string(),
            issues: vec![FieldIssue {
                field: "$".to_string(),
                reason: IssueReason::NotAnObject,
            }],
        });
    };

    let schema = &descriptor.parameters;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !supplied.contains_key(name) {
                issues.push(FieldIssue {
                    field: name.to_string(),
                    reason: IssueReason::MissingRequired,
                });
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, declared) in properties {
            let Some(value) = supplied.get(name) else {
                continue;
            };
            check_property(name, declared, value, &mut issues);
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            tool: descriptor.name.to_string(),
            issues,
        })
    }
}

fn check_property(field: &str, declared: &Value, value: &Value, issues: &mut Vec<FieldIssue>) {
    if let Some(expected) = declared.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            issues.push(FieldIssue {
                field: field.to_string(),
                reason: IssueReason::WrongType {
                    expected: expected.to_string(),
                },
            });
            return;
        }
    }

    if let Some(allowed) = declared.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            issues.push(FieldIssue {
                field: field.to_string(),
                reason: IssueReason::NotInEnum {
                    allowed: allowed
                        .iter()
                        .map(|v| v.as_str().unwrap_or_default().to_string())
                        .collect(),
                },
            });
            return;
        }
    }

    if let (Some(items), Some(elements)) = (declared.get("items"), value.as_array()) {
        if let Some(expected) = items.get("type").and_then(Value::as_str) {
            for (idx, element) in elements.iter().enumerate() {
                if !type_matches(expected, element) {
                    issues.push(FieldIssue {
                        field: format!("{}[{}]", field, idx),
                        reason: IssueReason::WrongType {
                            expected: expected.to_string(),
                        },
                    });
                }
            }
        }
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        // Unknown schema types are not enforced.
        _ => true,
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut tools = HashMap::new();
        for descriptor in descriptors() {
            tools.insert(descriptor.name, descriptor);
        }
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Tool definitions in the shape the protocol layer advertises.
    pub fn list_definitions(&self) -> Vec<Value> {
        let mut definitions: Vec<Value> = self
            .tools
            .values()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.parameters
                })
            })
            .collect();
        definitions.sort_by(|a, b| {
            a["name"]
                .as_str()
                .unwrap_or_default()
                .cmp(b["name"].as_str().unwrap_or_default())
        });
        definitions
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            kind: ToolKind::CreateOrUpdateFile,
            name: "create_or_update_file",
            description: "Create or update a single file in a GitHub repository",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "path": { "type": "string", "description": "Path where to create/update the file" },
                    "content": { "type": "string", "description": "Content of the file" },
                    "message": { "type": "string", "description": "Commit message" },
                    "branch": { "type": "string", "description": "Branch to create/update the file in" },
                    "sha": { "type": "string", "description": "SHA of the file being replaced (required when updating)" }
                },
                "required": ["owner", "repo", "path", "content", "message", "branch"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::GetFileContents,
            name: "get_file_contents",
            description: "Get the contents of a file or directory from a GitHub repository",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "path": { "type": "string", "description": "Path to the file or directory" },
                    "branch": { "type": "string", "description": "Branch to get contents from" }
                },
                "required": ["owner", "repo", "path"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::SearchRepositories,
            name: "search_repositories",
            description: "Search for GitHub repositories",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query (see GitHub search syntax)" },
                    "page": { "type": "integer", "description": "Page number for pagination (default 1)" },
                    "perPage": { "type": "integer", "description": "Number of results per page (default 30, max 100)" }
                },
                "required": ["query"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::CreateRepository,
            name: "create_repository",
            description: "Create a new GitHub repository in your account",
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Repository name" },
                    "description": { "type": "string", "description": "Repository description" },
                    "private": { "type": "boolean", "description": "Whether the repository should be private" },
                    "autoInit": { "type": "boolean", "description": "Initialize with README.md" }
                },
                "required": ["name"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::CreateIssue,
            name: "create_issue",
            description: "Create a new issue in a GitHub repository",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "title": { "type": "string", "description": "Issue title" },
                    "body": { "type": "string", "description": "Issue body / description" },
                    "assignees": { "type": "array", "items": { "type": "string" }, "description": "Usernames to assign" },
                    "labels": { "type": "array", "items": { "type": "string" }, "description": "Labels to add" },
                    "milestone": { "type": "integer", "description": "Milestone number" }
                },
                "required": ["owner", "repo", "title"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::ListIssues,
            name: "list_issues",
            description: "List issues in a GitHub repository with filtering options",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "state": { "type": "string", "enum": ["open", "closed", "all"], "description": "Issue state filter" },
                    "labels": { "type": "array", "items": { "type": "string" }, "description": "Filter by labels" },
                    "sort": { "type": "string", "enum": ["created", "updated", "comments"], "description": "Sort order" },
                    "direction": { "type": "string", "enum": ["asc", "desc"], "description": "Sort direction" },
                    "since": { "type": "string", "description": "Only issues updated after this ISO 8601 timestamp" },
                    "page": { "type": "integer", "description": "Page number for pagination" },
                    "per_page": { "type": "integer", "description": "Number of results per page" }
                },
                "required": ["owner", "repo"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::UpdateIssue,
            name: "update_issue",
            description: "Update an existing issue in a GitHub repository",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "issue_number": { "type": "integer", "description": "Issue number to update" },
                    "title": { "type": "string", "description": "New title" },
                    "body": { "type": "string", "description": "New body" },
                    "state": { "type": "string", "enum": ["open", "closed"], "description": "New state" },
                    "labels": { "type": "array", "items": { "type": "string" }, "description": "Replacement labels" },
                    "assignees": { "type": "array", "items": { "type": "string" }, "description": "Replacement assignees" },
                    "milestone": { "type": "integer", "description": "Milestone number" }
                },
                "required": ["owner", "repo", "issue_number"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::AddIssueComment,
            name: "add_issue_comment",
            description: "Add a comment to an existing issue",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "issue_number": { "type": "integer", "description": "Issue number to comment on" },
                    "body": { "type": "string", "description": "Comment text" }
                },
                "required": ["owner", "repo", "issue_number", "body"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::CreatePullRequest,
            name: "create_pull_request",
            description: "Create a new pull request in a GitHub repository",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "title": { "type": "string", "description": "Pull request title" },
                    "body": { "type": "string", "description": "Pull request body / description" },
                    "head": { "type": "string", "description": "Branch containing the changes" },
                    "base": { "type": "string", "description": "Branch to merge into" },
                    "draft": { "type": "boolean", "description": "Create as a draft pull request" },
                    "maintainer_can_modify": { "type": "boolean", "description": "Allow maintainer edits" }
                },
                "required": ["owner", "repo", "title", "head", "base"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::ForkRepository,
            name: "fork_repository",
            description: "Fork a GitHub repository to your account or specified organization",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "organization": { "type": "string", "description": "Organization to fork into (defaults to your account)" }
                },
                "required": ["owner", "repo"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::CreateBranch,
            name: "create_branch",
            description: "Create a new branch in a GitHub repository from a known commit SHA",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "branch": { "type": "string", "description": "Name for the new branch" },
                    "sha": { "type": "string", "description": "Commit SHA the new branch points at" }
                },
                "required": ["owner", "repo", "branch", "sha"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::ListCommits,
            name: "list_commits",
            description: "Get the list of commits of a branch in a GitHub repository",
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner (username or organization)" },
                    "repo": { "type": "string", "description": "Repository name" },
                    "sha": { "type": "string", "description": "Branch name or commit SHA to start from" },
                    "page": { "type": "integer", "description": "Page number for pagination" },
                    "perPage": { "type": "integer", "description": "Number of results per page" }
                },
                "required": ["owner", "repo"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::SearchCode,
            name: "search_code",
            description: "Search for code across GitHub repositories",
            parameters: json!({
                "type": "object",
                "properties": {
                    "q": { "type": "string", "description": "Search query (see GitHub code search syntax)" },
                    "order": { "type": "string", "enum": ["asc", "desc"], "description": "Sort direction" },
                    "page": { "type": "integer", "description": "Page number for pagination" },
                    "per_page": { "type": "integer", "description": "Number of results per page" }
                },
                "required": ["q"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::SearchIssues,
            name: "search_issues",
            description: "Search for issues and pull requests across GitHub repositories",
            parameters: json!({
                "type": "object",
                "properties": {
                    "q": { "type": "string", "description": "Search query (see GitHub issue search syntax)" },
                    "sort": { "type": "string", "enum": ["comments", "reactions", "created", "updated"], "description": "Sort field" },
                    "order": { "type": "string", "enum": ["asc", "desc"], "description": "Sort direction" },
                    "page": { "type": "integer", "description": "Page number for pagination" },
                    "per_page": { "type": "integer", "description": "Number of results per page" }
                },
                "required": ["q"]
            }),
        },
        ToolDescriptor {
            kind: ToolKind::SearchUsers,
            name: "search_users",
            description: "Search for users on GitHub",
            parameters: json!({
                "type": "object",
                "properties": {
                    "q": { "type": "string", "description": "Search query (see GitHub user search syntax)" },
                    "sort": { "type": "string", "enum": ["followers", "repositories", "joined"], "description": "Sort field" },
                    "order": { "type": "string", "enum": ["asc", "desc"], "description": "Sort direction" },
                    "page": { "type": "integer", "description": "Page number for pagination" },
                    "per_page": { "type": "integer", "description": "Number of results per page" }
                },
                "required": ["q"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_is_registered_exactly_once() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.names().len(), 15);
        assert!(registry.get("create_issue").is_some());
        assert!(registry.get("push_files").is_none());
    }

    #[test]
    fn unknown_tool_lookup_is_a_distinct_miss() {
        let registry = ToolRegistry::new();
        assert!(registry.get("no_such_tool").is_none());
    }

    #[test]
    fn definitions_carry_schema_and_description() {
        let registry = ToolRegistry::new();
        let defs = registry.list_definitions();
        assert_eq!(defs.len(), 15);
        for def in &defs {
            assert!(def["name"].is_string());
            assert!(def["description"].is_string());
            assert_eq!(def["inputSchema"]["type"], "object");
        }
    }

    #[test]
    fn missing_required_fields_are_reported_individually() {
        let registry = ToolRegistry::new();
        let descriptor = registry.get("create_issue").expect("descriptor");
        let err = validate(descriptor, &json!({ "owner": "octocat" })).expect_err("must fail");
        let fields: Vec<&str> = err.issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"repo"));
        assert!(fields.contains(&"title"));
        assert!(err
            .issues
            .iter()
            .all(|i| i.reason == IssueReason::MissingRequired));
    }

    #[test]
    fn wrong_type_names_the_expected_type() {
        let registry = ToolRegistry::new();
        let descriptor = registry.get("create_issue").expect("descriptor");
        let err = validate(
            descriptor,
            &json!({ "owner": "octocat", "repo": "hello", "title": "t", "labels": "bug" }),
        )
        .expect_err("must fail");
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "labels");
        assert_eq!(
            err.issues[0].reason,
            IssueReason::WrongType { expected: "array".to_string() }
        );
    }

    #[test]
    fn array_items_are_type_checked() {
        let registry = ToolRegistry::new();
        let descriptor = registry.get("create_issue").expect("descriptor");
        let err = validate(
            descriptor,
            &json!({ "owner": "o", "repo": "r", "title": "t", "labels": ["bug", 7] }),
        )
        .expect_err("must fail");
        assert_eq!(err.issues[0].field, "labels[1]");
    }

    #[test]
    fn enum_membership_is_enforced() {
        let registry = ToolRegistry::new();
        let descriptor = registry.get("list_issues").expect("descriptor");
        let err = validate(
            descriptor,
            &json!({ "owner": "o", "repo": "r", "state": "reopened" }),
        )
        .expect_err("must fail");
        assert_eq!(err.issues[0].field, "state");
        assert!(matches!(err.issues[0].reason, IssueReason::NotInEnum { .. }));
    }

    #[test]
    fn non_object_arguments_are_rejected_outright() {
        let registry = ToolRegistry::new();
        let descriptor = registry.get("search_code").expect("descriptor");
        let err = validate(descriptor, &json!("just a string")).expect_err("must fail");
        assert_eq!(err.issues[0].reason, IssueReason::NotAnObject);
    }

    #[test]
    fn valid_arguments_pass() {
        let registry = ToolRegistry::new();
        let descriptor = registry.get("list_issues").expect("descriptor");
        let args = json!({
            "owner": "octocat",
            "repo": "hello-world",
            "state": "open",
            "labels": ["bug", "help wanted"],
            "per_page": 50
        });
        assert!(validate(descriptor, &args).is_ok());
    }

    #[test]
    fn validation_errors_render_field_and_reason() {
        let registry = ToolRegistry::new();
        let descriptor = registry.get("add_issue_comment").expect("descriptor");
        let err = validate(descriptor, &json!({ "owner": "o", "repo": "r" })).expect_err("must fail");
        let rendered = err.to_string();
        assert!(rendered.contains("add_issue_comment"));
        assert!(rendered.contains("issue_number: missing required field"));
        assert!(rendered.contains("body: missing required field"));
    }

    #[test]
    fn issues_serialize_for_protocol_consumers() {
        let issue = FieldIssue {
            field: "state".to_string(),
            reason: IssueReason::NotInEnum { allowed: vec!["open".to_string(), "closed".to_string()] },
        };
        let value = serde_json::to_value(&issue).expect("serialize");
        assert_eq!(value["field"], "state");
        assert_eq!(value["reason"]["code"], "not_in_enum");
    }
}
