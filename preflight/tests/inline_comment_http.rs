//! Inline comment tool against a mock GitHub REST API.

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;

use preflight::core::context::Repository;
use preflight::inline_comment::{InlineCommentRequest, create_inline_comment, describe_failure};
use preflight::io::github::rest::RestGithub;

fn repo() -> Repository {
    Repository::new("octo", "widgets")
}

fn request(value: serde_json::Value) -> InlineCommentRequest {
    serde_json::from_value(value).expect("request")
}

#[test]
fn single_line_comment_targets_pull_request_head() {
    let server = MockServer::start();
    let pull = server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/pulls/9");
        then.status(200).json_body(json!({
            "number": 9,
            "state": "open",
            "head": {"ref": "feature/retry", "sha": "headsha"},
            "base": {"ref": "main", "sha": "basesha"},
        }));
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/octo/widgets/pulls/9/comments")
            .json_body(json!({
                "path": "src/upload.rs",
                "body": "Consider a backoff here.",
                "commit_id": "headsha",
                "line": 42,
                "side": "RIGHT",
            }));
        then.status(201).json_body(json!({
            "id": 555,
            "html_url": "https://github.com/octo/widgets/pull/9#discussion_r555",
            "path": "src/upload.rs",
            "line": 42,
        }));
    });

    let client = RestGithub::new(&server.base_url(), "ghs_token").expect("client");
    let outcome = create_inline_comment(
        &client,
        &repo(),
        9,
        request(json!({"path": "src/upload.rs", "body": "Consider a backoff here.", "line": 42})),
    )
    .expect("created");

    pull.assert_calls(1);
    comment.assert_calls(1);
    assert_eq!(outcome.comment_id, 555);
    assert_eq!(outcome.line, Some(42));
    assert_eq!(
        outcome.message,
        "Inline comment created successfully on src/upload.rs at line 42"
    );
}

#[test]
fn line_range_sends_start_fields() {
    let server = MockServer::start();
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/octo/widgets/pulls/9/comments")
            .body_includes("\"start_line\":10")
            .body_includes("\"start_side\":\"LEFT\"")
            .body_includes("\"commit_id\":\"pinned\"");
        then.status(201)
            .json_body(json!({"id": 556, "path": "a.rs", "line": 12}));
    });

    let client = RestGithub::new(&server.base_url(), "t").expect("client");
    let outcome = create_inline_comment(
        &client,
        &repo(),
        9,
        request(json!({
            "path": "a.rs",
            "body": "b",
            "startLine": 10,
            "line": 12,
            "side": "LEFT",
            "commit_id": "pinned",
        })),
    )
    .expect("created");

    comment.assert_calls(1);
    assert!(outcome.message.ends_with("from line 10 to 12"));
}

#[test]
fn validation_failure_gets_a_diff_hint() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/repos/octo/widgets/pulls/9/comments");
        then.status(422)
            .json_body(json!({"message": "Validation Failed"}));
    });

    let client = RestGithub::new(&server.base_url(), "t").expect("client");
    let err = create_inline_comment(
        &client,
        &repo(),
        9,
        request(json!({"path": "a.rs", "body": "b", "line": 999, "commit_id": "c"})),
    )
    .expect_err("422");

    let text = describe_failure(&err);
    assert!(text.contains("status 422"), "{text}");
    assert!(text.contains("line number doesn't exist in the diff"), "{text}");
}
