//! Request/response tests for [`GitLabClient`] against a local stub server.
//!
//! The stub accepts one connection per canned reply, records the request it
//! received and answers with `connection: close`, so every client call lands on
//! a fresh connection and is recorded in order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gitlab::GitLabClient;
use repo_ops::{
    CommitAction, FileSet, NewBranch, NewCommit, NewMergeRequest, NewMirror, ProjectId, RepoError,
    RepoOperations, RepoRequest, RepoSettings, RepositoryHost,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const TOKEN: &str = "glpat-stub-token";
const PROJECT: &str = "me/clusterimagesets";
const PROJECT_PATH: &str = "/api/v4/projects/me%2Fclusterimagesets";

// ---------------------------------------------------------------------------
// Stub server
// ---------------------------------------------------------------------------

struct Reply {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    body: String,
}

impl Reply {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }
}

#[derive(Debug)]
struct Recorded {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Starts a stub that serves `replies` in order and returns its base URL and
/// a handle yielding the recorded requests.
async fn stub(replies: Vec<Reply>) -> (String, JoinHandle<Vec<Recorded>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut recorded = Vec::new();
        for reply in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            recorded.push(read_request(&mut stream).await);
            write_reply(&mut stream, &reply).await;
        }
        recorded
    });

    (base_url, handle)
}

async fn read_request(stream: &mut TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before request headers ended");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap().split(' ');
    let method = request_line.next().unwrap().to_string();
    let target = request_line.next().unwrap().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .map(|v| v.parse().unwrap())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before request body ended");
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8(buf[header_end..header_end + length].to_vec()).unwrap();

    Recorded {
        method,
        target,
        headers,
        body,
    }
}

async fn write_reply(stream: &mut TcpStream, reply: &Reply) {
    let mut response = format!(
        "HTTP/1.1 {} Stub\r\nconnection: close\r\ncontent-type: application/json\r\n",
        reply.status
    );
    for (name, value) in &reply.headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    if reply.status != 204 {
        response.push_str(&format!("content-length: {}\r\n", reply.body.len()));
    }
    response.push_str("\r\n");
    response.push_str(&reply.body);

    stream.write_all(response.as_bytes()).await.unwrap();
    let _ = stream.shutdown().await;
}

fn client(base_url: &str) -> GitLabClient {
    GitLabClient::new(base_url, TOKEN).unwrap()
}

fn branch_json(name: &str) -> Value {
    json!({
        "name": name,
        "merged": false,
        "protected": false,
        "default": false,
        "web_url": format!("https://gitlab.com/{PROJECT}/-/tree/{name}"),
        "commit": {
            "id": "ed899a2f4b50b4370feeea94676502b42383c746",
            "short_id": "ed899a2f",
            "title": "Update image sets",
            "committed_date": "2024-05-01T09:30:00Z"
        }
    })
}

fn commit_json() -> Value {
    json!({
        "id": "6104942438c14ec7bd21c6cd5bd995272b3faff6",
        "short_id": "6104942438c",
        "title": "Update image sets",
        "message": "Update image sets",
        "author_name": "bot",
        "created_at": "2024-05-01T09:31:00Z"
    })
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_branch_posts_branch_and_ref() {
    let (base_url, server) = stub(vec![Reply::json(201, branch_json("feature"))]).await;

    let branch = client(&base_url)
        .create_branch(
            PROJECT,
            &NewBranch {
                branch: "feature".to_string(),
                reference: "master".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(branch.name, "feature");
    assert_eq!(branch.commit.unwrap().short_id, "ed899a2f");

    let requests = server.await.unwrap();
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.target, format!("{PROJECT_PATH}/repository/branches"));
    assert_eq!(request.header("private-token"), Some(TOKEN));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert!(request.header("user-agent").unwrap().starts_with("glops/"));
    assert_eq!(request.json(), json!({ "branch": "feature", "ref": "master" }));
}

#[tokio::test]
async fn test_get_branch_encodes_branch_segment() {
    let (base_url, server) = stub(vec![Reply::json(200, branch_json("release/1.2"))]).await;

    let branch = client(&base_url)
        .get_branch(PROJECT, "release/1.2")
        .await
        .unwrap();
    assert_eq!(branch.name, "release/1.2");

    let requests = server.await.unwrap();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].target,
        format!("{PROJECT_PATH}/repository/branches/release%2F1.2")
    );
    assert_eq!(requests[0].header("private-token"), Some(TOKEN));
}

#[tokio::test]
async fn test_missing_branch_is_not_found() {
    let (base_url, server) = stub(vec![Reply::json(
        404,
        json!({ "message": "404 Branch Not Found" }),
    )])
    .await;

    let err = client(&base_url)
        .get_branch(PROJECT, "feature")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    assert!(err.to_string().contains("branch feature"));

    server.await.unwrap();
}

#[tokio::test]
async fn test_delete_branch_captures_request_id() {
    let (base_url, server) =
        stub(vec![Reply::empty(204).header("x-request-id", "01HX9Q2W3E4R")]).await;

    let meta = client(&base_url)
        .delete_branch(PROJECT, "feature")
        .await
        .unwrap();
    assert_eq!(meta.status, 204);
    assert_eq!(meta.request_id.as_deref(), Some("01HX9Q2W3E4R"));

    let requests = server.await.unwrap();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(
        requests[0].target,
        format!("{PROJECT_PATH}/repository/branches/feature")
    );
}

#[tokio::test]
async fn test_get_file_sends_ref_query() {
    let (base_url, server) = stub(vec![Reply::json(
        200,
        json!({
            "file_name": "config.yaml",
            "file_path": "deploy/config.yaml",
            "size": 12,
            "encoding": "base64",
            "content": "Y29uZmlnOiB0cnVl",
            "ref": "feature",
            "blob_id": "79f7bbd25901e8334750839545a9bd021f0e4c83",
            "commit_id": "d5a3ff139356ce33e37e73add446f16869741b50"
        }),
    )])
    .await;

    let file = client(&base_url)
        .get_file(PROJECT, "deploy/config.yaml", "feature")
        .await
        .unwrap();
    assert_eq!(file.encoding, "base64");
    assert_eq!(file.content, "Y29uZmlnOiB0cnVl");
    assert_eq!(file.reference, "feature");

    let requests = server.await.unwrap();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].target,
        format!("{PROJECT_PATH}/repository/files/deploy%2Fconfig.yaml?ref=feature")
    );
}

#[tokio::test]
async fn test_get_project_reads_fork_parent() {
    let (base_url, server) = stub(vec![Reply::json(
        200,
        json!({
            "id": 3,
            "name": "clusterimagesets",
            "path_with_namespace": PROJECT,
            "default_branch": "master",
            "forked_from_project": {
                "id": 13083,
                "name": "clusterimagesets",
                "path_with_namespace": "service/clusterimagesets"
            }
        }),
    )])
    .await;

    let project = client(&base_url).get_project(PROJECT).await.unwrap();
    assert_eq!(project.id, ProjectId::new(3));
    assert_eq!(
        project.forked_from_project.map(|p| p.id),
        Some(ProjectId::new(13083))
    );

    let requests = server.await.unwrap();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, PROJECT_PATH);
}

#[tokio::test]
async fn test_create_commit_posts_actions() {
    let (base_url, server) = stub(vec![Reply::json(201, commit_json())]).await;

    let commit = client(&base_url)
        .create_commit(
            PROJECT,
            &NewCommit {
                branch: "feature".to_string(),
                commit_message: "Update image sets".to_string(),
                actions: vec![CommitAction::update("sets/a.yaml", "a: 1\n")],
            },
        )
        .await
        .unwrap();
    assert_eq!(commit.short_id, "6104942438c");

    let requests = server.await.unwrap();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, format!("{PROJECT_PATH}/repository/commits"));
    assert_eq!(
        requests[0].json(),
        json!({
            "branch": "feature",
            "commit_message": "Update image sets",
            "actions": [{
                "action": "update",
                "file_path": "sets/a.yaml",
                "content": "a: 1\n",
                "encoding": "text"
            }]
        })
    );
}

#[tokio::test]
async fn test_create_merge_request_posts_target_project() {
    let (base_url, server) = stub(vec![Reply::json(
        201,
        json!({
            "id": 91,
            "iid": 7,
            "project_id": 3,
            "title": "Update image sets",
            "state": "opened",
            "source_branch": "feature",
            "target_branch": "master",
            "target_project_id": 13083,
            "web_url": "https://gitlab.com/service/clusterimagesets/-/merge_requests/7"
        }),
    )])
    .await;

    let merge_request = client(&base_url)
        .create_merge_request(
            PROJECT,
            &NewMergeRequest {
                source_branch: "feature".to_string(),
                target_branch: "master".to_string(),
                title: "Update image sets".to_string(),
                target_project_id: ProjectId::new(13083),
            },
        )
        .await
        .unwrap();
    assert_eq!(merge_request.iid, 7);
    assert_eq!(merge_request.target_project_id, Some(ProjectId::new(13083)));

    let requests = server.await.unwrap();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, format!("{PROJECT_PATH}/merge_requests"));
    assert_eq!(
        requests[0].json(),
        json!({
            "source_branch": "feature",
            "target_branch": "master",
            "title": "Update image sets",
            "target_project_id": 13083
        })
    );
}

#[tokio::test]
async fn test_add_project_mirror_posts_url() {
    let url = "https://gitlab.example.com/service/clusterimagesets.git";
    let (base_url, server) = stub(vec![Reply::json(
        201,
        json!({
            "id": 101486,
            "url": url,
            "enabled": true,
            "update_status": "none",
            "last_error": null
        }),
    )])
    .await;

    let mirror = client(&base_url)
        .add_project_mirror(
            PROJECT,
            &NewMirror {
                url: url.to_string(),
                enabled: true,
            },
        )
        .await
        .unwrap();
    assert!(mirror.enabled);
    assert_eq!(mirror.url, url);

    let requests = server.await.unwrap();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, format!("{PROJECT_PATH}/remote_mirrors"));
    assert_eq!(requests[0].json(), json!({ "url": url, "enabled": true }));
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let (base_url, server) =
        stub(vec![Reply::json(401, json!({ "message": "401 Unauthorized" }))]).await;

    let err = client(&base_url).get_project(PROJECT).await.unwrap_err();
    assert!(matches!(err, RepoError::Unauthorized { .. }), "{err:?}");

    server.await.unwrap();
}

#[tokio::test]
async fn test_throttled_request_carries_retry_after() {
    let (base_url, server) = stub(vec![Reply::json(
        429,
        json!({ "message": "Retry later" }),
    )
    .header("retry-after", "30")])
    .await;

    let err = client(&base_url).get_project(PROJECT).await.unwrap_err();
    match err {
        RepoError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }

    server.await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let (base_url, server) = stub(vec![Reply::json(
        500,
        json!({ "message": "500 Internal Server Error" }),
    )])
    .await;

    let err = client(&base_url).get_project(PROJECT).await.unwrap_err();
    assert!(matches!(err, RepoError::Api { status: 500, .. }), "{err:?}");

    server.await.unwrap();
}

// ---------------------------------------------------------------------------
// Through the operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_commit_creates_branch_after_404_lookup() {
    let (base_url, server) = stub(vec![
        Reply::json(404, json!({ "message": "404 Branch Not Found" })),
        Reply::json(201, branch_json("feature")),
        Reply::json(201, commit_json()),
    ])
    .await;

    let host: Arc<dyn RepositoryHost> = Arc::new(client(&base_url));
    let ops = RepoOperations::new(host, RepoSettings::default()).unwrap();
    let files: FileSet = [("sets/b.yaml", "b: 2\n"), ("sets/a.yaml", "a: 1\n")]
        .into_iter()
        .collect();
    let request = RepoRequest::new(&base_url, PROJECT, "feature").with_message("Update image sets");

    let commit = ops.create_commit(&request, &files).await.unwrap();
    assert_eq!(commit.short_id, "6104942438c");

    let requests = server.await.unwrap();
    let lines: Vec<(&str, &str)> = requests
        .iter()
        .map(|r| (r.method.as_str(), r.target.as_str()))
        .collect();
    let branches = format!("{PROJECT_PATH}/repository/branches");
    let feature = format!("{PROJECT_PATH}/repository/branches/feature");
    let commits = format!("{PROJECT_PATH}/repository/commits");
    assert_eq!(
        lines,
        vec![
            ("GET", feature.as_str()),
            ("POST", branches.as_str()),
            ("POST", commits.as_str()),
        ]
    );
    assert_eq!(requests[1].json(), json!({ "branch": "feature", "ref": "master" }));

    let paths: Vec<Value> = requests[2].json()["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["file_path"].clone())
        .collect();
    assert_eq!(paths, vec![json!("sets/a.yaml"), json!("sets/b.yaml")]);
}
