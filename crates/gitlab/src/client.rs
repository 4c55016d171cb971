//! `reqwest` implementation of [`RepositoryHost`] for the GitLab REST v4 API.

use async_trait::async_trait;
use repo_ops::{
    Branch, Commit, MergeRequest, NewBranch, NewCommit, NewMergeRequest, NewMirror, Project,
    ProjectMirror, RepoError, RepositoryFile, RepositoryHost, ResponseMeta,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{from_status, from_transport, retry_after};

const USER_AGENT: &str = concat!("glops/", env!("CARGO_PKG_VERSION"));

/// An authenticated connection to one GitLab instance.
///
/// The token is held only inside the default headers, marked sensitive so it
/// never shows up in `Debug` output or logs.
#[derive(Debug)]
pub struct GitLabClient {
    http: reqwest::Client,
    api_root: Url,
    base_url: String,
}

impl GitLabClient {
    /// Create a client for the instance at `base_url` (e.g.
    /// `"https://gitlab.com"` or `"https://git.example.com/gitlab"`).
    ///
    /// No request is made; an invalid token surfaces on the first call.
    pub fn new(base_url: &str, token: &str) -> Result<Self, RepoError> {
        let mut api_root = Url::parse(base_url)
            .map_err(|e| RepoError::configuration(format!("invalid GitLab URL '{base_url}': {e}")))?;
        api_root
            .path_segments_mut()
            .map_err(|_| RepoError::configuration(format!("'{base_url}' cannot be a base URL")))?
            .pop_if_empty()
            .extend(["api", "v4"]);

        let mut token_value = HeaderValue::from_str(token).map_err(|_| {
            RepoError::configuration("token contains characters not allowed in a header")
        })?;
        token_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("private-token"), token_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RepoError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_root,
            base_url: base_url.to_string(),
        })
    }

    /// The instance URL this client was created for.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `<api root>/<segments...>`, percent-encoding each segment so
    /// that `group/project` becomes `group%2Fproject`.
    ///
    /// Empty, `.` and `..` segments are rejected: the URL parser would drop or
    /// collapse them and silently address a different endpoint.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RepoError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| matches!(**s, "" | "." | ".."))
        {
            return Err(RepoError::configuration(format!(
                "'{bad}' is not a valid project, branch or file path"
            )));
        }
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| RepoError::configuration("API root cannot be a base URL"))?
            .extend(segments);
        Ok(url)
    }

    fn project_endpoint(&self, project: &str, rest: &[&str]) -> Result<Url, RepoError> {
        let mut segments = vec!["projects", project];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, path = url.path(), "GitLab API request");
        self.http.request(method, url)
    }

    /// Sends `request`, turning any non-success status into a [`RepoError`].
    async fn execute(&self, request: RequestBuilder, resource: &str) -> Result<Response, RepoError> {
        let response = request.send().await.map_err(|e| {
            warn!(resource, error = %e, "GitLab API request failed");
            from_transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        warn!(resource, %status, "GitLab API returned non-success status");
        Err(from_status(status, &body, resource, retry_after))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, RepoError> {
        self.execute(request, resource)
            .await?
            .json::<T>()
            .await
            .map_err(from_transport)
    }
}

fn response_meta(response: &Response) -> ResponseMeta {
    ResponseMeta {
        status: response.status().as_u16(),
        request_id: response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

#[async_trait]
impl RepositoryHost for GitLabClient {
    async fn create_branch(&self, project: &str, branch: &NewBranch) -> Result<Branch, RepoError> {
        let url = self.project_endpoint(project, &["repository", "branches"])?;
        let request = self.request(Method::POST, url).json(branch);
        self.send_json(request, &format!("project {project}")).await
    }

    async fn get_branch(&self, project: &str, branch: &str) -> Result<Branch, RepoError> {
        let url = self.project_endpoint(project, &["repository", "branches", branch])?;
        let request = self.request(Method::GET, url);
        self.send_json(request, &format!("branch {branch}")).await
    }

    async fn delete_branch(&self, project: &str, branch: &str) -> Result<ResponseMeta, RepoError> {
        let url = self.project_endpoint(project, &["repository", "branches", branch])?;
        let request = self.request(Method::DELETE, url);
        let response = self.execute(request, &format!("branch {branch}")).await?;
        Ok(response_meta(&response))
    }

    async fn get_file(
        &self,
        project: &str,
        path: &str,
        reference: &str,
    ) -> Result<RepositoryFile, RepoError> {
        let mut url = self.project_endpoint(project, &["repository", "files", path])?;
        url.query_pairs_mut().append_pair("ref", reference);
        let request = self.request(Method::GET, url);
        self.send_json(request, &format!("file {path}@{reference}"))
            .await
    }

    async fn get_project(&self, project: &str) -> Result<Project, RepoError> {
        let url = self.project_endpoint(project, &[])?;
        let request = self.request(Method::GET, url);
        self.send_json(request, &format!("project {project}")).await
    }

    async fn create_commit(&self, project: &str, commit: &NewCommit) -> Result<Commit, RepoError> {
        let url = self.project_endpoint(project, &["repository", "commits"])?;
        let request = self.request(Method::POST, url).json(commit);
        self.send_json(request, &format!("branch {}", commit.branch))
            .await
    }

    async fn create_merge_request(
        &self,
        project: &str,
        merge_request: &NewMergeRequest,
    ) -> Result<MergeRequest, RepoError> {
        let url = self.project_endpoint(project, &["merge_requests"])?;
        let request = self.request(Method::POST, url).json(merge_request);
        self.send_json(request, &format!("project {project}")).await
    }

    async fn add_project_mirror(
        &self,
        project: &str,
        mirror: &NewMirror,
    ) -> Result<ProjectMirror, RepoError> {
        let url = self.project_endpoint(project, &["remote_mirrors"])?;
        let request = self.request(Method::POST, url).json(mirror);
        self.send_json(request, &format!("project {project}")).await
    }
}
