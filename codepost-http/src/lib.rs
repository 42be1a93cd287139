//! # codepost-http
//!
//! [`ResourceStore`] backed by the codePost REST API.
//!
//! Requests are blocking, authenticated with `Authorization: Token <key>` and
//! never retried. Error statuses are mapped onto [`StoreError`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use ureq::{Agent, AgentBuilder, Request, Response};

use codepost_core::{
    ApiKey, AssignmentId, ClientConfig, CommentId, File, FileId, FileSpec, GraderEmail,
    ResourceKind, StoreError, StudentEmail, Submission, SubmissionId,
};
use codepost_upload::{ResourceStore, SubmissionQuery};

const TIMEOUT: Duration = Duration::from_secs(60);

/// Key the API uses in a 400 body when the request duplicates a resource.
const NON_FIELD_ERRORS: &str = "non_field_errors";

/// The resource a request addresses, for error reporting.
#[derive(Debug, Clone, Copy)]
struct Target {
    kind: ResourceKind,
    id: u64,
}

impl Target {
    fn new(kind: ResourceKind, id: impl Into<u64>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Blocking client for the codePost API.
pub struct HttpStore {
    agent: Agent,
    base_url: String,
    api_key: ApiKey,
}

impl HttpStore {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = AgentBuilder::new().timeout(TIMEOUT).build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str) -> Request {
        tracing::debug!(%method, %path, "codePost request");
        self.agent
            .request(method, &self.url(path))
            .set("Authorization", &format!("Token {}", self.api_key.expose()))
    }

    fn execute(
        &self,
        request: Request,
        body: Option<Value>,
        target: Target,
    ) -> Result<Response, StoreError> {
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        result.map_err(|err| match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                classify_status(status, &body, target.kind, target.id)
            }
            ureq::Error::Transport(transport) => StoreError::Transport(transport.to_string()),
        })
    }

    fn fetch<T: DeserializeOwned>(
        &self,
        request: Request,
        body: Option<Value>,
        target: Target,
    ) -> Result<T, StoreError> {
        self.execute(request, body, target)?
            .into_json()
            .map_err(|e| StoreError::Decode {
                kind: target.kind,
                reason: e.to_string(),
            })
    }

    fn discard(
        &self,
        request: Request,
        body: Option<Value>,
        target: Target,
    ) -> Result<(), StoreError> {
        self.execute(request, body, target).map(|_| ())
    }
}

impl ResourceStore for HttpStore {
    fn api_key(&self) -> Option<&ApiKey> {
        Some(&self.api_key)
    }

    fn list_submissions(
        &self,
        assignment: AssignmentId,
        query: &SubmissionQuery,
    ) -> Result<Vec<Submission>, StoreError> {
        let mut request = self.request("GET", &format!("/assignments/{assignment}/submissions"));
        if let Some(student) = &query.student {
            request = request.query("student", &student.0);
        }
        if let Some(grader) = &query.grader {
            request = request.query("grader", &grader.0);
        }
        self.fetch(request, None, Target::new(ResourceKind::Assignment, assignment.0))
    }

    fn create_submission(
        &self,
        assignment: AssignmentId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError> {
        let body = json!({ "assignment": assignment, "students": students });
        self.fetch(
            self.request("POST", "/submissions/"),
            Some(body),
            Target::new(ResourceKind::Assignment, assignment.0),
        )
    }

    fn get_submission(&self, id: SubmissionId) -> Result<Submission, StoreError> {
        self.fetch(
            self.request("GET", &format!("/submissions/{id}/")),
            None,
            Target::new(ResourceKind::Submission, id.0),
        )
    }

    fn update_submission_students(
        &self,
        id: SubmissionId,
        students: &[StudentEmail],
    ) -> Result<Submission, StoreError> {
        self.fetch(
            self.request("PATCH", &format!("/submissions/{id}/")),
            Some(json!({ "students": students })),
            Target::new(ResourceKind::Submission, id.0),
        )
    }

    fn set_submission_grader(
        &self,
        id: SubmissionId,
        grader: Option<&GraderEmail>,
    ) -> Result<(), StoreError> {
        let body = match grader {
            Some(grader) => json!({ "grader": grader }),
            None => json!({ "grader": "", "isFinalized": false }),
        };
        self.discard(
            self.request("PATCH", &format!("/submissions/{id}/")),
            Some(body),
            Target::new(ResourceKind::Submission, id.0),
        )
    }

    fn delete_submission(&self, id: SubmissionId) -> Result<(), StoreError> {
        self.discard(
            self.request("DELETE", &format!("/submissions/{id}/")),
            None,
            Target::new(ResourceKind::Submission, id.0),
        )
    }

    fn get_file(&self, id: FileId) -> Result<File, StoreError> {
        self.fetch(
            self.request("GET", &format!("/files/{id}/")),
            None,
            Target::new(ResourceKind::File, id.0),
        )
    }

    fn create_file(&self, submission: SubmissionId, spec: &FileSpec) -> Result<File, StoreError> {
        let body = json!({
            "submission": submission,
            "name": spec.name,
            "code": spec.code,
            "extension": spec.extension,
        });
        self.fetch(
            self.request("POST", "/files/"),
            Some(body),
            Target::new(ResourceKind::Submission, submission.0),
        )
    }

    fn delete_file(&self, id: FileId) -> Result<(), StoreError> {
        self.discard(
            self.request("DELETE", &format!("/files/{id}/")),
            None,
            Target::new(ResourceKind::File, id.0),
        )
    }

    fn delete_comment(&self, id: CommentId) -> Result<(), StoreError> {
        self.discard(
            self.request("DELETE", &format!("/comments/{id}/")),
            None,
            Target::new(ResourceKind::Comment, id.0),
        )
    }
}

/// Map an error status and its body onto a [`StoreError`].
pub fn classify_status(status: u16, body: &str, kind: ResourceKind, id: u64) -> StoreError {
    match status {
        400 => StoreError::BadRequest {
            detail: bad_request_detail(body),
        },
        401 => StoreError::Unauthenticated,
        403 => StoreError::Forbidden { kind, id },
        404 => StoreError::NotFound { kind, id },
        _ => StoreError::Server {
            status,
            body: body.trim().to_string(),
        },
    }
}

/// Explain a 400 response from its JSON body.
///
/// The API answers with an object keyed by offending field, or by
/// `non_field_errors` when the request duplicates an existing resource.
pub fn bad_request_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) if fields.contains_key(NON_FIELD_ERRORS) => {
            "the parameters describe an existing resource".to_string()
        }
        Ok(Value::Object(fields)) => {
            let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            format!("missing fields: {}", keys.join(", "))
        }
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(
            classify_status(401, "", ResourceKind::File, 1),
            StoreError::Unauthenticated
        );
        assert_eq!(
            classify_status(403, "", ResourceKind::File, 1),
            StoreError::Forbidden {
                kind: ResourceKind::File,
                id: 1
            }
        );
        assert_eq!(
            classify_status(404, "", ResourceKind::Submission, 7),
            StoreError::NotFound {
                kind: ResourceKind::Submission,
                id: 7
            }
        );
        assert_eq!(
            classify_status(502, " bad gateway\n", ResourceKind::File, 1),
            StoreError::Server {
                status: 502,
                body: "bad gateway".into()
            }
        );
    }

    #[test]
    fn duplicate_resource_detail() {
        let detail = bad_request_detail(r#"{"non_field_errors": ["already exists"]}"#);
        assert_eq!(detail, "the parameters describe an existing resource");
    }

    #[test]
    fn missing_fields_detail() {
        let detail = bad_request_detail(r#"{"name": ["required"], "code": ["required"]}"#);
        assert!(detail.starts_with("missing fields: "));
        assert!(detail.contains("name"));
        assert!(detail.contains("code"));
    }

    #[test]
    fn non_json_detail_is_passed_through() {
        assert_eq!(bad_request_detail("nope\n"), "nope");
    }

    #[test]
    fn urls_join_base_and_path() {
        let config = ClientConfig::new(ApiKey::new("k"), "https://api.codepost.io/");
        let store = HttpStore::new(&config);
        assert_eq!(store.base_url(), "https://api.codepost.io");
        assert_eq!(
            store.url("/submissions/3/"),
            "https://api.codepost.io/submissions/3/"
        );
        assert_eq!(store.api_key().map(ApiKey::expose), Some("k"));
    }
}
