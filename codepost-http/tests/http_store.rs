use codepost_core::{
    ApiKey, AssignmentId, ClientConfig, FileId, FileSpec, ResourceKind, StoreError, SubmissionId,
};
use codepost_http::HttpStore;
use codepost_upload::{ResourceStore, SubmissionQuery};
use mockito::Matcher;
use serde_json::json;

const KEY: &str = "0123456789abcdef0123456789abcdef01234567";

fn store_for(base_url: String) -> HttpStore {
    HttpStore::new(&ClientConfig::new(ApiKey::new(KEY), base_url))
}

fn submission_body(id: u64, grader: &str) -> String {
    json!({
        "id": id,
        "assignment": 1,
        "students": ["a@x.edu"],
        "grader": grader,
        "isFinalized": false,
        "files": [11],
        "dateEdited": "2024-03-01T12:00:00Z"
    })
    .to_string()
}

#[test]
fn list_filters_by_student_and_authenticates() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/assignments/1/submissions")
        .match_header("authorization", format!("Token {KEY}").as_str())
        .match_query(Matcher::UrlEncoded("student".into(), "a@x.edu".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!("[{}]", submission_body(5, "")))
        .create();

    let store = store_for(server.url());
    let found = store
        .list_submissions(AssignmentId(1), &SubmissionQuery::student("a@x.edu".into()))
        .expect("list");

    mock.assert();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, SubmissionId(5));
    assert!(!found[0].is_claimed());
}

#[test]
fn create_file_posts_name_code_and_extension() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/files/")
        .match_body(Matcher::Json(json!({
            "submission": 5,
            "name": "t.py",
            "code": "print(1)\n",
            "extension": "py"
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 12,
                "submission": 5,
                "name": "t.py",
                "code": "print(1)\n",
                "extension": "py",
                "comments": []
            })
            .to_string(),
        )
        .create();

    let store = store_for(server.url());
    let file = store
        .create_file(SubmissionId(5), &FileSpec::new("t.py", "py", "print(1)\n"))
        .expect("create");

    mock.assert();
    assert_eq!(file.id, FileId(12));
}

#[test]
fn unclaim_clears_grader_and_finalized() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PATCH", "/submissions/5/")
        .match_body(Matcher::Json(json!({ "grader": "", "isFinalized": false })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(submission_body(5, ""))
        .create();

    store_for(server.url())
        .unclaim_submission(SubmissionId(5))
        .expect("unclaim");
    mock.assert();
}

#[test]
fn not_found_names_the_resource() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/submissions/9/")
        .with_status(404)
        .with_body(r#"{"detail": "Not found."}"#)
        .create();

    let err = store_for(server.url()).get_submission(SubmissionId(9)).unwrap_err();
    assert_eq!(
        err,
        StoreError::NotFound {
            kind: ResourceKind::Submission,
            id: 9
        }
    );
}

#[test]
fn duplicate_submission_is_a_bad_request() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/submissions/")
        .with_status(400)
        .with_body(r#"{"non_field_errors": ["duplicate"]}"#)
        .create();

    let err = store_for(server.url())
        .create_submission(AssignmentId(1), &["a@x.edu".into()])
        .unwrap_err();
    match err {
        StoreError::BadRequest { detail } => assert!(detail.contains("existing resource")),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[test]
fn unreadable_body_is_a_decode_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/files/3/")
        .with_status(200)
        .with_body("not json")
        .create();

    let err = store_for(server.url()).get_file(FileId(3)).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Decode {
            kind: ResourceKind::File,
            ..
        }
    ));
}

#[test]
fn unreachable_host_is_a_transport_error() {
    let store = HttpStore::new(&ClientConfig::new(ApiKey::new(KEY), "http://127.0.0.1:1"));
    let err = store.delete_comment(7.into()).unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}
