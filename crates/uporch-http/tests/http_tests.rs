use mockito::{Matcher, Server, ServerGuard};
use pretty_assertions::assert_eq;
use serde_json::json;
use uporch_approvals::{
    CreatePolicyRequest, PolicyApi, PolicyId, UpdatePolicyRequest, WorkspaceId,
};
use uporch_core::{
    ClientConfig, PrivateKey, ProjectId, TransportError, UpgradeApi, UpgradeJobStatus,
    UpgradeRequest,
};
use uporch_http::HttpClient;

fn client_for(server: &ServerGuard) -> HttpClient {
    let config = ClientConfig::new()
        .with_api_url(server.url())
        .with_token("tok-1");
    HttpClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_status_in_progress_with_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v2/workspace/proj-1/upgrade/status")
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"IN_PROGRESS"}"#)
        .create_async()
        .await;

    let response = client_for(&server)
        .upgrade_status(&ProjectId::new("proj-1"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status, Some(UpgradeJobStatus::InProgress));
}

#[tokio::test]
async fn test_status_null_and_empty_bodies_mean_no_job() {
    let mut server = Server::new_async().await;
    let _null = server
        .mock("GET", "/api/v2/workspace/a/upgrade/status")
        .with_status(200)
        .with_body(r#"{"status":null}"#)
        .create_async()
        .await;
    let _empty = server
        .mock("GET", "/api/v2/workspace/b/upgrade/status")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let client = client_for(&server);
    let a = client.upgrade_status(&ProjectId::new("a")).await.unwrap();
    let b = client.upgrade_status(&ProjectId::new("b")).await.unwrap();

    assert_eq!(a.status, None);
    assert_eq!(b.status, None);
}

#[tokio::test]
async fn test_status_undecodable_body_is_decode_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v2/workspace/proj-1/upgrade/status")
        .with_status(200)
        .with_body(r#"{"status":"EXPLODED"}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .upgrade_status(&ProjectId::new("proj-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode(_)));
}

#[tokio::test]
async fn test_start_upgrade_posts_project_and_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/workspace/proj-1/upgrade")
        .match_body(Matcher::Json(json!({
            "projectId": "proj-1",
            "privateKey": "pk-secret",
        })))
        .with_status(202)
        .create_async()
        .await;

    client_for(&server)
        .start_upgrade(&UpgradeRequest {
            project_id: ProjectId::new("proj-1"),
            private_key: PrivateKey::new("pk-secret"),
        })
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_carries_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v2/workspace/proj-1/upgrade")
        .with_status(403)
        .with_body("not an admin")
        .create_async()
        .await;

    let err = client_for(&server)
        .start_upgrade(&UpgradeRequest {
            project_id: ProjectId::new("proj-1"),
            private_key: PrivateKey::new("pk"),
        })
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::status(403, "not an admin"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_connection_failure_is_request_error() {
    let config = ClientConfig::new().with_api_url("http://127.0.0.1:1");
    let client = HttpClient::new(&config).unwrap();

    let err = client
        .upgrade_status(&ProjectId::new("proj-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Request(_)));
}

#[tokio::test]
async fn test_create_policy_returns_raw_payload() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/secret-approvals")
        .match_body(Matcher::Json(json!({
            "environment": "prod",
            "workspaceId": "ws-1",
            "approvals": 2,
            "approverUserIds": ["u1", "u2"],
            "secretPath": "/db",
        })))
        .with_status(200)
        .with_body(r#"{"approval":{"id":"pol-9","extra":true}}"#)
        .create_async()
        .await;

    let payload = client_for(&server)
        .create_policy(&CreatePolicyRequest {
            environment: "prod".into(),
            workspace_id: WorkspaceId::new("ws-1"),
            approvals: 2,
            approver_user_ids: vec!["u1".into(), "u2".into()],
            secret_path: Some("/db".into()),
            name: None,
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(payload, json!({"approval": {"id": "pol-9", "extra": true}}));
}

#[tokio::test]
async fn test_update_policy_patches_by_id_without_routing_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PATCH", "/api/v1/secret-approvals/pol-1")
        .match_body(Matcher::Json(json!({ "approvals": 3 })))
        .with_status(200)
        .with_body(r#"{"approval":{"id":"pol-1"}}"#)
        .create_async()
        .await;

    let request = UpdatePolicyRequest::new("pol-1", "ws-1").with_approvals(3);
    client_for(&server).update_policy(&request).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_policy() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/api/v1/secret-approvals/pol-1")
        .with_status(200)
        .with_body(r#"{"approval":{"id":"pol-1"}}"#)
        .create_async()
        .await;

    let payload = client_for(&server)
        .delete_policy(&PolicyId::new("pol-1"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(payload["approval"]["id"], "pol-1");
}

#[tokio::test]
async fn test_list_policies_by_workspace() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/secret-approvals")
        .match_query(Matcher::UrlEncoded("workspaceId".into(), "ws-1".into()))
        .with_status(200)
        .with_body(
            r#"{"approvals":[
                {"id":"pol-1","workspaceId":"ws-1","environment":"prod","approvals":2,"approvers":["u1"]},
                {"id":"pol-2"}
            ]}"#,
        )
        .create_async()
        .await;

    let policies = client_for(&server)
        .list_policies(&WorkspaceId::new("ws-1"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(policies.len(), 2);
    assert_eq!(policies[0].id, PolicyId::new("pol-1"));
    assert_eq!(policies[0].approvals, 2);
    assert_eq!(policies[0].approvers, vec!["u1".to_string()]);
    assert_eq!(policies[1].environment, None);
}
