use ::common::storage::BlobStore;
use sea_orm::EntityTrait;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use feedback_server::entity::feedback_file;

use crate::common::{TestApp, routes};

const OWNER: i64 = 42;
const OTHER: i64 = 7;

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

mod create {
    use super::*;

    #[tokio::test]
    async fn created_document_can_be_read_back() {
        let app = TestApp::spawn().await;
        let body = "# Lab 1\n\nClean solution, watch the edge cases.";

        let res = app
            .post_as(
                OWNER,
                routes::FEEDBACK,
                &json!({"lab_id": 1, "title": "Lab 1 review", "content": body}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["owner_id"], OWNER);
        assert_eq!(res.body["lab_id"], 1);
        assert_eq!(res.body["content_hash"], sha256_hex(body));
        assert!(Uuid::parse_str(res.body["id"].as_str().unwrap()).is_ok());

        let fetched = app.get_as(OWNER, &routes::feedback(&res.id())).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["content"], body);
        assert_eq!(fetched.body["title"], "Lab 1 review");
        assert_eq!(fetched.body["content_hash"], res.body["content_hash"]);
    }

    #[tokio::test]
    async fn content_is_stored_as_markdown_object() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "t", "body").await;

        let objects = app.objects_of(&id).await;
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, format!("{id}/content.md"));
        assert_eq!(objects[0].content_type, "text/markdown");
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_anonymous(
                routes::FEEDBACK,
                &json!({"lab_id": 1, "title": "t", "content": "c"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "IDENTITY_MISSING");
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_as(
                OWNER,
                routes::FEEDBACK,
                &json!({"lab_id": 1, "title": "  ", "content": "c"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_body_gets_structured_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_as(OWNER, routes::FEEDBACK, &json!({"title": "no lab"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn other_users_cannot_read() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "private", "secret").await;

        let res = app.get_as(OTHER, &routes::feedback(&id)).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get_as(OWNER, &routes::feedback(&Uuid::now_v7().to_string()))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_as(OWNER, &routes::feedback("not-a-uuid")).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn missing_content_object_is_not_found() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "t", "body").await;
        app.blobs.delete(&format!("{id}/content.md")).await.unwrap();

        let res = app.get_as(OWNER, &routes::feedback(&id)).await;

        assert_eq!(res.status, 404);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn empty_title_keeps_title_and_replaces_content() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "Original", "old body").await;

        let res = app
            .patch_as(
                OWNER,
                &routes::feedback(&id),
                &json!({"title": "", "content": "new body"}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Original");
        assert_eq!(res.body["content"], "new body");
        assert_eq!(res.body["content_hash"], sha256_hex("new body"));

        let fetched = app.get_as(OWNER, &routes::feedback(&id)).await;
        assert_eq!(fetched.body["content"], "new body");
        assert_eq!(fetched.body["content_hash"], sha256_hex("new body"));
    }

    #[tokio::test]
    async fn title_only_update_keeps_content_and_hash() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "Original", "body").await;

        let res = app
            .patch_as(OWNER, &routes::feedback(&id), &json!({"title": "Renamed"}))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["title"], "Renamed");
        assert_eq!(res.body["content"], "body");
        assert_eq!(res.body["content_hash"], sha256_hex("body"));
    }

    #[tokio::test]
    async fn stale_precondition_conflicts() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "t", "body").await;
        let original = app.get_as(OWNER, &routes::feedback(&id)).await;
        let read_at = original.body["updated_at"].clone();

        let first = app
            .patch_as(
                OWNER,
                &routes::feedback(&id),
                &json!({"title": "first", "expected_updated_at": read_at}),
            )
            .await;
        assert_eq!(first.status, 200, "{}", first.text);

        let second = app
            .patch_as(
                OWNER,
                &routes::feedback(&id),
                &json!({"title": "second", "expected_updated_at": read_at}),
            )
            .await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["code"], "CONFLICT");

        let fetched = app.get_as(OWNER, &routes::feedback(&id)).await;
        assert_eq!(fetched.body["title"], "first");
    }

    #[tokio::test]
    async fn other_users_cannot_update() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "t", "body").await;

        let res = app
            .patch_as(OTHER, &routes::feedback(&id), &json!({"content": "hijack"}))
            .await;

        assert_eq!(res.status, 403);
        let fetched = app.get_as(OWNER, &routes::feedback(&id)).await;
        assert_eq!(fetched.body["content"], "body");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_content_assets_and_metadata() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "t", "body").await;
        app.upload_asset(OWNER, &id, "a.png", vec![1, 2, 3]).await;
        app.upload_asset(OWNER, &id, "b.txt", b"notes".to_vec()).await;
        assert_eq!(app.objects_of(&id).await.len(), 3);

        let res = app.delete_as(OWNER, &routes::feedback(&id)).await;
        assert_eq!(res.status, 204);

        assert!(app.objects_of(&id).await.is_empty());
        let row = feedback_file::Entity::find_by_id(Uuid::parse_str(&id).unwrap())
            .one(&app.db)
            .await
            .unwrap();
        assert!(row.is_none());
        assert_eq!(app.get_as(OWNER, &routes::feedback(&id)).await.status, 404);
        assert_eq!(app.get_as(OWNER, &routes::assets(&id)).await.status, 404);
    }

    #[tokio::test]
    async fn other_users_cannot_delete() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "t", "body").await;

        let res = app.delete_as(OTHER, &routes::feedback(&id)).await;

        assert_eq!(res.status, 403);
        assert_eq!(app.objects_of(&id).await.len(), 1);
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let app = TestApp::spawn().await;
        let id = app.create_feedback(OWNER, 1, "t", "body").await;

        assert_eq!(app.delete_as(OWNER, &routes::feedback(&id)).await.status, 204);
        assert_eq!(app.delete_as(OWNER, &routes::feedback(&id)).await.status, 404);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn pages_are_newest_first() {
        let app = TestApp::spawn().await;
        for i in 1..=5 {
            app.create_feedback(OWNER, 1, &format!("r{i}"), "body").await;
        }

        let res = app
            .get_as(OWNER, &format!("{}?page=2&per_page=2", routes::FEEDBACK))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let titles: Vec<_> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["r3", "r2"]);
        assert_eq!(res.body["pagination"]["total"], 5);
        assert_eq!(res.body["pagination"]["total_pages"], 3);
        assert_eq!(res.body["pagination"]["page"], 2);
        assert!(res.body["data"][0].get("content").is_none());
    }

    #[tokio::test]
    async fn only_own_documents_are_listed() {
        let app = TestApp::spawn().await;
        app.create_feedback(OWNER, 1, "mine", "body").await;
        app.create_feedback(OTHER, 1, "theirs", "body").await;

        let res = app.get_as(OWNER, routes::FEEDBACK).await;

        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["title"], "mine");
    }

    #[tokio::test]
    async fn lab_filter_narrows_results() {
        let app = TestApp::spawn().await;
        app.create_feedback(OWNER, 1, "lab1", "body").await;
        app.create_feedback(OWNER, 2, "lab2-a", "body").await;
        app.create_feedback(OWNER, 2, "lab2-b", "body").await;

        let res = app
            .get_as(OWNER, &format!("{}?lab_id=2", routes::FEEDBACK))
            .await;

        assert_eq!(res.body["pagination"]["total"], 2);
        assert_eq!(res.body["data"][0]["title"], "lab2-b");
        assert_eq!(res.body["data"][1]["title"], "lab2-a");
    }

    #[tokio::test]
    async fn per_page_is_clamped() {
        let app = TestApp::spawn().await;
        app.create_feedback(OWNER, 1, "only", "body").await;

        let res = app
            .get_as(OWNER, &format!("{}?per_page=1000", routes::FEEDBACK))
            .await;

        assert_eq!(res.body["pagination"]["per_page"], 100);
    }
}

#[tokio::test]
async fn openapi_document_lists_feedback_routes() {
    let app = TestApp::spawn().await;

    let res = app.get_anonymous(routes::OPENAPI).await;

    assert_eq!(res.status, 200);
    let paths = res.body["paths"].as_object().unwrap();
    assert!(
        paths
            .keys()
            .any(|p| p.trim_end_matches('/') == "/api/v1/feedback")
    );
    assert!(paths.contains_key("/api/v1/feedback/{id}/assets/{filename}"));
}
