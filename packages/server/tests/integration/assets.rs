use crate::common::{TestApp, routes};

const OWNER: i64 = 42;
const OTHER: i64 = 7;

#[tokio::test]
async fn uploaded_asset_downloads_byte_for_byte() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;
    let payload: Vec<u8> = (0..200 * 1024).map(|i| (i % 251) as u8).collect();

    let res = app
        .put_bytes_as(
            OWNER,
            &routes::asset(&id, "trace.bin"),
            "application/octet-stream",
            payload.clone(),
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["filename"], "trace.bin");
    assert_eq!(res.body["size"], payload.len() as u64);
    assert_eq!(res.body["success"], true);

    let download = app.get_raw_as(OWNER, &routes::asset(&id, "trace.bin")).await;
    assert_eq!(download.status(), 200);
    assert_eq!(
        download.headers()["content-length"],
        payload.len().to_string().as_str()
    );
    assert!(
        download.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("trace.bin")
    );
    assert!(download.headers().contains_key("last-modified"));
    let bytes = download.bytes().await.unwrap();
    assert_eq!(bytes.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn download_keeps_uploaded_content_type() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;
    let res = app
        .put_bytes_as(OWNER, &routes::asset(&id, "plot.png"), "image/png", vec![0x89, b'P'])
        .await;
    assert_eq!(res.status, 201);

    let download = app.get_raw_as(OWNER, &routes::asset(&id, "plot.png")).await;
    assert_eq!(download.headers()["content-type"], "image/png");
}

#[tokio::test]
async fn empty_asset_round_trips() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;
    app.upload_asset(OWNER, &id, "empty.txt", Vec::new()).await;

    let download = app.get_raw_as(OWNER, &routes::asset(&id, "empty.txt")).await;
    assert_eq!(download.status(), 200);
    assert!(download.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn reupload_replaces_previous_asset() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;
    app.upload_asset(OWNER, &id, "notes.txt", b"first draft".to_vec())
        .await;
    app.upload_asset(OWNER, &id, "notes.txt", b"final".to_vec()).await;

    let list = app.get_as(OWNER, &routes::assets(&id)).await;
    assert_eq!(list.status, 200);
    assert_eq!(list.body["total"], 1);
    assert_eq!(list.body["assets"][0]["filename"], "notes.txt");
    assert_eq!(list.body["assets"][0]["size"], 5);

    let download = app.get_raw_as(OWNER, &routes::asset(&id, "notes.txt")).await;
    assert_eq!(download.bytes().await.unwrap().as_ref(), b"final");
}

#[tokio::test]
async fn listing_excludes_document_body() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;
    app.upload_asset(OWNER, &id, "b.txt", b"b".to_vec()).await;
    app.upload_asset(OWNER, &id, "a.txt", b"a".to_vec()).await;

    let list = app.get_as(OWNER, &routes::assets(&id)).await;

    let names: Vec<_> = list.body["assets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["filename"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn fresh_document_has_no_assets() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;

    let list = app.get_as(OWNER, &routes::assets(&id)).await;

    assert_eq!(list.status, 200);
    assert_eq!(list.body["total"], 0);
}

#[tokio::test]
async fn deleted_asset_is_gone() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;
    app.upload_asset(OWNER, &id, "drop.txt", b"x".to_vec()).await;

    let res = app.delete_as(OWNER, &routes::asset(&id, "drop.txt")).await;
    assert_eq!(res.status, 204);

    let download = app.get_raw_as(OWNER, &routes::asset(&id, "drop.txt")).await;
    assert_eq!(download.status(), 404);
    let again = app.delete_as(OWNER, &routes::asset(&id, "drop.txt")).await;
    assert_eq!(again.status, 404);

    // The document itself is untouched.
    assert_eq!(app.get_as(OWNER, &routes::feedback(&id)).await.status, 200);
}

#[tokio::test]
async fn missing_asset_is_not_found() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;

    let download = app.get_raw_as(OWNER, &routes::asset(&id, "nope.txt")).await;

    assert_eq!(download.status(), 404);
}

#[tokio::test]
async fn hidden_filenames_are_rejected() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;

    let res = app
        .put_bytes_as(OWNER, &routes::asset(&id, ".env"), "text/plain", b"x".to_vec())
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(app.objects_of(&id).await.len(), 1);
}

#[tokio::test]
async fn oversized_upload_is_rejected_without_writing() {
    let app = TestApp::spawn_with_max_asset_size(16).await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;

    let res = app
        .put_bytes_as(
            OWNER,
            &routes::asset(&id, "big.bin"),
            "application/octet-stream",
            vec![0u8; 64],
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "PROTOCOL_VIOLATION");
    assert_eq!(app.objects_of(&id).await.len(), 1);
}

#[tokio::test]
async fn assets_of_other_users_documents_are_forbidden() {
    let app = TestApp::spawn().await;
    let id = app.create_feedback(OWNER, 1, "t", "body").await;
    app.upload_asset(OWNER, &id, "private.txt", b"x".to_vec()).await;

    let upload = app
        .put_bytes_as(OTHER, &routes::asset(&id, "evil.txt"), "text/plain", b"x".to_vec())
        .await;
    assert_eq!(upload.status, 403);

    let download = app.get_raw_as(OTHER, &routes::asset(&id, "private.txt")).await;
    assert_eq!(download.status(), 403);

    let list = app.get_as(OTHER, &routes::assets(&id)).await;
    assert_eq!(list.status, 403);
}

#[tokio::test]
async fn upload_to_unknown_document_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .put_bytes_as(
            OWNER,
            &routes::asset(&uuid::Uuid::now_v7().to_string(), "a.txt"),
            "text/plain",
            b"x".to_vec(),
        )
        .await;

    assert_eq!(res.status, 404);
}
