mod helpers;

use audiomill_storage::BlobStore;
use axum::http::StatusCode;
use bytes::Bytes;
use helpers::*;

#[tokio::test]
async fn download_without_token_is_unauthorized() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&api_path("/download"))
        .add_query_param("blob_id", uuid::Uuid::new_v4().to_string())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unprivileged_download_is_forbidden() {
    let app = setup_test_app().await;
    let token = login(&app, UNPRIVILEGED_USER, UNPRIVILEGED_SECRET).await;

    // The blob exists; privilege is checked regardless.
    let id = app
        .product_store
        .put(Bytes::from_static(b"mp3 bytes"))
        .await
        .unwrap();

    let response = app
        .server
        .get(&api_path("/download"))
        .add_query_param("blob_id", id.to_string())
        .add_header("Authorization", format!("Bearer {}", token))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn privileged_download_of_missing_blob_is_not_found() {
    let app = setup_test_app().await;
    let token = login(&app, PRIVILEGED_USER, PRIVILEGED_SECRET).await;

    let response = app
        .server
        .get(&api_path("/download"))
        .add_query_param("blob_id", uuid::Uuid::new_v4().to_string())
        .add_header("Authorization", format!("Bearer {}", token))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn privileged_download_streams_the_artifact() {
    let app = setup_test_app().await;
    let token = login(&app, PRIVILEGED_USER, PRIVILEGED_SECRET).await;

    let id = app
        .product_store
        .put(Bytes::from_static(b"mp3 bytes"))
        .await
        .unwrap();

    let response = app
        .server
        .get(&api_path("/download"))
        .add_query_param("blob_id", id.to_string())
        .add_header("Authorization", format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/mpeg"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(&format!("{}.mp3", id)));
    assert_eq!(response.as_bytes().as_ref(), b"mp3 bytes");
}

#[tokio::test]
async fn malformed_blob_id_is_bad_request() {
    let app = setup_test_app().await;
    let token = login(&app, PRIVILEGED_USER, PRIVILEGED_SECRET).await;

    let response = app
        .server
        .get(&api_path("/download"))
        .add_query_param("blob_id", "not-a-uuid")
        .add_header("Authorization", format!("Bearer {}", token))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_blob_id_parameter_is_rejected() {
    let app = setup_test_app().await;
    let token = login(&app, PRIVILEGED_USER, PRIVILEGED_SECRET).await;

    let response = app
        .server
        .get(&api_path("/download"))
        .add_header("Authorization", format!("Bearer {}", token))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
