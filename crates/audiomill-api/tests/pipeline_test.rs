//! End-to-end pipeline: upload → convert → notify → download.

mod helpers;

use audiomill_core::constants::{TOPIC_MP3, TOPIC_VIDEO};
use audiomill_core::Job;
use audiomill_queue::JobQueue;
use audiomill_worker::{ConversionWorker, Disposition, NotificationDispatcher};
use axum_test::multipart::{MultipartForm, Part};
use helpers::*;
use std::sync::Arc;
use std::time::Duration;

fn conversion_worker(app: &TestApp, codec: StubCodec) -> ConversionWorker {
    ConversionWorker::new(
        app.state.queue.clone(),
        app.state.source_store.clone(),
        app.state.product_store.clone(),
        Arc::new(codec),
        Duration::from_secs(5),
    )
}

async fn upload_clip(app: &TestApp, token: &str) -> serde_json::Value {
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"fake mp4 bytes".to_vec())
            .file_name("clip.mp4")
            .mime_type("video/mp4"),
    );
    let response = app
        .server
        .post(&api_path("/media"))
        .add_header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .await;
    response.assert_status_ok();
    response.json::<serde_json::Value>()
}

#[tokio::test]
async fn fault_free_round_trip_produces_one_artifact_and_one_notification() {
    let app = setup_test_app().await;
    let token = login(&app, PRIVILEGED_USER, PRIVILEGED_SECRET).await;

    // Ingress: one source blob, one video message owned by alice.
    let receipt = upload_clip(&app, &token).await;
    assert_eq!(app.source_store.len(), 1);
    assert_eq!(app.queue.ready_len(TOPIC_VIDEO), 1);

    // Conversion: video message acked, one mp3 message, one product blob.
    let worker = conversion_worker(
        &app,
        StubCodec {
            output: b"mp3 bytes".to_vec(),
            fail: false,
        },
    );
    assert_eq!(worker.process_one().await, Some(Disposition::Completed));
    assert_eq!(app.queue.ready_len(TOPIC_VIDEO), 0);
    assert_eq!(app.queue.in_flight_len(), 0);
    assert_eq!(app.queue.ready_len(TOPIC_MP3), 1);
    assert_eq!(app.product_store.len(), 1);

    // Notification: mp3 message acked, exactly one delivery to the owner
    // naming the product blob.
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = NotificationDispatcher::new(app.state.queue.clone(), transport.clone());
    assert_eq!(dispatcher.process_one().await, Some(Disposition::Completed));
    assert_eq!(app.queue.ready_len(TOPIC_MP3), 0);
    assert_eq!(app.queue.in_flight_len(), 0);

    let deliveries = transport.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, PRIVILEGED_USER);

    // Extract the product id from the notification body and download it.
    let product_id = deliveries[0]
        .1
        .split_whitespace()
        .find_map(|w| w.parse::<uuid::Uuid>().ok())
        .expect("notification names the product blob id");

    let response = app
        .server
        .get(&api_path("/download"))
        .add_query_param("blob_id", product_id.to_string())
        .add_header("Authorization", format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"mp3 bytes");

    // Fault-free run: nothing dead-lettered, no spurious messages.
    assert_eq!(app.queue.dead_letter_len(), 0);
    // The receipt's source blob id is a real identifier, distinct from the product.
    let source_id: uuid::Uuid = receipt["source_blob_id"].as_str().unwrap().parse().unwrap();
    assert_ne!(source_id, product_id);
}

#[tokio::test]
async fn codec_failure_keeps_job_on_video_topic_with_no_partial_output() {
    let app = setup_test_app().await;
    let token = login(&app, PRIVILEGED_USER, PRIVILEGED_SECRET).await;
    upload_clip(&app, &token).await;

    let worker = conversion_worker(
        &app,
        StubCodec {
            output: Vec::new(),
            fail: true,
        },
    );
    assert_eq!(worker.process_one().await, Some(Disposition::Requeued));

    // No orphaned partial output; original message not acknowledged.
    assert!(app.product_store.is_empty());
    assert_eq!(app.queue.ready_len(TOPIC_MP3), 0);
    assert_eq!(app.queue.ready_len(TOPIC_VIDEO), 1);
}

#[tokio::test]
async fn redelivery_after_worker_crash_completes_the_job() {
    let app = setup_test_app().await;
    let token = login(&app, PRIVILEGED_USER, PRIVILEGED_SECRET).await;
    upload_clip(&app, &token).await;

    // A first worker claims the message and dies before resolving it; the
    // queue returns the delivery for another consumer.
    let _stranded = app.queue.try_consume(TOPIC_VIDEO).await.unwrap().unwrap();
    app.queue.requeue_in_flight();

    let worker = conversion_worker(
        &app,
        StubCodec {
            output: b"mp3 bytes".to_vec(),
            fail: false,
        },
    );
    assert_eq!(worker.process_one().await, Some(Disposition::Completed));

    // State is intact: one product, one mp3 message, nothing stuck.
    assert_eq!(app.product_store.len(), 1);
    assert_eq!(app.queue.ready_len(TOPIC_MP3), 1);
    assert_eq!(app.queue.in_flight_len(), 0);

    let delivery = app.queue.try_consume(TOPIC_MP3).await.unwrap().unwrap();
    let job = Job::from_payload(&delivery.payload).unwrap();
    assert_eq!(job.owner_principal, PRIVILEGED_USER);
    assert!(job.product_blob_id.is_some());
}
