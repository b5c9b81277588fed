//! Playback timer behavior observed through renderer element streams
//!
//! Runs on tokio's paused clock so every tick is deterministic.

use std::sync::Arc;
use std::time::Duration;

use media_service::{
    MediaService, RendererObject, RendererUpdate, Request, SequentialIds, ServiceConfig,
};
use media_service::{Element, Subscription};
use serde_json::json;

fn service(config: ServiceConfig) -> MediaService {
    MediaService::builder()
        .with_config(config)
        .with_id_generator(Arc::new(SequentialIds::new("id")))
        .build()
        .unwrap()
}

fn subscribe(service: &MediaService) -> (String, Subscription<Element<RendererObject>>) {
    let id = service.renderers().ids().remove(0);
    let mut sub = service.renderers().subscribe(&id).unwrap();
    // Drop the replayed initial snapshot
    sub.try_recv().unwrap();
    (id, sub)
}

#[tokio::test(start_paused = true)]
async fn test_one_offset_event_per_tick() {
    let service = service(ServiceConfig::default());
    let (id, mut sub) = subscribe(&service);

    let response = service.handle(Request::Update {
        resource: "renderers".into(),
        element: id.clone(),
        payload: json!({ "state": "play" }),
    });
    assert!(response.is_ok());

    let started = sub.recv().await.unwrap();
    assert_eq!(started.properties_changed, vec!["state"]);

    let mut previous = started.data.offset;
    for _ in 0..5 {
        let tick = sub.recv().await.unwrap();
        assert_eq!(tick.properties_changed, vec!["offset"]);
        assert_eq!(tick.data.offset, previous + 1000);
        assert!(tick.last_update >= started.last_update);
        previous = tick.data.offset;
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_leaving_play() {
    let service = service(ServiceConfig::default());
    let (id, mut sub) = subscribe(&service);
    let renderers = service.renderers();

    renderers.update(&id, RendererUpdate::state("play")).unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    renderers.update(&id, RendererUpdate::state("stop")).unwrap();

    let before: Vec<_> = sub.try_iter().collect();
    let changes: Vec<_> = before.iter().map(|e| e.properties_changed.clone()).collect();
    assert_eq!(
        changes,
        vec![vec!["state"], vec!["offset"], vec!["offset"], vec!["state"]]
    );

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(sub.try_recv().is_none());
    assert_eq!(renderers.get(&id).unwrap().data.offset, 2000);
    assert!(!renderers.is_playing(&id));
}

#[tokio::test(start_paused = true)]
async fn test_configured_tick_interval() {
    let service = service(ServiceConfig::fast_ticks());
    let (id, mut sub) = subscribe(&service);

    service
        .renderers()
        .update(&id, RendererUpdate::state("play"))
        .unwrap();
    sub.recv().await.unwrap();

    let tick = sub.recv().await.unwrap();
    assert_eq!(tick.data.offset, 100);
    let tick = sub.recv().await.unwrap();
    assert_eq!(tick.data.offset, 200);
}

#[tokio::test(start_paused = true)]
async fn test_shuffle_while_playing_keeps_ticker() {
    let service = service(ServiceConfig::default());
    let (id, mut sub) = subscribe(&service);
    let renderers = service.renderers();

    renderers.update(&id, RendererUpdate::state("play")).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    renderers
        .update(&id, RendererUpdate::default().with_shuffle("on"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let events: Vec<_> = sub.try_iter().collect();
    let changes: Vec<_> = events.iter().map(|e| e.properties_changed.clone()).collect();
    assert_eq!(
        changes,
        vec![vec!["state"], vec!["offset"], vec!["shuffle"], vec!["offset"]]
    );
    assert_eq!(events[3].data.shuffle, media_service::Shuffle::On);
    assert_eq!(events[3].data.offset, 2000);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_service_stops_playback() {
    let service = service(ServiceConfig::default());
    let (id, mut sub) = subscribe(&service);

    service
        .renderers()
        .update(&id, RendererUpdate::state("play"))
        .unwrap();
    sub.recv().await.unwrap();
    drop(service);

    tokio::time::sleep(Duration::from_secs(5)).await;
    // Stream closes without any further ticks
    assert!(sub.recv().await.is_none());
}

#[test]
fn test_playback_on_dedicated_runtime() {
    let service = service(ServiceConfig::default().with_tick_interval(Duration::from_millis(20)));
    let id = service.renderers().ids().remove(0);
    let mut sub = service.renderers().subscribe(&id).unwrap();
    sub.blocking_recv().unwrap();

    service
        .renderers()
        .update(&id, RendererUpdate::state("play"))
        .unwrap();
    assert_eq!(sub.blocking_recv().unwrap().properties_changed, vec!["state"]);

    let tick = sub.blocking_recv().unwrap();
    assert_eq!(tick.properties_changed, vec!["offset"]);
    assert_eq!(tick.data.offset, 20);

    service.shutdown();
    assert!(!service.renderers().is_playing(&id));
}
