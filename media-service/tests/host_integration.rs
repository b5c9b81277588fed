//! End-to-end tests through the host request boundary
//!
//! Each test builds a service with deterministic ids and drives it only
//! through `Request`/`Response` plus the `Resource` streams a host relays.

use std::sync::Arc;

use media_service::{
    ErrorCode, MediaService, Request, ResourceAction, SequentialIds, ServiceConfig, Status,
};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::{json, Value};

// ============================================================================
// Test Helpers
// ============================================================================

fn service() -> MediaService {
    service_with(ServiceConfig::default())
}

fn service_with(config: ServiceConfig) -> MediaService {
    MediaService::builder()
        .with_config(config)
        .with_id_generator(Arc::new(SequentialIds::new("id")))
        .build()
        .unwrap()
}

fn list(service: &MediaService, resource: &str, offset: Option<i64>, limit: Option<i64>) -> Vec<Value> {
    let response = service.handle(Request::List {
        resource: resource.to_string(),
        offset,
        limit,
    });
    assert_eq!(response.status, Status::Ok, "{:?}", response);
    match response.data {
        Some(Value::Array(items)) => items,
        other => panic!("expected an array, got {:?}", other),
    }
}

fn create_collection(service: &MediaService, name: &str) -> Value {
    let response = service.handle(Request::Create {
        resource: "collections".into(),
        payload: json!({ "name": name }),
    });
    assert!(response.is_ok(), "{:?}", response);
    response.data.unwrap()
}

fn renderer_id(service: &MediaService) -> String {
    list(service, "renderers", None, None)[0]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_initial_collections() {
    let service = service();
    let collections = list(&service, "collections", None, None);

    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0]["data"]["name"], "default");
    assert_eq!(collections[0]["data"]["items"], json!([]));
    assert_eq!(collections[0]["propertiesChanged"], json!([]));
}

#[test]
fn test_create_party_collection() {
    let service = service();
    let created = create_collection(&service, "Party");

    assert_eq!(created["data"]["name"], "Party");
    assert_eq!(created["data"]["items"], json!([]));
    assert_ne!(created["id"], "id-2");

    let collections = list(&service, "collections", None, None);
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[1]["id"], created["id"]);

    let expected_uri = format!("/media/collections/{}", created["id"].as_str().unwrap());
    assert_eq!(created["uri"], expected_uri.as_str());
    assert_eq!(created["data"]["uri"], expected_uri.as_str());
}

#[test]
fn test_create_emits_exactly_one_add() {
    let service = service();
    let resource = service.resource_by_name("collections").unwrap();
    let mut changes = resource.changes();
    assert_eq!(changes.try_recv().unwrap().action, ResourceAction::Init);

    create_collection(&service, "Party");

    let events: Vec<_> = changes.try_iter().map(|e| e.action).collect();
    assert_eq!(events, vec![ResourceAction::Add]);
}

#[rstest]
#[case::no_payload(Value::Null)]
#[case::empty_object(json!({}))]
#[case::empty_name(json!({ "name": "" }))]
fn test_create_without_name_is_rejected(#[case] payload: Value) {
    let service = service();
    let response = service.handle(Request::Create {
        resource: "collections".into(),
        payload,
    });

    assert_eq!(response.status, Status::Error);
    assert_eq!(response.code, Some(ErrorCode::ValidationError));
    assert_eq!(list(&service, "collections", None, None).len(), 1);
}

#[test]
fn test_delete_collection() {
    let service = service();
    let created = create_collection(&service, "Temp");
    let id = created["id"].as_str().unwrap().to_string();

    let mut changes = service.resource_by_name("Collections").unwrap().changes();
    changes.try_recv();

    let response = service.handle(Request::Delete {
        resource: "collections".into(),
        element: id.clone(),
    });
    assert_eq!(response, media_service::Response::ok());
    assert_eq!(list(&service, "collections", None, None).len(), 1);
    assert_eq!(changes.try_recv().unwrap().action, ResourceAction::Remove);

    let response = service.handle(Request::Get {
        resource: "collections".into(),
        element: id,
    });
    assert_eq!(response.code, Some(ErrorCode::NotFound));
}

#[test]
fn test_delete_missing_collection() {
    let service = service();
    let response = service.handle(Request::Delete {
        resource: "collections".into(),
        element: "missing".into(),
    });

    assert_eq!(response.code, Some(ErrorCode::NotFound));
    assert_eq!(response.code.unwrap().http_status(), 404);
    assert_eq!(list(&service, "collections", None, None).len(), 1);
}

#[test]
fn test_update_collection_via_host() {
    let service = service();
    let id = list(&service, "collections", None, None)[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = service.handle_value(json!({
        "op": "update",
        "resource": "collections",
        "element": id,
        "payload": { "items": ["/media/tracks/1", "/media/tracks/2"] }
    }));
    assert!(response.is_ok());
    assert!(response.data.is_none());

    let response = service.handle(Request::Get {
        resource: "collections".into(),
        element: id,
    });
    let data = response.data.unwrap();
    assert_eq!(data["propertiesChanged"], json!(["items"]));
    assert_eq!(data["data"]["items"], json!(["/media/tracks/1", "/media/tracks/2"]));
}

// ============================================================================
// Renderers
// ============================================================================

#[test]
fn test_renderers_are_fixed() {
    let service = service();
    let id = renderer_id(&service);

    let response = service.handle(Request::Create {
        resource: "renderers".into(),
        payload: json!({ "name": "Another" }),
    });
    assert_eq!(response.code, Some(ErrorCode::NotSupported));

    let response = service.handle(Request::Delete {
        resource: "renderers".into(),
        element: id,
    });
    assert_eq!(response.code, Some(ErrorCode::NotSupported));
    assert_eq!(list(&service, "renderers", None, None).len(), 1);
}

#[test]
fn test_renderer_media_points_at_default_collection() {
    let service = service();
    let renderer = &list(&service, "renderers", None, None)[0];
    let collection = &list(&service, "collections", None, None)[0];

    assert_eq!(renderer["data"]["name"], "Netflux");
    assert_eq!(renderer["data"]["media"], collection["uri"]);
}

#[test]
fn test_invalid_shuffle_through_host() {
    let service = service();
    let id = renderer_id(&service);
    let mut feed = service
        .resource_by_name("renderers")
        .unwrap()
        .subscribe_element(&id)
        .unwrap();
    feed.try_next();

    let response = service.handle(Request::Update {
        resource: "renderers".into(),
        element: id,
        payload: json!({ "shuffle": "maybe", "bogus": true }),
    });
    assert!(response.is_ok());

    let snapshot = feed.try_next().unwrap();
    assert_eq!(snapshot["propertiesChanged"], json!([]));
    assert_eq!(snapshot["data"]["shuffle"], "off");
}

#[test]
fn test_update_missing_renderer() {
    let service = service();
    let response = service.handle(Request::Update {
        resource: "renderers".into(),
        element: "ghost".into(),
        payload: json!({ "state": "play" }),
    });

    assert_eq!(response.code, Some(ErrorCode::NotFound));
    assert!(response.message.unwrap().contains("ghost"));
}

#[rstest]
#[case::renderers("renderers")]
#[case::collections("collections")]
fn test_update_missing_element_with_bad_payload(#[case] resource: &str) {
    let service = service();
    let response = service.handle(Request::Update {
        resource: resource.into(),
        element: "ghost".into(),
        payload: Value::Null,
    });

    assert_eq!(response.code, Some(ErrorCode::NotFound));
}

#[test]
fn test_unknown_resource() {
    let service = service();
    let response = service.handle(Request::Get {
        resource: "playlists".into(),
        element: "x".into(),
    });
    assert_eq!(response.code, Some(ErrorCode::NotFound));
}

#[test]
fn test_list_pagination_through_host() {
    let service = service();
    for name in ["a", "b", "c"] {
        create_collection(&service, name);
    }

    let names = |items: Vec<Value>| -> Vec<String> {
        items
            .iter()
            .map(|i| i["data"]["name"].as_str().unwrap().to_string())
            .collect()
    };

    assert_eq!(names(list(&service, "collections", Some(1), Some(2))), vec!["a", "b"]);
    assert_eq!(names(list(&service, "collections", Some(3), None)), vec!["c"]);
    assert_eq!(names(list(&service, "collections", Some(-5), Some(1))), vec!["default"]);
    assert!(list(&service, "collections", Some(10), None).is_empty());
    assert!(list(&service, "collections", None, Some(-1)).is_empty());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_create_then_delete_restores_size(names in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let service = service();
        let mut ids = Vec::new();
        for name in &names {
            let created = create_collection(&service, name);
            ids.push(created["id"].as_str().unwrap().to_string());
        }
        prop_assert_eq!(list(&service, "collections", None, None).len(), names.len() + 1);

        for id in ids {
            let response = service.handle(Request::Delete {
                resource: "collections".into(),
                element: id,
            });
            prop_assert!(response.is_ok());
        }
        prop_assert_eq!(list(&service, "collections", None, None).len(), 1);
    }

    #[test]
    fn prop_list_window_is_contiguous(offset in 0i64..6, limit in 0i64..6) {
        let service = service();
        for name in ["a", "b", "c", "d"] {
            create_collection(&service, name);
        }

        let all = list(&service, "collections", None, None);
        let window = list(&service, "collections", Some(offset), Some(limit));

        let start = (offset as usize).min(all.len());
        let end = (start + limit as usize).min(all.len());
        prop_assert_eq!(window, all[start..end].to_vec());
    }
}
