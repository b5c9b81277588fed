use std::time::Duration;

use media_service::logging::{init_logging, LoggingMode};
use media_service::{
    CollectionCreate, MediaService, RendererUpdate, Request, ResourceAction, ServiceConfig,
};
use serde_json::json;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingMode::Development)?;

    println!("1. Starting media service...");
    let config = ServiceConfig::from_env()?.with_tick_interval(Duration::from_millis(250));
    let service = MediaService::new(config)?;
    println!("✓ Service {} ({}) with resources {:?}", service.name(), service.id(), service.resource_names());

    println!("\n2. Watching collections...");
    let mut collection_changes = service.collections().subscribe_changes();
    let party = service.collections().create(CollectionCreate::named("Party"))?;
    println!("✓ Created {} at {}", party.data.name, party.uri);

    while let Some(event) = collection_changes.try_recv() {
        let action = match event.action {
            ResourceAction::Init => "init",
            ResourceAction::Add => "add",
            ResourceAction::Remove => "remove",
            ResourceAction::Update => "update",
        };
        println!("  collections: {}", action);
    }

    println!("\n3. Playing on the first renderer...");
    let renderers = service.renderers();
    let renderer_id = renderers.ids().remove(0);
    let mut updates = renderers.subscribe(&renderer_id)?;

    let response = service.handle_value(json!({
        "op": "update",
        "resource": "renderers",
        "element": renderer_id,
        "payload": { "state": "play", "repeat": "all", "shuffle": "maybe" }
    }));
    println!("✓ Update accepted: {}", serde_json::to_string(&response)?);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match timeout(remaining, updates.recv()).await {
            Ok(Some(element)) => println!(
                "  [{}] state={} repeat={} offset={}ms changed={:?}",
                element.last_update.format("%H:%M:%S%.3f"),
                element.data.state,
                element.data.repeat,
                element.data.offset,
                element.properties_changed
            ),
            Ok(None) => break,
            Err(_) => break, // Deadline reached
        }
    }

    println!("\n4. Pausing...");
    renderers.update(&renderer_id, RendererUpdate::state("pause"))?;
    let position = renderers.get(&renderer_id)?.data.offset;
    println!("✓ Paused at {}ms (playing: {})", position, renderers.is_playing(&renderer_id));

    println!("\n5. Listing collections through the host boundary...");
    let response = service.handle(Request::List {
        resource: "collections".into(),
        offset: None,
        limit: None,
    });
    println!("{}", serde_json::to_string_pretty(&response)?);

    service.shutdown();
    Ok(())
}
