use std::env;
use std::sync::Arc;

use nexia_climate::{Entity, EntityState, Integration, NexiaConfig};
use tokio::sync::Notify;

fn print_states(integration: &Integration) {
    println!("-- {} --", integration.coordinator().last_update_iso());
    for entity in integration.entities() {
        match EntityState::read(entity) {
            Ok(state) => println!("{} = {}", state.entity_id, state.state),
            Err(e) => eprintln!("{}: {e}", entity.entity_id()),
        }
    }
}

#[tokio::main]
async fn main() -> nexia_climate::Result<()> {
    tracing_subscriber::fmt::init();

    // monitor <config.json>, or NEXIA_HOUSE_ID / NEXIA_MOBILE_ID / NEXIA_API_KEY
    let config = match env::args().nth(1) {
        Some(path) => NexiaConfig::from_file(path)?,
        None => {
            let house_id = env::var("NEXIA_HOUSE_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .expect("usage: monitor <config.json> or set NEXIA_HOUSE_ID");
            let mobile_id = env::var("NEXIA_MOBILE_ID").expect("NEXIA_MOBILE_ID");
            let api_key = env::var("NEXIA_API_KEY").expect("NEXIA_API_KEY");
            NexiaConfig::new(house_id, mobile_id, api_key)
        }
    };

    println!("Fetching house {}...", config.house_id);
    let mut integration = Integration::setup(&config).await?;
    print_states(&integration);

    let updated = Arc::new(Notify::new());
    let notify = updated.clone();
    integration.coordinator().add_listener(move || notify.notify_one());
    integration.start_polling();
    println!("Polling every {}s", config.scan_interval);

    loop {
        updated.notified().await;
        if !integration.coordinator().last_update_success() {
            eprintln!("Refresh failed, entities unavailable");
            continue;
        }
        print_states(&integration);
    }
}
