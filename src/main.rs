use color_eyre::eyre::Result;
use counselbook_directory::http::{HttpBatchNumbering, HttpBookingService, HttpSlotDirectory};
use counselbook_scheduling::zones::{city_name, offset_label};
use counselbook_scheduling::{SystemTimezoneResolver, TimezoneResolver};
use counselbook_session::config::SessionConfig;
use counselbook_session::{BookingSession, load_batch_options};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let mut config = SessionConfig::from_env()?;
    if let Some(zone) = std::env::args().nth(1) {
        config.caller_timezone = Some(zone);
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting CounselBook slot browser");

    let directory = HttpSlotDirectory::new(&config.slot_directory_url, config.request_timeout)?;
    let booking = HttpBookingService::new(&config.booking_service_url, config.request_timeout)?;
    let mut session = BookingSession::new(SystemTimezoneResolver, directory, booking, &config);

    if let Err(e) = session.load_slots().await {
        error!("Could not load slots: {}", e);
    }

    let machine = session.machine();
    let timezone = machine.state().timezone;
    println!(
        "Slots for {} ({})",
        city_name(timezone.name()),
        offset_label(timezone, machine.resolver().now())
    );

    if machine.is_empty() {
        println!("No slots are currently available.");
        return Ok(());
    }

    for (date, slots) in machine.index().iter() {
        println!("{}", date.format("%a %-d %b %Y"));
        for slot in slots {
            println!("  {}", slot.display_time);
        }
    }

    if let Some(suggestion) = machine.suggestion() {
        println!(
            "Next available: {} {}",
            suggestion.local_date, suggestion.slot.display_time
        );
    }

    if let Some(url) = &config.batch_service_url {
        let numbering = HttpBatchNumbering::new(url, config.request_timeout)?;
        let options = load_batch_options(&numbering).await;
        println!("Batches: {:?}", options);
    }

    Ok(())
}
