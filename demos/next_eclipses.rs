//! List the next solar eclipses for a location or a region.
//!
//! ```text
//! cargo run --example next_eclipses -- coords:45.07,7.69 3
//! cargo run --example next_eclipses -- region:Europe 5
//! ```
//!
//! Ctrl-C stops the computation and prints what was found so far.
use std::env;

use flexi_logger::Logger;
use tokio_util::sync::CancellationToken;
use umbra::{
    time::epoch_to_date, Engine, EngineConfig, EngineError, EphemerisStatus, PredictionMode,
    PredictionRequest,
};

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let _logger = Logger::try_with_env_or_str("info")
        .unwrap_or_else(|e| panic!("Logger initialization failed with {e}"))
        .start()
        .unwrap_or_else(|e| panic!("Logger initialization failed with {e}"));

    let mut args = env::args().skip(1);
    let mode = PredictionMode::try_from(args.next().as_deref().unwrap_or("coords:45.07,7.69"))?;
    let n = args
        .next()
        .map(|n| {
            n.parse()
                .map_err(|err| EngineError::Configuration(format!("invalid count '{n}': {err}")))
        })
        .transpose()?
        .unwrap_or(3);

    let engine = Engine::new(EngineConfig::default()).await?;
    let request = PredictionRequest::new(n, mode)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let predictions = engine.predict_next(&request, &cancel).await?;

    if predictions.degraded {
        println!("(offline: embedded catalog)");
    }
    if let EphemerisStatus::Unavailable { reason } = &predictions.ephemeris {
        println!("(no local circumstances: {reason})");
    }
    if predictions.is_empty() {
        println!("No upcoming eclipse found.");
    }
    if let Some(days) = epoch_to_date(&predictions.generated_at)
        .and_then(|today| predictions.days_until_next(today))
    {
        println!("Next eclipse in {days} days");
    }

    for event in predictions.iter() {
        let record = &event.record;
        print!("{}  {:<8}", record.date_utc, record.kind.to_string());
        match &event.visibility {
            Some(visibility) => {
                print!("  {:>5.1}%", visibility.coverage_percent());
                if let (Some(start), Some(end)) = (visibility.local_start, visibility.local_end) {
                    print!("  {start} → {end}");
                }
                println!();
            }
            None => println!("  {}", record.global_region_text.as_deref().unwrap_or("-")),
        }
    }
    if !predictions.complete {
        println!("(interrupted: list may be incomplete)");
    }
    Ok(())
}
