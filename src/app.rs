// src/app.rs

use std::sync::Arc;

use chrono_tz::Tz;
use pipa_config::PipaConfig;
use pipa_core::{Clock, PipaError, PipaResult, SystemClock};
use pipa_routes::{FeedClient, FrontDoor, FrontDoorRequest, HassClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};
use uuid::Uuid;

/// Line-oriented console front end: one utterance per line in, one JSON
/// envelope per line out.
pub struct PipaApp {
    front_door: FrontDoor,
}

impl PipaApp {
    pub fn new(config: PipaConfig) -> PipaResult<Self> {
        let tz: Tz = config
            .app
            .timezone
            .parse()
            .map_err(|_| PipaError::Config(format!("invalid timezone: {}", config.app.timezone)))?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(tz));

        let home = Arc::new(HassClient::new(config.home.clone())?);
        let feeds = Arc::new(FeedClient::new(
            config.search.clone(),
            config.holiday.clone(),
            &config.news,
            clock.clone(),
        )?);

        let front_door = FrontDoor::new(&config, home, feeds.clone(), feeds, clock);
        Ok(Self { front_door })
    }

    pub async fn run(&mut self) -> PipaResult<()> {
        info!("Reading utterances from stdin, one per line");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.handle_line(&line).await,
                        None => break,
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        // Either a JSON request object or a bare utterance.
        let request = if line.starts_with('{') {
            match serde_json::from_str::<FrontDoorRequest>(line) {
                Ok(request) => request,
                Err(e) => {
                    error!(error = %e, "Malformed request line");
                    return;
                }
            }
        } else {
            FrontDoorRequest::text(line)
        };

        let request_id = Uuid::new_v4();
        info!(%request_id, "Handling request");

        let result = self.front_door.handle(&request).await;
        match serde_json::to_string(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(%request_id, error = %e, "Failed to serialize result"),
        }
    }
}
