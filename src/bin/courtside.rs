use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use clap::Parser;

use courtside::cache::Cache;
use courtside::client::Client;
use courtside::config::ClientConfig;
use courtside::reconciler::progress::feedback_channel;
use courtside::traits::Identity;
use courtside::utils::print_view_state;
use courtside::{BookingView, Provider};

#[derive(Debug, Parser)]
#[command(name = "courtside", about = "Show the court bookings of a day", version)]
struct Args {
    /// Path to the JSON config file
    #[arg(env = "COURTSIDE_CONFIG")]
    config: PathBuf,

    /// The date to show (YYYY-MM-DD). Defaults to the earliest bookable date
    date: Option<NaiveDate>,
}


/// This tool only reads bookings, so nobody ever logs in
struct Anonymous;

#[async_trait]
impl Identity for Anonymous {
    fn is_logged_in(&self) -> bool {
        false
    }

    async fn login(&self, _username: &str, _password: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        Err("Logging in is not supported by this tool".into())
    }

    async fn logout(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}


#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(err) = run(&args.config, args.date).await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(config_path: &Path, remembered_date: Option<NaiveDate>) -> Result<(), Box<dyn Error>> {
    let config = ClientConfig::from_file(config_path)?;

    let cache = match Cache::from_folder(&config.cache_folder) {
        Ok(cache) => cache,
        Err(err) => {
            log::warn!("Invalid cache folder: {}. Starting with an empty cache", err);
            Cache::new(&config.cache_folder)
        },
    };
    let client = Client::from_config(&config)?;
    let provider = Arc::new(Provider::new(client, cache));

    let mut view = BookingView::new(provider.clone(), Arc::new(Anonymous), config.schedule.clone(), remembered_date);
    let (sender, mut receiver) = feedback_channel();
    view.set_feedback_channel(sender);
    let listener = tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            println!("{}", *receiver.borrow());
        }
    });

    let outcome = view.load_initial().await;
    let state = view.state();
    drop(view);
    let _ = listener.await;

    log::info!("Initial load ended: {:?}", outcome);
    print_view_state(&state, &config.schedule);

    provider.local().prune();
    provider.local().save_to_folder()?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(&["courtside", "config.json", "2016-04-23"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.date, Some("2016-04-23".parse().unwrap()));

        let args = Args::try_parse_from(&["courtside", "config.json"]).unwrap();
        assert_eq!(args.date, None);

        assert!(Args::try_parse_from(&["courtside", "config.json", "23/04/2016"]).is_err());
    }
}
