#[macro_use]
extern crate log;

use std::{fs, path::PathBuf};

use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDate};
use clap::{Args, CommandFactory, Parser, Subcommand};
use dotenv::dotenv;
use sleepweather::{
    Credentials, GarminClient, ResponseCache, RetryConfig, SessionStore, WeatherClient,
    collect_night, plots,
};
use sleepweather_algos::{Combined, CorrelationMatrix, NightSummary};
use sleepweather_db::{FirebaseClient, read_document, write_document};
use sleepweather_types::SleepWindow;

const CACHE_EXPIRY_SECS: u64 = 3600;

#[derive(Parser)]
pub struct SleepWeatherCli {
    #[clap(subcommand)]
    pub subcommand: SleepWeatherCommand,
}

#[derive(Args)]
pub struct GarminArgs {
    #[arg(env, long)]
    pub garmin_email: Option<String>,
    #[arg(env, long, hide_env_values = true)]
    pub garmin_password: Option<String>,
    /// Defaults to ~/.garth
    #[arg(env, long)]
    pub session_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct NightArgs {
    #[command(flatten)]
    pub garmin: GarminArgs,
    #[arg(env, long, default_value_t = 48.1067)]
    pub latitude: f64,
    #[arg(env, long, default_value_t = 11.4248)]
    pub longitude: f64,
    #[arg(env, long, default_value = ".cache")]
    pub weather_cache_dir: PathBuf,
    /// Morning the night ends on, defaults to yesterday
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum SleepWeatherCommand {
    ///
    /// Fetch last night's sleep and weather, store the combined table and
    /// upload it when a remote store is configured
    ///
    Collect {
        #[command(flatten)]
        night: NightArgs,
        #[arg(env, long, default_value = "cache.json")]
        output: PathBuf,
        #[arg(env, long)]
        firebase_url: Option<String>,
        #[arg(env, long, hide_env_values = true)]
        firebase_auth: Option<String>,
        #[arg(env, long, default_value = "data/combined_data_upload")]
        firebase_path: String,
    },
    ///
    /// Like collect, without upload, and render the correlation heatmap and
    /// the time series chart
    ///
    Analyze {
        #[command(flatten)]
        night: NightArgs,
        #[arg(long, default_value = "output.json")]
        output: PathBuf,
        #[arg(long, default_value = ".")]
        plot_dir: PathBuf,
    },
    ///
    /// Establish and store a session with the wearable service
    ///
    Login {
        #[command(flatten)]
        garmin: GarminArgs,
    },
    ///
    /// Print per-night summaries of a stored document
    ///
    Summary {
        #[arg(long, env = "OUTPUT", default_value = "cache.json")]
        input: PathBuf,
    },
    ///
    /// Generate shell completions
    ///
    Completions { shell: clap_complete::Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        println!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper_util", log::LevelFilter::Warn)
        .filter_module("rustls", log::LevelFilter::Warn)
        .init();

    let cli = SleepWeatherCli::parse();
    match cli.subcommand {
        SleepWeatherCommand::Collect {
            night,
            output,
            firebase_url,
            firebase_auth,
            firebase_path,
        } => {
            let (window, combined) = run_night(&night).await?;
            write_document(&output, &combined.rows)?;

            match firebase_url {
                Some(url) => {
                    let document = read_document(&output)?;
                    let report = FirebaseClient::new(url, firebase_auth)
                        .update(&firebase_path, &document)
                        .await?;
                    println!("{}", report);
                }
                None => info!("FIREBASE_URL not set, skipping upload"),
            }

            println!("Finished {}", window.sleep_date());
            Ok(())
        }
        SleepWeatherCommand::Analyze {
            night,
            output,
            plot_dir,
        } => {
            let (window, combined) = run_night(&night).await?;
            write_document(&output, &combined.rows)?;

            let matrix = CorrelationMatrix::compute(&combined.rows);
            println!("{}", matrix);

            fs::create_dir_all(&plot_dir)
                .with_context(|| format!("failed to create {}", plot_dir.display()))?;
            let date = window.sleep_date();
            plots::correlation_heatmap(
                &plot_dir.join(format!("correlation_{date}.svg")),
                &matrix,
                date,
            )?;
            plots::time_series(
                &plot_dir.join(format!("timeseries_{date}.svg")),
                &combined.rows,
                date,
            )?;
            Ok(())
        }
        SleepWeatherCommand::Login { garmin } => {
            let client = connect(&garmin).await?;
            println!("Login successful as {}", client.display_name());
            Ok(())
        }
        SleepWeatherCommand::Summary { input } => {
            let rows = read_document(&input)?.to_rows()?;
            let nights = NightSummary::split_nights(&rows);
            if nights.is_empty() {
                println!("No data available in {}", input.display());
            }
            for night in nights {
                println!("{}\n", night);
            }
            Ok(())
        }
        SleepWeatherCommand::Completions { shell } => {
            let mut command = SleepWeatherCli::command();
            clap_complete::generate(shell, &mut command, "sleepweather", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn sleep_window(date: Option<NaiveDate>) -> anyhow::Result<SleepWindow> {
    let today = Local::now().date_naive();
    match date {
        Some(date) => {
            SleepWindow::new(date, today).ok_or_else(|| anyhow!("{date} is in the future"))
        }
        None => Ok(SleepWindow::yesterday(today)),
    }
}

async fn connect(args: &GarminArgs) -> anyhow::Result<GarminClient> {
    let session_dir = match &args.session_dir {
        Some(dir) => dir.clone(),
        None => dirs::home_dir()
            .ok_or_else(|| anyhow!("no home directory, set SESSION_DIR"))?
            .join(".garth"),
    };

    let credentials = match (&args.garmin_email, &args.garmin_password) {
        (Some(email), Some(password)) => Some(Credentials {
            email: email.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    GarminClient::connect(&SessionStore::new(session_dir), credentials.as_ref()).await
}

async fn run_night(args: &NightArgs) -> anyhow::Result<(SleepWindow, Combined)> {
    let window = sleep_window(args.date)?;
    info!(
        "collecting night ending {} (requested on {})",
        window.sleep_date(),
        window.today()
    );

    let garmin = connect(&args.garmin).await?;
    let weather = WeatherClient::new(
        args.latitude,
        args.longitude,
        RetryConfig::default(),
        ResponseCache::new(
            &args.weather_cache_dir,
            std::time::Duration::from_secs(CACHE_EXPIRY_SECS),
        ),
    );

    let combined = collect_night(&garmin, &weather, &window).await?;
    Ok((window, combined))
}
