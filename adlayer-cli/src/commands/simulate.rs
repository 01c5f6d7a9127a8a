//! Scripted ad session against the simulated provider.
//!
//! Wires a full `AdManager` to in-process collaborators and drives loads and
//! repeated show attempts, so the coordination behavior (retry, frequency
//! capping, arbitration) can be watched in the log output.

use crate::error::CliError;
use adlayer::category::AdCategory;
use adlayer::config::{ConfigSnapshot, PlacementConfig, StaticFetcher, StoreConfig};
use adlayer::manager::{AdManager, ManagerConfig, ShowCallbacks};
use adlayer::persist::MemoryStore;
use adlayer::provider::{AdRevenue, LoadScript, Reward, SimulatedProvider};
use adlayer::telemetry::TracingSink;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Number of interstitial show attempts to drive
    #[arg(long, default_value = "6")]
    pub shows: u32,

    /// Script a load failure before the first success, exercising the retry
    #[arg(long)]
    pub fail_first: bool,

    /// Run the session as a premium user (all display suppressed)
    #[arg(long)]
    pub premium: bool,
}

/// Configuration document the simulated remote serves.
fn demo_config() -> ConfigSnapshot {
    ConfigSnapshot {
        enabled: true,
        splash: Some(PlacementConfig::new("boot", "demo-splash").with_timeout_seconds(5.0)),
        interstitials: vec![
            PlacementConfig::new("home_resume", "demo-interstitial").with_frequency(2, 2),
        ],
        rewardeds: vec![PlacementConfig::new("double_coins", "demo-rewarded")],
        ..ConfigSnapshot::default()
    }
}

pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(session(args))
}

async fn session(args: SimulateArgs) -> Result<(), CliError> {
    info!(
        shows = args.shows,
        fail_first = args.fail_first,
        premium = args.premium,
        "starting simulated ad session"
    );
    let provider = Arc::new(
        SimulatedProvider::new()
            .with_load_latency(Duration::from_millis(150))
            .with_present_hold(Duration::from_millis(400))
            .with_reward(Reward {
                amount: 10,
                kind: "coins".to_string(),
            })
            .with_revenue(AdRevenue {
                value_micros: 12_500,
                currency: "USD".to_string(),
            }),
    );
    if args.fail_first {
        provider.push_script([LoadScript::Fail]);
    }

    let config_bytes = demo_config()
        .encode()
        .map_err(CliError::ConfigDecode)?;
    let manager = Arc::new(AdManager::with_config(
        Arc::clone(&provider) as _,
        Arc::new(StaticFetcher::new(config_bytes.clone())),
        Arc::new(MemoryStore::new()),
        Arc::new(TracingSink),
        ManagerConfig::default()
            .with_store(StoreConfig::default().with_fetch_retry_delay(Duration::from_secs(2)))
            .with_slot_retry_delay(Duration::from_millis(500)),
    ));
    manager.set_premium(args.premium);

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    manager.await_ready(move || {
        let _ = ready_tx.send(());
    });
    manager.register("demo_ad_config", config_bytes);
    let _ = ready_rx.await;

    println!("Placement status after resolution:");
    for (category, name) in [
        (AdCategory::Splash, "boot"),
        (AdCategory::Interstitial, "home_resume"),
        (AdCategory::Rewarded, "double_coins"),
    ] {
        println!(
            "  {:<22} {:<14} {:?}",
            category.to_string(),
            name,
            manager.status(category, name)
        );
    }
    println!();

    manager.load(AdCategory::Splash, "boot").await;
    manager.load(AdCategory::Interstitial, "home_resume").await;
    manager.load(AdCategory::Rewarded, "double_coins").await;
    // Give the warm-up loads (and the scripted retry) time to settle.
    let warmup = if args.fail_first {
        Duration::from_millis(1200)
    } else {
        Duration::from_millis(400)
    };
    tokio::time::sleep(warmup).await;

    for attempt in 1..=args.shows {
        print!("show #{attempt}: ");
        let callbacks = ShowCallbacks::new()
            .with_on_hide(|| println!("  interstitial dismissed"))
            .with_on_fail(|err| println!("  interstitial failed: {err}"));
        match manager
            .show(AdCategory::Interstitial, "home_resume", callbacks)
            .await
        {
            Ok(()) => {
                println!("presenting");
                // Wait out the presentation plus the automatic rewarm.
                tokio::time::sleep(Duration::from_millis(700)).await;
            }
            Err(err) => println!("rejected ({err})"),
        }
    }

    println!();
    print!("rewarded show: ");
    let callbacks = ShowCallbacks::new()
        .with_on_reward(|reward| println!("  earned {} {}", reward.amount, reward.kind))
        .with_on_hide(|| println!("  rewarded dismissed"))
        .with_on_fail(|err| println!("  rewarded failed: {err}"));
    match manager
        .show(AdCategory::Rewarded, "double_coins", callbacks)
        .await
    {
        Ok(()) => {
            println!("presenting");
            tokio::time::sleep(Duration::from_millis(700)).await;
        }
        Err(err) => println!("rejected ({err})"),
    }

    manager.shutdown().await;
    info!("simulated ad session complete");
    Ok(())
}
