//! Integration tests for the AdManager façade.
//!
//! These tests verify the complete coordination workflow including:
//! - Configuration registration and resolution
//! - Load, show, and automatic rewarm cycles
//! - Cross-category presentation arbitration
//! - Frequency capping across repeated show attempts
//! - Load-failure retry and surfacing
//! - Premium suppression

use adlayer::category::AdCategory;
use adlayer::config::{ConfigSnapshot, PlacementConfig, StaticFetcher, StoreConfig};
use adlayer::error::ShowError;
use adlayer::manager::{AdManager, ManagerConfig, ShowCallbacks};
use adlayer::persist::MemoryStore;
use adlayer::provider::{LoadScript, SimulatedProvider};
use adlayer::slot::SlotHooks;
use adlayer::telemetry::NoOpSink;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test Helpers
// =============================================================================

fn demo_snapshot() -> ConfigSnapshot {
    ConfigSnapshot {
        enabled: true,
        splash: Some(PlacementConfig::new("boot", "unit-splash").with_timeout_seconds(0.05)),
        interstitials: vec![
            PlacementConfig::new("home_resume", "unit-inter"),
            PlacementConfig::new("level_end", "unit-capped").with_frequency(3, 2),
        ],
        rewardeds: vec![PlacementConfig::new("double_coins", "unit-reward")],
        ..ConfigSnapshot::default()
    }
}

fn fast_config() -> ManagerConfig {
    ManagerConfig::default()
        .with_store(StoreConfig::default().with_fetch_retry_delay(Duration::from_millis(20)))
        .with_slot_retry_delay(Duration::from_millis(20))
}

fn make_manager(provider: Arc<SimulatedProvider>) -> AdManager {
    AdManager::with_config(
        provider,
        Arc::new(StaticFetcher::new(demo_snapshot().encode().unwrap())),
        Arc::new(MemoryStore::new()),
        Arc::new(NoOpSink),
        fast_config(),
    )
}

async fn register_and_settle(manager: &AdManager) {
    let (tx, rx) = tokio::sync::oneshot::channel();
    manager.await_ready(move || {
        let _ = tx.send(());
    });
    manager.register("ad_config", Vec::new());
    tokio::select! {
        _ = rx => {}
        _ = tokio::time::sleep(Duration::from_secs(2)) => {
            panic!("configuration resolution timed out");
        }
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_full_session_load_show_hide_rewarm() {
    let provider =
        Arc::new(SimulatedProvider::new().with_present_hold(Duration::from_millis(30)));
    let manager = make_manager(Arc::clone(&provider));
    register_and_settle(&manager).await;

    assert_eq!(
        manager.status(AdCategory::Interstitial, "home_resume"),
        Some(true)
    );

    manager.load(AdCategory::Interstitial, "home_resume").await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let hidden = Arc::new(AtomicU32::new(0));
    let hidden_clone = Arc::clone(&hidden);
    let callbacks = ShowCallbacks::new().with_on_hide(move || {
        hidden_clone.fetch_add(1, Ordering::SeqCst);
    });
    manager
        .show(AdCategory::Interstitial, "home_resume", callbacks)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hidden.load(Ordering::SeqCst), 1);
    // The consumed ad was replaced automatically.
    assert_eq!(provider.load_calls(), 2);

    // With the rewarmed ad the next show succeeds straight away.
    manager
        .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
        .await
        .unwrap();

    manager.shutdown().await;
}

#[tokio::test]
async fn test_two_categories_cannot_present_simultaneously() {
    let provider =
        Arc::new(SimulatedProvider::new().with_present_hold(Duration::from_millis(80)));
    let manager = make_manager(provider);
    register_and_settle(&manager).await;

    manager.load(AdCategory::Interstitial, "home_resume").await;
    manager.load(AdCategory::Rewarded, "double_coins").await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    manager
        .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
        .await
        .unwrap();

    // The interstitial holds the token; the rewarded ad must wait.
    assert_eq!(
        manager
            .show(AdCategory::Rewarded, "double_coins", ShowCallbacks::new())
            .await,
        Err(ShowError::OtherAdsShowing)
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    manager
        .show(AdCategory::Rewarded, "double_coins", ShowCallbacks::new())
        .await
        .unwrap();

    manager.shutdown().await;
}

#[tokio::test]
async fn test_frequency_capping_suppresses_then_allows() {
    let provider =
        Arc::new(SimulatedProvider::new().with_present_hold(Duration::from_millis(10)));
    let manager = make_manager(provider);
    register_and_settle(&manager).await;

    manager.load(AdCategory::Interstitial, "level_end").await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    // start=3, interval=2: the first two opportunities are suppressed.
    for _ in 0..2 {
        assert_eq!(
            manager
                .show(AdCategory::Interstitial, "level_end", ShowCallbacks::new())
                .await,
            Err(ShowError::DisplayNotYet)
        );
    }

    manager
        .show(AdCategory::Interstitial, "level_end", ShowCallbacks::new())
        .await
        .unwrap();
    // Wait out the presentation and the automatic rewarm.
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(
        manager
            .show(AdCategory::Interstitial, "level_end", ShowCallbacks::new())
            .await,
        Err(ShowError::DisplayNotYet)
    );
    manager
        .show(AdCategory::Interstitial, "level_end", ShowCallbacks::new())
        .await
        .unwrap();

    manager.shutdown().await;
}

#[tokio::test]
async fn test_load_failure_retries_once_then_surfaces() {
    let provider = Arc::new(SimulatedProvider::new());
    provider.push_script([LoadScript::Fail, LoadScript::Fail]);

    let failures = Arc::new(AtomicU32::new(0));
    let failures_clone = Arc::clone(&failures);
    let hooks = SlotHooks {
        on_loaded: None,
        on_load_failed: Some(Arc::new(move |_: &str, err: ShowError| {
            assert!(matches!(err, ShowError::LoadFailed(_)));
            failures_clone.fetch_add(1, Ordering::SeqCst);
        })),
    };
    let manager = make_manager(Arc::clone(&provider)).with_slot_hooks(hooks);
    register_and_settle(&manager).await;

    manager.load(AdCategory::Interstitial, "home_resume").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Exactly one automatic retry, one surfaced failure.
    assert_eq!(provider.load_calls(), 2);
    assert_eq!(failures.load(Ordering::SeqCst), 1);

    assert_eq!(
        manager
            .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
            .await,
        Err(ShowError::NotReady)
    );

    // An explicit reload recovers now that the script is exhausted.
    manager.load(AdCategory::Interstitial, "home_resume").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    manager
        .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
        .await
        .unwrap();

    manager.shutdown().await;
}

#[tokio::test]
async fn test_splash_timeout_synthesizes_failure_and_recovers() {
    let provider = Arc::new(SimulatedProvider::new());
    // Stall past the configured 50ms splash timeout; the retry succeeds.
    provider.push_script([LoadScript::Stall(Duration::from_millis(300))]);
    let manager = make_manager(Arc::clone(&provider));
    register_and_settle(&manager).await;

    manager.load(AdCategory::Splash, "boot").await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(provider.load_calls(), 2);
    manager
        .show(AdCategory::Splash, "boot", ShowCallbacks::new())
        .await
        .unwrap();

    manager.shutdown().await;
}

#[tokio::test]
async fn test_empty_remote_payload_falls_back_to_bundled_default() {
    let manager = AdManager::with_config(
        Arc::new(SimulatedProvider::new()),
        Arc::new(StaticFetcher::new(Vec::new())),
        Arc::new(MemoryStore::new()),
        Arc::new(NoOpSink),
        fast_config(),
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    manager.await_ready(move || {
        let _ = tx.send(());
    });
    manager.register("ad_config", demo_snapshot().encode().unwrap());
    tokio::select! {
        _ = rx => {}
        _ = tokio::time::sleep(Duration::from_secs(2)) => {
            panic!("default-tier fallback timed out");
        }
    }

    assert_eq!(
        manager.status(AdCategory::Interstitial, "home_resume"),
        Some(true)
    );

    manager.load(AdCategory::Interstitial, "home_resume").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    manager
        .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
        .await
        .unwrap();

    manager.shutdown().await;
}

#[tokio::test]
async fn test_premium_suppresses_everything() {
    let provider = Arc::new(SimulatedProvider::new());
    let manager = make_manager(Arc::clone(&provider));
    manager.set_premium(true);

    register_and_settle(&manager).await;
    assert_eq!(manager.status(AdCategory::Interstitial, "home_resume"), None);

    manager.load(AdCategory::Interstitial, "home_resume").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(provider.load_calls(), 0);

    assert_eq!(
        manager
            .show(AdCategory::Interstitial, "home_resume", ShowCallbacks::new())
            .await,
        Err(ShowError::PlacementDisabled)
    );

    manager.shutdown().await;
}
