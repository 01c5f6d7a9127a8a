//! Decode a configuration document and print its placement table.

use crate::error::CliError;
use adlayer::category::AdCategory;
use adlayer::config::{ConfigSnapshot, PlacementConfig};
use clap::Args;
use std::fs;

#[derive(Debug, Args)]
pub struct PlacementsArgs {
    /// Path to a configuration JSON document
    pub file: String,
}

pub fn run(args: &PlacementsArgs) -> Result<(), CliError> {
    let bytes = fs::read(&args.file).map_err(|error| CliError::ConfigRead {
        path: args.file.clone(),
        error,
    })?;
    let snapshot = ConfigSnapshot::decode(&bytes).map_err(CliError::ConfigDecode)?;

    println!(
        "Configuration: {} ({} placements, ads {})",
        args.file,
        snapshot.placement_count(),
        if snapshot.enabled { "enabled" } else { "disabled" }
    );
    println!();
    println!(
        "{:<22} {:<20} {:<24} {:<9} {}",
        "CATEGORY", "NAME", "UNIT ID", "ENABLED", "PARAMETERS"
    );

    for (category, placement) in collect_rows(&snapshot) {
        println!(
            "{:<22} {:<20} {:<24} {:<9} {}",
            category.to_string(),
            placement.name,
            placement.unit_id,
            placement.enabled,
            describe_parameters(placement)
        );
    }
    Ok(())
}

fn collect_rows(snapshot: &ConfigSnapshot) -> Vec<(AdCategory, &PlacementConfig)> {
    let mut rows = Vec::new();
    if let Some(placement) = &snapshot.splash {
        rows.push((AdCategory::Splash, placement));
    }
    if let Some(placement) = &snapshot.app_open {
        rows.push((AdCategory::AppOpen, placement));
    }
    for placement in &snapshot.interstitials {
        rows.push((AdCategory::Interstitial, placement));
    }
    for placement in &snapshot.rewardeds {
        rows.push((AdCategory::Rewarded, placement));
    }
    for placement in &snapshot.rewarded_interstitials {
        rows.push((AdCategory::RewardedInterstitial, placement));
    }
    for placement in &snapshot.natives {
        rows.push((AdCategory::Native, placement));
    }
    for placement in &snapshot.banners {
        rows.push((AdCategory::Banner, placement));
    }
    rows
}

fn describe_parameters(placement: &PlacementConfig) -> String {
    let mut parts = Vec::new();
    if let Some(timeout) = placement.timeout_seconds {
        parts.push(format!("timeout={timeout}s"));
    }
    if let (Some(start), Some(interval)) =
        (placement.frequency_start, placement.frequency_interval)
    {
        parts.push(format!("frequency={start}+{interval}"));
    }
    if placement.is_auto == Some(true) {
        parts.push("auto".to_string());
    }
    if placement.is_full_screen == Some(true) {
        parts.push("full-screen".to_string());
    }
    if placement.is_preload == Some(true) {
        parts.push("preload".to_string());
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_parameters() {
        let plain = PlacementConfig::new("a", "unit-a");
        assert_eq!(describe_parameters(&plain), "-");

        let capped = PlacementConfig::new("b", "unit-b").with_frequency(3, 2);
        assert_eq!(describe_parameters(&capped), "frequency=3+2");

        let splash = PlacementConfig::new("c", "unit-c").with_timeout_seconds(15.0);
        assert_eq!(describe_parameters(&splash), "timeout=15s");
    }

    #[test]
    fn test_collect_rows_orders_by_category() {
        let snapshot = ConfigSnapshot {
            enabled: true,
            splash: Some(PlacementConfig::new("boot", "unit-splash")),
            interstitials: vec![PlacementConfig::new("home", "unit-inter")],
            banners: vec![PlacementConfig::new("footer", "unit-banner")],
            ..ConfigSnapshot::default()
        };
        let rows = collect_rows(&snapshot);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, AdCategory::Splash);
        assert_eq!(rows[2].0, AdCategory::Banner);
    }
}
