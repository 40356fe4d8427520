//! Device simulator scenarios: simulated agents enroll in bulk and are
//! picked up by fleets applied through the CLI.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{ensure, Context};
use fctl_api::TEST_ID_LABEL;
use fctl_harness::devicesim::{
    generate_fleet_yamls_for_simulator, validate_fleet_yaml_devices_per_fleet,
};
use fctl_harness::Harness;
use fctl_testing::{eventually, unique_suffix, PollConfig, LONG_TIMEOUT, POLLING_LONG};
use tracing::info;

const FLEETS: usize = 2;
const DEVICES_PER_FLEET: usize = 3;
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

async fn simulated_devices_join_fleet(h: &Harness) -> anyhow::Result<()> {
    h.setup_device_simulator_agent_config(Duration::ZERO, Duration::ZERO)
        .await?;

    let base = format!("sim-{}", unique_suffix());
    let yaml = generate_fleet_yamls_for_simulator(FLEETS, DEVICES_PER_FLEET, &base)?;
    validate_fleet_yaml_devices_per_fleet(&yaml, DEVICES_PER_FLEET, FLEETS)?;
    let labelled = h.add_test_labels_to_yaml(&yaml)?;
    h.cli_runner()
        .cli_with_stdin(&labelled, ["apply", "-f", "-"])
        .await?;

    let test_label = format!("{TEST_ID_LABEL}={}", h.test_id());
    let sim = h
        .run_device_simulator([
            "--count".to_string(),
            DEVICES_PER_FLEET.to_string(),
            "--log-level".to_string(),
            "info".to_string(),
            "--label".to_string(),
            test_label,
        ])
        .await?;
    info!(pid = ?sim.pid(), log = %sim.log_path().display(), "device simulator running");

    let scenario = async {
        let test_labels = BTreeMap::from([(TEST_ID_LABEL.to_string(), h.test_id().to_string())]);
        let test_labels = &test_labels;
        let devices = eventually(PollConfig::new(LONG_TIMEOUT, POLLING_LONG), move || async move {
            let devices = h.devices_with_label(test_labels).await?;
            Ok::<_, anyhow::Error>((devices.len() >= DEVICES_PER_FLEET).then_some(devices))
        })
        .await
        .context("simulated devices did not enroll")?;

        let fleet = format!("{base}-00");
        let ids: Vec<&str> = devices.iter().map(|d| d.name()).collect();
        let labels = vec![BTreeMap::new(); ids.len()];
        h.set_labels_for_device_list(&ids, &labels, &fleet).await?;

        let owner = format!("Fleet/{fleet}");
        for id in ids {
            let device = h
                .wait_for_device_contents(
                    id,
                    &format!("owned by {owner}"),
                    |d| d.metadata.owner.as_deref() == Some(owner.as_str()),
                    LONG_TIMEOUT,
                )
                .await?;
            ensure!(device.metadata.label("fleet") == Some(fleet.as_str()));
        }
        anyhow::Ok(())
    }
    .await;

    let stopped = h.stop_device_simulator(sim, STOP_TIMEOUT).await;
    scenario?;
    Ok(stopped?)
}

#[tokio::test]
#[ignore = "needs a live deployment and the devicesimulator binary"]
async fn simulated_devices_are_adopted_by_fleet() -> anyhow::Result<()> {
    let mut h = common::api_harness()?;
    let result = simulated_devices_join_fleet(&h).await;
    common::finish(&mut h, result).await
}
