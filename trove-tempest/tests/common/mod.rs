#![allow(dead_code)]

use trove_common::Settings;
use trove_fake::{FakeConfig, FakeTrove};

pub async fn fake() -> FakeTrove {
    trove_fake::spawn(FakeConfig {
        settle_polls: 1,
        ..FakeConfig::default()
    })
    .await
    .expect("fake service starts")
}

/// Settings aimed at `fake`, polling without delay. The connectivity check
/// dials the fake's own port.
pub fn settings_for(fake: &FakeTrove, extra: &[(&str, &str)]) -> Settings {
    let mut vars = fake.endpoint_env();
    vars.push(("TROVE_BUILD_INTERVAL".to_string(), "0".to_string()));
    vars.push(("TROVE_BUILD_TIMEOUT".to_string(), "10".to_string()));
    vars.push(("TROVE_DB_PORT".to_string(), fake.addr.port().to_string()));
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Settings::from_lookup(|key| {
        vars.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("valid test settings")
}
