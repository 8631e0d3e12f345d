use std::{fs, path::Path, sync::LazyLock};

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::session::Scenario;

static BUILTIN_SCENARIOS: LazyLock<IndexMap<String, Scenario>> = LazyLock::new(|| {
    parse_scenarios(include_str!("../content/scenarios.yaml"))
        .expect("built-in scenario catalog is valid YAML")
});

/// The shipped scenario catalog, in display order.
pub fn builtin_scenarios() -> &'static IndexMap<String, Scenario> {
    &BUILTIN_SCENARIOS
}

pub fn find_scenario(id: &str) -> Option<&'static Scenario> {
    BUILTIN_SCENARIOS.get(id)
}

/// Parse a YAML list of scenarios, keyed by id in file order.
pub fn parse_scenarios(text: &str) -> Result<IndexMap<String, Scenario>> {
    let list: Vec<Scenario> = serde_yaml::from_str(text).context("invalid scenario catalog")?;
    Ok(list.into_iter().map(|s| (s.id.clone(), s)).collect())
}

pub fn load_scenarios(path: impl AsRef<Path>) -> Result<IndexMap<String, Scenario>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario catalog: {}", path.display()))?;
    parse_scenarios(&text)
        .with_context(|| format!("failed to parse scenario catalog: {}", path.display()))
}
