// ABOUTME: Custom serde deserializers for settings types.
// ABOUTME: Accepts no-proxy lists as YAML sequences or comma-separated strings.

use serde::Deserialize;

pub fn deserialize_no_proxy<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<NoProxyEntry> = Option::deserialize(deserializer)?;
    Ok(match entries {
        None => Vec::new(),
        Some(NoProxyEntry::Joined(s)) => split_entries(std::iter::once(s.as_str())),
        Some(NoProxyEntry::List(values)) => split_entries(values.iter().map(String::as_str)),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NoProxyEntry {
    Joined(String),
    List(Vec<String>),
}

fn split_entries<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
