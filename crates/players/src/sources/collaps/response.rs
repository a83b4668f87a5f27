use serde::{Deserialize, Serialize};

/// Body of the `/list` search endpoint. The schema is undocumented; ids have
/// been observed both as numbers and strings.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub results: Vec<ListEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default, alias = "iframe_url")]
    pub iframe_url: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
