use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// Where a badge record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeSource {
    Local,
    External,
}

/// A badge stored in the local database.
///
/// On the wire the fields keep the names used by the external badge service
/// (`nom`, `prenom`, `valide`).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Badge {
    pub id: i64,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "valide", with = "int_bool")]
    pub validated: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Badge {
    /// Name as printed on the label: first name, then last name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn into_entry(self) -> BadgeEntry {
        BadgeEntry {
            id: self.id,
            last_name: self.last_name,
            first_name: self.first_name,
            validated: self.validated,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            source: BadgeSource::Local,
            extra: Map::new(),
        }
    }
}

/// A badge as returned by the external badge service. Unknown fields are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalBadge {
    pub id: i64,
    #[serde(rename = "nom", default)]
    pub last_name: String,
    #[serde(rename = "prenom", default)]
    pub first_name: String,
    #[serde(rename = "valide", default, with = "int_bool")]
    pub validated: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExternalBadge {
    pub fn into_entry(mut self) -> BadgeEntry {
        self.extra.remove("source");
        BadgeEntry {
            id: self.id,
            last_name: self.last_name,
            first_name: self.first_name,
            validated: self.validated,
            created_at: None,
            updated_at: None,
            source: BadgeSource::External,
            extra: self.extra,
        }
    }
}

/// Unified listing entry for local and external badges.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeEntry {
    pub id: i64,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "valide", with = "int_bool")]
    pub validated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
    pub source: BadgeSource,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /api/badges`. Accepts `nom`/`prenom` or `last_name`/`first_name`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBadge {
    #[serde(rename = "nom", alias = "last_name")]
    pub last_name: String,
    #[serde(rename = "prenom", alias = "first_name")]
    pub first_name: String,
    #[serde(rename = "valide", default, with = "int_bool")]
    pub validated: bool,
}

/// Body of `PUT /api/badges/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BadgeUpdate {
    #[serde(rename = "nom", alias = "last_name", default)]
    pub last_name: Option<String>,
    #[serde(rename = "prenom", alias = "first_name", default)]
    pub first_name: Option<String>,
    #[serde(
        rename = "valide",
        default,
        deserialize_with = "int_bool::deserialize_option"
    )]
    pub validated: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeStats {
    pub total: i64,
    pub validated: i64,
    pub pending: i64,
    pub total_prints: i64,
    pub prints_today: i64,
}

/// Outcome of importing external badges into the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub imported: usize,
    pub skipped: usize,
}

/// Case-insensitive substring match on last name, first name, or id.
/// A blank needle matches everything. `%` and `_` are literal.
pub fn matches_search(id: i64, last_name: &str, first_name: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            last_name.to_lowercase().contains(&needle)
                || first_name.to_lowercase().contains(&needle)
                || id.to_string().contains(&needle)
        }
    }
}

/// Unicode-aware equality of two names, ignoring case and surrounding whitespace.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// `valide` travels as 0/1; also accepts booleans and "0"/"1"/"true"/"false".
pub mod int_bool {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    fn to_bool<E: de::Error>(flag: Flag) -> Result<bool, E> {
        match flag {
            Flag::Bool(b) => Ok(b),
            Flag::Int(i) => Ok(i != 0),
            Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "oui" | "yes" => Ok(true),
                "0" | "false" | "non" | "no" | "" => Ok(false),
                other => Err(E::custom(format!("invalid flag value '{other}'"))),
            },
        }
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Option::<Flag>::deserialize(deserializer)? {
            Some(flag) => to_bool(flag),
            None => Ok(false),
        }
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        Option::<Flag>::deserialize(deserializer)?
            .map(to_bool)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_badge_accepts_both_field_styles() {
        let french: NewBadge =
            serde_json::from_value(json!({"nom": "Smith", "prenom": "Jane"})).unwrap();
        let english: NewBadge =
            serde_json::from_value(json!({"last_name": "Smith", "first_name": "Jane", "valide": 1}))
                .unwrap();
        assert_eq!(french.last_name, "Smith");
        assert!(!french.validated);
        assert_eq!(english.first_name, "Jane");
        assert!(english.validated);
    }

    #[test]
    fn test_external_badge_keeps_unknown_fields() {
        let badge: ExternalBadge = serde_json::from_value(json!({
            "id": 7, "nom": "Doe", "prenom": "John", "valide": "1",
            "company": "ACME", "source": "upstream"
        }))
        .unwrap();
        assert!(badge.validated);
        let entry = badge.into_entry();
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["company"], "ACME");
        assert_eq!(value["source"], "external");
        assert_eq!(value["valide"], 1);
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_update_distinguishes_absent_from_false() {
        let absent: BadgeUpdate = serde_json::from_value(json!({"nom": "X"})).unwrap();
        assert_eq!(absent.validated, None);
        let cleared: BadgeUpdate = serde_json::from_value(json!({"valide": 0})).unwrap();
        assert_eq!(cleared.validated, Some(false));
        assert!(serde_json::from_value::<BadgeUpdate>(json!({"valide": "maybe"})).is_err());
    }
}
