use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Deserializer, Serialize, de};

/// Unique identifier of a job within a catalog.
///
/// Catalogs may use integers (`1`, `15`) or strings (`"rdf"`); integers are kept
/// as their decimal text. Ordering is numeric-aware so `"2"` sorts before `"10"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for JobId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for JobId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for JobId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl de::Visitor<'_> for IdVisitor {
            type Value = JobId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a job id as string or non-negative integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<JobId, E> {
                Ok(JobId::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<JobId, E> {
                Ok(JobId::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<JobId, E> {
                Ok(JobId::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<JobId, E> {
                u64::try_from(v)
                    .map(JobId::from)
                    .map_err(|_| E::custom(format!("negative job id: {v}")))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_sort_numerically() {
        let mut ids: Vec<JobId> = ["10", "2", "1", "15"].into_iter().map(JobId::from).collect();
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(JobId::as_str).collect();
        assert_eq!(ordered, vec!["1", "2", "10", "15"]);
    }

    #[test]
    fn numeric_ids_sort_before_names() {
        let mut ids = vec![JobId::from("rdf"), JobId::from("3"), JobId::from("msd")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "3");
        assert_eq!(ids[1].as_str(), "msd");
        assert_eq!(ids[2].as_str(), "rdf");
    }

    #[test]
    fn zero_padded_ids_stay_distinct() {
        let a = JobId::from("01");
        let b = JobId::from("1");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn deserializes_from_integer_or_string() {
        let from_int: JobId = serde_json::from_str("7").unwrap();
        let from_str: JobId = serde_json::from_str(r#""thermo""#).unwrap();
        assert_eq!(from_int.as_str(), "7");
        assert_eq!(from_str.as_str(), "thermo");

        assert!(serde_json::from_str::<JobId>("-1").is_err());
    }

    #[test]
    fn blank_id_is_empty() {
        assert!(JobId::from("  ").is_empty());
        assert!(!JobId::from("1").is_empty());
    }
}
