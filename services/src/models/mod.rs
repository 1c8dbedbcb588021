//! Wire shapes of the backend's collections.

pub mod class_instance;
pub mod course;
pub mod instructor;
pub mod result;
pub mod student;
pub mod subject;
pub mod subject_result;

/// Deserializers for the loosely typed fields the backend emits.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(f64),
        Text(String),
    }

    /// A relation given either as a bare id or as the nested object.
    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(crate) enum IdRef {
        Id(i64),
        Object { id: i64 },
    }

    impl IdRef {
        pub(crate) fn id(&self) -> i64 {
            match self {
                IdRef::Id(id) | IdRef::Object { id } => *id,
            }
        }
    }

    fn parse_decimal<E: Error>(value: Decimal) -> Result<Option<f64>, E> {
        match value {
            Decimal::Number(n) => Ok(Some(n)),
            Decimal::Text(s) if s.trim().is_empty() => Ok(None),
            Decimal::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid decimal: {s:?}"))),
        }
    }

    /// `12.5`, `"12.50"` or `null`.
    pub(crate) fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Decimal>::deserialize(d)? {
            Some(value) => parse_decimal(value),
            None => Ok(None),
        }
    }

    pub(crate) fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        opt_decimal(d)?.ok_or_else(|| D::Error::custom("missing decimal"))
    }

    /// Numbers are kept as their textual form (prices arrive either way).
    pub(crate) fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Decimal>::deserialize(d)? {
            Some(Decimal::Number(n)) => Some(n.to_string()),
            Some(Decimal::Text(s)) => Some(s),
            None => None,
        })
    }

    pub(crate) fn id_ref<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        IdRef::deserialize(d).map(|r| r.id())
    }

    pub(crate) fn id_refs<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
        let refs = Option::<Vec<IdRef>>::deserialize(d)?.unwrap_or_default();
        Ok(refs.iter().map(IdRef::id).collect())
    }
}
