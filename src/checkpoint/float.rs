//! Serde adapters for floats that may be infinite or NaN.
//!
//! JSON has no literal for non-finite numbers and `serde_json` writes them as
//! `null`, which then fails to decode. In human-readable formats these values are
//! written as the strings `"inf"`, `"-inf"` and `"nan"` instead. Binary formats
//! keep the plain IEEE encoding.

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const EXPECTED: &str = "a number, \"inf\", \"-inf\" or \"nan\"";

pub(crate) trait Float: Copy + Serialize + for<'de> Deserialize<'de> {
    fn label(self) -> Option<&'static str>;
    fn from_label(label: &str) -> Option<Self>;
}

macro_rules! impl_float {
    ($t:ty) => {
        impl Float for $t {
            fn label(self) -> Option<&'static str> {
                if self.is_nan() {
                    Some("nan")
                } else if self == <$t>::INFINITY {
                    Some("inf")
                } else if self == <$t>::NEG_INFINITY {
                    Some("-inf")
                } else {
                    None
                }
            }

            fn from_label(label: &str) -> Option<Self> {
                match label {
                    "nan" => Some(<$t>::NAN),
                    "inf" => Some(<$t>::INFINITY),
                    "-inf" => Some(<$t>::NEG_INFINITY),
                    _ => None,
                }
            }
        }
    };
}

impl_float!(f32);
impl_float!(f64);

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr<F> {
    Number(F),
    Label(String),
}

pub(crate) fn serialize<F: Float, S: Serializer>(
    value: &F,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value.label() {
        Some(label) if serializer.is_human_readable() => serializer.serialize_str(label),
        _ => value.serialize(serializer),
    }
}

pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<F, D::Error> {
    if !deserializer.is_human_readable() {
        return F::deserialize(deserializer);
    }
    match Repr::<F>::deserialize(deserializer)? {
        Repr::Number(v) => Ok(v),
        Repr::Label(label) => F::from_label(&label)
            .ok_or_else(|| D::Error::invalid_value(Unexpected::Str(&label), &EXPECTED)),
    }
}

struct Lenient<F>(F);

impl<F: Float> Serialize for Lenient<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de, F: Float> Deserialize<'de> for Lenient<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(Lenient)
    }
}

/// `#[serde(with)]` adapter for `Vec<f32>` / `Vec<f64>`.
pub(crate) mod vec {
    use super::*;

    pub(crate) fn serialize<F: Float, S: Serializer>(
        values: &[F],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| Lenient(*v)))
    }

    pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<F>, D::Error> {
        let values = Vec::<Lenient<F>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.0).collect())
    }
}

/// `#[serde(with)]` adapter for `Option<f64>`.
pub(crate) mod option {
    use super::*;

    pub(crate) fn serialize<F: Float, S: Serializer>(
        value: &Option<F>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&Lenient(*v)),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<F>, D::Error> {
        Ok(Option::<Lenient<F>>::deserialize(deserializer)?.map(|v| v.0))
    }
}
