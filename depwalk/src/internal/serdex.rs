use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the default value of `T`.
///
/// Registry documents are hand-edited and produced by many generations of tooling, so fields
/// which are normally maps or lists occasionally arrive as explicit `null`s.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
