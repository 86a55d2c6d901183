//! Identity of a project's compiled output assembly.

use serde::{Deserialize, Serialize};

/// The identity of a compiled .NET assembly.
///
/// Reported by an [`AssemblyInspector`](crate::AssemblyInspector) once the
/// project has been built.
///
/// # Examples
///
/// ```
/// use spd_core::AssemblyIdentity;
///
/// let identity = AssemblyIdentity {
///     name: "Contoso.Intranet".to_owned(),
///     version: "1.0.0.0".to_owned(),
///     culture: None,
///     public_key_token: vec![0x71, 0xe9, 0xbc, 0xe1, 0x11, 0xe9, 0x42, 0x9c],
/// };
///
/// assert_eq!(identity.public_key_token_hex(), "71e9bce111e9429c");
/// assert_eq!(
///     identity.full_name(),
///     "Contoso.Intranet, Version=1.0.0.0, Culture=neutral, PublicKeyToken=71e9bce111e9429c"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssemblyIdentity {
    /// Simple assembly name.
    pub name: String,

    /// Four-part version.
    pub version: String,

    /// Culture name; `None` for culture-neutral assemblies.
    #[serde(default)]
    pub culture: Option<String>,

    /// Public key token bytes; empty for unsigned assemblies.
    #[serde(default, with = "hex_bytes")]
    pub public_key_token: Vec<u8>,
}

impl AssemblyIdentity {
    /// Returns the public key token as lower-case hex without separators.
    ///
    /// Unsigned assemblies yield an empty string.
    #[must_use]
    pub fn public_key_token_hex(&self) -> String {
        hex::encode(&self.public_key_token)
    }

    /// Returns the display name in the form the .NET runtime prints it.
    #[must_use]
    pub fn full_name(&self) -> String {
        let culture = self.culture.as_deref().unwrap_or("neutral");
        let token = if self.public_key_token.is_empty() {
            "null".to_owned()
        } else {
            self.public_key_token_hex()
        };
        format!(
            "{}, Version={}, Culture={culture}, PublicKeyToken={token}",
            self.name, self.version
        )
    }
}

/// Serializes token bytes as a hex string, the way tokens are written in
/// project files and manifests.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S: Serializer>(
        bytes: &[u8],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text)
            .map_err(|err| de::Error::custom(format!("invalid hex in token '{text}': {err}")))
    }
}
