// src/common/patch.rs

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Atualização parcial com três estados: o JSON sem a chave não toca no
// campo, `null` limpa, e um valor presente sobrescreve. Assim `0` e `""`
// continuam sendo valores válidos de escrita, nunca "campo ausente".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Chave ausente no JSON: o campo não foi enviado.
    Absent,
    /// Chave presente com `null`: limpar o campo.
    Clear,
    /// Chave presente com valor: sobrescrever.
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Clear => Patch::Clear,
            Patch::Set(v) => Patch::Set(v),
        }
    }
}

// A desserialização só distingue `null` de valor; a ausência da chave
// vira `Absent` via `#[serde(default)]` no campo que usa o wrapper.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

// Na serialização, `Absent` deve ser pulado com
// `#[serde(skip_serializing_if = "Patch::is_absent")]`; `Clear` vira `null`.
impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Absent | Patch::Clear => serializer.serialize_none(),
            Patch::Set(value) => value.serialize(serializer),
        }
    }
}
