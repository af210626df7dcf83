//! Recipient lists and per-recipient template variables.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::address::Address;
use crate::error::PostageError;

/// Template variable name → value.
pub type Variables = Map<String, Value>;

/// Recipients of the message being assembled.
///
/// Serializes to the two shapes the API accepts: a JSON array of addresses, or
/// an object keyed by address whose values are that recipient's variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Recipients {
    /// Plain ordered list of addresses.
    List(Vec<String>),
    /// Address → variables for that recipient.
    WithVars(BTreeMap<String, Variables>),
}

impl Recipients {
    /// Recipient addresses, in list order or sorted by address.
    pub fn addresses(&self) -> Vec<&str> {
        match self {
            Self::List(list) => list.iter().map(String::as_str).collect(),
            Self::WithVars(map) => map.keys().map(String::as_str).collect(),
        }
    }

    /// Number of recipient addresses.
    pub fn len(&self) -> usize {
        match self {
            Self::List(list) => list.len(),
            Self::WithVars(map) => map.len(),
        }
    }

    /// True when there are no recipients.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Variables for one recipient, if this is a keyed recipient set.
    pub fn variables_for(&self, address: &str) -> Option<&Variables> {
        match self {
            Self::List(_) => None,
            Self::WithVars(map) => map.get(address),
        }
    }

    /// Merge per-recipient variables into this set.
    ///
    /// A plain list is converted first, each address getting an empty variable
    /// map, so previously set recipients are kept.
    pub(crate) fn merge_vars(&mut self, incoming: BTreeMap<String, Variables>) {
        if let Self::List(list) = self {
            let keyed = list.drain(..).map(|a| (a, Variables::new())).collect();
            *self = Self::WithVars(keyed);
        }
        if let Self::WithVars(map) = self {
            for (address, vars) in incoming {
                map.entry(address).or_default().extend(vars);
            }
        }
    }
}

/// Input accepted by [`PostageApp::set_recipients`](crate::PostageApp::set_recipients).
///
/// Sequences are taken as-is; strings must be comma separated. Either way the
/// result is a list of individual addresses, never a joined string, so the API
/// does not expose one recipient's address to the others.
pub trait IntoRecipientList {
    fn into_recipient_list(self) -> Result<Vec<String>, PostageError>;
}

impl IntoRecipientList for &str {
    fn into_recipient_list(self) -> Result<Vec<String>, PostageError> {
        if !self.contains(',') {
            return Err(PostageError::Validation(
                "recipient list must be a sequence or a comma separated string".into(),
            ));
        }
        normalize(self.split(','))
    }
}

impl IntoRecipientList for String {
    fn into_recipient_list(self) -> Result<Vec<String>, PostageError> {
        self.as_str().into_recipient_list()
    }
}

impl IntoRecipientList for &String {
    fn into_recipient_list(self) -> Result<Vec<String>, PostageError> {
        self.as_str().into_recipient_list()
    }
}

impl<S: AsRef<str>> IntoRecipientList for Vec<S> {
    fn into_recipient_list(self) -> Result<Vec<String>, PostageError> {
        normalize(self.iter().map(AsRef::as_ref))
    }
}

impl<S: AsRef<str>> IntoRecipientList for &[S] {
    fn into_recipient_list(self) -> Result<Vec<String>, PostageError> {
        normalize(self.iter().map(AsRef::as_ref))
    }
}

impl<S: AsRef<str>, const N: usize> IntoRecipientList for [S; N] {
    fn into_recipient_list(self) -> Result<Vec<String>, PostageError> {
        normalize(self.iter().map(AsRef::as_ref))
    }
}

fn normalize<'a>(entries: impl Iterator<Item = &'a str>) -> Result<Vec<String>, PostageError> {
    let mut out = Vec::new();
    for entry in entries.map(str::trim).filter(|e| !e.is_empty()) {
        Address::parse_formatted(entry)?;
        out.push(entry.to_string());
    }
    if out.is_empty() {
        return Err(PostageError::Validation("recipient list is empty".into()));
    }
    Ok(out)
}

/// Parse `{address: {name: value}}` into keyed recipient variables.
///
/// `None` means "clear" (null, empty object or empty string).
pub(crate) fn parse_recipient_vars(
    input: Value,
) -> Result<Option<BTreeMap<String, Variables>>, PostageError> {
    let map = match input {
        Value::Null => return Ok(None),
        Value::String(s) if s.is_empty() => return Ok(None),
        Value::Object(map) if map.is_empty() => return Ok(None),
        Value::Object(map) => map,
        other => {
            return Err(PostageError::Validation(format!(
                "recipients with variables must be an object, got {}",
                json_type(&other)
            )))
        }
    };

    let mut out = BTreeMap::new();
    for (address, vars) in map {
        Address::parse_formatted(&address)?;
        let vars = match vars {
            Value::Object(vars) => vars,
            Value::Null => Variables::new(),
            other => {
                return Err(PostageError::Validation(format!(
                    "variables for {} must be an object, got {}",
                    address,
                    json_type(&other)
                )))
            }
        };
        out.insert(address, vars);
    }
    Ok(Some(out))
}

/// Parse global variables. `None` means "no variables".
pub(crate) fn parse_global_vars(input: Value) -> Result<Option<Variables>, PostageError> {
    match input {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(PostageError::Validation(format!(
            "global variables must be an object, got {}",
            json_type(&other)
        ))),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
