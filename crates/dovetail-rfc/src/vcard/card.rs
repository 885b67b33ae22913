//! vCard model types (RFC 2426).

use crate::ical::core::Parameter;

/// A single vCard property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcardProperty {
    /// Optional property group (`item1` in `item1.TEL`).
    pub group: Option<String>,
    /// Property name (normalized to uppercase).
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    /// Raw value text (unescaped component-wise by accessors).
    pub value: String,
}

impl VcardProperty {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    /// Returns the first value of a parameter.
    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        let name_upper = name.to_ascii_uppercase();
        self.params
            .iter()
            .find(|p| p.name == name_upper)?
            .value()
    }

    /// Returns whether a TYPE parameter contains the given token
    /// (case-insensitive), e.g. `TYPE=WORK,VOICE`.
    #[must_use]
    pub fn has_type(&self, token: &str) -> bool {
        let name_upper = "TYPE";
        self.params
            .iter()
            .filter(|p| p.name == name_upper)
            .flat_map(|p| p.values.iter())
            .any(|v| v.eq_ignore_ascii_case(token))
    }

    /// Splits the value into `;`-separated components, decoding escapes.
    #[must_use]
    pub fn components(&self) -> Vec<String> {
        split_structured(&self.value)
    }
}

/// The structured N property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuredName {
    pub family: String,
    pub given: String,
    pub additional: String,
    pub prefix: String,
    pub suffix: String,
}

impl StructuredName {
    /// Parses an N value: `family;given;additional;prefix;suffix`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut parts = split_structured(value).into_iter();
        Self {
            family: parts.next().unwrap_or_default(),
            given: parts.next().unwrap_or_default(),
            additional: parts.next().unwrap_or_default(),
            prefix: parts.next().unwrap_or_default(),
            suffix: parts.next().unwrap_or_default(),
        }
    }

    /// Serializes back to the wire component form.
    #[must_use]
    pub fn to_value(&self) -> String {
        [
            &self.family,
            &self.given,
            &self.additional,
            &self.prefix,
            &self.suffix,
        ]
        .iter()
        .map(|s| escape_structured(s))
        .collect::<Vec<_>>()
        .join(";")
    }
}

/// The structured ADR property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    pub po_box: String,
    pub extended: String,
    pub street: String,
    pub locality: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Parses an ADR value (seven `;`-separated components).
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut parts = split_structured(value).into_iter();
        Self {
            po_box: parts.next().unwrap_or_default(),
            extended: parts.next().unwrap_or_default(),
            street: parts.next().unwrap_or_default(),
            locality: parts.next().unwrap_or_default(),
            region: parts.next().unwrap_or_default(),
            postal_code: parts.next().unwrap_or_default(),
            country: parts.next().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> String {
        [
            &self.po_box,
            &self.extended,
            &self.street,
            &self.locality,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .map(|s| escape_structured(s))
        .collect::<Vec<_>>()
        .join(";")
    }
}

/// A parsed vCard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vcard {
    /// Properties in order of appearance (BEGIN/END/VERSION excluded).
    pub properties: Vec<VcardProperty>,
}

impl Vcard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property(&mut self, prop: VcardProperty) {
        self.properties.push(prop);
    }

    /// Returns the first property with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VcardProperty> {
        let name_upper = name.to_ascii_uppercase();
        self.properties.iter().find(|p| p.name == name_upper)
    }

    /// Returns all properties with the given name.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&VcardProperty> {
        let name_upper = name.to_ascii_uppercase();
        self.properties
            .iter()
            .filter(|p| p.name == name_upper)
            .collect()
    }

    /// Returns the formatted name (FN).
    #[must_use]
    pub fn formatted_name(&self) -> Option<&str> {
        self.get("FN").map(|p| p.value.as_str())
    }

    /// Returns the structured name (N) if present.
    #[must_use]
    pub fn structured_name(&self) -> Option<StructuredName> {
        self.get("N").map(|p| StructuredName::parse(&p.value))
    }
}

/// Splits a `;`-separated structured value, honoring backslash escapes.
fn split_structured(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n' | 'N') => current.push('\n'),
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ';' => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn escape_structured(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
