//! Transform resolver.
//! Named, pure string transforms requested by `{{name|transform}}` tokens or
//! declared as derived variants of a registry variable.

use std::fmt;
use std::str::FromStr;

use cruet::Inflector;

/// The closed set of transforms a token may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// `EXAMPLE PLUGIN`
    Upper,
    /// `example plugin`
    Lower,
    /// `example-plugin`, with every run of non-alphanumerics collapsed to `-`.
    Slug,
    /// `example_plugin`
    Snake,
    /// `example-plugin`
    Kebab,
    /// `examplePlugin`
    Camel,
    /// `ExamplePlugin`
    Pascal,
    /// `Example Plugin`
    Title,
    /// `EXAMPLE_PLUGIN`
    Constant,
}

impl Transform {
    pub const ALL: [Transform; 9] = [
        Transform::Upper,
        Transform::Lower,
        Transform::Slug,
        Transform::Snake,
        Transform::Kebab,
        Transform::Camel,
        Transform::Pascal,
        Transform::Title,
        Transform::Constant,
    ];

    /// Name used in tokens and registry documents.
    pub fn name(self) -> &'static str {
        match self {
            Transform::Upper => "upper",
            Transform::Lower => "lower",
            Transform::Slug => "slug",
            Transform::Snake => "snake",
            Transform::Kebab => "kebab",
            Transform::Camel => "camel",
            Transform::Pascal => "pascal",
            Transform::Title => "title",
            Transform::Constant => "constant",
        }
    }

    /// Name of the variable derived from `base` by this transform.
    pub fn derived_name(self, base: &str) -> String {
        format!("{base}_{}", self.name())
    }

    /// Applies the transform. Never depends on the process locale.
    pub fn apply(self, value: &str) -> String {
        match self {
            Transform::Upper => value.to_uppercase(),
            Transform::Lower => value.to_lowercase(),
            Transform::Slug => slugify(value),
            Transform::Snake => value.to_snake_case(),
            Transform::Kebab => value.to_kebab_case(),
            Transform::Camel => value.to_camel_case(),
            Transform::Pascal => value.to_pascal_case(),
            Transform::Title => value.to_title_case(),
            Transform::Constant => value.to_screaming_snake_case(),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a transform name is not one of [`Transform::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransformName(pub String);

impl FromStr for Transform {
    type Err = UnknownTransformName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transform::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTransformName(s.to_string()))
    }
}

impl<'de> serde::Deserialize<'de> for Transform {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown transform '{name}'")))
    }
}

impl serde::Serialize for Transform {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Lowercases and joins alphanumeric runs with single hyphens.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
