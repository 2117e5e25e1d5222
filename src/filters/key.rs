use serde::{Deserialize, Serialize};

/// Declared value kind of a filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
}

/// Closed vocabulary of filter keys.
///
/// Adding a filter: add a variant here and to `ALL`, `as_str()` and `kind()`.
/// The `as_str()` value is the query parameter name; once published in a
/// shared link, do not rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum FilterKey {
    Country,
    Type,
    YearMin,
    YearMax,
    Search,
    Order,
    View,
    Term,
    Entity,
    Focus,
    Facet,
    Newspaper,
    TopN,
    Keywords,
    Topic,
    Year,
}

impl FilterKey {
    const ALL: [FilterKey; 16] = [
        Self::Country,
        Self::Type,
        Self::YearMin,
        Self::YearMax,
        Self::Search,
        Self::Order,
        Self::View,
        Self::Term,
        Self::Entity,
        Self::Focus,
        Self::Facet,
        Self::Newspaper,
        Self::TopN,
        Self::Keywords,
        Self::Topic,
        Self::Year,
    ];

    /// Query parameter name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Type => "type",
            Self::YearMin => "yearMin",
            Self::YearMax => "yearMax",
            Self::Search => "search",
            Self::Order => "order",
            Self::View => "view",
            Self::Term => "term",
            Self::Entity => "entity",
            Self::Focus => "focus",
            Self::Facet => "facet",
            Self::Newspaper => "newspaper",
            Self::TopN => "topN",
            Self::Keywords => "keywords",
            Self::Topic => "topic",
            Self::Year => "year",
        }
    }

    /// All variants, in declaration order.
    pub fn all() -> &'static [FilterKey] {
        &Self::ALL
    }

    /// Parse a query parameter name. Unknown names return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::YearMin | Self::YearMax | Self::TopN | Self::Year => ValueKind::Number,
            _ => ValueKind::Text,
        }
    }
}

impl std::fmt::Display for FilterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FilterKey> for &'static str {
    fn from(key: FilterKey) -> Self {
        key.as_str()
    }
}

impl TryFrom<String> for FilterKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("unknown filter key '{}'", s))
    }
}

/// Keys owned by other subsystems (locale, theme) that share the store.
///
/// Never counted as active filters; preserved by `clear_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemKey {
    Lang,
    Theme,
}

impl SystemKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lang => "lang",
            Self::Theme => "theme",
        }
    }

    pub fn all() -> &'static [SystemKey] {
        &[Self::Lang, Self::Theme]
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lang" => Some(Self::Lang),
            "theme" => Some(Self::Theme),
            _ => None,
        }
    }

    pub fn is_system(key: &str) -> bool {
        Self::parse(key).is_some()
    }
}
