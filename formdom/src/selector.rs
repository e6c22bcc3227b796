/// A single simple selector: `.class`, `#id` or a tag name.
///
/// Compound and combinator selectors are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Class(String),
    Id(String),
    Tag(String),
}

impl Selector {
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if let Some(class) = selector.strip_prefix('.') {
            Self::Class(class.to_string())
        } else if let Some(id) = selector.strip_prefix('#') {
            Self::Id(id.to_string())
        } else {
            Self::Tag(selector.to_ascii_lowercase())
        }
    }

    pub(crate) fn matches(&self, id: &str, tag: &str, classes: &[String]) -> bool {
        match self {
            Self::Class(class) => classes.iter().any(|c| c == class),
            Self::Id(wanted) => id == wanted,
            Self::Tag(wanted) => tag == wanted,
        }
    }
}

impl From<&str> for Selector {
    fn from(selector: &str) -> Self {
        Self::parse(selector)
    }
}
