/// Element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tag {
    #[default]
    Div,
    Form,
    Input,
    TextArea,
    Select,
    Button,
    Label,
    Span,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Div => "div",
            Self::Form => "form",
            Self::Input => "input",
            Self::TextArea => "textarea",
            Self::Select => "select",
            Self::Button => "button",
            Self::Label => "label",
            Self::Span => "span",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let tag = match name.to_ascii_lowercase().as_str() {
            "div" => Self::Div,
            "form" => Self::Form,
            "input" => Self::Input,
            "textarea" => Self::TextArea,
            "select" => Self::Select,
            "button" => Self::Button,
            "label" => Self::Label,
            "span" => Self::Span,
            _ => return None,
        };
        Some(tag)
    }

    /// Whether elements of this kind carry a form value.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Input | Self::TextArea | Self::Select)
    }
}

/// The `type` of an input control.
///
/// Unknown type strings fall back to `Text`, matching how browsers treat them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputType {
    #[default]
    Text,
    Email,
    Number,
    Tel,
    Url,
    Password,
    Search,
    Checkbox,
    Radio,
    Hidden,
    Submit,
    Button,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Number => "number",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Password => "password",
            Self::Search => "search",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Hidden => "hidden",
            Self::Submit => "submit",
            Self::Button => "button",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "number" => Self::Number,
            "tel" => Self::Tel,
            "url" => Self::Url,
            "password" => Self::Password,
            "search" => Self::Search,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "hidden" => Self::Hidden,
            "submit" => Self::Submit,
            "button" => Self::Button,
            _ => Self::Text,
        }
    }

    /// Checkable inputs report `checked` instead of free text.
    pub fn is_checkable(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio)
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
