//! Outgoing message content, independent of the delivery platform.

/// An inline button. Platforms without buttons render the label as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text shown on the button.
    pub label: String,
    /// Callback payload sent back when the button is pressed.
    pub data: String,
}

/// A message to send to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Message body.
    pub text: String,
    /// Inline buttons, in display order.
    pub buttons: Vec<Button>,
}

impl Reply {
    /// A plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// Append an inline button.
    #[must_use]
    pub fn with_button(mut self, label: impl Into<String>, data: impl Into<String>) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            data: data.into(),
        });
        self
    }

    /// Body followed by the button labels, for channels that cannot show buttons.
    pub fn plain_text(&self) -> String {
        if self.buttons.is_empty() {
            return self.text.clone();
        }
        let labels: Vec<&str> = self.buttons.iter().map(|b| b.label.as_str()).collect();
        format!("{}\n\n[{}]", self.text, labels.join("] ["))
    }
}
