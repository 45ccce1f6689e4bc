/// Who authored a transcript message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    /// The operator typing at the prompt.
    User,

    /// The remote instructor model.
    Ai,

    /// Synthetic notices emitted by the session itself.
    System,
}

impl Sender {
    /// Returns the header label shown above a message from this sender.
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "OPERATOR",
            Sender::Ai => "INSTRUCTOR_KERNEL",
            Sender::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
