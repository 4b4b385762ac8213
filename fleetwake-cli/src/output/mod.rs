//! Output formatting for CLI.

mod json;
mod text;

pub use json::{
    BudgetStatus, CredentialStatus, JsonFormatter, PollOutput, QuietStatus, RegistrationOutput,
    StatusOutput,
};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;
