// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Interactive Input Collector
//!
//! Prompts the operator through an [`OperatorConsole`] and loops until the
//! answer is acceptable. Validation failures are shown to the operator and
//! re-prompted; only a closed input stream or a read error ends the loop.

use tracing::debug;

use crate::domain::console::{Echo, OperatorConsole, ValidationError};
use crate::domain::credentials::{email_domain, is_valid_email, AdminIdentity, Secret};
use crate::domain::pipeline::ProvisionError;

pub struct InputCollector {
    console: Box<dyn OperatorConsole>,
}

impl InputCollector {
    pub fn new(console: Box<dyn OperatorConsole>) -> Self {
        Self { console }
    }

    pub fn notify(&mut self, message: &str) {
        self.console.notify(message);
    }

    async fn read_raw(&mut self, prompt: &str, default: &str, echo: Echo) -> Result<String, ProvisionError> {
        let shown = if default.is_empty() {
            format!("{} ", prompt)
        } else {
            format!("{} [{}] ", prompt, default)
        };
        let line = self
            .console
            .read_line(&shown, echo)
            .await
            .map_err(ProvisionError::Input)?
            .ok_or_else(|| ProvisionError::InputClosed {
                prompt: prompt.to_string(),
            })?;
        let line = match echo {
            Echo::Visible => line.trim().to_string(),
            Echo::Hidden => line,
        };
        Ok(if line.is_empty() { default.to_string() } else { line })
    }

    /// Ask until the operator gives a non-empty answer or accepts `default`.
    pub async fn ask(&mut self, prompt: &str, default: &str) -> Result<String, ProvisionError> {
        loop {
            let answer = self.read_raw(prompt, default, Echo::Visible).await?;
            if !answer.is_empty() {
                return Ok(answer);
            }
        }
    }

    /// Ask until `validate` accepts the answer, reporting each rejection.
    pub async fn ask_until<T, F>(
        &mut self,
        prompt: &str,
        default: &str,
        echo: Echo,
        validate: F,
    ) -> Result<T, ProvisionError>
    where
        F: Fn(&str) -> Result<T, ValidationError>,
    {
        loop {
            let answer = self.read_raw(prompt, default, echo).await?;
            match validate(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(prompt = %prompt, "Rejected operator answer");
                    self.console.notify(&e.to_string());
                }
            }
        }
    }

    pub async fn ask_yes_no(&mut self, prompt: &str, default: bool) -> Result<bool, ProvisionError> {
        let default = if default { "Y" } else { "N" };
        self.ask_until(prompt, default, Echo::Visible, |answer| {
            match answer.to_uppercase().as_str() {
                "Y" => Ok(true),
                "N" => Ok(false),
                _ => Err(ValidationError::new("Please answer Y or N")),
            }
        })
        .await
    }

    pub async fn ask_valid_email(&mut self, prompt: &str) -> Result<String, ProvisionError> {
        self.ask_until(prompt, "", Echo::Visible, |answer| {
            if is_valid_email(answer) {
                Ok(answer.to_string())
            } else {
                Err(ValidationError::new("Invalid email"))
            }
        })
        .await
    }

    /// Hidden entry twice; both must be non-empty and equal.
    pub async fn ask_confirmed_password(
        &mut self,
        prompt: &str,
        confirm_prompt: &str,
    ) -> Result<Secret, ProvisionError> {
        loop {
            let first = self.read_raw(prompt, "", Echo::Hidden).await?;
            let second = self.read_raw(confirm_prompt, "", Echo::Hidden).await?;
            if first.is_empty() {
                self.console.notify("Password cannot be empty");
            } else if first != second {
                self.console.notify("Passwords do not match");
            } else {
                return Ok(Secret::new(first));
            }
        }
    }

    /// Email, confirmed password, then the domain defaulting to the email's.
    pub async fn collect_admin_identity(&mut self) -> Result<AdminIdentity, ProvisionError> {
        let email = self.ask_valid_email("Enter admin email:").await?;
        let password = self
            .ask_confirmed_password("Enter admin password:", "Re-enter admin password:")
            .await?;
        let default_domain = email_domain(&email).unwrap_or_default().to_string();
        let domain = self.ask("Enter admin domain:", &default_domain).await?;
        Ok(AdminIdentity {
            email,
            password,
            domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Transcript {
        prompts: Vec<(String, Echo)>,
        notices: Vec<String>,
    }

    struct ScriptedConsole {
        lines: VecDeque<String>,
        transcript: Arc<Mutex<Transcript>>,
    }

    fn collector(lines: &[&str]) -> (InputCollector, Arc<Mutex<Transcript>>) {
        let transcript = Arc::new(Mutex::new(Transcript::default()));
        let console = ScriptedConsole {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            transcript: transcript.clone(),
        };
        (InputCollector::new(Box::new(console)), transcript)
    }

    #[async_trait]
    impl OperatorConsole for ScriptedConsole {
        async fn read_line(&mut self, prompt: &str, echo: Echo) -> std::io::Result<Option<String>> {
            self.transcript.lock().unwrap().prompts.push((prompt.to_string(), echo));
            Ok(self.lines.pop_front())
        }

        fn notify(&mut self, message: &str) {
            self.transcript.lock().unwrap().notices.push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_ask_default_and_override() {
        let (mut input, transcript) = collector(&["", "  other  "]);
        assert_eq!(input.ask("Enter host name:", "myhost").await.unwrap(), "myhost");
        assert_eq!(input.ask("Enter host name:", "myhost").await.unwrap(), "other");
        assert_eq!(transcript.lock().unwrap().prompts[0].0, "Enter host name: [myhost] ");
    }

    #[tokio::test]
    async fn test_ask_without_default_reprompts_on_empty() {
        let (mut input, transcript) = collector(&["", "", "value"]);
        assert_eq!(input.ask("Name:", "").await.unwrap(), "value");
        assert_eq!(transcript.lock().unwrap().prompts.len(), 3);
    }

    #[tokio::test]
    async fn test_yes_no_loops_until_valid() {
        let (mut input, transcript) = collector(&["maybe", "yes", "y"]);
        assert!(input.ask_yes_no("Delete?", false).await.unwrap());
        assert_eq!(transcript.lock().unwrap().prompts.len(), 3);
        assert_eq!(transcript.lock().unwrap().notices.len(), 2);

        let (mut input, _) = collector(&["", "n"]);
        assert!(!input.ask_yes_no("Delete?", false).await.unwrap());
        assert!(!input.ask_yes_no("Delete?", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_email_reprompts_until_valid() {
        let (mut input, transcript) = collector(&["not-an-email", "a@b", "admin@example.com"]);
        assert_eq!(
            input.ask_valid_email("Enter admin email:").await.unwrap(),
            "admin@example.com"
        );
        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.notices, vec!["Invalid email", "Invalid email"]);
    }

    #[tokio::test]
    async fn test_confirmed_password() {
        let (mut input, transcript) = collector(&["secret1", "secret2", "", "", "secret1", "secret1"]);
        let password = input.ask_confirmed_password("Password:", "Again:").await.unwrap();
        assert_eq!(password.expose(), "secret1");

        let transcript = transcript.lock().unwrap();
        assert_eq!(
            transcript.notices,
            vec!["Passwords do not match", "Password cannot be empty"]
        );
        assert!(transcript.prompts.iter().all(|(_, echo)| *echo == Echo::Hidden));
    }

    #[tokio::test]
    async fn test_admin_identity_domain_defaults_to_email() {
        let (mut input, _) = collector(&["admin@corp.example.com", "pw", "pw", ""]);
        let admin = input.collect_admin_identity().await.unwrap();
        assert_eq!(admin.email, "admin@corp.example.com");
        assert_eq!(admin.password.expose(), "pw");
        assert_eq!(admin.domain, "corp.example.com");

        let (mut input, _) = collector(&["admin@corp.example.com", "pw", "pw", "other.org"]);
        assert_eq!(input.collect_admin_identity().await.unwrap().domain, "other.org");
    }

    #[tokio::test]
    async fn test_closed_input_is_an_error() {
        let (mut input, _) = collector(&["", ""]);
        let result = input.ask("Name:", "").await;
        assert!(matches!(result, Err(ProvisionError::InputClosed { .. })));
    }
}
