use std::io::Write;

use anyhow::Result;
use futures_util::StreamExt;

use crate::domain::PromptExecutionSettings;

use super::super::Container;

pub struct ChatController<'a> {
    container: &'a Container,
}

impl<'a> ChatController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn chat(
        &self,
        prompt: String,
        system: Option<String>,
        stream: bool,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let mut settings = PromptExecutionSettings::new();
        if let Some(t) = temperature {
            settings = settings.with_temperature(t);
        }
        if let Some(n) = max_tokens {
            settings = settings.with_max_tokens(n);
        }

        let mut session = self.container.chat_session()?.with_settings(settings);
        if let Some(system) = system {
            session = session.with_system_prompt(system);
        }

        if !stream {
            let reply = session.send(&prompt).await?;
            return Ok(reply.content().unwrap_or_default());
        }

        let mut deltas = session.send_streaming(&prompt).await?;
        let mut stdout = std::io::stdout();
        let mut reply = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = match delta {
                Ok(d) => d,
                Err(e) => {
                    session.discard_streamed_turn();
                    return Err(e.into());
                }
            };
            write!(stdout, "{}", delta)?;
            stdout.flush()?;
            reply.push_str(&delta);
        }
        writeln!(stdout)?;
        session.commit_streamed_reply(reply);
        Ok(String::new())
    }
}
