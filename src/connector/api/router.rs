use anyhow::Result;

use crate::cli::{Commands, MemoryCommands};
use crate::domain::MemorySearch;

use super::container::Container;
use super::controller::{ChatController, EmbedController, MediaController, MemoryController};

pub struct Router<'a> {
    chat_controller: ChatController<'a>,
    embed_controller: EmbedController<'a>,
    memory_controller: MemoryController<'a>,
    media_controller: MediaController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            chat_controller: ChatController::new(container),
            embed_controller: EmbedController::new(container),
            memory_controller: MemoryController::new(container),
            media_controller: MediaController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Chat {
                prompt,
                system,
                stream,
                temperature,
                max_tokens,
            } => {
                self.chat_controller
                    .chat(prompt, system, stream, temperature, max_tokens)
                    .await
            }
            Commands::Embed { texts } => self.embed_controller.embed(texts).await,
            Commands::Memory { command } => match command {
                MemoryCommands::Save {
                    collection,
                    text,
                    id,
                    description,
                } => {
                    self.memory_controller
                        .save(collection, text, id, description)
                        .await
                }
                MemoryCommands::Search {
                    collection,
                    query,
                    limit,
                    min_relevance,
                    offset,
                    filter,
                } => {
                    let mut options = MemorySearch::new(limit)
                        .with_min_relevance(min_relevance)
                        .with_offset(offset);
                    options.filter = filter;
                    self.memory_controller
                        .search(collection, query, options)
                        .await
                }
                MemoryCommands::Collections => self.memory_controller.collections().await,
            },
            Commands::Image {
                prompt,
                width,
                height,
                output,
            } => {
                self.media_controller
                    .image(prompt, width, height, output)
                    .await
            }
            Commands::Speak {
                text,
                voice,
                output,
            } => self.media_controller.speak(text, voice, output).await,
            Commands::Transcribe { file } => self.media_controller.transcribe(file).await,
            Commands::Moderate { texts } => self.media_controller.moderate(texts).await,
        }
    }
}
