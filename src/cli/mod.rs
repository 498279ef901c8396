use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

use crate::domain::MetadataFilter;

/// AI provider backing chat, embedding and media commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Openai,
    Azure,
    Mistral,
    Anthropic,
}

/// Where `memory` commands store records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MemoryBackend {
    Qdrant,
    Weaviate,
    /// In-process store; contents vanish when the command exits
    Volatile,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single prompt and print the reply
    Chat {
        prompt: String,

        #[arg(short, long)]
        system: Option<String>,

        /// Print the reply as it is generated
        #[arg(long)]
        stream: bool,

        #[arg(short, long)]
        temperature: Option<f32>,

        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Print embedding vectors for one or more texts
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Generate an image from a prompt
    Image {
        prompt: String,

        #[arg(long, default_value = "1024")]
        width: u32,

        #[arg(long, default_value = "1024")]
        height: u32,

        /// Save the image here instead of printing its URL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synthesize speech into an audio file
    Speak {
        text: String,

        #[arg(long, default_value = "alloy")]
        voice: String,

        #[arg(short, long, default_value = "speech.mp3")]
        output: PathBuf,
    },

    /// Transcribe an audio file
    Transcribe { file: PathBuf },

    /// Check texts against the provider's content policy
    Moderate {
        #[arg(required = true)]
        texts: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Embed and store a piece of text
    Save {
        collection: String,

        text: String,

        /// Record id; a random one is generated when omitted
        #[arg(long)]
        id: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Find stored texts closest to a query
    Search {
        collection: String,

        query: String,

        #[arg(short, long, default_value = "5")]
        limit: usize,

        #[arg(short, long, default_value = "0.0")]
        min_relevance: f64,

        /// Skip this many of the best matches
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Only match records whose field equals a value, e.g. `external_source_name=github`
        #[arg(long)]
        filter: Option<MetadataFilter>,
    },

    /// List collections in the store
    Collections,
}
