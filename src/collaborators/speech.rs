use super::support::run_checked;
use super::types::SpeechSynthesizer;
use crate::config::SpeechConfig;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::PathBuf;
use tracing::debug;

const COLLABORATOR: &str = "speech";

/// Speech through two external programs: a synthesizer that writes an audio
/// file and a player for that file
pub struct CommandSpeech {
    synth_command: String,
    player_command: String,
    output_path: PathBuf,
}

impl CommandSpeech {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            synth_command: config.synth_command.clone(),
            player_command: config.player_command.clone(),
            output_path: PathBuf::from(&config.output_path),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSpeech {
    async fn synthesize_and_play(
        &self,
        text: &str,
        language: &str,
    ) -> Result<(), CollaboratorError> {
        let output = self.output_path.as_os_str();

        run_checked(
            COLLABORATOR,
            &self.synth_command,
            [
                OsStr::new("--lang"),
                OsStr::new(language),
                OsStr::new("--output"),
                output,
                OsStr::new(text),
            ],
        )
        .await?;
        debug!("Synthesized speech to {}", self.output_path.display());

        run_checked(COLLABORATOR, &self.player_command, [output]).await?;
        Ok(())
    }
}
