//! Dental MCP Speech Library
//!
//! Text-to-speech for the dental voice desk: [`SpeechConverter`] sends text to
//! the ElevenLabs API and returns MP3 bytes, and [`SpeechServer`] exposes it as
//! an MCP tool.

pub mod converter;
pub mod server;

pub use converter::{SpeechConverter, SynthesisRequest, VoiceSettings, AUDIO_MIME_TYPE};
pub use server::{SpeechServer, SpeechSynthesizeToolParams};
