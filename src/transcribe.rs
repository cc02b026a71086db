use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::TranscriptionConfig;

/// Audio longer than this is split into fixed-length segments that are
/// transcribed independently
pub const CHUNK_DURATION_SECS: f64 = 300.0;

/// Timeout for media downloads and transcode subprocesses
pub const MEDIA_TIMEOUT_SECS: u64 = 120;

/// Bound a subprocess future to the media timeout. A hung tool must never
/// suspend the request; the caller degrades instead.
async fn run_with_deadline<T, F>(label: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(MEDIA_TIMEOUT_SECS), fut).await {
        Ok(result) => result.map_err(|e| anyhow!("{} failed: {}", label, e)),
        Err(_) => Err(anyhow!("{} timed out after {}s", label, MEDIA_TIMEOUT_SECS)),
    }
}

/// Downloads a media URL to a local file (yt-dlp in production)
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;
}

/// Turns an audio file into text (local whisper CLI or a hosted model)
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String>;
}

/// Audio tooling: stream extraction, duration probing and chunk cutting
/// (ffmpeg/ffprobe in production)
#[async_trait]
pub trait AudioToolbox: Send + Sync {
    /// Run one codec/container extraction attempt. `Ok(false)` means the
    /// tool ran and did not produce usable output.
    async fn convert(
        &self,
        video_path: &Path,
        audio_path: &Path,
        codec: &str,
        format: &str,
    ) -> Result<bool>;

    async fn duration_secs(&self, audio_path: &Path) -> Option<f64>;

    /// Cut `[start, start + duration)` out of an audio file without
    /// re-encoding
    async fn cut(
        &self,
        audio_path: &Path,
        start: f64,
        duration: f64,
        chunk_path: &Path,
    ) -> Result<bool>;
}

/// yt-dlp subprocess downloader
pub struct YtDlpDownloader;

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        let template = output_dir.join("source.%(ext)s");
        debug!("Downloading media via yt-dlp: {}", url);

        let status = run_with_deadline(
            "yt-dlp",
            tokio::process::Command::new("yt-dlp")
                .args([
                    "-f",
                    "bestaudio/best",
                    "--no-playlist",
                    "-o",
                    &template.to_string_lossy(),
                    url,
                ])
                .kill_on_drop(true)
                .status(),
        )
        .await?;

        if !status.success() {
            return Err(anyhow!("yt-dlp exited with {}", status));
        }

        // yt-dlp picks the extension; find whatever it wrote
        let mut entries = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .file_stem()
                .map_or(false, |stem| stem.to_string_lossy() == "source")
            {
                return Ok(path);
            }
        }
        Err(anyhow!("yt-dlp reported success but produced no file"))
    }
}

/// ffmpeg/ffprobe subprocess toolbox
pub struct FfmpegToolbox;

#[async_trait]
impl AudioToolbox for FfmpegToolbox {
    async fn convert(
        &self,
        video_path: &Path,
        audio_path: &Path,
        codec: &str,
        format: &str,
    ) -> Result<bool> {
        let result = run_with_deadline(
            "ffmpeg",
            tokio::process::Command::new("ffmpeg")
                .args([
                    "-i",
                    video_path.to_string_lossy().as_ref(),
                    "-vn",
                    "-acodec",
                    codec,
                    "-ar",
                    "16000",
                    "-ac",
                    "1",
                    "-f",
                    format,
                    "-y",
                    audio_path.to_string_lossy().as_ref(),
                ])
                .kill_on_drop(true)
                .status(),
        )
        .await;

        match result {
            Ok(status) => Ok(status.success()),
            Err(e) => {
                // ffmpeg binary missing or stuck; the caller may still try
                // another codec
                warn!("ffmpeg extraction failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Probe media duration in seconds via ffprobe. Best effort: errors
    /// map to `None` and the caller skips chunking.
    async fn duration_secs(&self, audio_path: &Path) -> Option<f64> {
        let output = run_with_deadline(
            "ffprobe",
            tokio::process::Command::new("ffprobe")
                .args([
                    "-v",
                    "quiet",
                    "-print_format",
                    "json",
                    "-show_format",
                    audio_path.to_string_lossy().as_ref(),
                ])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .ok()?;

        if !output.status.success() {
            return None;
        }

        let data: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
        data["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
    }

    async fn cut(
        &self,
        audio_path: &Path,
        start: f64,
        duration: f64,
        chunk_path: &Path,
    ) -> Result<bool> {
        let status = run_with_deadline(
            "ffmpeg",
            tokio::process::Command::new("ffmpeg")
                .args([
                    "-i",
                    audio_path.to_string_lossy().as_ref(),
                    "-ss",
                    &start.to_string(),
                    "-t",
                    &duration.to_string(),
                    "-c",
                    "copy",
                    "-y",
                    chunk_path.to_string_lossy().as_ref(),
                ])
                .kill_on_drop(true)
                .status(),
        )
        .await?;
        Ok(status.success())
    }
}

/// Local whisper CLI transcriber
pub struct WhisperCliTranscriber {
    model: String,
}

impl WhisperCliTranscriber {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

#[async_trait]
impl SpeechToText for WhisperCliTranscriber {
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String> {
        let output_dir = audio_path
            .parent()
            .ok_or_else(|| anyhow!("audio path has no parent directory"))?;

        let status = run_with_deadline(
            "whisper",
            tokio::process::Command::new("whisper")
                .args([
                    audio_path.to_string_lossy().as_ref(),
                    "--model",
                    &self.model,
                    "--output_format",
                    "txt",
                    "--output_dir",
                    output_dir.to_string_lossy().as_ref(),
                ])
                .kill_on_drop(true)
                .status(),
        )
        .await?;

        if !status.success() {
            return Err(anyhow!("whisper exited with {}", status));
        }

        let txt_path = audio_path.with_extension("txt");
        let text = tokio::fs::read_to_string(&txt_path).await?;
        Ok(text.trim().to_string())
    }
}

/// Hosted transcription via the OpenAI audio endpoint
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(MEDIA_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        let filename = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("transcription API error {}: {}", status, text));
        }

        let body: serde_json::Value = response.json().await?;
        body["text"]
            .as_str()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| anyhow!("transcription response missing text field"))
    }
}

/// Downloads a media URL, extracts an audio stream and transcribes it.
///
/// Every step is independently fault tolerant; `transcribe` returns an
/// empty string on any failure. All temporary files live in a per-call
/// `TempDir` released on every exit path.
pub struct AudioTranscriber {
    downloader: Arc<dyn MediaDownloader>,
    toolbox: Arc<dyn AudioToolbox>,
    stt: Arc<dyn SpeechToText>,
}

impl AudioTranscriber {
    pub fn new(downloader: Arc<dyn MediaDownloader>, stt: Arc<dyn SpeechToText>) -> Self {
        Self::with_toolbox(downloader, Arc::new(FfmpegToolbox), stt)
    }

    pub fn with_toolbox(
        downloader: Arc<dyn MediaDownloader>,
        toolbox: Arc<dyn AudioToolbox>,
        stt: Arc<dyn SpeechToText>,
    ) -> Self {
        Self {
            downloader,
            toolbox,
            stt,
        }
    }

    /// Build the transcriber from configuration: local whisper CLI by
    /// default, hosted transcription when an API key is configured and the
    /// provider asks for it.
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        let stt: Arc<dyn SpeechToText> = if config.use_hosted {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("hosted transcription requires an API key"))?;
            Arc::new(OpenAiTranscriber::new(api_key, config.model.clone())?)
        } else {
            Arc::new(WhisperCliTranscriber::new(config.model.clone()))
        };
        Ok(Self::new(Arc::new(YtDlpDownloader), stt))
    }

    /// Transcribe the audio of a media URL. Never raises: any failure
    /// returns an empty string and the caller proceeds with whatever text
    /// it already has.
    pub async fn transcribe(&self, media_url: &str) -> String {
        match self.try_transcribe(media_url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Audio transcription failed for {}: {}", media_url, e);
                String::new()
            }
        }
    }

    async fn try_transcribe(&self, media_url: &str) -> Result<String> {
        let temp_dir = TempDir::new()?;
        info!("🎵 Transcribing audio from: {}", media_url);

        let video_path = self.downloader.download(media_url, temp_dir.path()).await?;
        let audio_path = self.extract_audio(&video_path, temp_dir.path()).await?;

        let duration = self.toolbox.duration_secs(&audio_path).await.unwrap_or(0.0);
        let text = if duration > CHUNK_DURATION_SECS {
            self.transcribe_chunked(&audio_path, duration, temp_dir.path())
                .await?
        } else {
            self.stt.transcribe_file(&audio_path).await?
        };

        info!("✅ Transcription produced {} characters", text.len());
        Ok(text)
    }

    /// Extract a mono 16kHz WAV audio stream from a video file. If the WAV
    /// conversion fails (codec unavailable, container oddities) retry once
    /// with mp3 output.
    async fn extract_audio(&self, video_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let wav_path = output_dir.join("audio.wav");
        if self
            .toolbox
            .convert(video_path, &wav_path, "pcm_s16le", "wav")
            .await?
        {
            return Ok(wav_path);
        }

        warn!("WAV extraction failed, retrying with mp3");
        let mp3_path = output_dir.join("audio.mp3");
        if self
            .toolbox
            .convert(video_path, &mp3_path, "libmp3lame", "mp3")
            .await?
        {
            return Ok(mp3_path);
        }

        Err(anyhow!(
            "audio extraction failed for {}",
            video_path.display()
        ))
    }

    /// Split long audio into fixed-length segments and transcribe each in
    /// temporal order. Segment failures are skipped, not fatal.
    async fn transcribe_chunked(
        &self,
        audio_path: &Path,
        duration: f64,
        work_dir: &Path,
    ) -> Result<String> {
        let num_chunks = (duration / CHUNK_DURATION_SECS).ceil() as usize;
        info!("✂️ Splitting {:.0}s audio into {} chunks", duration, num_chunks);

        let mut parts = Vec::new();
        for i in 0..num_chunks {
            let start = i as f64 * CHUNK_DURATION_SECS;
            let chunk_path = work_dir.join(format!("chunk_{:03}.wav", i));

            let cut = self
                .toolbox
                .cut(audio_path, start, CHUNK_DURATION_SECS, &chunk_path)
                .await;
            if !matches!(cut, Ok(true)) {
                warn!("Failed to cut chunk {}", i);
                continue;
            }

            match self.stt.transcribe_file(&chunk_path).await {
                Ok(text) if !text.is_empty() => parts.push(text),
                Ok(_) => {}
                Err(e) => warn!("Chunk {} transcription failed: {}", i, e),
            }
        }

        Ok(parts.join(" "))
    }
}
