//! Native Desktop Backend
//!
//! Implements the audio primitives with rodio. Playback runs on the blocking
//! pool because rodio's output stream must live on the thread that plays.

use super::{
    AssetFetcher, AudioGraph, AudioGraphFactory, DecodedBuffer, EnvironmentProbe,
    EnvironmentSnapshot, GraphState, MediaElementFactory, MediaHandle, PlatformError,
    SpriteSegment, ToneRequest, VisualFeedback,
};
use crate::audio::events::VisualMessage;
use crate::audio::tones::Envelope;
use async_trait::async_trait;
use rodio::buffer::SamplesBuffer;
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Describes the desktop runtime: audio available, no touch, no phone
/// primitives.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEnvironment;

impl EnvironmentProbe for NativeEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            user_agent: format!(
                "liftcue/{} ({})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            audio_graph: true,
            simple_media: true,
            ..Default::default()
        }
    }
}

/// Applies an [`Envelope`] to a source, ending the source at the envelope's
/// length.
pub struct EnvelopedSource<S> {
    inner: S,
    envelope: Envelope,
    samples_per_second: f64,
    position: u64,
}

impl<S> EnvelopedSource<S>
where
    S: Source<Item = f32>,
{
    pub fn new(inner: S, envelope: Envelope) -> Self {
        let samples_per_second = inner.sample_rate() as f64 * inner.channels().max(1) as f64;
        Self {
            inner,
            envelope,
            samples_per_second,
            position: 0,
        }
    }
}

impl<S> Iterator for EnvelopedSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let t = Duration::from_secs_f64(self.position as f64 / self.samples_per_second);
        if t >= self.envelope.length {
            return None;
        }
        let sample = self.inner.next()?;
        self.position += 1;
        Some(sample * self.envelope.gain_at(t))
    }
}

impl<S> Source for EnvelopedSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.envelope.length)
    }
}

/// Decode wav/mp3 bytes into interleaved f32 samples.
pub fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedBuffer, PlatformError> {
    let decoder =
        Decoder::new(Cursor::new(bytes)).map_err(|e| PlatformError::Decode(e.to_string()))?;
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

    if samples.is_empty() {
        return Err(PlatformError::Decode("asset contains no audio".to_string()));
    }

    Ok(DecodedBuffer {
        channels,
        sample_rate,
        samples: samples.into(),
    })
}

/// Copy the part of `buffer` covered by `segment`, clamped to the buffer.
fn slice_segment(buffer: &DecodedBuffer, segment: SpriteSegment) -> Vec<f32> {
    let channels = buffer.channels.max(1) as usize;
    let rate = buffer.sample_rate as f64;
    let total_frames = buffer.samples.len() / channels;

    let start = ((segment.offset.as_secs_f64() * rate) as usize).min(total_frames);
    let frames = (segment.duration.as_secs_f64() * rate) as usize;
    let end = start.saturating_add(frames).min(total_frames);

    buffer.samples[start * channels..end * channels].to_vec()
}

/// Play `source` to completion on the default output device.
fn play_blocking<S>(source: S, delay: Duration) -> Result<(), PlatformError>
where
    S: Source<Item = f32> + Send + 'static,
{
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }

    let (_stream, stream_handle) =
        OutputStream::try_default().map_err(|e| PlatformError::Unavailable(e.to_string()))?;
    let sink = Sink::try_new(&stream_handle).map_err(|e| PlatformError::Playback(e.to_string()))?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

fn spawn_playback<S>(source: S, delay: Duration) -> Result<(), PlatformError>
where
    S: Source<Item = f32> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|e| PlatformError::Unavailable(e.to_string()))?;

    handle.spawn_blocking(move || {
        if let Err(e) = play_blocking(source, delay) {
            tracing::warn!("Native playback failed: {}", e);
        }
    });
    Ok(())
}

/// Audio graph backed by the default rodio output device.
pub struct RodioGraph {
    state: Mutex<GraphState>,
}

impl RodioGraph {
    fn state_guard(&self) -> std::sync::MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_running(&self) -> Result<(), PlatformError> {
        match *self.state_guard() {
            GraphState::Running => Ok(()),
            GraphState::Suspended => Err(PlatformError::NotAllowed("graph is suspended".to_string())),
            GraphState::Closed => Err(PlatformError::Closed),
        }
    }
}

#[async_trait]
impl AudioGraph for RodioGraph {
    fn state(&self) -> GraphState {
        *self.state_guard()
    }

    async fn resume(&self) -> Result<(), PlatformError> {
        let mut state = self.state_guard();
        if *state == GraphState::Closed {
            return Err(PlatformError::Closed);
        }
        *state = GraphState::Running;
        Ok(())
    }

    async fn suspend(&self) -> Result<(), PlatformError> {
        let mut state = self.state_guard();
        if *state == GraphState::Closed {
            return Err(PlatformError::Closed);
        }
        *state = GraphState::Suspended;
        Ok(())
    }

    async fn close(&self) -> Result<(), PlatformError> {
        *self.state_guard() = GraphState::Closed;
        Ok(())
    }

    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedBuffer, PlatformError> {
        tokio::task::spawn_blocking(move || decode_bytes(bytes))
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?
    }

    fn play_segment(
        &self,
        buffer: &DecodedBuffer,
        segment: SpriteSegment,
        envelope: Envelope,
    ) -> Result<(), PlatformError> {
        self.ensure_running()?;

        let samples = slice_segment(buffer, segment);
        if samples.is_empty() {
            return Err(PlatformError::Playback("segment is outside the asset".to_string()));
        }
        let source = SamplesBuffer::new(buffer.channels, buffer.sample_rate, samples);
        spawn_playback(EnvelopedSource::new(source, envelope), Duration::ZERO)
    }

    fn start_tone(&self, request: ToneRequest) -> Result<(), PlatformError> {
        self.ensure_running()?;

        let source = EnvelopedSource::new(SineWave::new(request.frequency_hz), request.envelope);
        spawn_playback(source, request.start_delay)
    }
}

/// Creates [`RodioGraph`]s after checking an output device exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioGraphFactory;

impl AudioGraphFactory for RodioGraphFactory {
    fn create(&self) -> Result<Arc<dyn AudioGraph>, PlatformError> {
        // The stream is not Send; only probe for a device here.
        OutputStream::try_default().map_err(|e| PlatformError::Unavailable(e.to_string()))?;

        tracing::info!("Opened native audio output");
        Ok(Arc::new(RodioGraph {
            state: Mutex::new(GraphState::Running),
        }))
    }
}

/// A fully decoded asset with a playhead.
pub struct RodioMediaHandle {
    buffer: DecodedBuffer,
    position: Mutex<Duration>,
    /// Bumped by `pause` to stop in-flight playback
    generation: Arc<AtomicU64>,
}

#[async_trait]
impl MediaHandle for RodioMediaHandle {
    fn seek(&self, position: Duration) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }

    async fn play(&self) -> Result<(), PlatformError> {
        let position = *self.position.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = self.buffer.duration().saturating_sub(position);
        let samples = slice_segment(&self.buffer, SpriteSegment { offset: position, duration: remaining });
        if samples.is_empty() {
            return Err(PlatformError::Playback("playhead is past the end".to_string()));
        }

        let source = SamplesBuffer::new(self.buffer.channels, self.buffer.sample_rate, samples);
        let generation = Arc::clone(&self.generation);
        let started = generation.load(Ordering::SeqCst);

        tokio::task::spawn_blocking(move || {
            let (_stream, stream_handle) = match OutputStream::try_default() {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("No output device for media playback: {}", e);
                    return;
                }
            };
            let sink = match Sink::try_new(&stream_handle) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Media sink failed: {}", e);
                    return;
                }
            };

            sink.append(source);
            while !sink.empty() {
                if generation.load(Ordering::SeqCst) != started {
                    sink.stop();
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        });

        Ok(())
    }

    fn pause(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loads media elements by fetching and fully decoding the asset.
pub struct RodioMediaFactory {
    fetcher: Arc<dyn AssetFetcher>,
}

impl RodioMediaFactory {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl MediaElementFactory for RodioMediaFactory {
    async fn load(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn MediaHandle>, PlatformError> {
        let load = async {
            let bytes = self.fetcher.fetch(url).await?;
            tokio::task::spawn_blocking(move || decode_bytes(bytes))
                .await
                .map_err(|e| PlatformError::Decode(e.to_string()))?
        };

        let buffer = tokio::time::timeout(timeout, load)
            .await
            .map_err(|_| PlatformError::Timeout(timeout))??;

        Ok(Arc::new(RodioMediaHandle {
            buffer,
            position: Mutex::new(Duration::ZERO),
            generation: Arc::new(AtomicU64::new(0)),
        }))
    }
}

/// Prints visual feedback to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleToast;

impl VisualFeedback for ConsoleToast {
    fn show(&self, message: &VisualMessage) {
        tracing::info!("Visual feedback: {}", message.title);
        println!("[{}] {}", message.title, message.description);
    }
}
