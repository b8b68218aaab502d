//! # Playback Engine
//!
//! Streams one WAV file at a time through the double buffer.
//!
//! ```text
//!            +---------------- DMA (auto-init) ----------------+
//!            v                                                 |
//!   [ first half | second half ] --> codec --> IRQ --> RefillSignal
//!            ^                                                 |
//!            +------------ Player::poll refills <--------------+
//! ```
//!
//! The codec interrupts once per half. The interrupt only raises a flag;
//! [`Player::poll`], called from the main loop, refills the half the DMA
//! has just left. A poll that comes too late merges two interrupts into one
//! and the skipped half replays stale audio.

use crate::buffer::{BufferHalf, DmaBuffer, BUFFER_SIZE};
use crate::codec::{Codec, CodecFormat};
use crate::config::{PlayerConfig, WssConfig};
use crate::dma;
use crate::error::AudioResult;
use crate::irq::{IrqLine, RefillSignal};
use crate::storage::{Storage, TrackFile};
use crate::wav::{StreamDescriptor, WavReader};
use alloc::sync::Arc;
use wss_hal::Platform;

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// No track open
    #[default]
    Stopped,
    /// Track open, codec halted
    Paused,
    /// Track streaming
    Playing,
}

/// The open track
struct Session<F> {
    file: F,
    /// PCM bytes of the data chunk not read yet
    remaining: u32,
    silence: u8,
}

/// Read the next chunk of PCM into `dest`, padding a short read with silence
fn fill<F: TrackFile + ?Sized>(
    file: &mut F,
    dest: &mut [u8],
    remaining: &mut u32,
    silence: u8,
) -> AudioResult<usize> {
    let want = dest.len().min(*remaining as usize);
    let read = file.read_full(&mut dest[..want])?;
    dest[read..].fill(silence);
    *remaining -= read as u32;
    Ok(read)
}

/// WAV playback engine bound to one codec
///
/// Owns the platform, the DMA buffer and the IRQ binding for its whole
/// life; [`Player::deinit`] hands the platform back.
///
/// # Teardown
///
/// Call [`Player::deinit`] before letting go of a player. Teardown needs the
/// platform, which is moved out on `deinit`, so there is no `Drop` doing it.
/// A player dropped without `deinit` leaves its handler installed with the
/// line unmasked and codec and DMA in whatever state they were; the IRQ
/// binding logs a warning when that happens.
pub struct Player<H: Platform, S: Storage> {
    hal: H,
    storage: S,
    wss: WssConfig,
    codec: Codec,
    reader: WavReader,
    buffer: DmaBuffer,
    signal: Arc<RefillSignal>,
    irq: Option<IrqLine>,
    session: Option<Session<S::File>>,
    stream: Option<StreamDescriptor>,
    state: PlayerState,
    next_half: BufferHalf,
    bytes_played: u64,
    volume: u8,
    coalesced_seen: u32,
}

impl<H: Platform, S: Storage> Player<H, S> {
    /// Bring the driver up: allocate the DMA buffer, bind the IRQ and set
    /// the initial volume
    pub fn init(mut hal: H, storage: S, config: PlayerConfig) -> AudioResult<Self> {
        config.wss.validate()?;
        let codec = Codec::new(config.wss.base);

        let mut buffer = DmaBuffer::allocate(&mut hal)?;
        let signal = Arc::new(RefillSignal::new(&codec, config.wss.irq));
        let irq = match IrqLine::attach(&mut hal, config.wss.irq, signal.clone()) {
            Ok(line) => line,
            Err(err) => {
                buffer.release(&mut hal);
                return Err(err);
            }
        };

        let mut player = Self {
            hal,
            storage,
            wss: config.wss,
            codec,
            reader: WavReader::with_scan_window(config.scan_window),
            buffer,
            signal,
            irq: Some(irq),
            session: None,
            stream: None,
            state: PlayerState::Stopped,
            next_half: BufferHalf::First,
            bytes_played: 0,
            volume: config.initial_volume,
            coalesced_seen: 0,
        };

        if let Err(err) = player.set_volume(config.initial_volume) {
            player.deinit();
            return Err(err);
        }

        log::info!(
            "player: codec at {:#x}, IRQ{}, DMA{}",
            config.wss.base,
            config.wss.irq,
            config.wss.dma
        );
        Ok(player)
    }

    /// Stop playback, release every resource and return the platform
    pub fn deinit(mut self) -> H {
        if let Err(err) = self.stop() {
            log::warn!("player: stop during teardown failed: {}", err);
        }
        if let Some(line) = self.irq.take() {
            if let Err(err) = line.detach(&mut self.hal) {
                log::warn!("player: IRQ detach failed: {}", err);
            }
        }
        self.buffer.release(&mut self.hal);
        log::info!("player: shut down");
        self.hal
    }

    /// Open `path` and start playing it from the beginning
    ///
    /// A running track is stopped first. On error the player is left
    /// stopped with DMA and codec halted.
    pub fn start(&mut self, path: &str) -> AudioResult<()> {
        if self.state != PlayerState::Stopped {
            self.stop()?;
        }
        self.signal.clear();
        self.next_half = BufferHalf::First;
        self.bytes_played = 0;
        self.stream = None;

        let mut file = self.storage.open(path)?;
        let stream = self.reader.parse(&mut file)?;
        let format = CodecFormat::for_stream(&stream)?;

        let mut remaining = stream.data_size;
        let primed = fill(&mut file, self.buffer.as_mut_slice(), &mut remaining, format.silence())?;

        if let Err(err) = self.start_hardware(&format) {
            self.abort_start();
            return Err(err);
        }

        self.bytes_played = primed as u64;
        self.stream = Some(stream);
        self.session = Some(Session {
            file,
            remaining,
            silence: format.silence(),
        });
        self.state = PlayerState::Playing;

        log::info!(
            "player: {} ({} Hz, {} bit, {} ch, {} s)",
            path,
            stream.sample_rate,
            stream.bit_depth,
            stream.channels,
            stream.duration_secs()
        );
        Ok(())
    }

    fn start_hardware(&mut self, format: &CodecFormat) -> AudioResult<()> {
        dma::autoinit_start(
            &mut self.hal,
            self.wss.dma,
            self.buffer.page(),
            self.buffer.offset(),
            BUFFER_SIZE as u32,
        )?;
        self.codec.playback_start(&mut self.hal, format, BUFFER_SIZE)?;
        // The mixer baseline leaves the DACs at full level.
        self.codec.set_volume(&mut self.hal, self.volume)
    }

    fn abort_start(&mut self) {
        if let Err(err) = self.codec.playback_stop(&mut self.hal) {
            log::warn!("player: codec did not stop: {}", err);
        }
        if let Err(err) = dma::release(&mut self.hal, self.wss.dma) {
            log::warn!("player: DMA release failed: {}", err);
        }
        self.codec.clear_interrupt(&mut self.hal);
        self.signal.clear();
    }

    /// Halt the codec, keeping position; no-op unless playing
    pub fn pause(&mut self) -> AudioResult<PlayerState> {
        if self.state == PlayerState::Playing {
            self.codec.playback_stop(&mut self.hal)?;
            self.state = PlayerState::Paused;
            log::info!("player: paused");
        }
        Ok(self.state)
    }

    /// Continue a paused track; no-op unless paused
    pub fn resume(&mut self) -> AudioResult<PlayerState> {
        if self.state == PlayerState::Paused {
            self.codec.playback_continue(&mut self.hal)?;
            self.state = PlayerState::Playing;
            log::info!("player: resumed");
        }
        Ok(self.state)
    }

    /// Silence the device and close the track
    ///
    /// Always runs every step and ends in [`PlayerState::Stopped`]; the
    /// first hardware error, if any, is returned.
    pub fn stop(&mut self) -> AudioResult<()> {
        let codec = self.codec.playback_stop(&mut self.hal);
        let dma = dma::release(&mut self.hal, self.wss.dma);
        self.codec.clear_interrupt(&mut self.hal);
        self.signal.clear();
        self.session = None;

        if self.state != PlayerState::Stopped {
            log::info!("player: stopped after {} bytes", self.bytes_played);
        }
        self.state = PlayerState::Stopped;
        codec.and(dma)
    }

    /// Set the output level in percent (0 mutes)
    pub fn set_volume(&mut self, percent: u8) -> AudioResult<()> {
        self.codec.set_volume(&mut self.hal, percent)?;
        self.volume = percent;
        Ok(())
    }

    /// Service a pending refill; call on every main-loop iteration
    ///
    /// Never blocks on the codec. End of stream stops the player.
    pub fn poll(&mut self) -> AudioResult<()> {
        if self.state != PlayerState::Playing || !self.signal.take() {
            return Ok(());
        }

        let coalesced = self.signal.coalesced();
        if coalesced != self.coalesced_seen {
            log::warn!(
                "player: {} refill(s) missed, audio repeated",
                coalesced.wrapping_sub(self.coalesced_seen)
            );
            self.coalesced_seen = coalesced;
        }

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let half = self.next_half;
        let read = match fill(
            &mut session.file,
            self.buffer.half_mut(half),
            &mut session.remaining,
            session.silence,
        ) {
            Ok(read) => read,
            Err(err) => {
                log::warn!("player: read failed: {}", err);
                // The read error is what the caller gets back.
                if let Err(stop_err) = self.stop() {
                    log::warn!("player: stop after read failure failed: {}", stop_err);
                }
                return Err(err);
            }
        };

        self.bytes_played += read as u64;
        self.next_half = half.other();
        log::debug!("player: refilled {:?} half with {} bytes", half, read);

        if read == 0 {
            log::info!("player: end of stream");
            self.stop()?;
        }
        Ok(())
    }

    /// Current state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whole seconds streamed into the buffer for the current or last track
    pub fn seconds_played(&self) -> u32 {
        self.stream
            .map_or(0, |s| (self.bytes_played / u64::from(s.byte_rate)) as u32)
    }

    /// Whole seconds of PCM in the current or last track
    pub fn seconds_total(&self) -> u32 {
        self.stream.map_or(0, |s| s.duration_secs())
    }

    /// Bytes streamed into the buffer for the current or last track
    pub fn bytes_played(&self) -> u64 {
        self.bytes_played
    }

    /// Descriptor of the current or last track
    pub fn stream(&self) -> Option<&StreamDescriptor> {
        self.stream.as_ref()
    }

    /// Last volume set, in percent
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Half the next refill goes to
    pub fn next_refill_half(&self) -> BufferHalf {
        self.next_half
    }

    /// Interrupts that arrived while a refill was still pending
    pub fn coalesced_interrupts(&self) -> u32 {
        self.signal.coalesced()
    }

    /// Codec resources in use
    pub fn wss_config(&self) -> WssConfig {
        self.wss
    }

    /// The platform the player drives
    pub fn platform(&self) -> &H {
        &self.hal
    }

    /// Mutable access to the platform
    pub fn platform_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Mutable access to the track storage
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

impl<H: Platform, S: Storage> core::fmt::Debug for Player<H, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Player")
            .field("wss", &self.wss)
            .field("state", &self.state)
            .field("next_half", &self.next_half)
            .field("bytes_played", &self.bytes_played)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}
