//! # Playback Engine Tests
//!
//! End-to-end scenarios running the player against the simulated machine.

#[cfg(test)]
mod tests {
    use crate::buffer::{BufferHalf, BUFFER_SIZE, HALF_SIZE};
    use crate::codec::regs::Reg;
    use crate::config::PlayerConfig;
    use crate::error::{AudioError, FormatError};
    use crate::player::{Player, PlayerState};
    use crate::sim::SimMachine;
    use crate::error::AudioResult;
    use crate::storage::{MemoryFile, MemoryStorage, Storage, TrackFile};
    use crate::wav::fixture::{ramp, wav};
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use wss_hal::interrupts::{HandlerRef, InterruptHandler, InterruptVector, InterruptVectors};
    use wss_hal::port::PortIo;

    // =========================================================================
    // Helpers
    // =========================================================================

    type SimPlayer = Player<SimMachine, MemoryStorage>;

    fn storage_with(files: &[(&str, Vec<u8>)]) -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        for (path, image) in files {
            storage.insert(*path, image.clone());
        }
        storage
    }

    fn player_with(files: &[(&str, Vec<u8>)]) -> SimPlayer {
        Player::init(SimMachine::new(), storage_with(files), PlayerConfig::default()).unwrap()
    }

    /// Let one period play and service it
    fn step(player: &mut SimPlayer) -> bool {
        let played = player.platform_mut().complete_period();
        player.poll().unwrap();
        played
    }

    /// Storage whose files fail every read at or past byte `fail_at`
    struct FailingStorage {
        inner: MemoryStorage,
        fail_at: u64,
    }

    struct FailingFile {
        inner: MemoryFile,
        pos: u64,
        fail_at: u64,
    }

    impl Storage for FailingStorage {
        type File = FailingFile;

        fn open(&mut self, path: &str) -> AudioResult<FailingFile> {
            Ok(FailingFile {
                inner: self.inner.open(path)?,
                pos: 0,
                fail_at: self.fail_at,
            })
        }
    }

    impl TrackFile for FailingFile {
        fn read(&mut self, buf: &mut [u8]) -> AudioResult<usize> {
            if self.pos >= self.fail_at {
                return Err(AudioError::Io);
            }
            let cap = buf.len().min((self.fail_at - self.pos) as usize);
            let n = self.inner.read(&mut buf[..cap])?;
            self.pos += n as u64;
            Ok(n)
        }

        fn seek(&mut self, pos: u64) -> AudioResult<()> {
            self.inner.seek(pos)?;
            self.pos = pos;
            Ok(())
        }

        fn size(&self) -> u64 {
            self.inner.size()
        }
    }

    struct Marker;

    impl InterruptHandler for Marker {
        fn handle(&self, _vector: InterruptVector, _io: &mut dyn PortIo) {}
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    #[test]
    fn test_two_second_track_drains_and_stops() {
        let pcm = ramp(352_800);
        let mut player = player_with(&[("song.wav", wav(44100, 16, 2, &pcm))]);

        player.start("song.wav").unwrap();
        assert_eq!(player.state(), PlayerState::Playing);
        assert_eq!(player.seconds_total(), 2);

        let mut periods = 0;
        while player.state() == PlayerState::Playing && periods < 64 {
            assert!(step(&mut player));
            periods += 1;
        }

        assert_eq!(player.state(), PlayerState::Stopped);
        assert_eq!(player.bytes_played(), 352_800);
        assert_eq!(player.seconds_played(), 2);

        // the final partial half is queued but playback stops before it
        assert_eq!(periods, 21);
        let played = player.platform().played();
        assert_eq!(played.len(), 21 * HALF_SIZE);
        assert_eq!(played, &pcm[..21 * HALF_SIZE]);

        assert!(!player.platform_mut().complete_period());
        assert!(player.platform().dma_channel(1).masked);
    }

    #[test]
    fn test_refill_never_targets_the_half_in_transfer() {
        let pcm = ramp(200_000);
        let mut player = player_with(&[("a.wav", wav(22050, 16, 2, &pcm))]);
        player.start("a.wav").unwrap();
        assert_eq!(player.next_refill_half(), BufferHalf::First);

        for _ in 0..6 {
            assert!(player.platform_mut().complete_period());
            let in_transfer = player.platform().current_half();
            assert_eq!(player.next_refill_half(), in_transfer.other());

            player.poll().unwrap();
            assert_eq!(player.next_refill_half(), in_transfer);
        }
    }

    #[test]
    fn test_short_track_is_padded_with_silence() {
        let pcm = ramp(1000);
        let mut player = player_with(&[("beep.wav", wav(8000, 8, 1, &pcm))]);
        player.start("beep.wav").unwrap();

        assert!(step(&mut player));
        assert_eq!(player.state(), PlayerState::Stopped);

        let played = player.platform().played();
        assert_eq!(played.len(), HALF_SIZE);
        assert_eq!(&played[..1000], &pcm[..]);
        assert!(played[1000..].iter().all(|&b| b == 0x80));
        assert_eq!(player.seconds_played(), 0);
    }

    #[test]
    fn test_short_sixteen_bit_track_is_padded_with_zero() {
        let pcm = [0x55u8; 1000];
        let mut player = player_with(&[("beep16.wav", wav(8000, 16, 1, &pcm))]);
        player.start("beep16.wav").unwrap();

        assert!(step(&mut player));
        assert_eq!(player.state(), PlayerState::Stopped);

        let played = player.platform().played();
        assert_eq!(played.len(), HALF_SIZE);
        assert_eq!(&played[..1000], &pcm[..]);
        assert!(played[1000..].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_read_error_during_refill_stops_playback() {
        let pcm = ramp(100_000);
        let storage = FailingStorage {
            inner: storage_with(&[("bad.wav", wav(44100, 16, 2, &pcm))]),
            // header plus the priming read, then the first refill fails
            fail_at: 44 + BUFFER_SIZE as u64,
        };
        let mut player = Player::init(SimMachine::new(), storage, PlayerConfig::default()).unwrap();

        player.start("bad.wav").unwrap();
        assert_eq!(player.state(), PlayerState::Playing);

        assert!(player.platform_mut().complete_period());
        assert_eq!(player.poll(), Err(AudioError::Io));

        assert_eq!(player.state(), PlayerState::Stopped);
        assert!(player.platform().dma_channel(1).masked);
        assert!(!player.platform().codec().playback_enabled());
        assert!(!player.platform_mut().complete_period());

        // the driver stays usable after the failure
        player.set_volume(30).unwrap();
        let sim = player.deinit();
        assert_eq!(sim.memory().live_blocks(), 0);
    }

    #[test]
    fn test_chunks_after_the_data_are_never_played() {
        let pcm = ramp(1000);
        let mut image = wav(8000, 8, 1, &pcm);
        image.extend_from_slice(b"LIST");
        image.extend_from_slice(&[0x11; 500]);
        let mut player = player_with(&[("tagged.wav", image)]);

        player.start("tagged.wav").unwrap();
        step(&mut player);

        let played = player.platform().played();
        assert_eq!(&played[..1000], &pcm[..]);
        assert!(played[1000..].iter().all(|&b| b == 0x80));
    }

    #[test]
    fn test_late_poll_coalesces_interrupts() {
        let mut player = player_with(&[("a.wav", wav(44100, 16, 2, &ramp(352_800)))]);
        player.start("a.wav").unwrap();

        assert!(player.platform_mut().complete_period());
        assert!(player.platform_mut().complete_period());
        assert_eq!(player.coalesced_interrupts(), 1);

        let before = player.bytes_played();
        player.poll().unwrap();
        player.poll().unwrap();
        assert_eq!(player.bytes_played(), before + HALF_SIZE as u64);
        assert_eq!(player.platform().eoi_count(), (2, 0));
    }

    // =========================================================================
    // State Machine
    // =========================================================================

    #[test]
    fn test_pause_resume_stop_sequence() {
        let mut player = player_with(&[("a.wav", wav(44100, 16, 2, &ramp(100_000)))]);
        player.start("a.wav").unwrap();

        assert_eq!(player.pause().unwrap(), PlayerState::Paused);
        assert!(!player.platform().codec().playback_enabled());
        assert!(!player.platform_mut().complete_period());
        assert_eq!(player.pause().unwrap(), PlayerState::Paused);

        assert_eq!(player.resume().unwrap(), PlayerState::Playing);
        assert!(player.platform().codec().playback_enabled());
        assert_eq!(player.resume().unwrap(), PlayerState::Playing);
        assert_eq!(player.platform().codec().calibrations(), 1);

        player.stop().unwrap();
        assert_eq!(player.state(), PlayerState::Stopped);
        player.stop().unwrap();
        assert_eq!(player.pause().unwrap(), PlayerState::Stopped);
        assert_eq!(player.resume().unwrap(), PlayerState::Stopped);
    }

    #[test]
    fn test_poll_is_idle_while_paused() {
        let mut player = player_with(&[("a.wav", wav(44100, 16, 2, &ramp(100_000)))]);
        player.start("a.wav").unwrap();
        assert!(player.platform_mut().complete_period());
        player.pause().unwrap();

        let before = player.bytes_played();
        player.poll().unwrap();
        assert_eq!(player.bytes_played(), before);

        player.resume().unwrap();
        player.poll().unwrap();
        assert_eq!(player.bytes_played(), before + HALF_SIZE as u64);
    }

    #[test]
    fn test_start_while_playing_restarts_cleanly() {
        let mut player = player_with(&[
            ("a.wav", wav(44100, 16, 2, &ramp(100_000))),
            ("b.wav", wav(22050, 8, 1, &ramp(50_000))),
        ]);
        player.start("a.wav").unwrap();
        step(&mut player);
        assert_eq!(player.next_refill_half(), BufferHalf::Second);

        player.start("b.wav").unwrap();
        assert_eq!(player.state(), PlayerState::Playing);
        assert_eq!(player.next_refill_half(), BufferHalf::First);
        assert_eq!(player.bytes_played(), 32_768);
        assert_eq!(player.stream().map(|s| s.sample_rate), Some(22050));
        assert_eq!(player.platform().dma_channel(1).position, 0);
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn test_missing_file_is_not_found() {
        let mut player = player_with(&[]);
        assert_eq!(player.start("nope.wav"), Err(AudioError::NotFound));
        assert_eq!(player.state(), PlayerState::Stopped);
        assert_eq!(player.seconds_total(), 0);
    }

    #[test]
    fn test_unsupported_rate_touches_no_hardware() {
        let mut player = player_with(&[("odd.wav", wav(12000, 16, 2, &ramp(4000)))]);
        player.platform_mut().clear_port_writes();

        assert_eq!(
            player.start("odd.wav"),
            Err(AudioError::InvalidFormat(FormatError::UnsupportedSampleRate { rate: 12000 }))
        );
        assert_eq!(player.state(), PlayerState::Stopped);
        assert!(player.platform().port_writes().is_empty());
    }

    #[test]
    fn test_codec_timeout_leaves_player_stopped() {
        let mut player = player_with(&[("a.wav", wav(44100, 16, 2, &ramp(100_000)))]);
        player.platform_mut().codec_mut().set_stuck_busy(true);

        assert_eq!(player.start("a.wav"), Err(AudioError::Timeout));
        assert_eq!(player.state(), PlayerState::Stopped);
        assert!(player.platform().dma_channel(1).masked);
    }

    #[test]
    fn test_init_fails_on_a_dead_codec() {
        let mut sim = SimMachine::new();
        sim.codec_mut().set_stuck_busy(true);
        let result = Player::init(sim, MemoryStorage::new(), PlayerConfig::default());
        assert!(matches!(result, Err(AudioError::Timeout)));
    }

    // =========================================================================
    // Volume and Lifecycle
    // =========================================================================

    #[test]
    fn test_volume_survives_playback_start() {
        let mut player = player_with(&[("a.wav", wav(44100, 16, 2, &ramp(100_000)))]);
        player.set_volume(50).unwrap();
        player.start("a.wav").unwrap();

        assert_eq!(player.platform().codec().reg(Reg::LeftDac), 21);
        assert_eq!(player.platform().codec().reg(Reg::RightDac), 21);

        assert!(player.set_volume(101).is_err());
        assert_eq!(player.volume(), 50);
    }

    #[test]
    fn test_deinit_restores_the_previous_vector() {
        let mut sim = SimMachine::new();
        let old: HandlerRef = Arc::new(Marker);
        sim.set_handler(0x0D, Some(old.clone()));

        let mut player = Player::init(
            sim,
            storage_with(&[("a.wav", wav(44100, 16, 2, &ramp(100_000)))]),
            PlayerConfig::default(),
        )
        .unwrap();
        assert!(!player.platform().irq_masked(5));
        assert_eq!(player.platform().memory().live_blocks(), 1);
        player.start("a.wav").unwrap();

        let sim = player.deinit();
        assert!(sim.irq_masked(5));
        assert!(Arc::ptr_eq(&sim.handler(0x0D).unwrap(), &old));
        assert!(sim.dma_channel(1).masked);
        assert!(!sim.codec().playback_enabled());
        assert_eq!(sim.memory().live_blocks(), 0);
    }
}
