//! The host-facing orchestrator.
//!
//! Owns one [`Nes`] and runs it on a dedicated worker thread, one frame at
//! a time. The host supplies the output backends as [`VideoSink`] and
//! [`AudioSink`] implementations and controls the session with
//! pause/resume/stop handshakes; those are observed once per displayed
//! frame, never mid-instruction, which preserves cycle accuracy.

use std::{
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread,
};

use log::*;

use crate::core::{Cartridge, Controller, Error, Nes};

/// Receives each completed frame as 256x240 colour indices.
/// Map through [`PALETTE_RGB`][crate::core::PALETTE_RGB] for RGB output.
pub trait VideoSink: Send {
    fn submit_frame(&mut self, frame: &[u8]);
}

/// Receives the mixed audio output.
///
/// Implementations may block while their device buffer is full; that
/// backpressure is what throttles emulation to real playback speed.
pub trait AudioSink: Send {
    fn submit_samples(&mut self, samples: &[f32]);
}

/// Session lifecycle notifications, delivered from the worker thread.
pub trait HostCallback: Send {
    fn on_frame_complete(&mut self) {}
    fn on_error(&mut self, _error: &Error) {}
}

/// A sink that discards its input, for headless use.
pub struct NullSink;
impl VideoSink for NullSink {
    fn submit_frame(&mut self, _frame: &[u8]) {}
}
impl AudioSink for NullSink {
    fn submit_samples(&mut self, _samples: &[f32]) {}
}

/// Host configuration for a session.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory battery-backed save RAM files are kept in.
    pub save_dir: PathBuf,
    /// Directory save-state files are kept in.
    pub state_dir: PathBuf,
    /// Frame rate the audio sample cadence is derived from.
    pub target_frame_rate: u32,
    pub audio_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            save_dir: PathBuf::from("."),
            state_dir: PathBuf::from("."),
            target_frame_rate: 60,
            audio_enabled: true,
        }
    }
}

/// Where the session is in its lifecycle. A session that hit a fatal
/// error can only be re-created, never restarted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    Ready,
    Running,
    Paused,
    Stopped,
    Error,
}

struct Shared {
    nes: Mutex<Nes>,
    state: Mutex<SessionState>,
    control: Condvar,
    stop_requested: AtomicBool,
    pause_requested: AtomicBool,
}

/// One emulation session: a console, a loaded game, and a worker thread.
/// ```no_run
/// use famicore::core::Cartridge;
/// use famicore::session::{Config, NullSink, Session};
///
/// let rom = std::fs::read("game.nes").unwrap();
/// let cartridge = Cartridge::from_ines(&rom, None).unwrap();
/// let mut session = Session::new(cartridge, "game", Config::default());
/// session.start(Box::new(NullSink), Box::new(NullSink), None).unwrap();
/// session.pause().unwrap();
/// session.save_state(0).unwrap();
/// session.resume().unwrap();
/// session.stop().unwrap();
/// ```
pub struct Session {
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
    game_name: String,
    config: Config,
}

impl Session {
    /// Create a session around a loaded cartridge. Battery-backed RAM is
    /// read from `<save_dir>/<game_name>.sav` if present; a missing file
    /// just means a first run.
    pub fn new(cartridge: Cartridge, game_name: &str, config: Config) -> Session {
        let mut nes = Nes::with_cartridge(cartridge);
        nes.apu.set_target_frame_rate(config.target_frame_rate);
        nes.apu.set_audio_enabled(config.audio_enabled);

        let save_file = config.save_dir.join(format!("{}.sav", game_name));
        match fs::read(&save_file) {
            Ok(data) => {
                info!("Loaded {} bytes of save RAM from {:?}", data.len(), save_file);
                nes.cartridge.load_nv_ram(&data);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not read save RAM file {:?}: {}", save_file, e),
        }

        Session {
            shared: Arc::new(Shared {
                nes: Mutex::new(nes),
                state: Mutex::new(SessionState::Ready),
                control: Condvar::new(),
                stop_requested: AtomicBool::new(false),
                pause_requested: AtomicBool::new(false),
            }),
            worker: None,
            game_name: game_name.to_string(),
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock().unwrap()
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    /// Launch the worker thread. Returns immediately; frames start flowing
    /// to the sinks.
    pub fn start(
        &mut self,
        video: Box<dyn VideoSink>,
        audio: Box<dyn AudioSink>,
        callback: Option<Box<dyn HostCallback>>,
    ) -> Result<(), Error> {
        match self.state() {
            SessionState::Ready => {}
            SessionState::Error => return Err(Error::ErrorState),
            _ => return Err(Error::AlreadyStarted),
        }
        *self.shared.state.lock().unwrap() = SessionState::Running;
        let shared = Arc::clone(&self.shared);
        let save_file = self.config.save_dir.join(format!("{}.sav", self.game_name));
        self.worker = Some(thread::spawn(move || {
            run_worker(shared, video, audio, callback, save_file)
        }));
        info!("Session for {} started", self.game_name);
        Ok(())
    }

    /// Ask the worker to pause at the next frame boundary and block until
    /// it has.
    pub fn pause(&self) -> Result<(), Error> {
        if self.worker.is_none() {
            return Err(Error::NotRunning);
        }
        self.shared.pause_requested.store(true, Ordering::SeqCst);
        let mut state = self.shared.state.lock().unwrap();
        while *state == SessionState::Running {
            state = self.shared.control.wait(state).unwrap();
        }
        match *state {
            SessionState::Paused => Ok(()),
            SessionState::Error => Err(Error::ErrorState),
            _ => Err(Error::NotRunning),
        }
    }

    /// Wake a paused worker.
    pub fn resume(&self) -> Result<(), Error> {
        if self.worker.is_none() {
            return Err(Error::NotRunning);
        }
        self.shared.pause_requested.store(false, Ordering::SeqCst);
        let mut state = self.shared.state.lock().unwrap();
        if *state == SessionState::Paused {
            *state = SessionState::Running;
        }
        self.shared.control.notify_all();
        Ok(())
    }

    /// Stop the session and block until the worker has exited. Flushes
    /// battery-backed RAM to disk.
    pub fn stop(&mut self) -> Result<(), Error> {
        let worker = self.worker.take().ok_or(Error::NotRunning)?;
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        self.shared.control.notify_all();
        if worker.join().is_err() {
            error!("Emulation worker panicked");
        }
        info!("Session for {} stopped", self.game_name);
        Ok(())
    }

    fn state_file(&self, slot: usize) -> PathBuf {
        self.config
            .state_dir
            .join(format!("{}.state{}", self.game_name, slot))
    }

    /// Save the full console state to the given slot. The worker is paused
    /// around the snapshot and resumed afterwards.
    pub fn save_state(&self, slot: usize) -> Result<(), Error> {
        self.pause()?;
        let bytes = self.shared.nes.lock().unwrap().save_state();
        let path = self.state_file(slot);
        let result = fs::write(&path, &bytes);
        self.resume()?;
        result?;
        info!("Saved state {} ({} bytes)", slot, bytes.len());
        Ok(())
    }

    /// Restore the console state from the given slot. Requires the same
    /// cartridge this session was created with.
    pub fn load_state(&self, slot: usize) -> Result<(), Error> {
        self.pause()?;
        let path = self.state_file(slot);
        let result = fs::read(&path)
            .map_err(Error::from)
            .and_then(|bytes| self.shared.nes.lock().unwrap().load_state(&bytes));
        self.resume()?;
        result?;
        info!("Loaded state {}", slot);
        Ok(())
    }

    /// Update a controller. Observed by the ROM on its next strobe.
    pub fn set_controller(&self, port: usize, state: Controller) {
        self.shared.nes.lock().unwrap().set_controller(port, state);
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.shared.nes.lock().unwrap().apu.set_master_volume(volume);
    }
    pub fn master_volume(&self) -> f32 {
        self.shared.nes.lock().unwrap().apu.master_volume()
    }
    /// Channel index: pulse 1, pulse 2, triangle, noise, DMC.
    pub fn set_channel_volume(&self, channel: usize, volume: f32) {
        self.shared
            .nes
            .lock()
            .unwrap()
            .apu
            .set_channel_volume(channel, volume);
    }
    pub fn channel_volume(&self, channel: usize) -> f32 {
        self.shared.nes.lock().unwrap().apu.channel_volume(channel)
    }
    pub fn set_target_frame_rate(&self, rate: u32) {
        self.shared
            .nes
            .lock()
            .unwrap()
            .apu
            .set_target_frame_rate(rate);
    }
    pub fn set_turbo(&self, enabled: bool) {
        self.shared.nes.lock().unwrap().apu.set_turbo(enabled);
    }

    /// A copy of the last completed frame, as colour indices.
    pub fn frame(&self) -> Vec<u8> {
        self.shared.nes.lock().unwrap().ppu.frame().to_vec()
    }
    /// Render one nametable for a debugging UI.
    pub fn name_table(&self, table: usize) -> Vec<u8> {
        let nes = self.shared.nes.lock().unwrap();
        nes.ppu.debug_name_table(&nes.cartridge, table).to_vec()
    }
    /// Render one pattern table for a debugging UI.
    pub fn pattern_table(&self, table: usize, palette: usize) -> Vec<u8> {
        let nes = self.shared.nes.lock().unwrap();
        nes.ppu
            .debug_pattern_table(&nes.cartridge, table, palette)
            .to_vec()
    }
    /// One palette's four colour indices.
    pub fn palette(&self, palette: usize) -> [u8; 4] {
        self.shared.nes.lock().unwrap().ppu.debug_palette(palette)
    }
    /// Render one sprite for a debugging UI.
    pub fn sprite(&self, sprite: usize) -> Vec<u8> {
        let nes = self.shared.nes.lock().unwrap();
        nes.ppu.debug_sprite(&nes.cartridge, sprite).to_vec()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

fn run_worker(
    shared: Arc<Shared>,
    mut video: Box<dyn VideoSink>,
    mut audio: Box<dyn AudioSink>,
    mut callback: Option<Box<dyn HostCallback>>,
    save_file: PathBuf,
) {
    loop {
        if shared.stop_requested.load(Ordering::SeqCst) {
            break;
        }

        // Run one frame under the lock, then hand the outputs off without
        // it so a blocking audio sink cannot starve the control thread
        let step_result = {
            let mut nes = shared.nes.lock().unwrap();
            nes.step_frame().map(|()| {
                (
                    nes.ppu.frame().to_vec(),
                    nes.apu.sample_queue().drain(..).collect::<Vec<f32>>(),
                )
            })
        };
        match step_result {
            Ok((frame, samples)) => {
                video.submit_frame(&frame);
                audio.submit_samples(&samples);
                if let Some(callback) = callback.as_mut() {
                    callback.on_frame_complete();
                }
            }
            Err(e) => {
                error!("Emulation stopped: {}", e);
                *shared.state.lock().unwrap() = SessionState::Error;
                shared.control.notify_all();
                if let Some(callback) = callback.as_mut() {
                    callback.on_error(&e);
                }
                return;
            }
        }

        // The only drain point: pause and stop are honoured between frames
        if shared.pause_requested.load(Ordering::SeqCst) {
            let mut state = shared.state.lock().unwrap();
            *state = SessionState::Paused;
            shared.control.notify_all();
            while *state == SessionState::Paused && !shared.stop_requested.load(Ordering::SeqCst) {
                state = shared.control.wait(state).unwrap();
            }
        }
    }

    // Flush battery-backed RAM on the way out
    let nes = shared.nes.lock().unwrap();
    if let Some(data) = nes.cartridge.nv_ram() {
        if let Err(e) = fs::write(&save_file, &data) {
            warn!("Could not write save RAM file {:?}: {}", save_file, e);
        }
    }
    drop(nes);
    *shared.state.lock().unwrap() = SessionState::Stopped;
    shared.control.notify_all();
}
