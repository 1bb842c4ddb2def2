//! In-memory clip driver and output lines for tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::engine::{Clip, ClipDriver, CompletionListener, LineProvider, OutputLine};
use crate::error::StationError;
use crate::synth::PcmFormat;

/// Open/release bookkeeping shared by a fake and its handles
#[derive(Debug, Clone, Default)]
pub struct HandleLog {
    pub opened: usize,
    pub released: usize,
    pub live: usize,
    pub max_live: usize,
}

impl HandleLog {
    fn open(&mut self) {
        self.opened += 1;
        self.live += 1;
        self.max_live = self.max_live.max(self.live);
    }

    fn release(&mut self) {
        assert!(self.live > 0, "handle released twice");
        self.live -= 1;
        self.released += 1;
    }
}

#[derive(Debug, Default)]
pub struct FakeClipState {
    pub position: u64,
    pub length: u64,
    pub running: bool,
    pub released: bool,
}

struct FakeClip {
    state: Arc<Mutex<FakeClipState>>,
    log: Arc<Mutex<HandleLog>>,
}

impl Clip for FakeClip {
    fn frame_length(&self) -> u64 {
        self.state.lock().unwrap().length
    }

    fn frame_position(&self) -> u64 {
        self.state.lock().unwrap().position
    }

    fn set_frame_position(&mut self, frame: u64) {
        self.state.lock().unwrap().position = frame;
    }

    fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    fn start(&mut self) {
        self.state.lock().unwrap().running = true;
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().running = false;
    }
}

impl Drop for FakeClip {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        assert!(!state.released, "clip released twice");
        state.released = true;
        state.running = false;
        self.log.lock().unwrap().release();
    }
}

struct OpenedClip {
    path: PathBuf,
    state: Arc<Mutex<FakeClipState>>,
    listener: Arc<dyn Fn() + Send + Sync>,
}

/// Clip driver whose clips only move when the test moves them
pub struct FakeClipDriver {
    frame_length: u64,
    fail_next: AtomicBool,
    log: Arc<Mutex<HandleLog>>,
    clips: Mutex<Vec<OpenedClip>>,
}

impl FakeClipDriver {
    pub fn new(frame_length: u64) -> Self {
        Self {
            frame_length,
            fail_next: AtomicBool::new(false),
            log: Arc::new(Mutex::new(HandleLog::default())),
            clips: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self) -> HandleLog {
        self.log.lock().unwrap().clone()
    }

    /// Make the next open fail with a device error
    pub fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn clip(&self, index: usize) -> Arc<Mutex<FakeClipState>> {
        Arc::clone(&self.clips.lock().unwrap()[index].state)
    }

    pub fn opened_path(&self, index: usize) -> PathBuf {
        self.clips.lock().unwrap()[index].path.clone()
    }

    pub fn set_position(&self, index: usize, frame: u64) {
        self.clip(index).lock().unwrap().position = frame;
    }

    /// Fire the completion listener of clip `index`
    pub fn notify(&self, index: usize) {
        let listener = Arc::clone(&self.clips.lock().unwrap()[index].listener);
        listener();
    }

    /// Run clip `index` to its end, as the driver would
    pub fn finish(&self, index: usize) {
        {
            let clip = self.clip(index);
            let mut state = clip.lock().unwrap();
            state.position = state.length;
            state.running = false;
        }
        self.notify(index);
    }
}

impl ClipDriver for FakeClipDriver {
    fn open(
        &self,
        path: &Path,
        on_complete: CompletionListener,
    ) -> Result<Box<dyn Clip>, StationError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StationError::DeviceUnavailable("fake device refused".into()));
        }

        let state = Arc::new(Mutex::new(FakeClipState {
            length: self.frame_length,
            ..Default::default()
        }));
        self.log.lock().unwrap().open();
        self.clips.lock().unwrap().push(OpenedClip {
            path: path.to_path_buf(),
            state: Arc::clone(&state),
            listener: Arc::from(on_complete),
        });

        Ok(Box::new(FakeClip {
            state,
            log: Arc::clone(&self.log),
        }))
    }
}

/// What the fake lines have seen
#[derive(Debug, Clone, Default)]
pub struct LineLog {
    pub handles: HandleLog,
    pub formats: Vec<PcmFormat>,
    pub chunks: Vec<usize>,
    pub bytes: usize,
    pub drains: usize,
}

struct FakeLine {
    log: Arc<Mutex<LineLog>>,
    write_delay: Duration,
}

impl OutputLine for FakeLine {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StationError> {
        thread::sleep(self.write_delay);
        let mut log = self.log.lock().unwrap();
        log.chunks.push(bytes.len());
        log.bytes += bytes.len();
        Ok(bytes.len())
    }

    fn drain(&mut self) -> Result<(), StationError> {
        self.log.lock().unwrap().drains += 1;
        Ok(())
    }
}

impl Drop for FakeLine {
    fn drop(&mut self) {
        self.log.lock().unwrap().handles.release();
    }
}

/// Line provider that records writes, optionally slowing each one down
pub struct FakeLineProvider {
    log: Arc<Mutex<LineLog>>,
    write_delay: Duration,
    unavailable: bool,
}

impl FakeLineProvider {
    pub fn new(write_delay: Duration) -> Self {
        Self {
            log: Arc::new(Mutex::new(LineLog::default())),
            write_delay,
            unavailable: false,
        }
    }

    /// A provider whose every open fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(Duration::ZERO)
        }
    }

    pub fn log(&self) -> LineLog {
        self.log.lock().unwrap().clone()
    }
}

impl LineProvider for FakeLineProvider {
    fn open_line(&self, format: &PcmFormat) -> Result<Box<dyn OutputLine>, StationError> {
        if self.unavailable {
            return Err(StationError::DeviceUnavailable("fake line refused".into()));
        }

        {
            let mut log = self.log.lock().unwrap();
            log.handles.open();
            log.formats.push(*format);
        }

        Ok(Box::new(FakeLine {
            log: Arc::clone(&self.log),
            write_delay: self.write_delay,
        }))
    }
}
