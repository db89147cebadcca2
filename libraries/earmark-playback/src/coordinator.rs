//! Playback coordinator
//!
//! Three threads share one mutex-protected state:
//! - the control loop (the caller's thread) renders fragments and applies keys
//! - the output thread is the only caller of the blocking [`DeviceSink::play`]
//! - the input thread blocks in [`InputSource::next_key`] and hands keys over
//!   one at a time
//!
//! There is a single fragment buffer. While the output thread holds it the
//! control loop cannot render, so at most one fragment is ever in flight and
//! a key press is heard within one fragment.

use crate::error::{PlaybackError, Result};
use crate::session::{RenderOutcome, Session, SessionStatus};
use earmark_core::{DeviceSink, EarmarkError, InputSource, Key};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every trial was recorded
    Completed,
    /// The user quit
    Quit,
    /// The device stopped accepting audio
    DeviceClosed,
    /// Key input could no longer be read
    InputClosed,
}

#[derive(Default)]
struct State {
    exiting: bool,
    /// Fragment handed to the output thread
    outgoing: Option<Vec<u8>>,
    /// Fragment buffer returned by the output thread
    played: Option<Vec<u8>>,
    /// Key waiting for the control loop
    key: Option<Key>,
    device_closed: bool,
    input_error: Option<EarmarkError>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    main_cond: Condvar,
    play_cond: Condvar,
    key_cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("coordinator state poisoned")
    }

    /// Flag shutdown and wake every waiter
    fn shut_down(&self, state: &mut State) {
        state.exiting = true;
        self.main_cond.notify_all();
        self.play_cond.notify_all();
        self.key_cond.notify_all();
    }
}

/// Run `session` until it finishes, the user quits, or a collaborator fails
///
/// `observer` is called with the session status once per control-loop pass,
/// outside the lock.
///
/// # Errors
/// - [`PlaybackError::ThreadSpawn`] if a worker thread cannot be started
/// - any error from [`Session::render`]; these indicate a bug
pub fn run(
    session: &mut Session,
    sink: Box<dyn DeviceSink>,
    input: Box<dyn InputSource>,
    observer: &mut dyn FnMut(&SessionStatus),
) -> Result<StopReason> {
    let mut spare = Vec::new();
    spare.try_reserve_exact(session.fragment_bytes())?;
    spare.resize(session.fragment_bytes(), 0);

    let shared = Arc::new(Shared::default());
    let waker = input.waker();

    let output = spawn("output", {
        let shared = Arc::clone(&shared);
        move || output_thread(&shared, sink)
    })?;
    let keys = match spawn("input", {
        let shared = Arc::clone(&shared);
        move || input_thread(&shared, input)
    }) {
        Ok(handle) => handle,
        Err(e) => {
            shared.shut_down(&mut shared.lock());
            join(output);
            return Err(e);
        }
    };

    let result = control_loop(&shared, session, spare, observer);

    shared.shut_down(&mut shared.lock());
    waker.wake();
    join(output);
    join(keys);

    let result = result?;
    let state = shared.lock();
    let reason = if let Some(reason) = result {
        reason
    } else if state.device_closed {
        StopReason::DeviceClosed
    } else if let Some(e) = &state.input_error {
        tracing::warn!("Stopping: {e}");
        StopReason::InputClosed
    } else {
        StopReason::Quit
    };
    tracing::info!("Session ended: {:?}", reason);
    Ok(reason)
}

fn spawn(name: &str, f: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("earmark-{name}"))
        .spawn(f)
        .map_err(|e| {
            tracing::error!("Failed to spawn {name} thread: {e}");
            PlaybackError::ThreadSpawn(name.to_string())
        })
}

fn join(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("Worker thread panicked");
    }
}

/// Returns the stop reason the session itself decided on, or `None` when a
/// worker thread asked to exit
fn control_loop(
    shared: &Shared,
    session: &mut Session,
    spare: Vec<u8>,
    observer: &mut dyn FnMut(&SessionStatus),
) -> Result<Option<StopReason>> {
    let mut spare = Some(spare);
    let mut state = shared.lock();

    loop {
        if state.exiting {
            return Ok(None);
        }

        // flips, choices and pauses are applied one fragment at a time
        if session.accepts_input() {
            if let Some(key) = state.key.take() {
                drop(state);
                session.handle_key(key);
                state = shared.lock();
                shared.key_cond.notify_one();
                if session.is_finished() {
                    shared.shut_down(&mut state);
                    return Ok(Some(StopReason::Quit));
                }
            }
        }

        drop(state);
        observer(&session.status());
        state = shared.lock();

        if spare.is_none() {
            spare = state.played.take();
        }
        let buffer = if state.exiting { None } else { spare.take() };
        if let Some(mut buffer) = buffer {
            drop(state);
            let outcome = session.render(&mut buffer);
            state = shared.lock();
            match outcome {
                Ok(RenderOutcome::Ready) => {
                    state.outgoing = Some(buffer);
                    shared.play_cond.notify_one();
                }
                Ok(RenderOutcome::Finished) => {
                    shared.shut_down(&mut state);
                    let reason = if session.trials_complete() {
                        StopReason::Completed
                    } else {
                        StopReason::Quit
                    };
                    return Ok(Some(reason));
                }
                Err(e) => {
                    tracing::error!("Fragment rendering failed: {e}");
                    shared.shut_down(&mut state);
                    return Err(e);
                }
            }
        }

        let in_flight = spare.is_none() && state.played.is_none();
        let key_ready = state.key.is_some() && session.accepts_input();
        if in_flight && !key_ready && !state.exiting {
            state = shared.main_cond.wait(state).expect("coordinator state poisoned");
        }
    }
}

fn output_thread(shared: &Shared, mut sink: Box<dyn DeviceSink>) {
    let mut state = shared.lock();
    loop {
        if state.exiting {
            break;
        }
        if let Some(fragment) = state.outgoing.take() {
            drop(state);
            let written = sink.play(&fragment);
            state = shared.lock();
            state.played = Some(fragment);
            if written == 0 {
                tracing::error!("Output device stopped accepting audio");
                state.device_closed = true;
                shared.shut_down(&mut state);
                break;
            }
            shared.main_cond.notify_one();
            continue;
        }
        state = shared.play_cond.wait(state).expect("coordinator state poisoned");
    }
    drop(state);
    // dropping the sink closes the device
    drop(sink);
}

fn input_thread(shared: &Shared, mut input: Box<dyn InputSource>) {
    loop {
        if shared.lock().exiting {
            break;
        }
        let key = input.next_key();
        let mut state = shared.lock();
        if state.exiting {
            break;
        }
        match key {
            Ok(Some(key)) => {
                state.key = Some(key);
                shared.main_cond.notify_one();
                while state.key.is_some() && !state.exiting {
                    state = shared.key_cond.wait(state).expect("coordinator state poisoned");
                }
            }
            Ok(None) => {}
            Err(e) => {
                state.input_error = Some(e);
                shared.shut_down(&mut state);
                break;
            }
        }
    }
}

