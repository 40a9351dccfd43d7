use {
    crate::AudioError,
    libpulse_binding::{
        callbacks::ListResult,
        context::{Context, FlagSet, State},
        mainloop::standard::{IterateResult, Mainloop},
        operation::State as OperationState,
    },
    std::{cell::RefCell, rc::Rc},
};

// number of mainloop iterations to wait for the context to become ready
const MAX_MAINLOOP_ITERATIONS: usize = 100;

/// PulseAudio playback sink as reported by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub description: String,
}

fn iterate(mainloop: &mut Mainloop, what: &str) -> Result<(), AudioError> {
    match mainloop.iterate(true) {
        IterateResult::Quit(_) | IterateResult::Err(_) => {
            Err(AudioError::Device(format!("PulseAudio mainloop error during {what}")))
        }
        IterateResult::Success(_) => Ok(()),
    }
}

/// Enumerate playback sinks. Blocks while talking to the PulseAudio server.
pub fn list_devices() -> Result<Vec<AudioDevice>, AudioError> {
    let mut mainloop = Mainloop::new()
        .ok_or_else(|| AudioError::Device("Failed to create PulseAudio mainloop".to_string()))?;
    let mut context = Context::new(&mainloop, "parrot")
        .ok_or_else(|| AudioError::Device("Failed to create PulseAudio context".to_string()))?;
    context
        .connect(None, FlagSet::NOFLAGS, None)
        .map_err(|e| AudioError::Device(format!("Failed to connect to PulseAudio server: {}", e)))?;

    let mut ready = false;
    for _ in 0..MAX_MAINLOOP_ITERATIONS {
        iterate(&mut mainloop, "connection")?;
        match context.get_state() {
            State::Ready => {
                ready = true;
                break;
            }
            State::Failed | State::Terminated => {
                return Err(AudioError::Device(
                    "PulseAudio connection failed or terminated".to_string(),
                ));
            }
            _ => {}
        }
    }
    if !ready {
        return Err(AudioError::Device(
            "PulseAudio server unavailable or connection timed out".to_string(),
        ));
    }

    let devices = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&devices);
    let introspect = context.introspect();
    let op = introspect.get_sink_info_list(move |result| {
        if let ListResult::Item(info) = result {
            if let (Some(name), Some(description)) = (&info.name, &info.description) {
                sink.borrow_mut().push(AudioDevice {
                    name: name.to_string(),
                    description: description.to_string(),
                });
            }
        }
    });

    loop {
        iterate(&mut mainloop, "device enumeration")?;
        match op.get_state() {
            OperationState::Done => break,
            OperationState::Cancelled => {
                return Err(AudioError::Device("Device enumeration cancelled".to_string()));
            }
            OperationState::Running => {}
        }
    }

    let result = devices.borrow().clone();
    Ok(result)
}
