use crate::audio::Voice;

// Commands cross from the control thread into the audio callback; events come
// back the other way. Both channels are bounded and only ever try_send/
// try_recv'd, so neither side can block the other.
#[derive(Debug)]
pub enum AudioCommand {
    // The callback can't allocate, so voices arrive fully built (source view
    // or reverse copy, effect chain, envelope timing all done control-side)
    // and just get slotted into the pool.
    Spawn(Box<Voice>),

    // force-stop everything; used for abrupt resets like a new file load
    StopAll,
}

#[derive(Debug)]
pub enum EngineEvent {
    // The authoritative "this voice is done" signal, natural end or forced.
    // The dead voice rides along so its buffers drop on the control thread
    // instead of inside the callback.
    VoiceEnded(Box<Voice>),
}
