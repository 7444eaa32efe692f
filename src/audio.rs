//! The audio collaborator: a dedicated thread that turns scheduler messages
//! into rodio playback. Everything here is fire-and-forget; playback
//! failures are logged and never reach the scheduler.

use std::{error::Error, fs::File, io::BufReader, path::Path, sync::mpsc::Receiver, thread};

use rodio::{Decoder, OutputStreamHandle, Sink, Source};

use crate::communication::{Message, MessageType};

pub fn spawn(receiver: Receiver<Message>) -> thread::JoinHandle<()> {
    thread::spawn(move || run(&receiver))
}

fn run(receiver: &Receiver<Message>) {
    // keep the stream alive for the lifetime of the thread
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            log::error!("couldn't open audio output: {e}, alerts will be silent");
            // keep draining so the scheduler's sends never error
            for _ in receiver {}
            return;
        }
    };
    // at most one alert rings at a time, so one looping sink suffices
    let mut ringing: Option<Sink> = None;
    for message in receiver {
        match message.kind {
            MessageType::AlarmTriggered { volume, sound_path } => {
                if let Some(old) = ringing.take() {
                    old.stop();
                }
                match start_sink(&handle, &sound_path, volume, true) {
                    Ok(sink) => {
                        log::info!("alarm {} ringing at volume {volume}", message.alarm_id);
                        ringing = Some(sink);
                    }
                    Err(e) => {
                        log::error!("couldn't play {}: {e}", sound_path.display());
                    }
                }
            }
            MessageType::Preview { volume, sound_path } => {
                match start_sink(&handle, &sound_path, volume, false) {
                    Ok(sink) => sink.detach(),
                    Err(e) => log::error!("couldn't preview {}: {e}", sound_path.display()),
                }
            }
            MessageType::AlarmStopped => {
                if let Some(sink) = ringing.take() {
                    log::info!("alarm {} stopped", message.alarm_id);
                    sink.stop();
                }
            }
        }
    }
}

fn start_sink(
    handle: &OutputStreamHandle,
    path: &Path,
    volume: f32,
    looped: bool,
) -> Result<Sink, Box<dyn Error>> {
    let file = BufReader::new(File::open(path)?);
    let source = Decoder::new(file)?;
    let sink = Sink::try_new(handle)?;
    sink.set_volume(volume / 100.0);
    if looped {
        sink.append(source.repeat_infinite());
    } else {
        sink.append(source);
    }
    sink.play();
    Ok(sink)
}
