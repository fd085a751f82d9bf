//! Duration probe for synthesized speech files.

use crate::error::{LipSyncError, Result};
use std::path::Path;
use symphonia::core::codecs::CodecParameters;
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Length of an audio file in ms.
///
/// Uses the container's frame count when it has one (WAV, MP4) and falls
/// back to walking packet timestamps otherwise (headerless MP3).
///
/// # Errors
///
/// Returns [`LipSyncError::Io`] if the file cannot be opened and
/// [`LipSyncError::Audio`] if it is not a recognised audio format.
pub fn probe_duration_ms(path: &Path) -> Result<f64> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LipSyncError::Audio(format!("failed to probe audio: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| LipSyncError::Audio("no default audio track".into()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    if let Some(frames) = params.n_frames
        && let Some(ms) = frames_to_ms(&params, frames)
    {
        debug!(path = %path.display(), duration_ms = ms, "audio duration from header");
        return Ok(ms);
    }

    let mut end_ts: u64 = 0;
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(LipSyncError::Audio(format!("audio read error: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        end_ts = end_ts.max(packet.ts() + packet.dur());
    }

    let ms = frames_to_ms(&params, end_ts)
        .ok_or_else(|| LipSyncError::Audio("unknown time base and sample rate".into()))?;
    debug!(path = %path.display(), duration_ms = ms, "audio duration from packets");
    Ok(ms)
}

fn frames_to_ms(params: &CodecParameters, frames: u64) -> Option<f64> {
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Some((time.seconds as f64 + time.frac) * 1000.0);
    }
    params
        .sample_rate
        .map(|rate| frames as f64 * 1000.0 / f64::from(rate))
}
