use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

pub trait DurationProbe: Send + Sync {
    /// Track length in seconds.
    fn duration(&self, path: &Path) -> Result<f64>;
}

pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn duration(&self, path: &Path) -> Result<f64> {
        let file = File::open(path).with_context(|| format!("open audio file {:?}", path))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("probe audio format {:?}", path))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| anyhow::anyhow!("no default track found"))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        if let Some(frames) = params.n_frames {
            if let Some(seconds) = frames_to_seconds(frames, &params) {
                debug!(?path, seconds, "duration from stream header");
                return Ok(seconds);
            }
        }

        // No frame count in the header: sum packet durations instead of decoding.
        let mut frames = 0u64;
        while let Ok(packet) = format.next_packet() {
            if packet.track_id() == track_id {
                frames += packet.dur;
            }
        }
        let seconds = frames_to_seconds(frames, &params)
            .ok_or_else(|| anyhow::anyhow!("stream has neither time base nor sample rate"))?;
        debug!(?path, seconds, "duration from packet scan");
        Ok(seconds)
    }
}

fn frames_to_seconds(
    frames: u64,
    params: &symphonia::core::codecs::CodecParameters,
) -> Option<f64> {
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    params
        .sample_rate
        .map(|rate| frames as f64 / rate as f64)
}
