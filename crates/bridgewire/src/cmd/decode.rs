use std::fs::File;
use std::io::{self, Read};

use bridgewire_frame::{FrameConfig, FrameError, FrameReader};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.path {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let mut config = FrameConfig::default();
    if let Some(max) = args.max_payload {
        config.max_payload_size = max;
    }

    let decoded = decode_all(input, config, |msg| print_message(msg, format))?;
    if decoded == 0 {
        return Err(CliError::new(DATA_INVALID, "input contains no frames"));
    }

    tracing::debug!(frames = decoded, "decoded input");
    Ok(SUCCESS)
}

/// Decode every frame in `input`, calling `on_message` for each. Returns the
/// number of frames decoded.
fn decode_all<R: Read>(
    input: R,
    config: FrameConfig,
    mut on_message: impl FnMut(&bridgewire_frame::Message),
) -> CliResult<usize> {
    let mut reader = FrameReader::with_config(input, config);
    let mut count = 0usize;

    loop {
        match reader.read_message() {
            Ok(msg) => {
                on_message(&msg);
                count += 1;
            }
            Err(FrameError::ConnectionClosed) if reader.buffered() == 0 => return Ok(count),
            Err(FrameError::ConnectionClosed) => {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!(
                        "frame {} truncated: {} trailing bytes",
                        count + 1,
                        reader.buffered()
                    ),
                ));
            }
            Err(err) => return Err(frame_error(&format!("frame {} invalid", count + 1), err)),
        }
    }
}
