use std::fs;
use std::io::Write;

use bridgewire_frame::{Message, MessageType};
use serde_json::Value;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_raw, print_record, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let kind = MessageType::from(args.kind);
    let msg = Message::new(kind, args.id, &payload).map_err(|err| frame_error("encode failed", err))?;
    let wire = msg.encode();

    tracing::debug!(kind = %kind, id = args.id, wire_size = wire.len(), "encoded frame");

    let Some(path) = &args.out else {
        print_raw(&wire);
        return Ok(SUCCESS);
    };

    fs::File::create(path)
        .and_then(|mut file| file.write_all(&wire))
        .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;

    print_record(
        &[
            ("type", Value::from(kind.name())),
            ("id", Value::from(msg.id())),
            ("payload_size", Value::from(msg.payload().len())),
            ("wire_size", Value::from(wire.len())),
            ("path", Value::from(path.display().to_string())),
        ],
        format,
    );
    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
