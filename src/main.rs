use std::{env, fs};

use amf::{AmfValue, GenericClassMapper};
use amf_remoting::{Envelope, config::read_config, logger::init_logger};
use anyhow::{Context, Result, bail};
use bytes::Bytes;
use tracing::info;

const USAGE: &str = "Usage: amf_remoting [--echo] <request file>";

fn main() -> Result<()> {
    let config = read_config();
    init_logger(config.logger)?;

    let mut echo = false;
    let mut path = None;
    for arg in env::args().skip(1) {
        if arg == "--echo" {
            echo = true;
        } else if path.replace(arg).is_some() {
            bail!(USAGE);
        }
    }
    let Some(path) = path else {
        bail!(USAGE);
    };

    let request = fs::read(&path).with_context(|| format!("Failed to read {path}"))?;
    let envelope = Envelope::decode(Bytes::from(request), &GenericClassMapper)
        .with_context(|| format!("Failed to decode envelope from {path}"))?;

    info!(amf_version = envelope.amf_version, "Decoded envelope.");
    for header in &envelope.headers {
        info!(
            name = %header.name,
            must_understand = header.must_understand,
            data = %summary(&header.data),
            "Header"
        );
    }
    for message in &envelope.messages {
        info!(
            target_uri = %message.target_uri,
            response_uri = %message.response_uri,
            data = %summary(&message.data),
            "Message"
        );
    }

    if echo {
        let encoded = envelope
            .encode(&GenericClassMapper)
            .context("Failed to re-encode envelope")?;
        info!(size = encoded.len(), "Re-encoded envelope.");
    }
    Ok(())
}

/// One-line description that does not descend into (possibly cyclic) children.
fn summary(value: &AmfValue) -> String {
    match value {
        AmfValue::Null => "null".to_string(),
        AmfValue::Boolean(b) => b.to_string(),
        AmfValue::Number(n) => n.to_string(),
        AmfValue::Integer(i) => i.to_string(),
        AmfValue::String(s) => format!("{s:?}"),
        AmfValue::Xml(xml) => format!("xml ({} bytes)", xml.len()),
        AmfValue::Date(date) => format!("date ({} ms)", date.millis()),
        AmfValue::Array(array) => format!("array ({} items)", array.borrow().len()),
        AmfValue::Object(map) => format!("object ({} members)", map.borrow().len()),
        AmfValue::TypedObject(object) => {
            let object = object.borrow();
            let class_name = object.class_name.as_deref().unwrap_or("<anonymous>");
            format!("{class_name} ({} members)", object.properties.len())
        }
        AmfValue::ByteArray(bytes) => format!("byte array ({} bytes)", bytes.len()),
        AmfValue::Dictionary(entries) => format!("dictionary ({} entries)", entries.borrow().len()),
    }
}
