//! OSC wire codec
//!
//! Converts between [`Message`] and the OSC 1.0 datagram format spoken by the
//! synthesis engine. Only the `i`, `f`, `d` and `s` argument types are part of
//! the message model; anything else is rejected as malformed.

use rosc::{OscMessage, OscPacket, OscType};

use crate::{Arg, Error, Message, Result};

/// Encode a message into a single OSC datagram
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(to_osc(message));
    rosc::encoder::encode(&packet).map_err(|e| Error::Encode(format!("{:?}", e)))
}

/// Decode a datagram holding exactly one OSC message
pub fn decode(bytes: &[u8]) -> Result<Message> {
    match decode_osc(bytes)? {
        OscPacket::Message(msg) => from_osc(msg),
        OscPacket::Bundle(_) => Err(Error::wire("expected a message, got a bundle")),
    }
}

/// Decode a datagram holding a message or a bundle.
///
/// Bundles are flattened depth-first, so the returned messages keep the order
/// they had inside the bundle. A single bad element fails the whole datagram.
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<Message>> {
    let packet = decode_osc(bytes)?;
    let mut messages = Vec::new();
    flatten(packet, &mut messages)?;
    Ok(messages)
}

fn decode_osc(bytes: &[u8]) -> Result<OscPacket> {
    if bytes.is_empty() {
        return Err(Error::wire("empty datagram"));
    }
    let (_, packet) = rosc::decoder::decode_udp(bytes)?;
    Ok(packet)
}

fn flatten(packet: OscPacket, out: &mut Vec<Message>) -> Result<()> {
    match packet {
        OscPacket::Message(msg) => out.push(from_osc(msg)?),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out)?;
            }
        }
    }
    Ok(())
}

fn to_osc(message: &Message) -> OscMessage {
    OscMessage {
        addr: message.address.clone(),
        args: message.args.iter().map(arg_to_osc).collect(),
    }
}

fn from_osc(msg: OscMessage) -> Result<Message> {
    if !msg.addr.starts_with('/') {
        return Err(Error::wire(format!("invalid address: {:?}", msg.addr)));
    }

    let args = msg
        .args
        .into_iter()
        .map(osc_to_arg)
        .collect::<Result<Vec<_>>>()?;

    Ok(Message {
        address: msg.addr,
        args,
    })
}

fn arg_to_osc(arg: &Arg) -> OscType {
    match arg {
        Arg::Int(i) => OscType::Int(*i),
        Arg::Float(f) => OscType::Float(*f),
        Arg::Double(d) => OscType::Double(*d),
        Arg::String(s) => OscType::String(s.clone()),
    }
}

fn osc_to_arg(arg: OscType) -> Result<Arg> {
    match arg {
        OscType::Int(i) => Ok(Arg::Int(i)),
        OscType::Float(f) => Ok(Arg::Float(f)),
        OscType::Double(d) => Ok(Arg::Double(d)),
        OscType::String(s) => Ok(Arg::String(s)),
        other => Err(Error::wire(format!("unsupported argument type: {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_conversion() {
        assert_eq!(osc_to_arg(OscType::Int(42)).unwrap(), Arg::Int(42));
        assert_eq!(osc_to_arg(OscType::Float(0.5)).unwrap(), Arg::Float(0.5));
        assert_eq!(
            osc_to_arg(OscType::String("test".to_string())).unwrap(),
            Arg::String("test".to_string())
        );
        assert!(osc_to_arg(OscType::Bool(true)).is_err());
        assert!(osc_to_arg(OscType::Nil).is_err());
    }

    #[test]
    fn test_encode_is_osc_aligned() {
        let msg = Message::new("/a").arg(1).arg("xy");
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(&bytes[..4], b"/a\0\0");
    }

    #[test]
    fn test_empty_datagram() {
        assert!(matches!(decode(&[]), Err(Error::MalformedWireMessage(_))));
        assert!(matches!(decode_packet(&[]), Err(Error::MalformedWireMessage(_))));
    }
}
