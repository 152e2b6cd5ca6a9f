use serde::Deserialize;
use thiserror::Error;

use crate::checksum::{crc16, crc16_le};
use crate::dictionary::{DataType, RegisterDescriptor};
use crate::{ExchangeError, ExchangeResult};

/// Standard write single register, used for 16-bit parameters.
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;

/// The drive accepts 32-bit parameter writes under function code 0x03.
/// This is not a holding register read despite sharing the standard code.
pub const EXTENDED_WRITE: u8 = 0x03;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),

    #[error("Unit ID mismatch: expected {expected}, received {received}")]
    UnitIdMismatch { expected: u8, received: u8 },

    #[error("CRC mismatch: expected {expected:#06x}, received {received:#06x}")]
    CrcMismatch { expected: u16, received: u16 },

    #[error("Unexpected function code: expected {expected:#x}, got {received:#x}")]
    UnexpectedFunctionCode { expected: u8, received: u8 },

    #[error("Device exception: function code {function:#x}, exception code {code:#x}")]
    DeviceException { function: u8, code: u8 },
}

/// How much of a response is checked before an exchange counts as a success.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCheck {
    /// Any non-empty response is accepted. This is what the drive firmware
    /// has been commissioned against.
    #[default]
    Lenient,
    /// Unit id, CRC and function code echo must all match the request.
    Strict,
}

/// One encoded Modbus RTU request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
    description: String,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn unit_id(&self) -> u8 {
        self.bytes[0]
    }

    pub fn function_code(&self) -> u8 {
        self.bytes[1]
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub fn function_code(data_type: DataType) -> u8 {
    match data_type {
        DataType::U16 | DataType::I16 => WRITE_SINGLE_REGISTER,
        DataType::U32 | DataType::I32 => EXTENDED_WRITE,
    }
}

/// Build the request frame for writing `value` to the register.
///
/// `value` is cut down to the register width (wrapping, two's complement for
/// negative numbers); callers are responsible for passing values that fit.
pub fn encode(descriptor: &RegisterDescriptor, value: i64, unit_id: u8) -> Frame {
    let width = descriptor.data_type.width();
    let mut pdu = Vec::with_capacity(3 + width);
    pdu.push(function_code(descriptor.data_type));
    pdu.push(descriptor.index);
    pdu.push(descriptor.sub_index);
    match width {
        2 => pdu.extend_from_slice(&(value as u16).to_be_bytes()),
        _ => pdu.extend_from_slice(&(value as u32).to_be_bytes()),
    }

    Frame {
        bytes: wrap_rtu(unit_id, pdu),
        description: descriptor.description.clone(),
    }
}

fn wrap_rtu(unit_id: u8, pdu: Vec<u8>) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + pdu.len() + 2);
    frame.push(unit_id);
    frame.extend(&pdu);

    let crc = crc16_le(&frame);
    frame.extend_from_slice(&crc);

    frame
}

/// Interpret the raw bytes read back after sending `request`.
pub fn decode(raw: Vec<u8>, request: &Frame, check: ResponseCheck) -> ExchangeResult {
    if raw.is_empty() {
        return ExchangeResult::failure(request.description(), raw, ExchangeError::NoResponse);
    }

    if check == ResponseCheck::Strict {
        if let Err(err) = validate_response(&raw, request) {
            return ExchangeResult::failure(request.description(), raw, err.into());
        }
    }

    ExchangeResult::success(request.description(), raw)
}

/// Strict response validation: unit id, trailing CRC and function code echo.
pub fn validate_response(frame: &[u8], request: &Frame) -> Result<(), FrameError> {
    if frame.len() < 4 {
        return Err(FrameError::FrameTooShort(frame.len()));
    }

    let unit_id = frame[0];
    if unit_id != request.unit_id() {
        return Err(FrameError::UnitIdMismatch {
            expected: request.unit_id(),
            received: unit_id,
        });
    }

    let data_len = frame.len() - 2;
    let received_crc = u16::from_le_bytes([frame[data_len], frame[data_len + 1]]);
    let calculated_crc = crc16(&frame[..data_len]);
    if received_crc != calculated_crc {
        return Err(FrameError::CrcMismatch {
            expected: calculated_crc,
            received: received_crc,
        });
    }

    let function = frame[1];
    let expected = request.function_code();
    if function == (expected | 0x80) {
        let code = if data_len > 2 { frame[2] } else { 0 };
        return Err(FrameError::DeviceException { function, code });
    }
    if function != expected {
        return Err(FrameError::UnexpectedFunctionCode {
            expected,
            received: function,
        });
    }

    Ok(())
}

/// Uppercase, space separated hex used in the exchange trace.
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
